//! Generic internal data types shared across the hodlock crates.

pub mod buf;
pub mod constants;
pub mod errors;
pub mod keys;
pub mod outref;
pub mod prelude;
