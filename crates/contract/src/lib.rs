//! The time-lock coin contract: parsed form, locking-script codec and the
//! signature-hash construction used to redeem it.

mod contract;
pub mod script;
pub mod sighash;

pub use contract::{LockContract, ValidationError};
pub use script::{decode, encode, DecodeError};
