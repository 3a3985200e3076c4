pub use crate::{buf::Hash160Buf, constants::*, errors::ParseError, keys::KeyRef, outref::OutputRef};
