//! The lock registry: lifecycle operations and queries over the store.
//!
//! This is the single shared mutable resource in the service. It is an
//! explicitly constructed instance handed to whoever needs it (overlay event
//! handlers, the watchman, the lookup surface); there is no global lookup.
//! All mutations are idempotent under retry, so the overlay transport is
//! free to redeliver notifications.

mod registry;

pub use registry::{LockRegistry, RegistryError};
