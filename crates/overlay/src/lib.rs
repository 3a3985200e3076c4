//! Overlay-facing surfaces for the lock topic: the admission decision
//! applied to incoming transactions, the lifecycle event handlers that keep
//! the registry current, the outward lookup service, and the originator-side
//! lock composition helper.

pub mod compose;
pub mod events;
pub mod lookup;
pub mod topic;

pub use compose::{compose_lock, ComposeError, ComposedLock};
pub use events::{LockEventHandler, OutputAdded, OutputDeleted, OutputSpent};
pub use lookup::{LockRecord, LookupQuery, LookupService};
pub use topic::{identify_admissible_outputs, AdmissionError, AdmittanceDecision};
