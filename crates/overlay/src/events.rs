//! Output-lifecycle notifications from the overlay engine, filtered by topic
//! and applied to the registry.

use std::time::{SystemTime, UNIX_EPOCH};

use bitcoin::Script;
use hodlock_contract::{script, DecodeError};
use hodlock_db::LockEntry;
use hodlock_primitives::outref::OutputRef;
use hodlock_storage::{LockRegistry, RegistryError};
use thiserror::Error;
use tracing::*;

#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The notifier claimed this output belongs to the lock topic but its
    /// script does not decode as the template.
    #[error("notified output is not a lock: {0}")]
    NotALock(#[from] DecodeError),
}

/// A new output the overlay admitted under some topic. Carries the raw
/// bundle so the registry can serve it later as the funding proof.
#[derive(Debug, Clone)]
pub struct OutputAdded {
    pub outpoint: OutputRef,
    pub satoshis: u64,
    pub script: Vec<u8>,
    pub topic: String,
    pub bundle: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutputSpent {
    pub outpoint: OutputRef,
    pub topic: String,
}

#[derive(Debug, Clone)]
pub struct OutputDeleted {
    pub outpoint: OutputRef,
    pub topic: String,
}

/// Applies lifecycle notifications for one topic to the registry.
#[derive(Debug, Clone)]
pub struct LockEventHandler {
    registry: LockRegistry,
    topic: String,
}

impl LockEventHandler {
    pub fn new(registry: LockRegistry, topic: impl Into<String>) -> Self {
        Self {
            registry,
            topic: topic.into(),
        }
    }

    fn ours(&self, topic: &str) -> bool {
        topic == self.topic
    }

    /// Inserts a newly admitted output. The script is decoded and validated
    /// again here; an overlay engine vouching for an output does not excuse
    /// trusting its bytes.
    pub fn handle_added(&self, event: OutputAdded) -> Result<bool, EventError> {
        if !self.ours(&event.topic) {
            trace!(topic = %event.topic, "ignoring output for foreign topic");
            return Ok(false);
        }

        let contract = script::decode(Script::from_bytes(&event.script))?;
        let entry = LockEntry::new(
            event.outpoint,
            event.satoshis,
            event.script,
            contract,
            event.bundle,
            unix_now(),
        );
        Ok(self.registry.on_admitted(entry)?)
    }

    pub fn handle_spent(&self, event: OutputSpent) -> Result<bool, EventError> {
        if !self.ours(&event.topic) {
            return Ok(false);
        }
        Ok(self.registry.on_spent(&event.outpoint)?)
    }

    pub fn handle_deleted(&self, event: OutputDeleted) -> Result<bool, EventError> {
        if !self.ours(&event.topic) {
            return Ok(false);
        }
        Ok(self.registry.on_deleted(&event.outpoint)?)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hodlock_contract::LockContract;
    use hodlock_db::mem::MemLockStore;
    use hodlock_primitives::buf::Hash160Buf;

    use super::*;

    fn handler() -> LockEventHandler {
        let registry = LockRegistry::new(Arc::new(MemLockStore::new()));
        LockEventHandler::new(registry, "tm_hodlock")
    }

    fn added_event(topic: &str) -> OutputAdded {
        let contract =
            LockContract::new(Hash160Buf::new([0x42; 20]), 120_000, b"hi".to_vec()).unwrap();
        OutputAdded {
            outpoint: OutputRef::from_raw([1; 32], 0),
            satoshis: 2000,
            script: script::encode(&contract).into_bytes(),
            topic: topic.to_string(),
            bundle: vec![0xEE; 40],
        }
    }

    #[test]
    fn adds_then_spends() {
        let h = handler();
        assert!(h.handle_added(added_event("tm_hodlock")).unwrap());
        // duplicate notification
        assert!(!h.handle_added(added_event("tm_hodlock")).unwrap());

        let spent = OutputSpent {
            outpoint: OutputRef::from_raw([1; 32], 0),
            topic: "tm_hodlock".into(),
        };
        assert!(h.handle_spent(spent.clone()).unwrap());
        assert!(!h.handle_spent(spent).unwrap());
    }

    #[test]
    fn filters_foreign_topics() {
        let h = handler();
        assert!(!h.handle_added(added_event("tm_other")).unwrap());
        assert!(!h
            .handle_deleted(OutputDeleted {
                outpoint: OutputRef::from_raw([1; 32], 0),
                topic: "tm_other".into(),
            })
            .unwrap());
    }

    #[test]
    fn rejects_lying_notifier() {
        let h = handler();
        let mut event = added_event("tm_hodlock");
        event.script = vec![0x51; 200];
        assert!(matches!(
            h.handle_added(event),
            Err(EventError::NotALock(_))
        ));
    }
}
