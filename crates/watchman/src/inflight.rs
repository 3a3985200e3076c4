use std::collections::HashSet;

use hodlock_primitives::outref::OutputRef;
use parking_lot::Mutex;

/// Guard set for entries whose redemption is currently underway.
///
/// The registry scan and the broadcast are not atomic; a second cycle can
/// start before the first one's submission is confirmed and the spend
/// notification lands. Claiming the outpoint here before doing any work
/// keeps at most one attempt in flight per entry within this process.
#[derive(Debug, Default)]
pub(crate) struct InflightSet {
    active: Mutex<HashSet<OutputRef>>,
}

impl InflightSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claims the outpoint. False means another attempt holds it.
    pub(crate) fn try_begin(&self, outpoint: OutputRef) -> bool {
        self.active.lock().insert(outpoint)
    }

    /// Releases the outpoint, success or not.
    pub(crate) fn finish(&self, outpoint: &OutputRef) {
        self.active.lock().remove(outpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_loses_until_released() {
        let set = InflightSet::new();
        let op = OutputRef::from_raw([1; 32], 0);
        assert!(set.try_begin(op));
        assert!(!set.try_begin(op));
        set.finish(&op);
        assert!(set.try_begin(op));
    }
}
