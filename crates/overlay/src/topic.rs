//! Admission decision for the lock topic.
//!
//! Evaluated fresh on every transaction the overlay hands us; there is no
//! carried-forward state between transactions for this template, so the
//! previous-coin set always passes through untouched.

use hodlock_beef::{BeefBundle, BundleError};
use hodlock_contract::script;
use hodlock_primitives::outref::OutputRef;
use thiserror::Error;
use tracing::*;

/// Only a transaction that cannot be parsed at all fails the whole call;
/// individual outputs that are not instances of the template are skipped
/// silently.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("transaction bundle unparseable: {0}")]
    Bundle(#[from] BundleError),
}

/// Which outputs to admit and which previously-admitted coins to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittanceDecision {
    pub outputs_to_admit: Vec<u32>,
    pub coins_to_retain: Vec<OutputRef>,
}

/// Decides, per output of the bundled transaction, whether the output is a
/// valid instance of the lock contract.
///
/// Pure: same bundle and previous-coin set always yield the same decision.
pub fn identify_admissible_outputs(
    bundle_bytes: &[u8],
    previous_coins: Vec<OutputRef>,
) -> Result<AdmittanceDecision, AdmissionError> {
    let bundle = BeefBundle::parse(bundle_bytes)?;
    let tx = bundle.subject();
    let txid = tx.compute_txid();

    let mut outputs_to_admit = Vec::new();
    for (i, output) in tx.output.iter().enumerate() {
        let script_pubkey = output.script_pubkey.as_script();

        // cheap floor before any decode work; plain pay-to-address outputs
        // fall out here
        if !script::is_contract_candidate(script_pubkey) {
            trace!(%txid, vout = i, len = script_pubkey.len(), "skipping short output");
            continue;
        }

        match script::decode(script_pubkey) {
            Ok(contract) => {
                debug!(
                    %txid,
                    vout = i,
                    lock_until = contract.lock_until_height(),
                    owner = %contract.owner_hash(),
                    "admitting lock output"
                );
                outputs_to_admit.push(i as u32);
            }
            Err(err) => {
                // rejected by policy, not a failure of the call
                debug!(%txid, vout = i, %err, "output is not an admissible lock");
            }
        }
    }

    if outputs_to_admit.is_empty() {
        warn!(%txid, "no admissible lock outputs in transaction");
    }

    Ok(AdmittanceDecision {
        outputs_to_admit,
        coins_to_retain: previous_coins,
    })
}
