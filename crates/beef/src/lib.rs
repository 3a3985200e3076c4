//! BEEF bundle parsing.
//!
//! Transactions arrive from the overlay as self-contained BEEF bundles: a
//! version magic, a list of merkle proof sections (BUMPs), and the
//! transaction chain ending in the subject transaction. Admission only needs
//! the subject transaction's outputs and the redemption path only needs to
//! look a funding transaction back up out of a stored bundle, so proof
//! sections are length-checked and skipped rather than verified here; proof
//! verification belongs to the overlay engine that served the bundle.

use bitcoin::{consensus::Decodable, Transaction, Txid};
use thiserror::Error;

/// On-wire version magic, `0100beef` in serialized hex.
const BEEF_MAGIC: [u8; 4] = [0x01, 0x00, 0xBE, 0xEF];

/// Atomic-bundle prefix: four 0x01 bytes then the subject txid.
const ATOMIC_MAGIC: [u8; 4] = [0x01, 0x01, 0x01, 0x01];

/// Fatal wire-format failures. Any of these fails the whole admission call;
/// there is no per-output recovery from a bundle that cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BundleError {
    #[error("bundle does not start with a known version magic")]
    BadMagic,

    #[error("bundle truncated at byte {0}")]
    Truncated(usize),

    #[error("malformed transaction in bundle: {0}")]
    BadTransaction(String),

    #[error("bundle carries no transactions")]
    NoTransactions,

    #[error("atomic bundle subject {0} not present in transaction list")]
    SubjectMissing(Txid),

    #[error("proof section malformed at byte {0}")]
    BadProofSection(usize),
}

/// A parsed bundle: the decoded transaction chain plus the untouched raw
/// bytes, which the registry keeps verbatim as the funding proof.
#[derive(Debug, Clone)]
pub struct BeefBundle {
    raw: Vec<u8>,
    txs: Vec<Transaction>,
    subject_index: usize,
}

impl BeefBundle {
    /// Parses either a plain bundle (subject = final transaction) or an
    /// atomic bundle (subject named up front by txid).
    pub fn parse(bytes: &[u8]) -> Result<Self, BundleError> {
        let head: &[u8; 4] = bytes
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or(BundleError::Truncated(bytes.len()))?;

        match *head {
            ATOMIC_MAGIC => {
                let subject_txid = read_txid(bytes, 4)?;
                let mut bundle = Self::parse_plain(&bytes[36..])?;
                bundle.raw = bytes.to_vec();
                bundle.subject_index = bundle
                    .txs
                    .iter()
                    .position(|tx| tx.compute_txid() == subject_txid)
                    .ok_or(BundleError::SubjectMissing(subject_txid))?;
                Ok(bundle)
            }
            BEEF_MAGIC => Self::parse_plain(bytes),
            _ => Err(BundleError::BadMagic),
        }
    }

    fn parse_plain(bytes: &[u8]) -> Result<Self, BundleError> {
        let mut r = Reader::new(bytes);
        if r.take(4)? != BEEF_MAGIC {
            return Err(BundleError::BadMagic);
        }

        let n_proofs = r.read_compact_size()?;
        for _ in 0..n_proofs {
            skip_proof_section(&mut r)?;
        }

        let n_txs = r.read_compact_size()?;
        if n_txs == 0 {
            return Err(BundleError::NoTransactions);
        }
        let mut txs = Vec::with_capacity(n_txs as usize);
        for _ in 0..n_txs {
            txs.push(r.read_transaction()?);
            // trailing proof marker: 0x01 means a proof index follows
            if r.take(1)?[0] == 0x01 {
                r.read_compact_size()?;
            }
        }

        let subject_index = txs.len() - 1;
        Ok(Self {
            raw: bytes.to_vec(),
            txs,
            subject_index,
        })
    }

    /// The transaction this bundle exists to carry.
    pub fn subject(&self) -> &Transaction {
        &self.txs[self.subject_index]
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.txs
    }

    pub fn find_tx(&self, txid: Txid) -> Option<&Transaction> {
        self.txs.iter().find(|tx| tx.compute_txid() == txid)
    }

    /// The untouched serialized bundle.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// Skips one BUMP: block height, tree height, then per-level leaf lists
/// where each leaf is offset, flag, and (unless the flag marks a duplicate)
/// a 32-byte hash.
fn skip_proof_section(r: &mut Reader<'_>) -> Result<(), BundleError> {
    let start = r.pos;
    r.read_compact_size()?; // block height
    let tree_height = r.take(1)?[0];
    for _ in 0..tree_height {
        let n_leaves = r.read_compact_size()?;
        for _ in 0..n_leaves {
            r.read_compact_size()?; // offset
            let flag = r.take(1)?[0];
            match flag {
                0x00 | 0x02 => {
                    r.take(32)?;
                }
                0x01 => {}
                _ => return Err(BundleError::BadProofSection(start)),
            }
        }
    }
    Ok(())
}

fn read_txid(bytes: &[u8], at: usize) -> Result<Txid, BundleError> {
    use bitcoin::hashes::Hash;
    let raw: [u8; 32] = bytes
        .get(at..at + 32)
        .and_then(|s| s.try_into().ok())
        .ok_or(BundleError::Truncated(bytes.len()))?;
    Ok(Txid::from_byte_array(raw))
}

/// Bounded reader over the bundle bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BundleError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(BundleError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_compact_size(&mut self) -> Result<u64, BundleError> {
        let first = self.take(1)?[0];
        Ok(match first {
            0xfd => u16::from_le_bytes(self.take(2)?.try_into().expect("len checked")) as u64,
            0xfe => u32::from_le_bytes(self.take(4)?.try_into().expect("len checked")) as u64,
            0xff => u64::from_le_bytes(self.take(8)?.try_into().expect("len checked")),
            n => n as u64,
        })
    }

    fn read_transaction(&mut self) -> Result<Transaction, BundleError> {
        let mut slice = &self.bytes[self.pos..];
        let before = slice.len();
        let tx = Transaction::consensus_decode(&mut slice)
            .map_err(|e| BundleError::BadTransaction(e.to_string()))?;
        self.pos += before - slice.len();
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        absolute::LockTime, consensus::serialize, hashes::Hash, transaction::Version, Amount,
        OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Witness,
    };

    use super::*;

    fn tx_with_value(sats: u64) -> Transaction {
        Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::from_byte_array([9u8; 32]), 0),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(sats),
                script_pubkey: ScriptBuf::from_bytes(vec![0x51]),
            }],
        }
    }

    fn plain_bundle(txs: &[Transaction]) -> Vec<u8> {
        let mut bytes = BEEF_MAGIC.to_vec();
        bytes.push(0x00); // no proofs
        bytes.push(txs.len() as u8);
        for tx in txs {
            bytes.extend_from_slice(&serialize(tx));
            bytes.push(0x00); // no proof reference
        }
        bytes
    }

    #[test]
    fn parses_subject_as_last_tx() {
        let txs = [tx_with_value(100), tx_with_value(200)];
        let bundle = BeefBundle::parse(&plain_bundle(&txs)).unwrap();
        assert_eq!(bundle.transactions().len(), 2);
        assert_eq!(bundle.subject().output[0].value, Amount::from_sat(200));
    }

    #[test]
    fn atomic_prefix_selects_subject_by_txid() {
        let txs = [tx_with_value(100), tx_with_value(200)];
        let subject = txs[0].compute_txid();

        let mut bytes = ATOMIC_MAGIC.to_vec();
        bytes.extend_from_slice(&subject.to_byte_array());
        bytes.extend_from_slice(&plain_bundle(&txs));

        let bundle = BeefBundle::parse(&bytes).unwrap();
        assert_eq!(bundle.subject().compute_txid(), subject);
        assert_eq!(bundle.raw(), &bytes[..]);
    }

    #[test]
    fn atomic_subject_must_be_present() {
        let txs = [tx_with_value(100)];
        let mut bytes = ATOMIC_MAGIC.to_vec();
        bytes.extend_from_slice(&[0xEE; 32]);
        bytes.extend_from_slice(&plain_bundle(&txs));
        assert!(matches!(
            BeefBundle::parse(&bytes),
            Err(BundleError::SubjectMissing(_))
        ));
    }

    #[test]
    fn skips_proof_sections() {
        let txs = [tx_with_value(100)];
        let mut bytes = BEEF_MAGIC.to_vec();
        bytes.push(0x01); // one proof
        bytes.push(0x64); // block height 100
        bytes.push(0x02); // tree height 2
        for _ in 0..2 {
            bytes.push(0x01); // one leaf at this level
            bytes.push(0x00); // offset 0
            bytes.push(0x00); // hash follows
            bytes.extend_from_slice(&[0xAB; 32]);
        }
        bytes.push(0x01); // one tx
        bytes.extend_from_slice(&serialize(&txs[0]));
        bytes.push(0x01); // proof reference follows
        bytes.push(0x00); // proof index 0

        let bundle = BeefBundle::parse(&bytes).unwrap();
        assert_eq!(bundle.subject().compute_txid(), txs[0].compute_txid());
    }

    #[test]
    fn rejects_wrong_magic_and_truncation() {
        assert!(matches!(
            BeefBundle::parse(&[0xde, 0xad, 0xbe, 0xef, 0x00]),
            Err(BundleError::BadMagic)
        ));
        assert!(matches!(
            BeefBundle::parse(&BEEF_MAGIC[..3]),
            Err(BundleError::Truncated(_))
        ));

        let txs = [tx_with_value(100)];
        let full = plain_bundle(&txs);
        assert!(BeefBundle::parse(&full[..full.len() - 20]).is_err());
    }

    #[test]
    fn rejects_empty_transaction_list() {
        let mut bytes = BEEF_MAGIC.to_vec();
        bytes.push(0x00);
        bytes.push(0x00);
        assert!(matches!(
            BeefBundle::parse(&bytes),
            Err(BundleError::NoTransactions)
        ));
    }
}
