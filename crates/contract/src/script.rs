//! Locking-script codec for the time-lock template.
//!
//! Every instance of the contract serializes as three data pushes (owner
//! hash, lock-until height, payload) followed by a fixed opcode tail, the
//! unlock routine shared by all instances. Decoding walks the pushes with a
//! bounded reader and then requires the remainder to match the tail exactly;
//! anything else in the output set simply fails to match and is left to
//! whatever other template it belongs to.

use std::sync::OnceLock;

use bitcoin::{
    opcodes::all as op,
    script::{Builder, PushBytesBuf},
    Script, ScriptBuf,
};
use hodlock_primitives::constants::MIN_CONTRACT_SCRIPT_LEN;
use thiserror::Error;

use crate::contract::{LockContract, ValidationError};

/// Structural rejections from [`decode`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The opcode skeleton is not this contract's template.
    #[error("script does not match the lock template")]
    NotThisTemplate,

    /// The script ran out of bytes where the template requires more.
    #[error("script truncated at offset {0}")]
    Truncated(usize),

    /// Structure matched but the extracted fields fail validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_PUSHNUM_1: u8 = 0x51;
const OP_PUSHNUM_16: u8 = 0x60;

static TEMPLATE_TAIL: OnceLock<ScriptBuf> = OnceLock::new();

/// Null hash a redemption preimage carries for the prevouts, sequence and
/// outputs commitments under ANYONECANPAY|NONE.
const NULL_COMMITMENT: [u8; 32] = [0u8; 32];
/// Little-endian sequence every redeeming input must use.
const REQUIRED_SEQUENCE_LE: [u8; 4] = [0xfe, 0xff, 0xff, 0xff];
/// Little-endian sighash type tag of the redemption signature.
const SIGHASH_TAG_LE: [u8; 4] = [0xc2, 0x00, 0x00, 0x00];

/// The fixed unlock routine appended to every instance's field pushes.
///
/// It rebuilds the spending transaction's sighash preimage commitments (null
/// prevouts/sequence/outputs hashes under ANYONECANPAY|NONE), pins the
/// required input sequence and sighash type, window-checks the locktime
/// against the pushed height, and finishes with a P2PKH-style owner check.
fn build_template_tail() -> ScriptBuf {
    Builder::new()
        // preimage commitments
        .push_opcode(op::OP_TOALTSTACK)
        .push_slice(NULL_COMMITMENT)
        .push_slice(NULL_COMMITMENT)
        .push_opcode(op::OP_CAT)
        .push_opcode(op::OP_SHA256)
        .push_opcode(op::OP_DUP)
        .push_opcode(op::OP_TOALTSTACK)
        // required input sequence, then the sighash type tag
        .push_slice(REQUIRED_SEQUENCE_LE)
        .push_opcode(op::OP_EQUALVERIFY)
        .push_slice(SIGHASH_TAG_LE)
        .push_opcode(op::OP_CAT)
        .push_slice(NULL_COMMITMENT)
        .push_opcode(op::OP_CAT)
        .push_opcode(op::OP_SHA256)
        .push_opcode(op::OP_FROMALTSTACK)
        .push_opcode(op::OP_CAT)
        .push_opcode(op::OP_FROMALTSTACK)
        .push_opcode(op::OP_DROP)
        // locktime window
        .push_opcode(op::OP_SIZE)
        .push_int(8)
        .push_opcode(op::OP_SUB)
        .push_opcode(op::OP_SUBSTR)
        .push_opcode(op::OP_DUP)
        .push_int(500_000_000)
        .push_opcode(op::OP_LESSTHAN)
        .push_opcode(op::OP_VERIFY)
        .push_opcode(op::OP_ROT)
        .push_opcode(op::OP_GREATERTHANOREQUAL)
        .push_opcode(op::OP_VERIFY)
        // owner check
        .push_opcode(op::OP_DUP)
        .push_opcode(op::OP_HASH160)
        .push_opcode(op::OP_ROT)
        .push_opcode(op::OP_EQUALVERIFY)
        .push_opcode(op::OP_CHECKSIG)
        .into_script()
}

fn template_tail() -> &'static Script {
    TEMPLATE_TAIL.get_or_init(build_template_tail).as_script()
}

/// Cheap pre-filter: serialized scripts at or below the length floor are
/// never candidates, regardless of content.
pub fn is_contract_candidate(script: &Script) -> bool {
    script.len() > MIN_CONTRACT_SCRIPT_LEN
}

/// Serializes the contract into its locking script. Pure; the inverse of
/// [`decode`] bit for bit.
pub fn encode(contract: &LockContract) -> ScriptBuf {
    let payload =
        PushBytesBuf::try_from(contract.payload().to_vec()).expect("payload within push limits");
    let mut bytes = Builder::new()
        .push_slice(contract.owner_hash().as_bytes())
        .push_int(contract.lock_until_height() as i64)
        .push_slice(payload)
        .into_script()
        .into_bytes();
    bytes.extend_from_slice(template_tail().as_bytes());
    ScriptBuf::from_bytes(bytes)
}

/// Parses a locking script produced by [`encode`], re-validating the fields.
pub fn decode(script: &Script) -> Result<LockContract, DecodeError> {
    let bytes = script.as_bytes();
    let mut reader = PushReader::new(bytes);

    // owner hash: exactly a 20-byte direct push
    let owner = reader.read_direct_push()?;
    if owner.len() != 20 {
        return Err(DecodeError::NotThisTemplate);
    }

    // lock-until height: minimally-encoded script number
    let height_num = reader.read_scriptnum()?;
    let height = u32::try_from(height_num).map_err(|_| DecodeError::NotThisTemplate)?;

    // payload: any data push
    let payload = reader.read_data_push()?;

    // everything after the field pushes must be the shared tail, exactly;
    // trailing unrelated bytes mean some other template, not an error class
    // of its own
    if reader.remainder() != template_tail().as_bytes() {
        return Err(DecodeError::NotThisTemplate);
    }

    let contract = LockContract::from_raw_fields(&owner, height, payload)?;
    Ok(contract)
}

/// Bounded reader over a raw script, distinguishing "wrong shape" from "ran
/// out of bytes".
struct PushReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PushReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remainder(&self) -> &'a [u8] {
        &self.bytes[self.pos.min(self.bytes.len())..]
    }

    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(DecodeError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DecodeError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads a direct push (opcodes 0x01..=0x4b only).
    fn read_direct_push(&mut self) -> Result<&'a [u8], DecodeError> {
        let opcode = self.next_byte()?;
        if !(0x01..=0x4b).contains(&opcode) {
            return Err(DecodeError::NotThisTemplate);
        }
        self.take(opcode as usize)
    }

    /// Reads any data push: OP_0 for empty, direct pushes, or PUSHDATA1/2/4.
    fn read_data_push(&mut self) -> Result<Vec<u8>, DecodeError> {
        let opcode = self.next_byte()?;
        let len = match opcode {
            0x00 => 0,
            n @ 0x01..=0x4b => n as usize,
            OP_PUSHDATA1 => self.next_byte()? as usize,
            OP_PUSHDATA2 => {
                let raw = self.take(2)?;
                u16::from_le_bytes([raw[0], raw[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let raw = self.take(4)?;
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
            }
            _ => return Err(DecodeError::NotThisTemplate),
        };
        Ok(self.take(len)?.to_vec())
    }

    /// Reads a number the way the encoder writes one: a small-integer opcode
    /// or a direct push of a minimal little-endian script number.
    fn read_scriptnum(&mut self) -> Result<i64, DecodeError> {
        let opcode = *self
            .bytes
            .get(self.pos)
            .ok_or(DecodeError::Truncated(self.pos))?;
        if opcode == 0x00 {
            self.pos += 1;
            return Ok(0);
        }
        if (OP_PUSHNUM_1..=OP_PUSHNUM_16).contains(&opcode) {
            self.pos += 1;
            return Ok((opcode - OP_PUSHNUM_1) as i64 + 1);
        }
        let data = self.read_direct_push()?;
        if data.len() > 5 {
            return Err(DecodeError::NotThisTemplate);
        }
        decode_minimal_scriptnum(data).ok_or(DecodeError::NotThisTemplate)
    }
}

/// Decodes a minimally-encoded little-endian script number; `None` for
/// non-minimal encodings (a compliant encoder never emits them, so they
/// cannot be this template).
fn decode_minimal_scriptnum(bytes: &[u8]) -> Option<i64> {
    let last = *bytes.last()?;
    if last & 0x7f == 0 && (bytes.len() == 1 || bytes[bytes.len() - 2] & 0x80 == 0) {
        return None;
    }
    let mut value: i64 = 0;
    for (i, b) in bytes.iter().enumerate() {
        value |= (*b as i64) << (8 * i);
    }
    if last & 0x80 != 0 {
        let mask = 0x80i64 << (8 * (bytes.len() - 1));
        value = -(value & !mask);
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use hodlock_primitives::buf::Hash160Buf;

    use super::*;

    fn contract(height: u32, payload: &[u8]) -> LockContract {
        LockContract::new(Hash160Buf::new([0x42; 20]), height, payload.to_vec()).unwrap()
    }

    #[test]
    fn roundtrip_assorted_fields() {
        let payloads: [&[u8]; 4] = [b"", b"x", b"why I locked these coins", &[0xaa; 300]];
        for height in [0u32, 1, 16, 17, 75, 128, 150_000, 499_999_999] {
            for payload in payloads {
                let c = contract(height, payload);
                let script = encode(&c);
                let decoded = decode(&script).unwrap();
                assert_eq!(decoded, c, "height {height} payload len {}", payload.len());
            }
        }
    }

    #[test]
    fn every_instance_clears_the_length_floor() {
        let smallest = encode(&contract(0, b""));
        assert!(smallest.len() > MIN_CONTRACT_SCRIPT_LEN);
        assert!(is_contract_candidate(&smallest));
    }

    #[test]
    fn rejects_foreign_scripts() {
        let p2pkh = ScriptBuf::from_bytes(
            [
                &[0x76u8, 0xa9, 0x14][..],
                &[0x42; 20][..],
                &[0x88u8, 0xac][..],
            ]
            .concat(),
        );
        assert_eq!(decode(&p2pkh), Err(DecodeError::NotThisTemplate));
    }

    #[test]
    fn rejects_truncation() {
        let script = encode(&contract(150_000, b"hello"));
        let cut = ScriptBuf::from_bytes(script.as_bytes()[..script.len() - 10].to_vec());
        assert!(matches!(
            decode(&cut),
            Err(DecodeError::NotThisTemplate | DecodeError::Truncated(_))
        ));

        // cutting inside the owner push is unambiguously a truncation
        let head = ScriptBuf::from_bytes(script.as_bytes()[..10].to_vec());
        assert!(matches!(decode(&head), Err(DecodeError::Truncated(_))));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = encode(&contract(150_000, b"tail")).into_bytes();
        bytes.push(0x51);
        assert_eq!(
            decode(Script::from_bytes(&bytes)),
            Err(DecodeError::NotThisTemplate)
        );
    }

    #[test]
    fn revalidates_fields_on_decode() {
        // splice a timestamp-range height into otherwise valid bytes by
        // encoding through the builder directly
        let payload = PushBytesBuf::try_from(b"p".to_vec()).unwrap();
        let mut bytes = Builder::new()
            .push_slice([0x42; 20])
            .push_int(500_000_000)
            .push_slice(payload)
            .into_script()
            .into_bytes();
        bytes.extend_from_slice(template_tail().as_bytes());
        assert_eq!(
            decode(Script::from_bytes(&bytes)),
            Err(DecodeError::Invalid(
                ValidationError::TimestampLocktimeNotAllowed(500_000_000)
            ))
        );
    }

    #[test]
    fn missing_height_field_is_not_this_template() {
        // owner push and payload push but no height between them: whatever
        // parses in the height slot shifts everything after it off the tail
        let payload = PushBytesBuf::try_from(b"xy".to_vec()).unwrap();
        let mut bytes = Builder::new()
            .push_slice([0x42; 20])
            .push_slice(payload)
            .into_script()
            .into_bytes();
        bytes.extend_from_slice(template_tail().as_bytes());
        assert!(matches!(
            decode(Script::from_bytes(&bytes)),
            Err(DecodeError::NotThisTemplate | DecodeError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_non_minimal_height_encoding() {
        // height 1 written as a two-byte push instead of OP_1
        let script = encode(&contract(1, b"m"));
        let bytes = script.as_bytes();
        // locate the OP_1 right after the 21-byte owner push and widen it
        assert_eq!(bytes[21], 0x51);
        let mut patched = Vec::with_capacity(bytes.len() + 2);
        patched.extend_from_slice(&bytes[..21]);
        patched.extend_from_slice(&[0x02, 0x01, 0x00]);
        patched.extend_from_slice(&bytes[22..]);
        assert_eq!(
            decode(Script::from_bytes(&patched)),
            Err(DecodeError::NotThisTemplate)
        );
    }
}
