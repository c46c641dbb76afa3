//! Message encoding and identifier computation
//!
//! Encoding is pure and deterministic: the same logical inputs always
//! produce the same bytes, which is what makes the derived identifier
//! usable as an idempotency/lookup key across both chains.
//!
//! Layouts use packed encoding (no padding between fields), with the
//! variable-length payload last so fixed-width context fields can never be
//! confused with payload bytes.

use tiny_keccak::{Hasher, Keccak};

use crate::error::ReadError;
use crate::types::{Address, MessageId};

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Compute the 4-byte function selector from a method signature,
/// e.g. `"relayedMessages(bytes32)"`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Encode a cross-domain call into the bytes the bridge messenger expects.
///
/// Packed layout: `target (20) || gasLimit u64 BE (8) || payload (var)`.
pub fn encode_call(target: &Address, payload: &[u8], gas_limit: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(20 + 8 + payload.len());
    data.extend_from_slice(target.as_bytes());
    data.extend_from_slice(&gas_limit.to_be_bytes());
    data.extend_from_slice(payload);
    data
}

/// Compute the canonical message identifier for one logical send.
///
/// ```text
/// keccak256(sender (20) || target (20) || gasLimit u64 BE (8) || nonce u64 BE (8) || payload)
/// ```
///
/// The nonce is assigned per sender before submission, so two distinct
/// logical sends never collide even with identical payloads, while a
/// resubmission of the same logical send (same nonce) always yields the
/// same id.
pub fn message_id(
    sender: &Address,
    target: &Address,
    payload: &[u8],
    gas_limit: u64,
    nonce: u64,
) -> MessageId {
    let mut data = Vec::with_capacity(20 + 20 + 8 + 8 + payload.len());
    data.extend_from_slice(sender.as_bytes());
    data.extend_from_slice(target.as_bytes());
    data.extend_from_slice(&gas_limit.to_be_bytes());
    data.extend_from_slice(&nonce.to_be_bytes());
    data.extend_from_slice(payload);
    MessageId(keccak256(&data))
}

/// Build calldata for a contract read/write: selector plus 32-byte words.
pub fn call_data(signature: &str, words: &[[u8; 32]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 * words.len());
    data.extend_from_slice(&selector(signature));
    for word in words {
        data.extend_from_slice(word);
    }
    data
}

/// Left-pad a byte slice into a 32-byte word. Slices longer than 32 bytes
/// are truncated from the left (keeps the low-order bytes).
pub fn to_word(bytes: &[u8]) -> [u8; 32] {
    let mut word = [0u8; 32];
    if bytes.len() >= 32 {
        word.copy_from_slice(&bytes[bytes.len() - 32..]);
    } else {
        word[32 - bytes.len()..].copy_from_slice(bytes);
    }
    word
}

/// Decode a hex-encoded 32-byte word from a chain read result.
pub fn decode_word(result: &str) -> Result<[u8; 32], ReadError> {
    let stripped = result.strip_prefix("0x").unwrap_or(result);
    let bytes = hex::decode(stripped)
        .map_err(|e| ReadError::Transport(format!("malformed word in response: {}", e)))?;
    if bytes.len() != 32 {
        return Err(ReadError::Transport(format!(
            "expected 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&bytes);
    Ok(word)
}

/// Decode a boolean word (any non-zero byte means true)
pub fn decode_bool(result: &str) -> Result<bool, ReadError> {
    Ok(decode_word(result)?.iter().any(|b| *b != 0))
}

/// Decode a u64 from the low-order 8 bytes of a word
pub fn decode_u64(result: &str) -> Result<u64, ReadError> {
    let word = decode_word(result)?;
    let mut out = [0u8; 8];
    out.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Address {
        Address([0xaa; 20])
    }

    fn target() -> Address {
        Address([0xbb; 20])
    }

    #[test]
    fn test_message_id_deterministic() {
        let payload = vec![0x42; 32];
        let a = message_id(&sender(), &target(), &payload, 1_000_000, 1);
        let b = message_id(&sender(), &target(), &payload, 1_000_000, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_message_id_injective_over_nonces() {
        let payload = vec![0x42; 32];
        let mut seen = std::collections::HashSet::new();
        for nonce in 0..100u64 {
            let id = message_id(&sender(), &target(), &payload, 1_000_000, nonce);
            assert!(seen.insert(id), "nonce {} collided", nonce);
        }
    }

    #[test]
    fn test_message_id_varies_with_context() {
        let payload = vec![0x42; 32];
        let base = message_id(&sender(), &target(), &payload, 1_000_000, 1);
        assert_ne!(
            base,
            message_id(&target(), &target(), &payload, 1_000_000, 1)
        );
        assert_ne!(
            base,
            message_id(&sender(), &sender(), &payload, 1_000_000, 1)
        );
        assert_ne!(base, message_id(&sender(), &target(), &payload, 2_000_000, 1));
        assert_ne!(
            base,
            message_id(&sender(), &target(), &[0x42; 31], 1_000_000, 1)
        );
    }

    #[test]
    fn test_encode_call_layout() {
        let payload = vec![1, 2, 3];
        let encoded = encode_call(&target(), &payload, 0x0102);
        assert_eq!(encoded.len(), 20 + 8 + 3);
        assert_eq!(&encoded[..20], target().as_bytes());
        assert_eq!(&encoded[20..28], &[0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(&encoded[28..], &payload[..]);
    }

    #[test]
    fn test_word_round_trip() {
        let word = to_word(&[0xff, 0xee]);
        assert_eq!(word[30], 0xff);
        assert_eq!(word[31], 0xee);
        let hex_word = format!("0x{}", hex::encode(word));
        assert_eq!(decode_word(&hex_word).unwrap(), word);
        assert_eq!(decode_u64(&hex_word).unwrap(), 0xffee);
    }

    #[test]
    fn test_decode_bool() {
        let f = format!("0x{}", hex::encode([0u8; 32]));
        let t = format!("0x{}", hex::encode(to_word(&[1])));
        assert!(!decode_bool(&f).unwrap());
        assert!(decode_bool(&t).unwrap());
    }

    #[test]
    fn test_decode_word_rejects_garbage() {
        assert!(decode_word("0x1234").is_err());
        assert!(decode_word("zz").is_err());
    }
}
