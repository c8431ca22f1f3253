//! SHA-256 hashing over **canonical JSON** bytes, plus the block-hash and
//! view-prefix-hash builders used across the engine.
//!
//! Deterministic: same canonical structure ⇒ same lowercase 64-hex across
//! OS/arch.

use digest::Digest;
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;

use cg_core::block::BlockHash;
use cg_core::StableMeta;

use crate::canonical_json::{canonicalize_value, to_canonical_bytes};
use crate::CanonError;

/// SHA-256 of the canonical empty object `{}`.
pub const EMPTY_OBJECT_HASH: &str =
    "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a";

/// Prefix hash of the empty view (SHA-256 of the empty string).
pub const EMPTY_PREFIX_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Compute lowercase 64-hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize()) // lowercase
}

/// SHA-256 of the canonical JSON representation; returns lowercase 64-hex.
pub fn sha256_canonical<T: Serialize>(value: &T) -> Result<String, CanonError> {
    let bytes = to_canonical_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

/// Content address of a block: SHA-256 over the canonical JSON of
/// `{"meta": <stable subset>, "payload": <canonical payload>}`. Volatile
/// metadata never reaches this preimage.
pub fn compute_block_hash(meta: &StableMeta, payload: &Value) -> Result<BlockHash, CanonError> {
    #[derive(Serialize)]
    struct Preimage<'a> {
        meta: &'a StableMeta,
        payload: Value,
    }
    let hex = sha256_canonical(&Preimage {
        meta,
        payload: canonicalize_value(payload),
    })?;
    Ok(BlockHash::from_hex_unchecked(hex))
}

/// View identity: SHA-256 over the `"|"`-joined ordered block hashes. The
/// empty sequence hashes the empty string ([`EMPTY_PREFIX_HASH`]).
pub fn stable_prefix_hash(hashes: &[BlockHash]) -> BlockHash {
    let joined = hashes
        .iter()
        .map(|h| h.as_str())
        .collect::<Vec<_>>()
        .join("|");
    BlockHash::from_hex_unchecked(sha256_hex(joined.as_bytes()))
}

/// True iff string is **lowercase** 64-hex.
pub fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.as_bytes().iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Return a short prefix of a 64-hex string (1..=64). Errors if non-hex or
/// out of range.
pub fn short_hex(full_hex: &str, len: usize) -> Result<String, CanonError> {
    if !(1..=64).contains(&len) {
        return Err(CanonError::Hash("short_hex length out of range".into()));
    }
    if !is_hex64(full_hex) {
        return Err(CanonError::Hash("short_hex expects lowercase 64-hex".into()));
    }
    Ok(full_hex[..len].to_string())
}
