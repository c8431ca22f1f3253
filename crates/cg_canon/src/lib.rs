//! cg_canon — canonical JSON and SHA-256 hashing.
//!
//! - Canonical JSON: objects key-sorted recursively, arrays preserved,
//!   compact output, no trailing whitespace.
//! - Hashing: lowercase 64-hex SHA-256 over canonical bytes; same canonical
//!   structure ⇒ same digest across OS/arch.
//! - Block hashing: digest of `{meta: <stable subset>, payload: <canonical>}`.
//! - Prefix hashing: digest of the `"|"`-joined ordered block hashes.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for canonicalization and hashing.
#[derive(Debug, Error)]
pub enum CanonError {
    /// JSON serialization failures (non-string map keys, non-finite floats).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hashing-related errors (bad hex input, out-of-range prefix length).
    #[error("hash error: {0}")]
    Hash(String),
}

pub type CanonResult<T> = Result<T, CanonError>;

pub mod canonical_json;
pub mod hasher;

pub use canonical_json::{canonicalize_value, to_canonical_bytes};
pub use hasher::{
    compute_block_hash, is_hex64, sha256_canonical, sha256_hex, short_hex,
    stable_prefix_hash, EMPTY_OBJECT_HASH, EMPTY_PREFIX_HASH,
};
