//! cg_codec — codec contract, registry, and built-in codecs.
//!
//! A codec is identified by `(codec_id, version)` and owns one payload shape:
//! it validates untyped payloads, canonicalizes them (pure, key-sorted,
//! documented normalization), and renders blocks into provider-tagged
//! structures. Hashing falls out of canonicalization: two codecs that
//! canonicalize the same payload hash it the same.
//!
//! The registry is an explicit value threaded through builders, graphs, and
//! compilers — there is no process-wide codec table.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod contract;
pub mod render;
pub mod registry;
pub mod builtin;

pub use contract::{payload_hash, Codec};
pub use registry::{BlockSpec, CodecRegistry};
pub use render::{
    AnthropicContent, AnthropicRendered, ChatRole, GeminiRendered, GeminiRole,
    OpenAiMessage, OpenAiRole, Rendered,
};

/// Codec-layer errors. `Validation` carries the offending codec id and field
/// so tests and observability can match on them.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("validation failed in codec '{codec}' at '{field}': {msg}")]
    Validation {
        codec: &'static str,
        field: &'static str,
        msg: String,
    },

    #[error("unknown codec: {0}")]
    UnknownCodec(String),

    #[error("codec already registered: {0}")]
    DuplicateCodec(String),

    #[error("kind '{kind}' not accepted by codec '{codec}'")]
    KindMismatch { codec: &'static str, kind: String },

    #[error("render failed in codec '{codec}': {msg}")]
    Render { codec: &'static str, msg: String },

    #[error(transparent)]
    Canon(#[from] cg_canon::CanonError),
}

pub type CodecResult<T> = Result<T, CodecError>;
