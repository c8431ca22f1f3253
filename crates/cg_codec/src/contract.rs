//! The codec contract.

use std::fmt;

use serde_json::Value;

use cg_core::{Block, BlockKind, Provider};

use crate::render::Rendered;
use crate::{CodecError, CodecResult};

/// One payload shape, identified by `(codec_id, version)`.
///
/// Contract:
/// - `validate` rejects malformed input and never silently coerces missing
///   required fields; on success it returns the normalized payload.
/// - `canonicalize` is pure and deterministic; the result has recursively
///   sorted keys, documented trimming/defaulting applied, and
///   content-irrelevant fields removed.
/// - `render` produces the provider-shaped entries for one block; an empty
///   vector means the codec has no representation for that provider (the
///   compiler records such blocks as excluded).
pub trait Codec {
    fn codec_id(&self) -> &'static str;

    fn version(&self) -> &'static str;

    /// Block kinds this codec accepts; `None` means any kind.
    fn kinds(&self) -> Option<&'static [BlockKind]> {
        None
    }

    fn validate(&self, payload: &Value) -> CodecResult<Value>;

    fn canonicalize(&self, payload: &Value) -> CodecResult<Value>;

    fn render(&self, block: &Block, provider: Provider) -> CodecResult<Vec<Rendered>>;
}

impl<'a> fmt::Debug for dyn Codec + 'a {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("codec_id", &self.codec_id())
            .field("version", &self.version())
            .finish()
    }
}

/// Hash a payload through a codec: canonicalize, then SHA-256 the canonical
/// bytes. Identical for any two codecs that canonicalize identically.
pub fn payload_hash(codec: &dyn Codec, payload: &Value) -> CodecResult<String> {
    let canonical = codec.canonicalize(payload)?;
    Ok(cg_canon::sha256_canonical(&canonical)?)
}

// ---- shared field helpers used by the built-ins ----

pub(crate) fn require_str<'a>(
    payload: &'a Value,
    codec: &'static str,
    field: &'static str,
) -> CodecResult<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or(CodecError::Validation {
            codec,
            field,
            msg: "required string field missing".into(),
        })
}

pub(crate) fn optional_str<'a>(
    payload: &'a Value,
    codec: &'static str,
    field: &'static str,
) -> CodecResult<Option<&'a str>> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(CodecError::Validation {
            codec,
            field,
            msg: "expected a string".into(),
        }),
    }
}

pub(crate) fn optional_bool(
    payload: &Value,
    codec: &'static str,
    field: &'static str,
) -> CodecResult<bool> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(CodecError::Validation {
            codec,
            field,
            msg: "expected a boolean".into(),
        }),
    }
}
