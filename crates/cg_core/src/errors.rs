//! Minimal error set for core-domain validation & parsing.

use core::fmt;

/// Errors raised by the core domain types. `UnknownKind` and `KindOrder`
/// indicate programmer errors (a bug upstream), not bad user documents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoreError {
    /// A kind token outside the closed enumeration.
    UnknownKind(String),
    /// A sensitivity token outside the closed enumeration.
    UnknownSensitivity(String),
    /// A hash string that is not lowercase 64-hex.
    InvalidHex,
    /// A block sequence that violates the canonical kind order, at `index`.
    KindOrder { index: usize },
    /// Policy sanity check failed.
    InvalidPolicy(&'static str),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::UnknownKind(t) => write!(f, "unknown block kind: {t}"),
            CoreError::UnknownSensitivity(t) => write!(f, "unknown sensitivity: {t}"),
            CoreError::InvalidHex => write!(f, "invalid hex (expect lowercase 64-hex)"),
            CoreError::KindOrder { index } => {
                write!(f, "kind order violated at index {index}")
            }
            CoreError::InvalidPolicy(msg) => write!(f, "invalid policy: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}
