//! Block kinds with their canonical total order, and sensitivity levels.
//!
//! The kind order is the single source of truth for compiled-context layout:
//! `pinned < reference < memory < state < tool_output < history < turn`.
//! Violations of this order in a materialized view are a programmer error.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Closed enumeration of block kinds. Variant order **is** the canonical
/// order; `Ord` is derived from it on purpose.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Pinned,
    Reference,
    Memory,
    State,
    ToolOutput,
    History,
    Turn,
}

impl BlockKind {
    /// Canonical position, `0..=6`.
    pub const fn order(self) -> u8 {
        match self {
            BlockKind::Pinned => 0,
            BlockKind::Reference => 1,
            BlockKind::Memory => 2,
            BlockKind::State => 3,
            BlockKind::ToolOutput => 4,
            BlockKind::History => 5,
            BlockKind::Turn => 6,
        }
    }

    /// Compare two kinds by canonical order.
    pub fn compare(a: BlockKind, b: BlockKind) -> Ordering {
        a.order().cmp(&b.order())
    }

    /// Wire token (matches the serde rename).
    pub const fn as_str(self) -> &'static str {
        match self {
            BlockKind::Pinned => "pinned",
            BlockKind::Reference => "reference",
            BlockKind::Memory => "memory",
            BlockKind::State => "state",
            BlockKind::ToolOutput => "tool_output",
            BlockKind::History => "history",
            BlockKind::Turn => "turn",
        }
    }

    /// All kinds in canonical order.
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Pinned,
        BlockKind::Reference,
        BlockKind::Memory,
        BlockKind::State,
        BlockKind::ToolOutput,
        BlockKind::History,
        BlockKind::Turn,
    ];
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pinned" => Ok(BlockKind::Pinned),
            "reference" => Ok(BlockKind::Reference),
            "memory" => Ok(BlockKind::Memory),
            "state" => Ok(BlockKind::State),
            "tool_output" => Ok(BlockKind::ToolOutput),
            "history" => Ok(BlockKind::History),
            "turn" => Ok(BlockKind::Turn),
            other => Err(CoreError::UnknownKind(other.to_string())),
        }
    }
}

/// Content classification, ordered: `public < internal < restricted`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Public,
    Internal,
    Restricted,
}

impl Sensitivity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Public => "public",
            Sensitivity::Internal => "internal",
            Sensitivity::Restricted => "restricted",
        }
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::Public
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensitivity {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Sensitivity::Public),
            "internal" => Ok(Sensitivity::Internal),
            "restricted" => Ok(Sensitivity::Restricted),
            other => Err(CoreError::UnknownSensitivity(other.to_string())),
        }
    }
}
