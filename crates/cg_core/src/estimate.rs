//! Token estimation capability.
//!
//! Estimators are external collaborators (provider APIs, BPE tables); the
//! engine consumes them through this trait and recovers locally from their
//! failures by degrading to [`HeuristicEstimator`] with `Confidence::Low`.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::block::Block;

/// Estimate confidence, ordered worst-first: `Low < High < Exact`. The
/// aggregate confidence of a view is the minimum over included blocks.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    High,
    Exact,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEstimate {
    pub tokens: u64,
    pub confidence: Confidence,
}

impl TokenEstimate {
    pub fn zero() -> Self {
        Self {
            tokens: 0,
            confidence: Confidence::Exact,
        }
    }

    /// Combine by summing tokens and keeping the worst confidence.
    pub fn combine(self, other: TokenEstimate) -> TokenEstimate {
        TokenEstimate {
            tokens: self.tokens + other.tokens,
            confidence: self.confidence.min(other.confidence),
        }
    }
}

/// Estimator failure. Call sites degrade to the heuristic instead of
/// propagating this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EstimateError(pub String);

impl fmt::Display for EstimateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "estimator unavailable: {}", self.0)
    }
}

impl std::error::Error for EstimateError {}

pub trait TokenEstimator {
    fn estimate_block(&self, block: &Block) -> Result<TokenEstimate, EstimateError>;

    fn estimate(&self, blocks: &[Block]) -> Result<TokenEstimate, EstimateError> {
        let mut total = TokenEstimate::zero();
        for b in blocks {
            total = total.combine(self.estimate_block(b)?);
        }
        Ok(total)
    }
}

/// chars/4 with a 1.2× safety multiplier, always `Confidence::Low`. The char
/// count is taken over the compact payload serialization.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub fn tokens_for_chars(chars: u64) -> u64 {
        // chars / 4 * 1.2 == chars * 3 / 10, rounded up.
        (chars * 3).div_ceil(10)
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate_block(&self, block: &Block) -> Result<TokenEstimate, EstimateError> {
        let chars = block.payload.to_string().chars().count() as u64;
        Ok(TokenEstimate {
            tokens: Self::tokens_for_chars(chars),
            confidence: Confidence::Low,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockHash, BlockMeta};
    use crate::kind::{BlockKind, Sensitivity};
    use std::collections::BTreeSet;

    fn text_block(text: &str) -> Block {
        Block {
            block_hash: BlockHash::from_hex_unchecked("0".repeat(64)),
            meta: BlockMeta {
                kind: BlockKind::Turn,
                sensitivity: Sensitivity::Public,
                codec_id: "user-turn".into(),
                codec_version: "1".into(),
                created_at: 0,
                source: None,
                tags: BTreeSet::new(),
            },
            payload: serde_json::json!({ "text": text }),
        }
    }

    #[test]
    fn confidence_orders_worst_first() {
        assert!(Confidence::Low < Confidence::High);
        assert!(Confidence::High < Confidence::Exact);
        let combined = TokenEstimate {
            tokens: 5,
            confidence: Confidence::Exact,
        }
        .combine(TokenEstimate {
            tokens: 7,
            confidence: Confidence::Low,
        });
        assert_eq!(combined.tokens, 12);
        assert_eq!(combined.confidence, Confidence::Low);
    }

    #[test]
    fn heuristic_rounds_up_and_reports_low() {
        assert_eq!(HeuristicEstimator::tokens_for_chars(0), 0);
        assert_eq!(HeuristicEstimator::tokens_for_chars(10), 3);
        assert_eq!(HeuristicEstimator::tokens_for_chars(11), 4);

        let est = HeuristicEstimator
            .estimate_block(&text_block("hello world"))
            .unwrap();
        assert_eq!(est.confidence, Confidence::Low);
        assert!(est.tokens > 0);
    }
}
