//! Deterministic view materialization.
//!
//! Procedure: select → stable sort by `(kind order, block hash)` → apply the
//! token budget → compute the stable prefix hash → freeze. Re-running against
//! an unchanged graph with the same query and estimator yields an identical
//! prefix hash, independent of insertion order.

use serde::Serialize;

use cg_canon::stable_prefix_hash;
use cg_core::order::sort_stable;
use cg_core::{
    Block, BlockHash, HeuristicEstimator, OverflowStrategy, Query, TokenEstimate,
    TokenEstimator,
};

use crate::graph::ContextGraph;
use crate::{GraphError, GraphResult};

#[derive(Clone, Debug, Default)]
pub struct ViewOptions {
    pub query: Query,
    /// Token budget; `None` disables truncation.
    pub max_tokens: Option<u64>,
    pub overflow_strategy: OverflowStrategy,
    /// Unix seconds, caller-supplied (the core is clock-free).
    pub created_at: u64,
}

/// Immutable ordered snapshot. Two views are equivalent iff their
/// `stable_prefix_hash` match.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_estimate: Option<TokenEstimate>,
    pub stable_prefix_hash: BlockHash,
    pub created_at: u64,
    pub truncated: bool,
    /// Set when the overflow strategy was `compact`: the caller is expected
    /// to run a compaction pass and rebuild.
    pub needs_compaction: bool,
}

impl View {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_hashes(&self) -> Vec<BlockHash> {
        self.blocks.iter().map(|b| b.block_hash.clone()).collect()
    }

    /// Rebuild a view around an already-ordered block list, recomputing the
    /// prefix hash. Used by fork and compaction outputs.
    pub fn from_blocks(
        blocks: Vec<Block>,
        token_estimate: Option<TokenEstimate>,
        created_at: u64,
    ) -> View {
        let hashes: Vec<BlockHash> = blocks.iter().map(|b| b.block_hash.clone()).collect();
        View {
            blocks,
            token_estimate,
            stable_prefix_hash: stable_prefix_hash(&hashes),
            created_at,
            truncated: false,
            needs_compaction: false,
        }
    }
}

static HEURISTIC: HeuristicEstimator = HeuristicEstimator;

/// Estimate one block, degrading to the heuristic on estimator failure.
fn estimate_block_degrading(estimator: &dyn TokenEstimator, block: &Block) -> TokenEstimate {
    match estimator.estimate_block(block) {
        Ok(est) => est,
        Err(err) => {
            tracing::warn!(
                block = %block.block_hash,
                error = %err,
                "token estimator unavailable, degrading to heuristic"
            );
            HeuristicEstimator
                .estimate_block(block)
                .expect("heuristic estimation is infallible")
        }
    }
}

pub fn create_view(
    graph: &ContextGraph,
    options: &ViewOptions,
    estimator: Option<&dyn TokenEstimator>,
) -> GraphResult<View> {
    let mut blocks: Vec<Block> = graph
        .select(&options.query)
        .into_iter()
        .cloned()
        .collect();
    sort_stable(&mut blocks);

    let mut truncated = false;
    let mut needs_compaction = false;
    let mut token_estimate = None;

    match (options.max_tokens, estimator) {
        (Some(budget), est) => {
            // A budget always gets per-block accounting; without a caller
            // estimator the heuristic serves (confidence low).
            let est = est.unwrap_or(&HEURISTIC);
            let per_block: Vec<TokenEstimate> = blocks
                .iter()
                .map(|b| estimate_block_degrading(est, b))
                .collect();
            let full = per_block
                .iter()
                .fold(TokenEstimate::zero(), |acc, e| acc.combine(*e));

            if full.tokens <= budget {
                token_estimate = Some(full);
            } else {
                match options.overflow_strategy {
                    OverflowStrategy::Error => {
                        return Err(GraphError::Overflow {
                            needed: full.tokens,
                            available: budget,
                        });
                    }
                    OverflowStrategy::Truncate | OverflowStrategy::Compact => {
                        // Stop before the first block that would exceed the budget.
                        let mut included = TokenEstimate::zero();
                        let mut cut = 0usize;
                        for est in &per_block {
                            if included.tokens + est.tokens > budget {
                                break;
                            }
                            included = included.combine(*est);
                            cut += 1;
                        }
                        blocks.truncate(cut);
                        truncated = true;
                        needs_compaction =
                            options.overflow_strategy == OverflowStrategy::Compact;
                        token_estimate = Some(included);
                    }
                }
            }
        }
        (None, Some(est)) => {
            // No budget: estimate once over the whole sequence.
            let total = match est.estimate(&blocks) {
                Ok(t) => t,
                Err(err) => {
                    tracing::warn!(error = %err, "token estimator unavailable, degrading to heuristic");
                    HeuristicEstimator
                        .estimate(&blocks)
                        .expect("heuristic estimation is infallible")
                }
            };
            token_estimate = Some(total);
        }
        (None, None) => {}
    }

    let hashes: Vec<BlockHash> = blocks.iter().map(|b| b.block_hash.clone()).collect();
    Ok(View {
        blocks,
        token_estimate,
        stable_prefix_hash: stable_prefix_hash(&hashes),
        created_at: options.created_at,
        truncated,
        needs_compaction,
    })
}

/// Concatenate views, dedupe by hash (first occurrence wins), re-sort,
/// re-hash. Estimates are recomputed when an estimator is supplied.
pub fn merge_views(
    views: &[&View],
    estimator: Option<&dyn TokenEstimator>,
    created_at: u64,
) -> View {
    let mut seen = std::collections::BTreeSet::new();
    let mut blocks = Vec::new();
    for view in views {
        for block in view.blocks() {
            if seen.insert(block.block_hash.clone()) {
                blocks.push(block.clone());
            }
        }
    }
    sort_stable(&mut blocks);
    let token_estimate = estimator.map(|est| match est.estimate(&blocks) {
        Ok(t) => t,
        Err(_) => HeuristicEstimator
            .estimate(&blocks)
            .expect("heuristic estimation is infallible"),
    });
    View::from_blocks(blocks, token_estimate, created_at)
}
