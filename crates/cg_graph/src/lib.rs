//! cg_graph — content-addressed block graph and deterministic views.
//!
//! The graph is a single-owner mutable structure: a map of blocks keyed by
//! hash plus two edge maps (derivation provenance, citation references).
//! Edges carry hashes, never blocks, so the graph is a DAG by construction.
//! Views are immutable ordered snapshots; their identity is the stable
//! prefix hash over the ordered block hashes.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod graph;
pub mod store;
pub mod view;

pub use graph::{ContextGraph, GraphStats};
pub use store::InMemoryStore;
pub use view::{create_view, merge_views, View, ViewOptions};

// The declarative filter lives in cg_core; re-exported here because the
// graph is where it is consumed.
pub use cg_core::query::{merge_queries, Query};

#[derive(Debug, Error)]
pub enum GraphError {
    /// Budget cannot be met and the policy says overflow is an error.
    #[error("context overflow: needed {needed} tokens, available {available}")]
    Overflow { needed: u64, available: u64 },

    #[error(transparent)]
    Core(#[from] cg_core::CoreError),

    #[error(transparent)]
    Canon(#[from] cg_canon::CanonError),
}

pub type GraphResult<T> = Result<T, GraphError>;
