//! cg_core — Core types, domains, and ordering helpers for the context engine.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`cg_canon`, `cg_codec`, `cg_graph`, `cg_pipeline`, `cg_compile`,
//! `cg_cli`).
//!
//! - Block kinds and their canonical total order
//! - Sensitivity levels (`public < internal < restricted`)
//! - `BlockHash` (lowercase 64-hex) and block metadata, with the
//!   stable/volatile field split that drives content addressing
//! - Declarative `Query` filter and query merging
//! - Declarative `Policy` (budgets, strategies)
//! - Capability traits consumed by the core: token estimation, attachment
//!   resolution, summarization, and the memory store

#![forbid(unsafe_code)]

pub mod errors;
pub mod kind;
pub mod block;
pub mod order;
pub mod query;
pub mod policy;
pub mod estimate;
pub mod caps;

pub use block::{Block, BlockHash, BlockMeta, StableMeta};
pub use errors::CoreError;
pub use estimate::{Confidence, EstimateError, HeuristicEstimator, TokenEstimate, TokenEstimator};
pub use kind::{BlockKind, Sensitivity};
pub use policy::{OverflowStrategy, Policy, Provider};
pub use query::Query;
