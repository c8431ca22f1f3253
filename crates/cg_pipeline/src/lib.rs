//! cg_pipeline — compaction and fork orchestration.
//!
//! Both surfaces are all-or-nothing over immutable inputs: a compaction
//! returns a fresh block list plus a report and never mutates the source
//! view or graph; a fork returns a fresh sensitivity-filtered view plus an
//! execution fingerprint. A failure anywhere leaves the inputs untouched.

#![forbid(unsafe_code)]

use thiserror::Error;

use cg_core::caps::SummarizeError;

pub mod compact;
pub mod dedupe;
pub mod prune_outputs;
pub mod trim_history;
pub mod summarize;
pub mod report;
pub mod fork;

pub use compact::{compact_view, CompactionConfig, CompactionOutcome};
pub use fork::{
    create_fork, execute_fork, execution_hash, ingest_fork_result, schema_hash,
    ExecutorReply, ForkOptions, ForkProvenance, ForkResult, SubTask,
};
pub use report::{CompactionReport, CompactionStep, StepReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A forbidden field survived into the serialized fork output.
    #[error("forbidden field leaked into fork output: {field}")]
    ForbiddenFieldLeak { field: String },

    #[error("fork output failed schema validation: {detail}")]
    SchemaValidation { detail: String },

    #[error("fork executor failed: {0}")]
    Executor(String),

    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    #[error(transparent)]
    Codec(#[from] cg_codec::CodecError),

    #[error(transparent)]
    Canon(#[from] cg_canon::CanonError),

    #[error(transparent)]
    Graph(#[from] cg_graph::GraphError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
