//! Compaction step identifiers and the deterministic report model.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionStep {
    Dedupe,
    ToolOutputPrune,
    HistoryTrim,
    SummarizeHistory,
}

impl CompactionStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            CompactionStep::Dedupe => "dedupe",
            CompactionStep::ToolOutputPrune => "tool_output_prune",
            CompactionStep::HistoryTrim => "history_trim",
            CompactionStep::SummarizeHistory => "summarize_history",
        }
    }

    /// The provenance tag carried by successor blocks of this step.
    pub fn provenance_tag(self) -> String {
        format!("compacted:{}", self.as_str())
    }
}

impl std::fmt::Display for CompactionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one step. `lossy` is true iff content was removed or replaced
/// in a way that cannot be reconstructed from the output alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub step: CompactionStep,
    pub blocks_removed: usize,
    pub blocks_replaced: usize,
    pub tokens_saved: u64,
    pub lossy: bool,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactionReport {
    pub before_tokens: u64,
    pub after_tokens: u64,
    pub saved_tokens: u64,
    pub steps_applied: Vec<CompactionStep>,
    pub step_reports: Vec<StepReport>,
}
