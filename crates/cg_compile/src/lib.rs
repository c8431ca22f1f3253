//! cg_compile — provider compilers.
//!
//! A compiler takes an ordered view, a policy, and options, and produces a
//! provider-native message structure plus compiled metadata. No I/O, no
//! recomputation of view contents, deterministic ordering only: the same
//! inputs compile to byte-identical outputs.
//!
//! Token counts in the compiled result are advisory; the view's estimate
//! remains authoritative for budget decisions.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod structure;
pub mod anthropic;
pub mod openai;
pub mod gemini;

pub use structure::{
    AnthropicMessage, AnthropicSystemEntry, CacheControl, CacheSelector,
    CompileOptions, CompiledContext, CompiledMessages, CompiledMeta, Diagnostic,
    GeminiContent, Severity,
};

use cg_core::order::validate_ordered;
use cg_core::{
    Block, BlockKind, HeuristicEstimator, Policy, Provider, TokenEstimator,
};
use cg_graph::View;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Codec(#[from] cg_codec::CodecError),

    #[error(transparent)]
    Policy(#[from] cg_core::CoreError),
}

pub type CompileResult<T> = Result<T, CompileError>;

static HEURISTIC: HeuristicEstimator = HeuristicEstimator;

fn block_tokens(estimator: Option<&dyn TokenEstimator>, block: &Block) -> u64 {
    let est = estimator.unwrap_or(&HEURISTIC);
    match est.estimate_block(block) {
        Ok(e) => e.tokens,
        Err(err) => {
            tracing::warn!(error = %err, "estimator unavailable during compile, degrading to heuristic");
            HeuristicEstimator
                .estimate_block(block)
                .expect("heuristic estimation is infallible")
                .tokens
        }
    }
}

/// Compile a view for the policy's provider. The view must already be in
/// canonical kind order (a materialized view always is); violations are a
/// programmer error surfaced before any rendering.
pub fn compile(
    view: &View,
    policy: &Policy,
    options: &CompileOptions,
    registry: &cg_codec::CodecRegistry,
    estimator: Option<&dyn TokenEstimator>,
) -> CompileResult<CompiledContext> {
    policy.validate()?;
    validate_ordered(view.blocks())?;

    // Advisory accounting, by kind and in total.
    let mut tokens_by_kind = std::collections::BTreeMap::<BlockKind, u64>::new();
    let mut total_tokens = 0u64;
    for block in view.blocks() {
        let t = block_tokens(estimator, block);
        *tokens_by_kind.entry(block.meta.kind).or_insert(0) += t;
        total_tokens += t;
    }
    let estimated_tokens = view
        .token_estimate
        .map(|e| e.tokens)
        .unwrap_or(total_tokens);
    let available = policy.available_tokens();

    let assembled = match policy.provider {
        Provider::Anthropic => anthropic::assemble(view, options, registry)?,
        Provider::Openai => openai::assemble(view, registry)?,
        Provider::Gemini => gemini::assemble(view, registry)?,
    };

    Ok(CompiledContext {
        provider: policy.provider,
        model_id: policy.model_id.clone(),
        messages: assembled.messages,
        estimated_tokens,
        blocks: view.blocks().to_vec(),
        excluded_blocks: assembled.excluded_blocks,
        diagnostics: assembled.diagnostics,
        meta: CompiledMeta {
            compiled_at: options.compiled_at,
            context_window: policy.context_window,
            completion_reserve: policy.completion_reserve,
            available_tokens: available,
            overflowed: estimated_tokens > available,
            compacted: options.compacted,
            truncated: view.truncated,
            tokens_by_kind,
        },
    })
}
