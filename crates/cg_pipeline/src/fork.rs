//! Fork: sensitivity-filtered sub-views and sub-agent execution.
//!
//! A fork replaces over-sensitive blocks with `redacted-stub` successors at
//! the same index (the stub itself is public), optionally drops history and
//! state, and recomputes the view identity. Executing a fork runs the
//! caller-supplied executor, enforces the output schema, and fail-closes on
//! forbidden-field leaks. Neither the parent view nor the graph is mutated.

use chrono::Utc;
use serde_json::{json, Value};

use cg_canon::{short_hex, to_canonical_bytes};
use cg_codec::{BlockSpec, CodecRegistry};
use cg_core::caps::Usage;
use cg_core::{Block, BlockHash, BlockKind, Provider, Sensitivity};
use cg_graph::{ContextGraph, View};

use crate::{PipelineError, PipelineResult};

#[derive(Clone, Debug)]
pub struct ForkOptions {
    /// Blocks above this level are redacted. Defaults to `public`.
    pub max_sensitivity: Sensitivity,
    pub include_history: bool,
    pub include_state: bool,
    /// Override for the stub placeholder text.
    pub placeholder: Option<String>,
}

impl Default for ForkOptions {
    fn default() -> Self {
        Self {
            max_sensitivity: Sensitivity::Public,
            include_history: true,
            include_state: true,
            placeholder: None,
        }
    }
}

/// Build the sensitivity-filtered fork of a view. Redacted blocks keep their
/// kind (and therefore their position); dropped kinds vanish entirely.
pub fn create_fork(
    parent: &View,
    options: &ForkOptions,
    registry: &CodecRegistry,
    created_at: u64,
) -> PipelineResult<View> {
    let mut blocks = Vec::with_capacity(parent.len());
    for block in parent.blocks() {
        match block.meta.kind {
            BlockKind::History if !options.include_history => continue,
            BlockKind::State if !options.include_state => continue,
            _ => {}
        }
        if block.meta.sensitivity > options.max_sensitivity {
            blocks.push(redact(block, options, registry)?);
        } else {
            blocks.push(block.clone());
        }
    }
    Ok(View::from_blocks(blocks, None, created_at))
}

fn redact(
    block: &Block,
    options: &ForkOptions,
    registry: &CodecRegistry,
) -> PipelineResult<Block> {
    let mut payload = json!({
        "originalBlockHash": block.block_hash.as_str(),
        "reason": format!(
            "Sensitivity level '{}' exceeds maximum '{}'",
            block.meta.sensitivity, options.max_sensitivity
        ),
    });
    if let Some(placeholder) = &options.placeholder {
        payload
            .as_object_mut()
            .expect("literal object")
            .insert("placeholder".into(), Value::String(placeholder.clone()));
    }
    let spec = BlockSpec::new(block.meta.kind, "redacted-stub", payload)
        .sensitivity(Sensitivity::Public)
        .created_at(block.meta.created_at);
    Ok(registry.make_block(spec)?)
}

// ---------------- Execution fingerprint ----------------

/// Stable digest of an output-schema structure.
pub fn schema_hash(schema: &Value) -> PipelineResult<BlockHash> {
    let hex = cg_canon::sha256_canonical(schema)?;
    Ok(BlockHash::from_hex_unchecked(hex))
}

/// Deterministic fingerprint of a sub-agent invocation. Identical inputs
/// yield identical hashes; any single difference changes it.
pub fn execution_hash(
    model: &str,
    view_hash: &BlockHash,
    instruction: &str,
    schema: &BlockHash,
    toolset_version: Option<&str>,
) -> PipelineResult<BlockHash> {
    let preimage = json!({
        "model": model,
        "viewHash": view_hash.as_str(),
        "instruction": instruction,
        "schemaHash": schema.as_str(),
        "toolsetVersion": toolset_version.unwrap_or("none"),
    });
    let hex = cg_canon::sha256_canonical(&preimage)?;
    Ok(BlockHash::from_hex_unchecked(hex))
}

// ---------------- Sub-task execution ----------------

/// Description of a sub-agent task.
#[derive(Clone, Debug)]
pub struct SubTask {
    pub provider: Provider,
    pub model_id: String,
    pub instruction: String,
    /// JSON Schema (draft 2020-12) the output must satisfy.
    pub output_schema: Value,
    /// Field names that must not appear anywhere in the serialized output.
    pub forbidden_fields: Vec<String>,
    pub toolset_version: Option<String>,
}

/// What the caller's executor hands back.
#[derive(Clone, Debug)]
pub struct ExecutorReply {
    pub output: Value,
    pub summary: String,
    pub artifacts: Vec<Value>,
    pub citations: Vec<BlockHash>,
    pub usage: Usage,
}

#[derive(Clone, Debug)]
pub struct ForkProvenance {
    pub source_view_hash: BlockHash,
    pub execution_hash: BlockHash,
    /// Unix seconds.
    pub forked_at: u64,
    pub completed_at: u64,
}

#[derive(Clone, Debug)]
pub struct ForkResult {
    pub agent_id: String,
    pub model: String,
    pub summary: String,
    pub output: Value,
    pub artifacts: Vec<Value>,
    pub citations: Vec<BlockHash>,
    pub usage: Usage,
    pub provenance: ForkProvenance,
}

fn forbidden_directive(fields: &[String]) -> String {
    format!(
        "\n\nDo not include the following fields in your output: {}.",
        fields.join(", ")
    )
}

fn validate_against_schema(schema: &Value, output: &Value) -> PipelineResult<()> {
    let compiled = jsonschema::JSONSchema::options()
        .with_draft(jsonschema::Draft::Draft202012)
        .compile(schema)
        .map_err(|e| PipelineError::SchemaValidation {
            detail: format!("schema does not compile: {e}"),
        })?;
    if let Err(errors) = compiled.validate(output) {
        let detail = errors
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PipelineError::SchemaValidation { detail });
    }
    Ok(())
}

/// Build the fork, run the executor, and post-validate the result.
///
/// The executor sees the (possibly directive-augmented) instruction and the
/// redacted view; its output is checked against the task schema and then
/// re-scanned for forbidden-field substrings (fail-closed).
pub fn execute_fork<F>(
    task: &SubTask,
    options: &ForkOptions,
    parent: &View,
    registry: &CodecRegistry,
    executor: F,
) -> PipelineResult<ForkResult>
where
    F: FnOnce(&str, &View) -> Result<ExecutorReply, String>,
{
    let forked_at = Utc::now().timestamp().max(0) as u64;
    let fork = create_fork(parent, options, registry, forked_at)?;

    let mut instruction = task.instruction.clone();
    if !task.forbidden_fields.is_empty() {
        instruction.push_str(&forbidden_directive(&task.forbidden_fields));
    }

    let reply = executor(&instruction, &fork).map_err(PipelineError::Executor)?;

    validate_against_schema(&task.output_schema, &reply.output)?;

    let serialized = String::from_utf8(to_canonical_bytes(&reply.output)?)
        .expect("canonical JSON is UTF-8");
    for field in &task.forbidden_fields {
        if serialized.contains(field.as_str()) {
            return Err(PipelineError::ForbiddenFieldLeak {
                field: field.clone(),
            });
        }
    }

    let model = format!("{}:{}", task.provider, task.model_id);
    let schema_digest = schema_hash(&task.output_schema)?;
    let execution = execution_hash(
        &model,
        &fork.stable_prefix_hash,
        &instruction,
        &schema_digest,
        task.toolset_version.as_deref(),
    )?;
    let agent_id = format!(
        "agent-{}",
        short_hex(execution.as_str(), 12).expect("execution hash is 64-hex")
    );

    Ok(ForkResult {
        agent_id,
        model,
        summary: reply.summary,
        output: reply.output,
        artifacts: reply.artifacts,
        citations: reply.citations,
        usage: reply.usage,
        provenance: ForkProvenance {
            source_view_hash: fork.stable_prefix_hash.clone(),
            execution_hash: execution,
            forked_at,
            completed_at: Utc::now().timestamp().max(0) as u64,
        },
    })
}

/// Wrap a fork result as a memory block, record its citations as derivation
/// parents, and insert it into the parent graph. Returns the new hash.
pub fn ingest_fork_result(
    graph: &mut ContextGraph,
    result: &ForkResult,
    registry: &CodecRegistry,
    created_at: u64,
) -> PipelineResult<BlockHash> {
    let output_text = String::from_utf8(to_canonical_bytes(&result.output)?)
        .expect("canonical JSON is UTF-8");
    let payload = json!({
        "title": format!("Sub-agent result {}", result.agent_id),
        "content": format!("{}\n\n{}", result.summary, output_text),
    });
    let spec = BlockSpec::new(BlockKind::Memory, "structured-reference", payload)
        .created_at(created_at)
        .source(format!("fork:{}", result.agent_id))
        .tag("fork-result");
    let block = registry.make_block(spec)?;
    let hash = block.block_hash.clone();
    graph.add_block(block, result.citations.clone(), vec![]);
    Ok(hash)
}
