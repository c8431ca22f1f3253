//! Fork behavior: sensitivity redaction, execution fingerprints, schema
//! enforcement, forbidden-field containment, and result ingestion.

use serde_json::json;

use cg_codec::{BlockSpec, CodecRegistry};
use cg_core::caps::Usage;
use cg_core::{BlockKind, Provider, Sensitivity};
use cg_graph::{create_view, ContextGraph, ViewOptions};
use cg_pipeline::{
    create_fork, execute_fork, execution_hash, ingest_fork_result, schema_hash,
    ExecutorReply, ForkOptions, PipelineError, SubTask,
};

fn seeded_graph(reg: &CodecRegistry) -> ContextGraph {
    let mut graph = ContextGraph::new();
    graph.add_block(
        reg.make_block(
            BlockSpec::new(BlockKind::Pinned, "system-rules", json!({ "text": "rules" }))
                .sensitivity(Sensitivity::Public),
        )
        .unwrap(),
        vec![],
        vec![],
    );
    graph.add_block(
        reg.make_block(
            BlockSpec::new(
                BlockKind::Memory,
                "unsafe-text",
                json!({ "text": "internal fact" }),
            )
            .sensitivity(Sensitivity::Internal),
        )
        .unwrap(),
        vec![],
        vec![],
    );
    graph.add_block(
        reg.make_block(
            BlockSpec::new(
                BlockKind::State,
                "unsafe-text",
                json!({ "text": "restricted state" }),
            )
            .sensitivity(Sensitivity::Restricted),
        )
        .unwrap(),
        vec![],
        vec![],
    );
    graph
}

fn task(schema: serde_json::Value) -> SubTask {
    SubTask {
        provider: Provider::Anthropic,
        model_id: "claude-sonnet-4-5".into(),
        instruction: "Summarize the facts".into(),
        output_schema: schema,
        forbidden_fields: vec![],
        toolset_version: None,
    }
}

#[test]
fn fork_redacts_in_place() {
    let reg = CodecRegistry::with_builtins();
    let graph = seeded_graph(&reg);
    let parent = create_view(&graph, &ViewOptions::default(), None).unwrap();
    assert_eq!(parent.len(), 3);

    let fork = create_fork(&parent, &ForkOptions::default(), &reg, 7).unwrap();
    assert_eq!(fork.len(), 3);

    // Index 0 (public pinned) survives verbatim; 1 and 2 become stubs
    // pointing back at the originals.
    assert_eq!(fork.blocks()[0].block_hash, parent.blocks()[0].block_hash);
    for i in [1usize, 2] {
        let stub = &fork.blocks()[i];
        let original = &parent.blocks()[i];
        assert_eq!(stub.meta.codec_id, "redacted-stub");
        assert_eq!(stub.meta.kind, original.meta.kind);
        assert_eq!(stub.meta.sensitivity, Sensitivity::Public);
        assert_eq!(
            stub.payload.get("originalBlockHash").unwrap().as_str().unwrap(),
            original.block_hash.as_str()
        );
        let reason = stub.payload.get("reason").unwrap().as_str().unwrap();
        assert!(reason.contains("exceeds maximum 'public'"));
    }
    assert_ne!(fork.stable_prefix_hash, parent.stable_prefix_hash);
}

#[test]
fn fork_can_drop_history_and_state() {
    let reg = CodecRegistry::with_builtins();
    let mut graph = seeded_graph(&reg);
    graph.add_block(
        reg.make_block(BlockSpec::new(
            BlockKind::History,
            "conversation-history",
            json!({ "messages": [{ "role": "user", "content": "old" }] }),
        ))
        .unwrap(),
        vec![],
        vec![],
    );
    let parent = create_view(&graph, &ViewOptions::default(), None).unwrap();

    let options = ForkOptions {
        include_history: false,
        include_state: false,
        ..ForkOptions::default()
    };
    let fork = create_fork(&parent, &options, &reg, 0).unwrap();
    assert!(fork
        .blocks()
        .iter()
        .all(|b| !matches!(b.meta.kind, BlockKind::History | BlockKind::State)));
}

#[test]
fn execution_hash_is_pure_and_input_sensitive() {
    let view_hash: cg_core::BlockHash = "a".repeat(64).parse().unwrap();
    let schema = schema_hash(&json!({ "type": "object" })).unwrap();

    let base = execution_hash("anthropic:m", &view_hash, "do it", &schema, None).unwrap();
    let same = execution_hash("anthropic:m", &view_hash, "do it", &schema, None).unwrap();
    assert_eq!(base, same);

    let other_instruction =
        execution_hash("anthropic:m", &view_hash, "do it differently", &schema, None).unwrap();
    assert_ne!(base, other_instruction);

    let other_model = execution_hash("openai:m", &view_hash, "do it", &schema, None).unwrap();
    assert_ne!(base, other_model);

    let other_toolset =
        execution_hash("anthropic:m", &view_hash, "do it", &schema, Some("v2")).unwrap();
    assert_ne!(base, other_toolset);
}

#[test]
fn execute_fork_validates_output_and_returns_provenance() {
    let reg = CodecRegistry::with_builtins();
    let graph = seeded_graph(&reg);
    let parent = create_view(&graph, &ViewOptions::default(), None).unwrap();

    let schema = json!({
        "type": "object",
        "properties": { "answer": { "type": "string" } },
        "required": ["answer"]
    });
    let result = execute_fork(
        &task(schema),
        &ForkOptions::default(),
        &parent,
        &reg,
        |instruction, view| {
            assert!(instruction.contains("Summarize"));
            // The executor only ever sees redacted content.
            assert!(view
                .blocks()
                .iter()
                .all(|b| b.meta.sensitivity == Sensitivity::Public));
            Ok(ExecutorReply {
                output: json!({ "answer": "42" }),
                summary: "answered".into(),
                artifacts: vec![],
                citations: vec![view.blocks()[0].block_hash.clone()],
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 2,
                },
            })
        },
    )
    .unwrap();

    assert!(result.agent_id.starts_with("agent-"));
    assert_eq!(result.model, "anthropic:claude-sonnet-4-5");
    assert_eq!(result.provenance.execution_hash.as_str().len(), 64);
    assert!(result.provenance.completed_at >= result.provenance.forked_at);
}

#[test]
fn execute_fork_rejects_schema_violations() {
    let reg = CodecRegistry::with_builtins();
    let graph = seeded_graph(&reg);
    let parent = create_view(&graph, &ViewOptions::default(), None).unwrap();

    let schema = json!({
        "type": "object",
        "properties": { "answer": { "type": "string" } },
        "required": ["answer"]
    });
    let err = execute_fork(
        &task(schema),
        &ForkOptions::default(),
        &parent,
        &reg,
        |_, _| {
            Ok(ExecutorReply {
                output: json!({ "wrong": true }),
                summary: "bad".into(),
                artifacts: vec![],
                citations: vec![],
                usage: Usage::default(),
            })
        },
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::SchemaValidation { .. }));
}

#[test]
fn execute_fork_fail_closes_on_forbidden_field_leak() {
    let reg = CodecRegistry::with_builtins();
    let graph = seeded_graph(&reg);
    let parent = create_view(&graph, &ViewOptions::default(), None).unwrap();

    let mut t = task(json!({ "type": "object" }));
    t.forbidden_fields = vec!["api_key".into()];
    let err = execute_fork(
        &t,
        &ForkOptions::default(),
        &parent,
        &reg,
        |instruction, _| {
            // The directive was appended for the executor to obey…
            assert!(instruction.contains("api_key"));
            // …but this executor leaks anyway.
            Ok(ExecutorReply {
                output: json!({ "api_key": "sk-123" }),
                summary: "oops".into(),
                artifacts: vec![],
                citations: vec![],
                usage: Usage::default(),
            })
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ForbiddenFieldLeak { field } if field == "api_key"
    ));
}

#[test]
fn ingest_records_citations_as_derivation() {
    let reg = CodecRegistry::with_builtins();
    let mut graph = seeded_graph(&reg);
    let parent = create_view(&graph, &ViewOptions::default(), None).unwrap();
    let cited = parent.blocks()[0].block_hash.clone();

    let result = execute_fork(
        &task(json!({ "type": "object" })),
        &ForkOptions::default(),
        &parent,
        &reg,
        |_, _| {
            Ok(ExecutorReply {
                output: json!({ "note": "done" }),
                summary: "done".into(),
                artifacts: vec![],
                citations: vec![cited.clone()],
                usage: Usage::default(),
            })
        },
    )
    .unwrap();

    let before = graph.stats().block_count;
    let hash = ingest_fork_result(&mut graph, &result, &reg, 123).unwrap();
    assert_eq!(graph.stats().block_count, before + 1);

    let block = graph.get_block(&hash).unwrap();
    assert_eq!(block.meta.kind, BlockKind::Memory);
    assert!(block.meta.tags.contains("fork-result"));
    assert_eq!(graph.get_derived_from(&hash), std::slice::from_ref(&cited));
}
