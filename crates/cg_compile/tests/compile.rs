//! Compiler behavior over materialized views: system/message split, cache
//! breakpoint placement, role handling, and alternation enforcement.

use assert_json_diff::assert_json_eq;
use serde_json::json;

use cg_codec::{BlockSpec, ChatRole, CodecRegistry, GeminiRole, OpenAiRole};
use cg_compile::{
    compile, CacheSelector, CompileOptions, CompiledMessages, Severity,
};
use cg_core::{BlockKind, Policy, Provider};
use cg_graph::{create_view, ContextGraph, ViewOptions};

fn policy(provider: Provider) -> Policy {
    Policy::for_model(provider, "test-model")
}

fn pinned_rule(reg: &CodecRegistry, text: &str, tag: &str) -> cg_core::Block {
    reg.make_block(
        BlockSpec::new(BlockKind::Pinned, "system-rules", json!({ "text": text }))
            .tag(tag),
    )
    .unwrap()
}

#[test]
fn anthropic_splits_system_from_messages() {
    let reg = CodecRegistry::with_builtins();
    let mut graph = ContextGraph::new();
    graph.add_block(pinned_rule(&reg, "Always cite sources", "base"), vec![], vec![]);
    graph.add_block(
        reg.make_block(BlockSpec::new(
            BlockKind::Turn,
            "user-turn",
            json!({ "text": "What changed?" }),
        ))
        .unwrap(),
        vec![],
        vec![],
    );

    let view = create_view(&graph, &ViewOptions::default(), None).unwrap();
    let compiled = compile(
        &view,
        &policy(Provider::Anthropic),
        &CompileOptions::default(),
        &reg,
        None,
    )
    .unwrap();

    match &compiled.messages {
        CompiledMessages::Anthropic { system, messages } => {
            assert_eq!(system.len(), 1);
            assert_eq!(system[0].text, "Always cite sources");
            assert!(system[0].cache_control.is_none());
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].role, ChatRole::User);
            assert_json_eq!(
                serde_json::to_value(&messages[0]).unwrap(),
                json!({
                    "role": "user",
                    "content": [{ "type": "text", "text": "What changed?" }]
                })
            );
        }
        other => panic!("wrong provider shape: {other:?}"),
    }
    assert!(compiled.excluded_blocks.is_empty());
}

#[test]
fn anthropic_cache_breakpoint_picks_last_match() {
    // Four pinned system blocks tagged [cacheable, cacheable, other, cacheable]:
    // the marker must land on the last cacheable entry only.
    let reg = CodecRegistry::with_builtins();
    let mut graph = ContextGraph::new();
    let texts = [
        ("rule a", "cacheable"),
        ("rule b", "cacheable"),
        ("rule c", "other"),
        ("rule d", "cacheable"),
    ];
    for (text, tag) in texts {
        graph.add_block(pinned_rule(&reg, text, tag), vec![], vec![]);
    }

    let view = create_view(&graph, &ViewOptions::default(), None).unwrap();
    let options = CompileOptions {
        cache: Some(CacheSelector {
            tag: Some("cacheable".into()),
            ..CacheSelector::default()
        }),
        ..CompileOptions::default()
    };
    let compiled = compile(&view, &policy(Provider::Anthropic), &options, &reg, None).unwrap();

    let CompiledMessages::Anthropic { system, .. } = &compiled.messages else {
        panic!("expected anthropic shape");
    };
    assert_eq!(system.len(), 4);

    // Views order pinned blocks by hash; recover the tag order from the
    // source blocks to find the expected index.
    let expected: usize = compiled
        .blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.meta.tags.contains("cacheable"))
        .map(|(i, _)| i)
        .max()
        .unwrap();

    let marked: Vec<usize> = system
        .iter()
        .enumerate()
        .filter(|(_, e)| e.cache_control.is_some())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(marked, vec![expected]);
    assert_eq!(
        system[expected].cache_control.as_ref().unwrap().cache_type,
        "ephemeral"
    );
    assert!(compiled
        .diagnostics
        .iter()
        .any(|d| d.code == "anthropic.cache_resolved" && d.severity == Severity::Info));
}

#[test]
fn anthropic_cache_zero_matches_still_compiles() {
    let reg = CodecRegistry::with_builtins();
    let mut graph = ContextGraph::new();
    graph.add_block(pinned_rule(&reg, "rule", "base"), vec![], vec![]);

    let view = create_view(&graph, &ViewOptions::default(), None).unwrap();
    let options = CompileOptions {
        cache: Some(CacheSelector {
            tag: Some("missing-tag".into()),
            ..CacheSelector::default()
        }),
        ..CompileOptions::default()
    };
    let compiled = compile(&view, &policy(Provider::Anthropic), &options, &reg, None).unwrap();

    let CompiledMessages::Anthropic { system, .. } = &compiled.messages else {
        panic!("expected anthropic shape");
    };
    assert!(system.iter().all(|e| e.cache_control.is_none()));
    let warn = compiled
        .diagnostics
        .iter()
        .find(|d| d.code == "anthropic.cache_no_match")
        .unwrap();
    assert_eq!(warn.severity, Severity::Warning);
    assert_eq!(warn.position, -1);
}

#[test]
fn openai_inlines_system_and_warns_on_same_role_runs() {
    let reg = CodecRegistry::with_builtins();
    let mut graph = ContextGraph::new();
    graph.add_block(pinned_rule(&reg, "rules", "base"), vec![], vec![]);
    for text in ["fact one", "fact two"] {
        graph.add_block(
            reg.make_block(BlockSpec::new(
                BlockKind::Memory,
                "unsafe-text",
                json!({ "text": text }),
            ))
            .unwrap(),
            vec![],
            vec![],
        );
    }

    let view = create_view(&graph, &ViewOptions::default(), None).unwrap();
    let compiled = compile(
        &view,
        &policy(Provider::Openai),
        &CompileOptions::default(),
        &reg,
        None,
    )
    .unwrap();

    let CompiledMessages::Openai { messages } = &compiled.messages else {
        panic!("expected openai shape");
    };
    assert_eq!(messages[0].role, OpenAiRole::System);
    // The two user-role memory facts stay as-is, drawing a warning.
    assert_eq!(messages.len(), 3);
    assert!(compiled
        .diagnostics
        .iter()
        .any(|d| d.code == "openai.same_role" && d.severity == Severity::Warning));
}

#[test]
fn gemini_merges_consecutive_same_role_parts() {
    // Five consecutive user blocks must compile into a single merged user
    // message with five parts.
    let reg = CodecRegistry::with_builtins();
    let mut graph = ContextGraph::new();
    for i in 0..5 {
        graph.add_block(
            reg.make_block(BlockSpec::new(
                BlockKind::Memory,
                "unsafe-text",
                json!({ "text": format!("note {i}") }),
            ))
            .unwrap(),
            vec![],
            vec![],
        );
    }

    let view = create_view(&graph, &ViewOptions::default(), None).unwrap();
    let compiled = compile(
        &view,
        &policy(Provider::Gemini),
        &CompileOptions::default(),
        &reg,
        None,
    )
    .unwrap();

    let CompiledMessages::Gemini { contents, .. } = &compiled.messages else {
        panic!("expected gemini shape");
    };
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].role, GeminiRole::User);
    assert_eq!(contents[0].parts.len(), 5);
}

#[test]
fn gemini_alternation_holds_across_history() {
    let reg = CodecRegistry::with_builtins();
    let mut graph = ContextGraph::new();
    graph.add_block(pinned_rule(&reg, "rules", "base"), vec![], vec![]);
    graph.add_block(
        reg.make_block(BlockSpec::new(
            BlockKind::History,
            "conversation-history",
            json!({ "messages": [
                { "role": "user", "content": "q1" },
                { "role": "assistant", "content": "a1" },
                { "role": "assistant", "content": "a2" },
                { "role": "user", "content": "q2" }
            ]}),
        ))
        .unwrap(),
        vec![],
        vec![],
    );

    let view = create_view(&graph, &ViewOptions::default(), None).unwrap();
    let compiled = compile(
        &view,
        &policy(Provider::Gemini),
        &CompileOptions::default(),
        &reg,
        None,
    )
    .unwrap();

    let CompiledMessages::Gemini {
        system_instruction,
        contents,
    } = &compiled.messages
    else {
        panic!("expected gemini shape");
    };
    assert_eq!(system_instruction.as_deref(), Some("rules"));
    // No two consecutive contents share a role.
    for pair in contents.windows(2) {
        assert_ne!(pair[0].role, pair[1].role);
    }
    // The two assistant turns merged into one model entry with two parts.
    let model_entry = contents
        .iter()
        .find(|c| c.role == GeminiRole::Model)
        .unwrap();
    assert_eq!(model_entry.parts, vec!["a1", "a2"]);
}

#[test]
fn compile_is_pure() {
    let reg = CodecRegistry::with_builtins();
    let mut graph = ContextGraph::new();
    graph.add_block(pinned_rule(&reg, "rules", "base"), vec![], vec![]);

    let view = create_view(&graph, &ViewOptions::default(), None).unwrap();
    let opts = CompileOptions {
        compiled_at: 42,
        ..CompileOptions::default()
    };
    let a = compile(&view, &policy(Provider::Anthropic), &opts, &reg, None).unwrap();
    let b = compile(&view, &policy(Provider::Anthropic), &opts, &reg, None).unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn meta_reports_budget_and_kind_accounting() {
    let reg = CodecRegistry::with_builtins();
    let mut graph = ContextGraph::new();
    graph.add_block(pinned_rule(&reg, "rules", "base"), vec![], vec![]);
    graph.add_block(
        reg.make_block(BlockSpec::new(
            BlockKind::Turn,
            "user-turn",
            json!({ "text": "question" }),
        ))
        .unwrap(),
        vec![],
        vec![],
    );

    let view = create_view(&graph, &ViewOptions::default(), None).unwrap();
    let mut pol = policy(Provider::Anthropic);
    pol.context_window = 10_000;
    pol.completion_reserve = 1_000;
    let compiled = compile(&view, &pol, &CompileOptions::default(), &reg, None).unwrap();

    assert_eq!(compiled.meta.available_tokens, 9_000);
    assert!(!compiled.meta.overflowed);
    assert!(compiled.meta.tokens_by_kind.contains_key(&BlockKind::Pinned));
    assert!(compiled.meta.tokens_by_kind.contains_key(&BlockKind::Turn));
}
