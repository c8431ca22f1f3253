// crates/cg_cli/src/main.rs
//
// Context engine CLI entrypoint.
// Loads a block manifest, materializes a deterministic view, optionally runs
// the compaction pipeline, compiles for the selected provider, and writes
// canonical artifacts. Strictly offline: no network, no OS RNG.

mod args;

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use serde::Deserialize;
use serde_json::Value;

use args::{parse_and_validate, Args};
use cg_canon::to_canonical_bytes;
use cg_codec::{BlockSpec, CodecRegistry};
use cg_compile::{compile, CacheSelector, CompileOptions};
use cg_core::{BlockKind, HeuristicEstimator, Policy, Query, Sensitivity};
use cg_graph::{create_view, ContextGraph, View, ViewOptions};
use cg_pipeline::{compact_view, CompactionConfig};

// Filenames for emitted artifacts in the output directory.
const VIEW_FILE: &str = "view.json";
const COMPILED_FILE: &str = "compiled.json";
const REPORT_FILE: &str = "compaction_report.json";

/// One manifest entry; payload stays untyped until the codec validates it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    kind: String,
    codec: String,
    payload: Value,
    #[serde(default)]
    sensitivity: Option<String>,
    #[serde(default)]
    created_at: Option<u64>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn main() -> ExitCode {
    let args = match parse_and_validate() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("cg: error: {e}");
            return ExitCode::from(1);
        }
    };

    if !args.quiet {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_target(false)
            .init();
    }

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("cg: error: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<ExitCode, String> {
    fs::create_dir_all(&args.out)
        .map_err(|e| format!("cannot create output directory {}: {e}", args.out.display()))?;

    let registry = CodecRegistry::with_builtins();
    let graph = load_graph(&args.blocks, &registry)?;

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let options = ViewOptions {
        query: Query::any(),
        max_tokens: args.max_tokens,
        created_at: now,
        ..ViewOptions::default()
    };
    let mut view =
        create_view(&graph, &options, None).map_err(|e| format!("view failed: {e}"))?;

    let mut compacted = false;
    if args.compact {
        let outcome = compact_view(&view, &CompactionConfig::default(), &HeuristicEstimator, None)
            .map_err(|e| format!("compaction failed: {e}"))?;
        write_canonical(&args.out.join(REPORT_FILE), &outcome.report)?;
        // The old estimate no longer describes the compacted block list.
        view = View::from_blocks(outcome.blocks, None, now);
        compacted = true;
    }

    let policy = Policy::for_model(args.provider_enum(), args.model.clone());
    let compile_options = CompileOptions {
        cache: args.cache_tag.as_ref().map(|tag| CacheSelector {
            tag: Some(tag.clone()),
            ..CacheSelector::default()
        }),
        compiled_at: now,
        compacted,
    };
    let compiled = compile(&view, &policy, &compile_options, &registry, None)
        .map_err(|e| format!("compile failed: {e}"))?;

    write_canonical(&args.out.join(VIEW_FILE), &view)?;
    write_canonical(&args.out.join(COMPILED_FILE), &compiled)?;

    if !args.quiet {
        println!(
            "cg: compiled {} block(s) for {} — view {}",
            view.len(),
            policy.provider,
            view.stable_prefix_hash
        );
        for d in &compiled.diagnostics {
            println!("cg: [{:?}] {}: {}", d.severity, d.code, d.message);
        }
        println!("cg: artifacts written to {}", args.out.display());
    }

    Ok(ExitCode::from(0))
}

/// Parse the manifest and mint every block through the codec registry.
fn load_graph(path: &Path, registry: &CodecRegistry) -> Result<ContextGraph, String> {
    let bytes = fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let entries: Vec<ManifestEntry> =
        serde_json::from_slice(&bytes).map_err(|e| format!("manifest rejected: {e}"))?;

    let mut graph = ContextGraph::new();
    for (i, entry) in entries.into_iter().enumerate() {
        let kind: BlockKind = entry
            .kind
            .parse()
            .map_err(|e| format!("entry {i}: {e}"))?;
        let sensitivity = match entry.sensitivity.as_deref() {
            Some(s) => s
                .parse::<Sensitivity>()
                .map_err(|e| format!("entry {i}: {e}"))?,
            None => Sensitivity::Public,
        };
        let spec = BlockSpec {
            kind,
            sensitivity,
            codec_id: entry.codec,
            payload: entry.payload,
            created_at: entry.created_at.unwrap_or(0),
            source: entry.source,
            tags: entry.tags.into_iter().collect::<BTreeSet<_>>(),
        };
        let block = registry
            .make_block(spec)
            .map_err(|e| format!("entry {i}: {e}"))?;
        graph.add_block(block, vec![], vec![]);
    }
    Ok(graph)
}

fn write_canonical<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let bytes =
        to_canonical_bytes(value).map_err(|e| format!("serialize {}: {e}", path.display()))?;
    fs::write(path, bytes).map_err(|e| format!("write {}: {e}", path.display()))
}
