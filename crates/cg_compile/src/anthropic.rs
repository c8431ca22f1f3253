//! Anthropic assembly: separate `system[]` from pinned renderings, one
//! message per rendered entry, no implicit re-ordering, and cache-breakpoint
//! resolution.

use cg_codec::{AnthropicRendered, CodecError, CodecRegistry, Rendered};
use cg_core::{Block, BlockKind, Provider};
use cg_graph::View;

use crate::structure::{
    AnthropicMessage, AnthropicSystemEntry, Assembled, CacheControl, CompileOptions,
    CompiledMessages, Diagnostic, Severity,
};
use crate::CompileResult;

pub(crate) fn assemble(
    view: &View,
    options: &CompileOptions,
    registry: &CodecRegistry,
) -> CompileResult<Assembled> {
    let mut system = Vec::new();
    let mut system_blocks: Vec<Block> = Vec::new();
    let mut messages = Vec::new();
    let mut excluded_blocks = Vec::new();
    let mut diagnostics = Vec::new();

    for block in view.blocks() {
        let codec = registry.get(&block.meta.codec_id)?;
        let rendered = codec.render(block, Provider::Anthropic)?;
        if rendered.is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Info,
                code: "anthropic.excluded",
                message: format!(
                    "block {} has no anthropic rendering",
                    block.block_hash
                ),
                position: -1,
            });
            excluded_blocks.push(block.clone());
            continue;
        }
        for entry in rendered {
            match entry {
                Rendered::Anthropic(AnthropicRendered::System { text, .. }) => {
                    system.push(AnthropicSystemEntry {
                        text,
                        cache_control: None,
                    });
                    system_blocks.push(block.clone());
                }
                Rendered::Anthropic(AnthropicRendered::Message { role, content }) => {
                    messages.push(AnthropicMessage {
                        role,
                        content: vec![content],
                    });
                }
                _ => {
                    return Err(CodecError::Render {
                        codec: "anthropic",
                        msg: format!(
                            "codec '{}' returned a non-anthropic rendering",
                            block.meta.codec_id
                        ),
                    }
                    .into());
                }
            }
        }
    }

    if let Some(selector) = &options.cache {
        resolve_cache_breakpoint(selector, &system_blocks, &mut system, &mut diagnostics);
    }

    Ok(Assembled {
        messages: CompiledMessages::Anthropic { system, messages },
        excluded_blocks,
        diagnostics,
    })
}

/// Attach `cache_control: ephemeral` to the **last** matching system entry.
/// Only pinned blocks are considered; zero matches emits a warning and no
/// marker, and compilation still succeeds.
fn resolve_cache_breakpoint(
    selector: &crate::structure::CacheSelector,
    system_blocks: &[Block],
    system: &mut [AnthropicSystemEntry],
    diagnostics: &mut Vec<Diagnostic>,
) {
    let matches: Vec<usize> = system_blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.meta.kind == BlockKind::Pinned && selector.matches(b))
        .map(|(i, _)| i)
        .collect();

    match matches.last() {
        None => diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: "anthropic.cache_no_match",
            message: "cache selector matched no pinned block".into(),
            position: -1,
        }),
        Some(&last) => {
            system[last].cache_control = Some(CacheControl::ephemeral());
            diagnostics.push(Diagnostic {
                severity: Severity::Info,
                code: "anthropic.cache_resolved",
                message: format!(
                    "cache breakpoint resolved to block {last}, {} match(es)",
                    matches.len()
                ),
                position: last as i64,
            });
            if matches.len() > 10 {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    code: "anthropic.cache_many_matches",
                    message: format!("cache selector matched {} blocks", matches.len()),
                    position: last as i64,
                });
            }
        }
    }
}
