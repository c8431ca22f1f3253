//! Gemini assembly: one system-instruction string plus strictly alternating
//! user/model contents. Alternation is *enforced* by merging adjacent
//! same-role entries (their parts concatenate); an empty-parts entry is a
//! diagnostic error.

use cg_codec::{CodecError, CodecRegistry, GeminiRendered, Rendered};
use cg_core::Provider;
use cg_graph::View;

use crate::structure::{Assembled, CompiledMessages, Diagnostic, GeminiContent, Severity};
use crate::CompileResult;

pub(crate) fn assemble(view: &View, registry: &CodecRegistry) -> CompileResult<Assembled> {
    let mut system_texts: Vec<String> = Vec::new();
    let mut contents: Vec<GeminiContent> = Vec::new();
    let mut excluded_blocks = Vec::new();
    let mut diagnostics = Vec::new();

    for block in view.blocks() {
        let codec = registry.get(&block.meta.codec_id)?;
        let rendered = codec.render(block, Provider::Gemini)?;
        if rendered.is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Info,
                code: "gemini.excluded",
                message: format!("block {} has no gemini rendering", block.block_hash),
                position: -1,
            });
            excluded_blocks.push(block.clone());
            continue;
        }
        for entry in rendered {
            match entry {
                Rendered::Gemini(GeminiRendered::System(text)) => system_texts.push(text),
                Rendered::Gemini(GeminiRendered::Content { role, parts }) => {
                    if parts.is_empty() {
                        diagnostics.push(Diagnostic {
                            severity: Severity::Error,
                            code: "gemini.empty_parts",
                            message: format!(
                                "block {} rendered a content entry with no parts",
                                block.block_hash
                            ),
                            position: contents.len() as i64,
                        });
                        continue;
                    }
                    // Merge into the previous entry while the role repeats.
                    match contents.last_mut() {
                        Some(last) if last.role == role => last.parts.extend(parts),
                        _ => contents.push(GeminiContent { role, parts }),
                    }
                }
                _ => {
                    return Err(CodecError::Render {
                        codec: "gemini",
                        msg: format!(
                            "codec '{}' returned a non-gemini rendering",
                            block.meta.codec_id
                        ),
                    }
                    .into());
                }
            }
        }
    }

    let system_instruction = if system_texts.is_empty() {
        None
    } else {
        Some(system_texts.join("\n\n"))
    };

    Ok(Assembled {
        messages: CompiledMessages::Gemini {
            system_instruction,
            contents,
        },
        excluded_blocks,
        diagnostics,
    })
}
