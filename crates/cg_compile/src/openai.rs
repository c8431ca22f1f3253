//! OpenAI assembly: one inline message list, system messages included in
//! place. No cache markers; consecutive same-role messages draw a warning.

use cg_codec::{CodecError, CodecRegistry, Rendered};
use cg_core::Provider;
use cg_graph::View;

use crate::structure::{Assembled, CompiledMessages, Diagnostic, Severity};
use crate::CompileResult;

pub(crate) fn assemble(view: &View, registry: &CodecRegistry) -> CompileResult<Assembled> {
    let mut messages = Vec::new();
    let mut excluded_blocks = Vec::new();
    let mut diagnostics = Vec::new();

    for block in view.blocks() {
        let codec = registry.get(&block.meta.codec_id)?;
        let rendered = codec.render(block, Provider::Openai)?;
        if rendered.is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Info,
                code: "openai.excluded",
                message: format!("block {} has no openai rendering", block.block_hash),
                position: -1,
            });
            excluded_blocks.push(block.clone());
            continue;
        }
        for entry in rendered {
            match entry {
                Rendered::OpenAi(message) => messages.push(message),
                _ => {
                    return Err(CodecError::Render {
                        codec: "openai",
                        msg: format!(
                            "codec '{}' returned a non-openai rendering",
                            block.meta.codec_id
                        ),
                    }
                    .into());
                }
            }
        }
    }

    for i in 1..messages.len() {
        if messages[i].role == messages[i - 1].role {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                code: "openai.same_role",
                message: format!(
                    "consecutive '{:?}' messages at index {i}",
                    messages[i].role
                ),
                position: i as i64,
            });
        }
    }

    Ok(Assembled {
        messages: CompiledMessages::Openai { messages },
        excluded_blocks,
        diagnostics,
    })
}
