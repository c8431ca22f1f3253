// crates/cg_cli/src/args.rs
//
// Offline CLI argument parsing & validation.
// - No networked paths (reject any "<scheme>://")
// - Provider/model selection with sane defaults
// - Output directory for canonical artifacts

use clap::Parser;
use std::path::PathBuf;

use cg_core::Provider;

#[derive(Debug, Parser)]
#[command(name = "cg", about = "Compile a block manifest into provider-native context")]
pub struct Args {
    /// JSON manifest: an array of {kind, codec, payload, sensitivity?,
    /// createdAt?, source?, tags?} entries.
    #[arg(long)]
    pub blocks: PathBuf,

    /// Target provider.
    #[arg(long, value_parser = ["anthropic", "openai", "gemini"], default_value = "anthropic")]
    pub provider: String,

    /// Model identifier recorded in the compiled output.
    #[arg(long, default_value = "claude-sonnet-4-5")]
    pub model: String,

    /// Token budget for the view; omit for no truncation.
    #[arg(long)]
    pub max_tokens: Option<u64>,

    /// Run the default compaction pipeline before compiling.
    #[arg(long)]
    pub compact: bool,

    /// Anthropic cache breakpoint: select the last pinned block with this tag.
    #[arg(long)]
    pub cache_tag: Option<String>,

    // Output & control
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {}", p),
            NotFound(p) => write!(f, "file not found: {}", p),
        }
    }
}
impl std::error::Error for CliError {}

/// True if `s` looks like a URL (any `<scheme>://`, including `file://`).
#[inline]
fn looks_like_url(s: &str) -> bool {
    s.trim().contains("://")
}

/// Entry point used by main.rs
pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();

    let shown = args.blocks.display().to_string();
    if looks_like_url(&shown) {
        return Err(CliError::NonLocalPath(shown));
    }
    if !args.blocks.is_file() {
        return Err(CliError::NotFound(shown));
    }
    Ok(args)
}

impl Args {
    pub fn provider_enum(&self) -> Provider {
        match self.provider.as_str() {
            "openai" => Provider::Openai,
            "gemini" => Provider::Gemini,
            _ => Provider::Anthropic,
        }
    }
}
