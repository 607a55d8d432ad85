//! Command-line argument parsing.

use clap::Parser;
use quill_compiler::AutofilterMode;
use std::path::PathBuf;

/// Compile quill templates into JavaScript classes
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Template directory to compile
    pub input: Option<PathBuf>,

    /// Directory for generated files (defaults to the input directory)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Path to quill.json
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Recompile when templates change
    #[arg(short, long)]
    pub watch: bool,

    /// Output format
    #[arg(long, default_value = "human")]
    pub output: OutputFormat,

    /// Show timing information
    #[arg(long)]
    pub timings: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Compile without writing any files
    #[arg(long)]
    pub check: bool,

    /// Ignore patterns (glob)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Autofilter mode for templates that do not set one
    #[arg(long, value_parser = parse_autofilter)]
    pub autofilter: Option<AutofilterMode>,
}

/// Output format for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Rendered diagnostics with source excerpts
    #[default]
    Human,
    /// One JSON object per line
    Json,
    /// `file:line: code: message` lines
    Machine,
}

fn parse_autofilter(value: &str) -> Result<AutofilterMode, String> {
    AutofilterMode::parse(value).ok_or_else(|| format!("expected on, off or auto, got \"{}\"", value))
}
