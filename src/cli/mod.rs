//! CLI entry point for Erudite.

pub mod commands;
pub mod keys;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::ModelSelector;
use crate::prompts::{Language, TemplateType};
use crate::types::TimeRange;

/// Erudite research-notes CLI
#[derive(Parser, Debug)]
#[command(
    name = "erudite",
    version,
    about = "Erudite: structured research notes from academic papers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate one note per paper
    Note(NoteArgs),
    /// Write one literature review across papers or existing notes
    Synthesize(SynthesizeArgs),
    /// Search for papers
    Search(SearchArgs),
    /// Ask one question about a note file
    Chat(ChatArgs),
    /// Manage saved provider API keys
    Keys(KeysArgs),
    /// Run the HTTP relay
    #[cfg(feature = "relay")]
    Serve(ServeArgs),
}

/// Model and prompt options shared by every generating command.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerationArgs {
    /// Model selector (format: provider/model, e.g. gemini/gemini-2.5-flash)
    #[arg(short, long)]
    pub model: Option<ModelSelector>,

    /// Temperature
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Max output tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Output language (en, zh, de)
    #[arg(short, long)]
    pub language: Option<Language>,

    /// Note template (auto, A-F)
    #[arg(long)]
    pub template: Option<TemplateType>,

    /// Generate through a relay instead of calling providers directly
    #[arg(long, value_name = "URL")]
    pub relay: Option<String>,
}

/// Where papers come from.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// PDF files
    pub files: Vec<PathBuf>,

    /// Plain-text files, each treated as one pasted paper
    #[arg(long = "paste", value_name = "FILE")]
    pub pasted: Vec<PathBuf>,

    /// Search results written by `erudite search --json`
    #[arg(long, value_name = "JSON")]
    pub from_search: Option<PathBuf>,
}

/// Arguments for `erudite note`.
#[derive(Args, Debug)]
pub struct NoteArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub generation: GenerationArgs,

    /// Papers processed at the same time
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Directory the notes are written to
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Bundle the notes into one ZIP archive
    #[arg(long)]
    pub zip: bool,
}

/// Arguments for `erudite synthesize`.
#[derive(Args, Debug)]
pub struct SynthesizeArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub generation: GenerationArgs,

    /// Existing note files to merge instead of papers
    #[arg(long = "notes", value_name = "FILE", conflicts_with_all = ["files", "pasted", "from_search"])]
    pub notes: Vec<PathBuf>,

    /// Directory the review is written to
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,
}

/// Arguments for `erudite search`.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Number of papers to request
    #[arg(short = 'n', long)]
    pub count: Option<u32>,

    /// How far back to search (all, month, year, 3year)
    #[arg(long)]
    pub range: Option<TimeRange>,

    /// Source to prioritise (repeatable)
    #[arg(long = "source", value_name = "NAME")]
    pub sources: Vec<String>,

    /// Write the raw results as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Write the results as CSV
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Search through a relay
    #[arg(long, value_name = "URL")]
    pub relay: Option<String>,
}

/// Arguments for `erudite chat`.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Note file to discuss
    pub note: PathBuf,

    /// Question about the note
    pub message: String,

    #[command(flatten)]
    pub generation: GenerationArgs,
}

/// Arguments for the `keys` subcommand group.
#[derive(Args, Debug)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommands,
}

/// Key subcommands.
#[derive(Subcommand, Debug)]
pub enum KeysCommands {
    /// Save a key for a provider
    Set(SetKeyArgs),
    /// Show which providers have a key
    List,
    /// Remove a saved key (all keys when no provider is given)
    Clear(ClearKeyArgs),
}

/// Arguments for `erudite keys set`.
#[derive(Args, Debug)]
pub struct SetKeyArgs {
    /// Provider tag (gemini, openai, deepseek, claude, proxy)
    pub provider: String,
    /// API key
    pub key: String,
}

/// Arguments for `erudite keys clear`.
#[derive(Args, Debug)]
pub struct ClearKeyArgs {
    /// Provider tag
    pub provider: Option<String>,
}

/// Arguments for `erudite serve`.
#[cfg(feature = "relay")]
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long)]
    pub bind: Option<String>,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
