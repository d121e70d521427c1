//! Note, synthesis, chat and search workflows.
//!
//! A [`Workspace`] owns the note collection and progress list and drives
//! every workflow through an injected [`GenerationTransport`]. Each
//! invocation receives one immutable [`WorkflowRequest`]; nothing is re-read
//! from settings while a workflow is in flight.
//!
//! [`GenerationTransport`]: crate::generation::GenerationTransport

mod chat;
pub mod events;
pub mod notebook;
pub mod progress;
mod workspace;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::models::ModelSelector;
use crate::prompts::{Language, TemplateType};
use crate::types::{ChatMessage, GenerationRequest, SamplingConfig};

pub use events::{noop_sink, EventSink, WorkflowEvent};
pub use notebook::NoteBook;
pub use progress::{labels, ProgressTracker, STOPPED_SUFFIX};
pub use workspace::{SharedSource, Workspace};

pub const NO_INPUT: &str =
    "Please provide at least one paper, either by uploading a PDF or pasting text.";
pub const ALL_PAPERS_ANALYZED: &str =
    "All provided papers have already been analyzed. Add new papers to continue.";
pub const PDF_TEXT_EMPTY: &str =
    "Extracted text is empty. The PDF might be image-based or protected.";
pub const SOURCE_NOT_FOUND_FOR_NOTE: &str =
    "Could not find the original source for this note to regenerate it.";
pub const NOT_ENOUGH_NOTES: &str = "At least two notes are needed to synthesize.";
pub const NO_SOURCES_SELECTED: &str = "Please select at least one search source.";
pub const NO_SEARCH_RESULTS: &str = "No papers were found for this topic. Try a different query.";
pub const GENERIC_ERROR: &str = "An error occurred:";

/// Default bound on concurrently processed sources.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Inline note text for a source that could not be read.
pub fn paper_error_text(name: &str, message: &str) -> String {
    format!("\n**Error processing paper {name}:** {message}\n")
}

/// Inline note text for a failed regenerate.
pub fn generic_error_text(message: &str) -> String {
    format!("\n**{GENERIC_ERROR}** {message}\n")
}

/// How `analyze` treats its sources.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationMode {
    /// One note per source.
    #[default]
    DeepRead,
    /// One review across all sources.
    Synthesis,
}

/// Everything a workflow invocation needs, fixed at the start.
#[derive(Debug, Clone, Builder)]
pub struct WorkflowRequest {
    pub model: ModelSelector,
    #[builder(default)]
    pub sampling: SamplingConfig,
    #[builder(default)]
    pub language: Language,
    #[builder(default)]
    pub template: TemplateType,
    #[builder(default)]
    pub mode: GenerationMode,
    #[builder(default = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
    #[builder(default)]
    pub cancel: CancellationToken,
}

impl WorkflowRequest {
    /// Snapshot `settings` into a request bound to `cancel`.
    pub fn from_settings(settings: &Settings, cancel: CancellationToken) -> Self {
        Self {
            model: settings.model.clone(),
            sampling: settings.sampling(),
            language: settings.language,
            template: settings.template,
            mode: GenerationMode::default(),
            concurrency: settings.concurrency,
            cancel,
        }
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    /// A generation call sharing this request's model, sampling and token.
    pub(crate) fn generation(
        &self,
        prompt: String,
        system_instruction: String,
        history: Vec<ChatMessage>,
    ) -> GenerationRequest {
        GenerationRequest::builder()
            .model(self.model.clone())
            .prompt(prompt)
            .system_instruction(system_instruction)
            .history(history)
            .sampling(self.sampling)
            .cancel(self.cancel.clone())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_snapshots_settings() {
        let mut settings = Settings::default();
        settings.concurrency = 2;
        settings.template = TemplateType::E;
        let request = WorkflowRequest::from_settings(&settings, CancellationToken::new())
            .with_mode(GenerationMode::Synthesis);
        settings.concurrency = 9;

        assert_eq!(request.concurrency, 2);
        assert_eq!(request.template, TemplateType::E);
        assert_eq!(request.mode, GenerationMode::Synthesis);
        assert_eq!(request.sampling.max_output_tokens, Some(65536));
    }

    #[test]
    fn builder_defaults() {
        let request = WorkflowRequest::builder()
            .model("openai/gpt-4o".parse().unwrap())
            .build();
        assert_eq!(request.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(request.mode, GenerationMode::DeepRead);
        assert_eq!(request.language, Language::En);
    }

    #[test]
    fn error_texts() {
        assert_eq!(
            paper_error_text("a.pdf", "boom"),
            "\n**Error processing paper a.pdf:** boom\n"
        );
        assert_eq!(generic_error_text("boom"), "\n**An error occurred:** boom\n");
        assert_eq!("deep_read".parse::<GenerationMode>().unwrap(), GenerationMode::DeepRead);
    }
}
