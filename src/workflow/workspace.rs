//! The workspace and its note workflows.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::events::{noop_sink, EventSink, WorkflowEvent};
use super::notebook::NoteBook;
use super::progress::{labels, ProgressTracker, STOPPED_SUFFIX};
use super::{
    generic_error_text, paper_error_text, GenerationMode, WorkflowRequest, ALL_PAPERS_ANALYZED,
    NOT_ENOUGH_NOTES, NO_INPUT, NO_SEARCH_RESULTS, NO_SOURCES_SELECTED, PDF_TEXT_EMPTY,
    SOURCE_NOT_FOUND_FOR_NOTE,
};
use crate::error::{EruditeError, Result};
use crate::export::{clean_markdown, split_front_matter};
use crate::generation::GenerationTransport;
use crate::prompts::{individual_prompt, synthesis_prompt, PromptLibrary, SynthesisKind};
use crate::search::SearchBackend;
use crate::sources::PaperSource;
use crate::types::{
    GenerationRequest, Note, ProgressStep, SearchQuery, SearchResult, StepStatus,
    SYNTHESIS_FROM_NOTES_KEY, SYNTHESIS_REVIEW_KEY,
};

/// A paper source shared between the caller and running workflows.
pub type SharedSource = Arc<dyn PaperSource>;

/// Owns notes and progress and runs workflows over an injected transport.
#[derive(Clone)]
pub struct Workspace {
    transport: Arc<dyn GenerationTransport>,
    search: Option<Arc<dyn SearchBackend>>,
    prompts: PromptLibrary,
    notes: NoteBook,
    progress: ProgressTracker,
    events: EventSink,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("notes", &self.notes.len())
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    pub fn new(transport: Arc<dyn GenerationTransport>) -> Self {
        let events = noop_sink();
        Self {
            transport,
            search: None,
            prompts: PromptLibrary::new(),
            notes: NoteBook::new(),
            progress: ProgressTracker::new(Arc::clone(&events)),
            events,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchBackend>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_notes(mut self, notes: NoteBook) -> Self {
        self.notes = notes;
        self
    }

    /// Route events to `sink`. Replaces the progress tracker.
    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.progress = ProgressTracker::new(Arc::clone(&sink));
        self.events = sink;
        self
    }

    pub fn notes(&self) -> &NoteBook {
        &self.notes
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    pub fn prompts_mut(&mut self) -> &mut PromptLibrary {
        &mut self.prompts
    }

    pub(super) fn emit(&self, event: WorkflowEvent) {
        (self.events)(event);
    }

    /// Apply the workflow-level failure policy to a finished workflow.
    fn settle<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Err(err) if err.is_cancellation() => {
                info!("workflow stopped");
                self.progress.mark_in_progress_as_stopped(STOPPED_SUFFIX);
            }
            Err(err) => {
                error!(error = %err, "workflow failed");
                self.progress.mark_in_progress_as_error();
            }
            Ok(_) => {}
        }
        result
    }

    /// Stream one generation, feeding each fragment to `on_fragment`.
    ///
    /// Returns the full text. Cancellation is re-checked after every fragment.
    pub(super) async fn stream_text(
        &self,
        request: GenerationRequest,
        mut on_fragment: impl FnMut(&str),
    ) -> Result<String> {
        let cancel = request.cancel.clone();
        let mut stream = self.transport.generate_stream(request).await?;
        let mut full = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            if cancel.is_cancelled() {
                return Err(EruditeError::Aborted);
            }
            full.push_str(&fragment);
            on_fragment(&fragment);
        }
        Ok(full)
    }

    fn append_to_note(&self, note_id: i64, fragment: &str) {
        self.notes.update(note_id, |n| n.content.push_str(fragment));
        self.emit(WorkflowEvent::NoteFragment {
            note_id,
            fragment: fragment.to_string(),
        });
    }

    /// Swap a note's whole content, keeping observers in step.
    fn replace_note_content(&self, note_id: i64, content: String) {
        self.notes.update(note_id, |n| n.content = content.clone());
        self.emit(WorkflowEvent::NoteReplaced { note_id, content });
    }

    fn finish_note(&self, note_id: i64) {
        self.notes.update(note_id, |n| n.is_generating = false);
        self.emit(WorkflowEvent::NoteFinished { note_id });
    }

    fn add_placeholder(&self, source_key: &str, source_name: Option<String>) -> i64 {
        let note = Note::placeholder(source_key, source_name);
        let note_id = note.id;
        self.notes.push(note);
        self.emit(WorkflowEvent::NoteCreated {
            note_id,
            source_key: source_key.to_string(),
        });
        note_id
    }

    fn clear_notes(&self) {
        self.notes.clear();
        self.emit(WorkflowEvent::NotesCleared);
    }

    /// Read a source, treating blank text as an extraction failure.
    async fn read_source(source: &dyn PaperSource) -> Result<String> {
        let text = source.get_content().await?;
        if text.trim().is_empty() {
            return Err(EruditeError::Workflow(PDF_TEXT_EMPTY.into()));
        }
        Ok(text)
    }

    /// Unified entry point.
    ///
    /// Deep-read skips sources that already have a note; synthesis starts
    /// from an empty note set.
    pub async fn analyze(&self, sources: Vec<SharedSource>, request: &WorkflowRequest) -> Result<()> {
        if sources.is_empty() {
            return Err(EruditeError::Workflow(NO_INPUT.into()));
        }
        match request.mode {
            GenerationMode::DeepRead => {
                let existing = self.notes.source_keys();
                let fresh: Vec<SharedSource> = sources
                    .into_iter()
                    .filter(|s| !existing.contains(s.key()))
                    .collect();
                if fresh.is_empty() {
                    return Err(EruditeError::Workflow(ALL_PAPERS_ANALYZED.into()));
                }
                self.generate_notes(fresh, request).await
            }
            GenerationMode::Synthesis => {
                self.clear_notes();
                self.synthesize_papers(sources, request).await
            }
        }
    }

    /// One note per source, processed concurrently up to `request.concurrency`.
    ///
    /// A failing source only fails its own note and steps. Cancellation stops
    /// every source through the shared token and fails the workflow.
    pub async fn generate_notes(&self, sources: Vec<SharedSource>, request: &WorkflowRequest) -> Result<()> {
        let result = self.generate_notes_inner(sources, request).await;
        self.settle(result)
    }

    async fn generate_notes_inner(&self, sources: Vec<SharedSource>, request: &WorkflowRequest) -> Result<()> {
        let count = sources.len();
        info!(sources = count, model = %request.model, "generating notes");

        let mut steps = vec![ProgressStep::new(1, labels::preparing_analysis(), StepStatus::InProgress)];
        for (i, source) in sources.iter().enumerate() {
            let (parse_step, generate_step) = note_step_ids(i);
            steps.push(ProgressStep::pending(parse_step, labels::parsing(source.name())));
            steps.push(ProgressStep::pending(generate_step, labels::generating(source.name())));
        }
        let finalizing = 2 * count as u32 + 2;
        steps.push(ProgressStep::pending(finalizing, labels::finalizing()));
        self.progress.reset(steps);
        self.progress.set_status(1, StepStatus::Completed);

        let note_ids: Vec<i64> = sources
            .iter()
            .map(|s| self.add_placeholder(s.key(), Some(s.name().to_string())))
            .collect();

        let system = self.prompts.system_instruction(request.template, request.language);
        let system = system.as_str();

        let mut outcomes = futures::stream::iter(sources.iter().zip(note_ids).enumerate())
            .map(|(i, (source, note_id))| self.process_source(i, source.as_ref(), note_id, system, request))
            .buffer_unordered(request.concurrency.max(1));

        let mut aborted = false;
        while let Some(outcome) = outcomes.next().await {
            if let Err(err) = outcome {
                debug!(error = %err, "source stopped");
                aborted = true;
            }
        }
        if aborted {
            return Err(EruditeError::Aborted);
        }

        self.progress.set_status(finalizing, StepStatus::Completed);
        info!(sources = count, "notes finished");
        Ok(())
    }

    /// Run one fan-out source. Only cancellation is returned as an error.
    async fn process_source(
        &self,
        index: usize,
        source: &dyn PaperSource,
        note_id: i64,
        system: &str,
        request: &WorkflowRequest,
    ) -> Result<()> {
        let (parse_step, generate_step) = note_step_ids(index);
        let outcome = self
            .run_source(source, note_id, system, request, parse_step, generate_step)
            .await;

        let result = match outcome {
            Ok(()) => Ok(()),
            Err(err) if err.is_cancellation() => Err(err),
            Err(err) => {
                error!(source = source.name(), error = %err, "source failed");
                let message = match &err {
                    EruditeError::ContentExtraction { source_name, message } => {
                        paper_error_text(source_name, message)
                    }
                    other => other.to_string(),
                };
                self.replace_note_content(note_id, message);
                self.progress.set_status(generate_step, StepStatus::Error);
                if self.progress.status(parse_step) != Some(StepStatus::Completed) {
                    self.progress.set_status(parse_step, StepStatus::Error);
                }
                Ok(())
            }
        };
        self.finish_note(note_id);
        result
    }

    async fn run_source(
        &self,
        source: &dyn PaperSource,
        note_id: i64,
        system: &str,
        request: &WorkflowRequest,
        parse_step: u32,
        generate_step: u32,
    ) -> Result<()> {
        if request.cancel.is_cancelled() {
            return Err(EruditeError::Aborted);
        }
        self.progress.set_status(parse_step, StepStatus::InProgress);
        let text = match Self::read_source(source).await {
            Ok(text) => {
                self.progress.set_status(parse_step, StepStatus::Completed);
                text
            }
            Err(err) => {
                self.progress.set_status(parse_step, StepStatus::Error);
                return Err(EruditeError::extraction(source.name(), extraction_message(err)));
            }
        };

        if request.cancel.is_cancelled() {
            return Err(EruditeError::Aborted);
        }
        self.progress.set_status(generate_step, StepStatus::InProgress);
        let generation = request.generation(
            individual_prompt(&text, request.template),
            system.to_string(),
            Vec::new(),
        );
        self.stream_text(generation, |fragment| self.append_to_note(note_id, fragment))
            .await?;
        self.progress.set_status(generate_step, StepStatus::Completed);
        Ok(())
    }

    /// One review over every source.
    ///
    /// Sources are read one after another into a banner-delimited text. A
    /// source that cannot be read is reported inline and skipped.
    pub async fn synthesize_papers(&self, sources: Vec<SharedSource>, request: &WorkflowRequest) -> Result<()> {
        let result = self.synthesize_papers_inner(sources, request).await;
        self.settle(result)
    }

    async fn synthesize_papers_inner(&self, sources: Vec<SharedSource>, request: &WorkflowRequest) -> Result<()> {
        let count = sources.len();
        let abstract_only = sources.iter().all(|s| s.is_abstract());
        info!(sources = count, abstract_only, model = %request.model, "synthesizing papers");

        let synthesizing = count as u32 + 2;
        let finalizing = count as u32 + 3;
        let mut steps = vec![ProgressStep::new(1, labels::preparing_analysis(), StepStatus::InProgress)];
        steps.extend(
            sources
                .iter()
                .enumerate()
                .map(|(i, s)| ProgressStep::pending(i as u32 + 2, labels::parsing(s.name()))),
        );
        steps.push(ProgressStep::pending(synthesizing, labels::synthesizing(count)));
        steps.push(ProgressStep::pending(finalizing, labels::finalizing()));
        self.progress.reset(steps);
        self.progress.set_status(1, StepStatus::Completed);

        self.clear_notes();
        let note_id = self.add_placeholder(SYNTHESIS_REVIEW_KEY, None);

        let mut combined = String::new();
        for (i, source) in sources.iter().enumerate() {
            let step = i as u32 + 2;
            self.progress.set_status(step, StepStatus::InProgress);
            if request.cancel.is_cancelled() {
                return Err(self.stop_note(note_id));
            }
            match Self::read_source(source.as_ref()).await {
                Ok(text) => {
                    let name = source.name();
                    combined.push_str(&format!(
                        "--- START OF PAPER: {name} ---\n\n{text}\n\n--- END OF PAPER: {name} ---\n\n"
                    ));
                    self.progress.set_status(step, StepStatus::Completed);
                }
                Err(err) => {
                    error!(source = source.name(), error = %err, "source failed");
                    self.append_to_note(note_id, &paper_error_text(source.name(), &extraction_message(err)));
                    self.progress.set_status(step, StepStatus::Error);
                }
            }
        }

        if request.cancel.is_cancelled() {
            return Err(self.stop_note(note_id));
        }
        self.progress.set_status(synthesizing, StepStatus::InProgress);

        let kind = if abstract_only {
            SynthesisKind::Abstracts
        } else {
            SynthesisKind::FullText
        };
        let generation = request.generation(
            synthesis_prompt(kind, count, &combined),
            self.prompts.synthesis_instruction(kind, request.language),
            Vec::new(),
        );

        self.replace_note_content(note_id, String::new());
        match self
            .stream_text(generation, |fragment| self.append_to_note(note_id, fragment))
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_cancellation() => return Err(self.stop_note(note_id)),
            Err(err) => {
                self.replace_note_content(note_id, generic_error_text(&err.to_string()));
                self.finish_note(note_id);
                return Err(err);
            }
        }

        self.progress.set_status(synthesizing, StepStatus::Completed);
        self.finish_note(note_id);
        self.progress.set_status(finalizing, StepStatus::Completed);
        info!(sources = count, "synthesis finished");
        Ok(())
    }

    /// Leave a note with whatever it has and report cancellation.
    fn stop_note(&self, note_id: i64) -> EruditeError {
        self.finish_note(note_id);
        EruditeError::Aborted
    }

    /// Meta-synthesis over the notes currently in the workspace.
    ///
    /// The note set is replaced by the single synthesis note. If the
    /// synthesis fails or is stopped, the previous notes are restored.
    pub async fn synthesize_notes(&self, request: &WorkflowRequest) -> Result<()> {
        let result = self.synthesize_notes_inner(request).await;
        self.settle(result)
    }

    async fn synthesize_notes_inner(&self, request: &WorkflowRequest) -> Result<()> {
        let previous = self.notes.snapshot();
        let count = previous.len();
        if count < 2 {
            return Err(EruditeError::Workflow(NOT_ENOUGH_NOTES.into()));
        }
        info!(notes = count, model = %request.model, "synthesizing notes");

        self.progress.reset(vec![
            ProgressStep::new(1, labels::preparing_analysis(), StepStatus::InProgress),
            ProgressStep::pending(2, labels::synthesizing(count)),
            ProgressStep::pending(3, labels::finalizing()),
        ]);
        self.progress.set_status(1, StepStatus::Completed);

        let combined = previous
            .iter()
            .map(|note| {
                let body = split_front_matter(&clean_markdown(&note.content)).body;
                format!(
                    "--- START OF NOTE for: {} ---\n\n{body}\n\n--- END OF NOTE ---\n\n",
                    note.display_name()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        self.progress.set_status(2, StepStatus::InProgress);
        self.clear_notes();
        let note_id = self.add_placeholder(SYNTHESIS_FROM_NOTES_KEY, None);

        let generation = request.generation(
            synthesis_prompt(SynthesisKind::Notes, count, &combined),
            self.prompts
                .synthesis_instruction(SynthesisKind::Notes, request.language),
            Vec::new(),
        );
        let outcome = self
            .stream_text(generation, |fragment| self.append_to_note(note_id, fragment))
            .await;

        if let Err(err) = outcome {
            self.notes.remove(note_id);
            self.emit(WorkflowEvent::NoteRemoved { note_id });
            for note in &previous {
                self.emit(WorkflowEvent::NoteCreated {
                    note_id: note.id,
                    source_key: note.source_key.clone(),
                });
                self.emit(WorkflowEvent::NoteReplaced {
                    note_id: note.id,
                    content: note.content.clone(),
                });
            }
            self.notes.extend(previous);
            return Err(err);
        }

        self.progress.set_status(2, StepStatus::Completed);
        self.progress.set_status(3, StepStatus::Completed);
        self.finish_note(note_id);
        Ok(())
    }

    /// Regenerate one note from its original source.
    ///
    /// The note is reset (content and chat cleared) before streaming. When
    /// stopped, the partial content stays; on failure the content becomes an
    /// inline error.
    pub async fn regenerate_note(
        &self,
        note_id: i64,
        sources: &[SharedSource],
        request: &WorkflowRequest,
    ) -> Result<()> {
        let note = self
            .notes
            .get(note_id)
            .ok_or_else(|| EruditeError::NotFound(format!("note {note_id}")))?;
        let source = sources
            .iter()
            .find(|s| s.key() == note.source_key)
            .ok_or_else(|| EruditeError::Workflow(SOURCE_NOT_FOUND_FOR_NOTE.into()))?;
        info!(note_id, source = source.name(), "regenerating note");

        self.notes.update(note_id, Note::reset);
        self.emit(WorkflowEvent::NoteReset { note_id });

        let outcome = async {
            let text = source.get_content().await?;
            let generation = request.generation(
                individual_prompt(&text, request.template),
                self.prompts
                    .system_instruction(request.template, request.language),
                Vec::new(),
            );
            self.stream_text(generation, |fragment| self.append_to_note(note_id, fragment))
                .await
        }
        .await;

        if let Err(err) = &outcome {
            if !err.is_cancellation() {
                error!(note_id, error = %err, "regenerate failed");
                self.replace_note_content(note_id, generic_error_text(&err.to_string()));
            }
        }
        self.finish_note(note_id);
        outcome.map(|_| ())
    }

    pub fn delete_note(&self, note_id: i64) -> Option<Note> {
        let removed = self.notes.remove(note_id);
        if removed.is_some() {
            self.emit(WorkflowEvent::NoteRemoved { note_id });
        }
        removed
    }

    /// Replace a note's content with user edits and leave edit mode.
    pub fn edit_note(&self, note_id: i64, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        self.notes
            .update(note_id, |n| {
                n.content = content.clone();
                n.is_editing = false;
            })
            .ok_or_else(|| EruditeError::NotFound(format!("note {note_id}")))?;
        self.emit(WorkflowEvent::NoteReplaced { note_id, content });
        Ok(())
    }

    /// Flip chat visibility, returning the new state.
    pub fn toggle_chat(&self, note_id: i64) -> Result<bool> {
        self.notes
            .update(note_id, |n| {
                n.is_chat_visible = !n.is_chat_visible;
                n.is_chat_visible
            })
            .ok_or_else(|| EruditeError::NotFound(format!("note {note_id}")))
    }

    /// Literature search. Clears the notes of the previous analysis.
    pub async fn search(&self, query: &SearchQuery, request: &WorkflowRequest) -> Result<SearchResult> {
        if query.query.trim().is_empty() {
            return Err(EruditeError::InvalidArgument("search query is empty".into()));
        }
        if query.sources.is_empty() {
            return Err(EruditeError::Workflow(NO_SOURCES_SELECTED.into()));
        }
        let backend = self
            .search
            .as_ref()
            .ok_or_else(|| EruditeError::Configuration("no search backend configured".into()))?;

        self.clear_notes();
        self.progress.reset(vec![
            ProgressStep::new(1, labels::preparing_search(), StepStatus::Completed),
            ProgressStep::new(2, labels::searching(&query.sources, &query.query), StepStatus::InProgress),
            ProgressStep::pending(3, labels::finalizing()),
        ]);

        let result = self.settle(backend.search(query, &request.cancel).await)?;
        self.progress.set_status(2, StepStatus::Completed);
        if result.papers.is_empty() {
            warn!(query = %query.query, "{}", NO_SEARCH_RESULTS);
        }
        self.progress.set_status(3, StepStatus::Completed);
        Ok(result)
    }
}

/// Reason a source could not be read, without repeating the source name.
fn extraction_message(err: EruditeError) -> String {
    match err {
        EruditeError::ContentExtraction { message, .. } => message,
        other => other.to_string(),
    }
}

/// Parse and generate step ids of the `index`-th fan-out source.
fn note_step_ids(index: usize) -> (u32, u32) {
    let i = index as u32;
    (2 + 2 * i, 3 + 2 * i)
}
