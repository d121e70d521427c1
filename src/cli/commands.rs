//! CLI handlers for the generating commands and search.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{ChatArgs, GenerationArgs, NoteArgs, SearchArgs, SourceArgs, SynthesizeArgs};
use crate::config::{EruditeConfig, Settings};
use crate::error::{EruditeError, Result};
use crate::export::{export_notes, search_results_csv};
use crate::generation::{GenerationTransport, Generator};
use crate::prompts::PromptLibrary;
use crate::search::{GeminiSearch, SearchBackend};
use crate::sources::{default_extractor, AbstractSource, FileSource, PastedSource};
use crate::store::FilePreferenceStore;
use crate::types::{next_id, Note, SearchQuery, SearchResult, StepStatus};
use crate::workflow::{
    EventSink, GenerationMode, NoteBook, SharedSource, WorkflowEvent, WorkflowRequest, Workspace,
};

/// Direct-call config: env keys layered over keys saved with `erudite keys set`.
pub fn client_config(settings: &Settings) -> EruditeConfig {
    let config = EruditeConfig::from_env()
        .with_store(Some(Arc::new(FilePreferenceStore::new_default())));
    config.apply_settings(settings);
    config
}

/// Fold command-line overrides into the loaded settings.
pub fn apply_overrides(settings: &mut Settings, args: &GenerationArgs) {
    if let Some(model) = &args.model {
        settings.model = model.clone();
        // The old allowance belonged to the old model.
        settings.max_output_tokens = None;
    }
    if let Some(temperature) = args.temperature {
        settings.temperature = temperature;
    }
    if let Some(max_tokens) = args.max_tokens {
        settings.max_output_tokens = Some(max_tokens);
    }
    if let Some(language) = args.language {
        settings.language = language;
    }
    if let Some(template) = args.template {
        settings.template = template;
    }
}

fn transport(relay: Option<&str>, config: &EruditeConfig) -> Result<Arc<dyn GenerationTransport>> {
    match relay {
        None => Ok(Arc::new(Generator::new(config.clone()))),
        #[cfg(feature = "relay")]
        Some(url) => Ok(Arc::new(crate::relay::RelayTransport::new(url))),
        #[cfg(not(feature = "relay"))]
        Some(_) => Err(EruditeError::Configuration(
            "this build has no relay support; rebuild with the `relay` feature".into(),
        )),
    }
}

fn search_backend(relay: Option<&str>, config: &EruditeConfig) -> Result<Arc<dyn SearchBackend>> {
    match relay {
        None => Ok(Arc::new(GeminiSearch::new(config.clone()))),
        #[cfg(feature = "relay")]
        Some(url) => Ok(Arc::new(crate::relay::RelaySearch::new(url))),
        #[cfg(not(feature = "relay"))]
        Some(_) => Err(EruditeError::Configuration(
            "this build has no relay support; rebuild with the `relay` feature".into(),
        )),
    }
}

/// Prints progress to stderr and, when `stream_notes` is set, note text to stdout.
pub fn terminal_sink(stream_notes: bool) -> EventSink {
    Arc::new(move |event: WorkflowEvent| match event {
        WorkflowEvent::StepChanged { step } => match step.status {
            StepStatus::InProgress => eprintln!("⏳ {}", step.label),
            StepStatus::Completed => eprintln!("✅ {}", step.label),
            StepStatus::Error => eprintln!("❌ {}", step.label),
            StepStatus::Pending => {}
        },
        WorkflowEvent::NoteFragment { fragment, .. } if stream_notes => {
            print!("{fragment}");
            let _ = std::io::stdout().flush();
        }
        // Earlier output can't be erased, so the new text goes on a fresh line.
        WorkflowEvent::NoteReplaced { content, .. } if stream_notes && !content.is_empty() => {
            println!();
            print!("{content}");
            let _ = std::io::stdout().flush();
        }
        WorkflowEvent::ChatFragment { fragment, .. } => {
            print!("{fragment}");
            let _ = std::io::stdout().flush();
        }
        _ => {}
    })
}

fn workspace(transport: Arc<dyn GenerationTransport>, sink: EventSink) -> Workspace {
    let prompts = match PromptLibrary::from_store(&FilePreferenceStore::new_default()) {
        Ok(prompts) => prompts,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring unreadable custom templates");
            PromptLibrary::new()
        }
    };
    Workspace::new(transport)
        .with_prompts(prompts)
        .with_event_sink(sink)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Build sources from PDF paths, pasted text files, and saved search results.
pub fn collect_sources(args: &SourceArgs) -> Result<Vec<SharedSource>> {
    let mut sources: Vec<SharedSource> = Vec::new();

    if !args.files.is_empty() {
        let extractor = default_extractor();
        for path in &args.files {
            sources.push(Arc::new(FileSource::open(path, extractor.clone())?));
        }
    }

    let mut pasted = Vec::with_capacity(args.pasted.len());
    for path in &args.pasted {
        pasted.push((next_id(), file_stem(path), std::fs::read_to_string(path)?));
    }
    sources.extend(
        PastedSource::collect(pasted.iter().map(|(id, name, text)| (*id, name.as_str(), text.as_str())))
            .into_iter()
            .map(|s| Arc::new(s) as SharedSource),
    );

    if let Some(path) = &args.from_search {
        let result: SearchResult = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        sources.extend(
            AbstractSource::from_results(&result.papers)
                .into_iter()
                .map(|s| Arc::new(s) as SharedSource),
        );
    }

    Ok(sources)
}

/// Read note files as finished notes named after the file.
pub fn load_note_files(paths: &[PathBuf]) -> Result<Vec<Note>> {
    paths
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)?;
            let name = file_stem(path);
            Ok(Note {
                source_name: Some(name.clone()),
                ..Note::finished(name, content)
            })
        })
        .collect()
}

/// Write each note as markdown, or all of them as one ZIP.
fn write_notes(notes: &[Note], out: &Path, zip: bool) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out)?;
    if zip {
        return Ok(vec![export_notes(notes)?.write_to(out)?]);
    }
    notes
        .iter()
        .filter(|n| !n.content.trim().is_empty())
        .map(|note| export_notes(std::slice::from_ref(note))?.write_to(out))
        .collect()
}

fn report_written(paths: &[PathBuf]) {
    for path in paths {
        eprintln!("📝 {}", path.display());
    }
}

/// Keep what was written before a failure, then surface the failure.
fn finish_run(outcome: Result<()>, notes: &[Note], out: &Path, zip: bool) -> Result<()> {
    let written = match write_notes(notes, out, zip) {
        Ok(paths) => paths,
        // A run that produced nothing should report its own error instead.
        Err(EruditeError::Workflow(_)) if outcome.is_err() => Vec::new(),
        Err(err) => return Err(err),
    };
    report_written(&written);
    outcome
}

/// Handle `erudite note`.
pub async fn handle_note(args: NoteArgs, cancel: CancellationToken) -> Result<()> {
    let mut settings = Settings::load()?;
    apply_overrides(&mut settings, &args.generation);
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }
    let config = client_config(&settings);

    let sources = collect_sources(&args.sources)?;
    let transport = transport(args.generation.relay.as_deref(), &config)?;
    let workspace = workspace(transport, terminal_sink(sources.len() == 1));
    let request = WorkflowRequest::from_settings(&settings, cancel);

    info!(sources = sources.len(), model = %request.model, "generating notes");
    let outcome = workspace.analyze(sources, &request).await;
    println!();
    finish_run(outcome, &workspace.notes().snapshot(), &args.out, args.zip)
}

/// Handle `erudite synthesize`.
pub async fn handle_synthesize(args: SynthesizeArgs, cancel: CancellationToken) -> Result<()> {
    let mut settings = Settings::load()?;
    apply_overrides(&mut settings, &args.generation);
    let config = client_config(&settings);

    let transport = transport(args.generation.relay.as_deref(), &config)?;
    let request =
        WorkflowRequest::from_settings(&settings, cancel).with_mode(GenerationMode::Synthesis);

    let workspace = if args.notes.is_empty() {
        workspace(transport, terminal_sink(true))
    } else {
        let notes = NoteBook::from_notes(load_note_files(&args.notes)?);
        workspace(transport, terminal_sink(true)).with_notes(notes)
    };

    let outcome = if args.notes.is_empty() {
        let sources = collect_sources(&args.sources)?;
        info!(sources = sources.len(), model = %request.model, "synthesizing papers");
        workspace.analyze(sources, &request).await
    } else {
        info!(notes = args.notes.len(), model = %request.model, "synthesizing notes");
        workspace.synthesize_notes(&request).await
    };
    println!();

    // On a failed meta-synthesis the input notes come back; don't rewrite them.
    let notes: Vec<Note> = workspace
        .notes()
        .snapshot()
        .into_iter()
        .filter(Note::is_synthesis)
        .collect();
    finish_run(outcome, &notes, &args.out, false)
}

/// Handle `erudite chat`.
pub async fn handle_chat(args: ChatArgs, cancel: CancellationToken) -> Result<()> {
    let mut settings = Settings::load()?;
    apply_overrides(&mut settings, &args.generation);
    let config = client_config(&settings);

    let note = load_note_files(std::slice::from_ref(&args.note))?
        .pop()
        .ok_or_else(|| EruditeError::NotFound(args.note.display().to_string()))?;
    let note_id = note.id;

    let transport = transport(args.generation.relay.as_deref(), &config)?;
    let workspace =
        workspace(transport, terminal_sink(false)).with_notes(NoteBook::from_notes(vec![note]));
    let request = WorkflowRequest::from_settings(&settings, cancel);

    let outcome = workspace.send_chat_message(note_id, args.message, &request).await;
    println!();
    if outcome.is_ok() {
        return Ok(());
    }
    // A failed turn is recorded as an `Error: ...` reply; show it.
    if let Some(reply) = workspace
        .notes()
        .get(note_id)
        .and_then(|n| n.chat_history.last().cloned())
    {
        if reply.text.starts_with("Error:") {
            eprintln!("{}", reply.text);
        }
    }
    outcome
}

/// Handle `erudite search`.
pub async fn handle_search(args: SearchArgs, cancel: CancellationToken) -> Result<()> {
    let settings = Settings::load()?;
    let config = client_config(&settings);

    let query = SearchQuery {
        query: args.query,
        count: args.count.unwrap_or(settings.search.count),
        time_range: args.range.unwrap_or(settings.search.time_range),
        sources: if args.sources.is_empty() {
            settings.search.sources.clone()
        } else {
            args.sources
        },
    };

    let backend = search_backend(args.relay.as_deref(), &config)?;
    let workspace = workspace(Arc::new(Generator::new(config)), terminal_sink(false))
        .with_search(backend);
    let request = WorkflowRequest::from_settings(&settings, cancel);

    let result = workspace.search(&query, &request).await?;
    print_results(&result);

    if let Some(path) = &args.json {
        std::fs::write(path, serde_json::to_string_pretty(&result)?)?;
        eprintln!("📝 {}", path.display());
    }
    if let Some(path) = &args.csv {
        std::fs::write(path, search_results_csv(&result.papers))?;
        eprintln!("📝 {}", path.display());
    }
    Ok(())
}

fn print_results(result: &SearchResult) {
    for (i, paper) in result.papers.iter().enumerate() {
        println!("{:>2}. {} ({})", i + 1, paper.title, paper.year);
        println!("    {} | {}", paper.authors.join(", "), paper.journal);
        if let Some(url) = &paper.url {
            println!("    {url}");
        }
    }
    if !result.sources.is_empty() {
        println!("\nSources:");
        for source in &result.sources {
            println!("  - {} <{}>", source.title, source.uri);
        }
    }
}

/// Handle `erudite serve`.
#[cfg(feature = "relay")]
pub async fn handle_serve(args: super::ServeArgs, cancel: CancellationToken) -> Result<()> {
    let settings = Settings::load()?;
    let config = EruditeConfig::from_env();
    config.apply_settings(&settings);
    let bind = args.bind.unwrap_or(settings.relay.bind);
    crate::relay::serve(&bind, crate::relay::RelayState::new(config), cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelSelector;
    use crate::prompts::{Language, TemplateType};

    #[test]
    fn overrides_replace_settings_and_reset_the_token_allowance() {
        let mut settings = Settings {
            max_output_tokens: Some(1000),
            ..Settings::default()
        };
        let args = GenerationArgs {
            model: Some(ModelSelector::parse("gemini/gemini-2.5-flash").unwrap()),
            temperature: Some(0.1),
            language: Some(Language::Zh),
            template: Some(TemplateType::B),
            ..GenerationArgs::default()
        };
        apply_overrides(&mut settings, &args);

        assert_eq!(settings.model.to_string(), "gemini/gemini-2.5-flash");
        assert_eq!(settings.max_output_tokens, None);
        assert_eq!(settings.sampling().max_output_tokens, Some(8192));
        assert_eq!(settings.temperature, 0.1);
        assert_eq!(settings.language, Language::Zh);
        assert_eq!(settings.template, TemplateType::B);
    }

    #[test]
    fn collects_pasted_and_search_sources() {
        let dir = tempfile::tempdir().unwrap();
        let pasted = dir.path().join("draft-paper.txt");
        std::fs::write(&pasted, "Some pasted text").unwrap();
        let blank = dir.path().join("blank.txt");
        std::fs::write(&blank, "   ").unwrap();
        let results = dir.path().join("results.json");
        std::fs::write(
            &results,
            r#"{"papers":[{"title":"T","authors":["A"],"journal":"J","year":2024,"abstract":"Abs"}],"sources":[]}"#,
        )
        .unwrap();

        let sources = collect_sources(&SourceArgs {
            files: Vec::new(),
            pasted: vec![pasted, blank],
            from_search: Some(results),
        })
        .unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name(), "draft-paper");
        assert!(!sources[0].is_abstract());
        assert_eq!(sources[1].name(), "T");
        assert!(sources[1].is_abstract());
    }

    #[test]
    fn note_files_load_as_finished_named_notes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-attention.md");
        std::fs::write(&path, "# Attention").unwrap();

        let notes = load_note_files(&[path]).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].display_name(), "2024-attention");
        assert_eq!(notes[0].content, "# Attention");
        assert!(!notes[0].is_generating);
    }

    #[test]
    fn write_notes_skips_blank_notes() {
        let dir = tempfile::tempdir().unwrap();
        let notes = vec![
            Note::finished("a", "# Title A\n\nbody"),
            Note::finished("b", "   "),
        ];
        let written = write_notes(&notes, dir.path(), false).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].exists());
    }

    #[test]
    fn failed_run_with_no_notes_reports_its_own_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = finish_run(Err(EruditeError::Aborted), &[], dir.path(), true).unwrap_err();
        assert!(matches!(err, EruditeError::Aborted));
    }
}
