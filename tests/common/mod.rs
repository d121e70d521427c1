//! Shared test helpers: a scripted transport, in-memory sources, and SSE bodies.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;

use erudite::error::{EruditeError, Result};
use erudite::generation::{guard_cancellation, FragmentStream, GenerationTransport};
use erudite::sources::PaperSource;
use erudite::types::{GenerationRequest, Note};
use erudite::workflow::{EventSink, SharedSource, WorkflowEvent, WorkflowRequest};

/// What the scripted transport does for one request.
pub enum Reply {
    Fragments(Vec<String>),
    FailBeforeStream(EruditeError),
    FailMidStream(Vec<String>, EruditeError),
    /// Yields the fragments, then waits until cancelled.
    Stall(Vec<String>),
}

impl Reply {
    pub fn text(parts: &[&str]) -> Self {
        Self::Fragments(parts.iter().map(|p| p.to_string()).collect())
    }
}

type Responder = Box<dyn Fn(&GenerationRequest) -> Reply + Send + Sync>;

/// A transport that answers from a closure and records every request.
pub struct ScriptedTransport {
    responder: Responder,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedTransport {
    pub fn new(responder: impl Fn(&GenerationRequest) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always answers with the same fragments.
    pub fn always(parts: &'static [&'static str]) -> Arc<Self> {
        Self::new(move |_| Reply::text(parts))
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationTransport for ScriptedTransport {
    async fn generate_stream(&self, request: GenerationRequest) -> Result<FragmentStream> {
        self.requests.lock().unwrap().push(request.clone());
        if request.cancel.is_cancelled() {
            return Err(EruditeError::Aborted);
        }
        let items = |parts: Vec<String>| stream::iter(parts.into_iter().map(Ok::<_, EruditeError>));
        let inner: FragmentStream = match (self.responder)(&request) {
            Reply::Fragments(parts) => Box::pin(items(parts)),
            Reply::FailBeforeStream(err) => return Err(err),
            Reply::FailMidStream(parts, err) => {
                Box::pin(futures::StreamExt::chain(items(parts), stream::once(async { Err(err) })))
            }
            Reply::Stall(parts) => {
                Box::pin(futures::StreamExt::chain(items(parts), stream::pending()))
            }
        };
        Ok(guard_cancellation(inner, request.cancel.clone()))
    }
}

/// An in-memory paper; `content: None` fails extraction.
pub struct TestSource {
    pub key: String,
    pub name: String,
    pub content: Option<String>,
    pub is_abstract: bool,
}

impl TestSource {
    pub fn text(name: &str, content: &str) -> SharedSource {
        Arc::new(Self {
            key: format!("{name}-key"),
            name: name.to_string(),
            content: Some(content.to_string()),
            is_abstract: false,
        })
    }

    pub fn abstract_only(name: &str, content: &str) -> SharedSource {
        Arc::new(Self {
            key: format!("{name}-key"),
            name: name.to_string(),
            content: Some(content.to_string()),
            is_abstract: true,
        })
    }

    pub fn unreadable(name: &str) -> SharedSource {
        Arc::new(Self {
            key: format!("{name}-key"),
            name: name.to_string(),
            content: None,
            is_abstract: false,
        })
    }
}

#[async_trait]
impl PaperSource for TestSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    async fn get_content(&self) -> Result<String> {
        self.content
            .clone()
            .ok_or_else(|| EruditeError::extraction(&self.name, "file is encrypted"))
    }
}

/// Collects every emitted workflow event.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl EventLog {
    pub fn sink(&self) -> EventSink {
        let events = Arc::clone(&self.events);
        Arc::new(move |event| events.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Note contents as an observer rebuilds them from the events alone.
    pub fn replay_notes(&self) -> BTreeMap<i64, String> {
        let mut notes = BTreeMap::new();
        for event in self.events() {
            match event {
                WorkflowEvent::NoteCreated { note_id, .. } | WorkflowEvent::NoteReset { note_id } => {
                    notes.insert(note_id, String::new());
                }
                WorkflowEvent::NoteFragment { note_id, fragment } => {
                    notes.entry(note_id).or_default().push_str(&fragment);
                }
                WorkflowEvent::NoteReplaced { note_id, content } => {
                    notes.insert(note_id, content);
                }
                WorkflowEvent::NoteRemoved { note_id } => {
                    notes.remove(&note_id);
                }
                WorkflowEvent::NotesCleared => notes.clear(),
                _ => {}
            }
        }
        notes
    }
}

/// Note contents by id, in the shape `EventLog::replay_notes` returns.
pub fn note_contents(notes: &[Note]) -> BTreeMap<i64, String> {
    notes.iter().map(|n| (n.id, n.content.clone())).collect()
}

pub fn request() -> WorkflowRequest {
    WorkflowRequest::builder()
        .model("gemini/gemini-2.5-flash".parse().unwrap())
        .build()
}

/// An SSE body: one `data:` line per payload, then `[DONE]`.
pub fn sse_body(payloads: &[Value]) -> String {
    let mut body: String = payloads
        .iter()
        .map(|p| format!("data: {p}\n\n"))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn chat_chunk(text: &str) -> Value {
    serde_json::json!({"choices": [{"delta": {"content": text}}]})
}

pub fn messages_chunk(text: &str) -> Value {
    serde_json::json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": text}})
}

pub fn gemini_chunk(text: &str) -> Value {
    serde_json::json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
}
