//! Live workflow notifications.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::ProgressStep;

/// A state change a front end may want to render immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A new workflow replaced the whole step list.
    ProgressReset { steps: Vec<ProgressStep> },
    StepChanged { step: ProgressStep },
    NoteCreated { note_id: i64, source_key: String },
    /// The note went back to empty and generating.
    NoteReset { note_id: i64 },
    /// The note's whole content was swapped, e.g. for an inline error.
    NoteReplaced { note_id: i64, content: String },
    /// Text appended to a note's content.
    NoteFragment { note_id: i64, fragment: String },
    NoteFinished { note_id: i64 },
    NoteRemoved { note_id: i64 },
    NotesCleared,
    ChatFragment {
        note_id: i64,
        message_id: i64,
        fragment: String,
    },
    ChatFinished { note_id: i64 },
}

/// Callback receiving workflow events. Called from whichever task made the change.
pub type EventSink = Arc<dyn Fn(WorkflowEvent) + Send + Sync>;

/// A sink that drops every event.
pub fn noop_sink() -> EventSink {
    Arc::new(|_| {})
}
