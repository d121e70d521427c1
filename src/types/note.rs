//! Generated notes.

use serde::{Deserialize, Serialize};

use super::{next_id, ChatMessage};

/// Source key of a synthesis note built from papers.
pub const SYNTHESIS_REVIEW_KEY: &str = "synthesis-review";
/// Source key of a meta-synthesis note built from prior notes.
pub const SYNTHESIS_FROM_NOTES_KEY: &str = "synthesis-from-notes";

/// A note generated from one source (or a synthesis of several).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    /// Key of the originating source; used only for lookup.
    pub source_key: String,
    /// Display name of the originating source at creation time.
    #[serde(default)]
    pub source_name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub is_chat_visible: bool,
    #[serde(default)]
    pub is_chat_loading: bool,
    #[serde(default)]
    pub is_editing: bool,
    #[serde(default)]
    pub is_generating: bool,
}

/// Coarse lifecycle state derived from a note's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Generating,
    Finished,
}

impl Note {
    /// A fresh placeholder: empty content, generating.
    pub fn placeholder(source_key: impl Into<String>, source_name: Option<String>) -> Self {
        Self {
            id: next_id(),
            source_key: source_key.into(),
            source_name,
            content: String::new(),
            chat_history: Vec::new(),
            is_chat_visible: false,
            is_chat_loading: false,
            is_editing: false,
            is_generating: true,
        }
    }

    /// A finished note with given content (e.g. loaded from disk).
    pub fn finished(source_key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_generating: false,
            ..Self::placeholder(source_key, None)
        }
    }

    pub fn state(&self) -> NoteState {
        if self.is_generating {
            NoteState::Generating
        } else {
            NoteState::Finished
        }
    }

    pub fn is_synthesis(&self) -> bool {
        self.source_key == SYNTHESIS_REVIEW_KEY || self.source_key == SYNTHESIS_FROM_NOTES_KEY
    }

    /// Name used in banners and listings.
    pub fn display_name(&self) -> &str {
        self.source_name.as_deref().unwrap_or("Unknown Paper")
    }

    /// Reset to the freshly-created state ahead of a regenerate.
    pub fn reset(&mut self) {
        self.content.clear();
        self.chat_history.clear();
        self.is_chat_visible = false;
        self.is_editing = false;
        self.is_generating = true;
    }
}
