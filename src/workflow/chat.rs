//! Follow-up chat grounded in one note.
//!
//! Regenerate, delete-turn and branch are plain edits of the note's history.

use tracing::{debug, warn};

use super::events::WorkflowEvent;
use super::workspace::Workspace;
use super::WorkflowRequest;
use crate::error::{EruditeError, Result};
use crate::prompts::chat_instruction;
use crate::types::{ChatMessage, ChatRole, Note};

impl Workspace {
    fn require_note(&self, note_id: i64) -> Result<Note> {
        self.notes()
            .get(note_id)
            .ok_or_else(|| EruditeError::NotFound(format!("note {note_id}")))
    }

    fn set_chat_loading(&self, note_id: i64, loading: bool) {
        self.notes().update(note_id, |n| n.is_chat_loading = loading);
        if !loading {
            self.emit(WorkflowEvent::ChatFinished { note_id });
        }
    }

    fn append_to_message(&self, note_id: i64, message_id: i64, fragment: &str) {
        self.notes().update(note_id, |n| {
            if let Some(msg) = n.chat_history.iter_mut().find(|m| m.id == message_id) {
                msg.text.push_str(fragment);
            }
        });
        self.emit(WorkflowEvent::ChatFragment {
            note_id,
            message_id,
            fragment: fragment.to_string(),
        });
    }

    /// Ask a question about a note.
    ///
    /// Appends the user message and an empty reply, then streams into the
    /// reply. On failure both are replaced by one `Error: ...` reply. When
    /// stopped, the partial reply is kept.
    pub async fn send_chat_message(
        &self,
        note_id: i64,
        text: impl Into<String>,
        request: &WorkflowRequest,
    ) -> Result<()> {
        let text = text.into();
        let note = self.require_note(note_id)?;
        let history = note.chat_history.clone();

        let user = ChatMessage::user(text.clone());
        let reply = ChatMessage::model("");
        let (user_id, reply_id) = (user.id, reply.id);
        self.notes().update(note_id, |n| {
            n.chat_history.push(user);
            n.chat_history.push(reply);
            n.is_chat_loading = true;
        });
        debug!(note_id, turns = history.len(), "chat turn");

        let generation = request.generation(text, chat_instruction(&note.content), history);
        let outcome = self
            .stream_text(generation, |fragment| {
                self.append_to_message(note_id, reply_id, fragment)
            })
            .await;

        if let Err(err) = &outcome {
            if !err.is_cancellation() {
                warn!(note_id, error = %err, "chat turn failed");
                let error_reply = ChatMessage::model(format!("Error: {err}"));
                self.notes().update(note_id, |n| {
                    let at = n.chat_history.iter().position(|m| m.id == user_id);
                    n.chat_history.retain(|m| m.id != user_id && m.id != reply_id);
                    let at = at.unwrap_or(n.chat_history.len()).min(n.chat_history.len());
                    n.chat_history.insert(at, error_reply);
                });
            }
        }
        self.set_chat_loading(note_id, false);
        outcome.map(|_| ())
    }

    /// Re-run the user message preceding `reply_id`, replacing only that reply.
    ///
    /// The model sees the history before that user message. On failure the
    /// reply text becomes `Error: ...`.
    pub async fn regenerate_chat_reply(
        &self,
        note_id: i64,
        reply_id: i64,
        request: &WorkflowRequest,
    ) -> Result<()> {
        let note = self.require_note(note_id)?;
        let index = note
            .chat_history
            .iter()
            .position(|m| m.id == reply_id)
            .ok_or_else(|| EruditeError::NotFound(format!("chat message {reply_id}")))?;
        let user = match index.checked_sub(1).map(|i| &note.chat_history[i]) {
            Some(msg) if msg.role == ChatRole::User => msg.clone(),
            _ => {
                return Err(EruditeError::InvalidArgument(
                    "only a reply that follows a user message can be regenerated".into(),
                ))
            }
        };
        let history = note.chat_history[..index - 1].to_vec();

        self.notes().update(note_id, |n| {
            n.is_chat_loading = true;
            if let Some(msg) = n.chat_history.iter_mut().find(|m| m.id == reply_id) {
                msg.text.clear();
            }
        });

        let generation = request.generation(user.text, chat_instruction(&note.content), history);
        let outcome = self
            .stream_text(generation, |fragment| {
                self.append_to_message(note_id, reply_id, fragment)
            })
            .await;

        if let Err(err) = &outcome {
            if !err.is_cancellation() {
                warn!(note_id, error = %err, "chat regenerate failed");
                let error_text = format!("Error: {err}");
                self.notes().update(note_id, |n| {
                    if let Some(msg) = n.chat_history.iter_mut().find(|m| m.id == reply_id) {
                        msg.text = error_text;
                    }
                });
            }
        }
        self.set_chat_loading(note_id, false);
        outcome.map(|_| ())
    }

    /// Remove a user message and the reply after it. Returns whether anything was removed.
    pub fn delete_chat_turn(&self, note_id: i64, user_message_id: i64) -> Result<bool> {
        self.notes()
            .update(note_id, |n| {
                match n.chat_history.iter().position(|m| m.id == user_message_id) {
                    Some(index) => {
                        let end = (index + 2).min(n.chat_history.len());
                        n.chat_history.drain(index..end);
                        true
                    }
                    None => false,
                }
            })
            .ok_or_else(|| EruditeError::NotFound(format!("note {note_id}")))
    }

    /// Drop every turn after `model_message_id`. Returns whether the message was found.
    pub fn branch_chat(&self, note_id: i64, model_message_id: i64) -> Result<bool> {
        self.notes()
            .update(note_id, |n| {
                match n.chat_history.iter().position(|m| m.id == model_message_id) {
                    Some(index) => {
                        n.chat_history.truncate(index + 1);
                        true
                    }
                    None => false,
                }
            })
            .ok_or_else(|| EruditeError::NotFound(format!("note {note_id}")))
    }
}
