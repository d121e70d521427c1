//! Generation request and sampling settings.

use bon::Builder;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::ChatMessage;
use crate::models::ModelSelector;

/// Sampling parameters shared by every provider.
///
/// Providers ignore fields they do not support (`top_k` is dropped by the
/// chat-completions family).
#[derive(Debug, Clone, Copy, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplingConfig {
    #[builder(default = 0.6)]
    pub temperature: f32,
    #[builder(default = 0.95)]
    pub top_p: f32,
    #[builder(default = 64)]
    pub top_k: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: None,
        }
    }
}

impl SamplingConfig {
    /// Token limit, treating zero as unset.
    pub fn effective_max_tokens(&self) -> Option<u32> {
        self.max_output_tokens.filter(|n| *n > 0)
    }
}

/// One call to the generation façade.
///
/// `history` holds prior turns only; `prompt` is always appended as the final
/// user turn.
#[derive(Debug, Clone, Builder)]
pub struct GenerationRequest {
    pub model: ModelSelector,
    #[builder(into)]
    pub prompt: String,
    #[builder(into)]
    pub system_instruction: Option<String>,
    #[builder(default)]
    pub history: Vec<ChatMessage>,
    #[builder(default)]
    pub sampling: SamplingConfig,
    #[builder(default)]
    pub cancel: CancellationToken,
}

impl GenerationRequest {
    /// System instruction, if present and non-blank.
    pub fn system(&self) -> Option<&str> {
        self.system_instruction
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}
