//! Google Gemini native adapter.
//!
//! Streams `:streamGenerateContent?alt=sse` and also exposes the one-shot
//! `:generateContent` call used by literature search.

use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::http::{ensure_success, gemini_headers, join_url, shared_client};
use super::sse::{classify_line, SseLine, SseLineBuffer};
use super::FragmentStream;
use crate::error::EruditeError;
use crate::types::{ChatRole, GenerationRequest};

/// Model that receives a thinking budget.
pub const THINKING_MODEL: &str = "gemini-2.5-flash";

/// Token limit used for the budget when none is configured.
pub const THINKING_REFERENCE_TOKENS: u32 = 8192;

/// Thinking budget to inject for `model_name`, if any.
///
/// The budget is `min(1500, floor(limit * 0.25))` and is injected whenever
/// the limit exceeds it, which holds for every positive limit.
pub fn thinking_budget(model_name: &str, max_output_tokens: Option<u32>) -> Option<u32> {
    if model_name != THINKING_MODEL {
        return None;
    }
    let limit = max_output_tokens
        .filter(|n| *n > 0)
        .unwrap_or(THINKING_REFERENCE_TOKENS);
    let budget = 1500_u32.min(limit / 4);
    (limit > budget).then_some(budget)
}

/// Request body for a streaming call.
pub fn build_stream_body(model_name: &str, request: &GenerationRequest) -> Value {
    let contents: Vec<Value> = request
        .history
        .iter()
        .map(|msg| {
            let role = match msg.role {
                ChatRole::Model => "model",
                ChatRole::User => "user",
            };
            json!({"role": role, "parts": [{"text": msg.text}]})
        })
        .chain(std::iter::once(
            json!({"role": "user", "parts": [{"text": request.prompt}]}),
        ))
        .collect();

    let sampling = &request.sampling;
    let mut gen_config = Map::new();
    gen_config.insert("temperature".into(), json!(sampling.temperature));
    gen_config.insert("topP".into(), json!(sampling.top_p));
    gen_config.insert("topK".into(), json!(sampling.top_k));
    if let Some(max) = sampling.effective_max_tokens() {
        gen_config.insert("maxOutputTokens".into(), json!(max));
    }
    if let Some(budget) = thinking_budget(model_name, sampling.effective_max_tokens()) {
        gen_config.insert("thinkingConfig".into(), json!({"thinkingBudget": budget}));
    }

    let mut body = Map::new();
    body.insert("contents".into(), Value::Array(contents));
    body.insert("generationConfig".into(), Value::Object(gen_config));
    if let Some(system) = request.system() {
        body.insert(
            "systemInstruction".into(),
            json!({"parts": [{"text": system}]}),
        );
    }
    Value::Object(body)
}

/// Open a native streaming call.
///
/// Cancellation is observed between fragments only: once the token fires the
/// stream simply ends.
pub async fn open_native_stream(
    base_url: &str,
    api_key: &str,
    model_name: &str,
    request: &GenerationRequest,
) -> Result<FragmentStream, EruditeError> {
    let url = join_url(
        base_url,
        &format!("models/{model_name}:streamGenerateContent?alt=sse"),
    );
    let body = build_stream_body(model_name, request);
    let cancel = request.cancel.clone();

    debug!(model = model_name, "Gemini stream");

    let resp = shared_client()
        .post(&url)
        .headers(gemini_headers(api_key))
        .json(&body)
        .send()
        .await?;
    let resp = ensure_success(resp).await?;
    if resp.content_length() == Some(0) {
        return Err(EruditeError::EmptyBody);
    }

    let byte_stream = resp.bytes_stream();
    let stream = async_stream::stream! {
        let mut buffer = SseLineBuffer::new();
        futures::pin_mut!(byte_stream);

        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(EruditeError::Network(e));
                    return;
                }
            };
            for line in buffer.push(&chunk) {
                match classify_line(&line) {
                    SseLine::Data(payload) => {
                        let text = match serde_json::from_value::<GeminiResponse>(payload) {
                            Ok(parsed) => parsed.text(),
                            Err(err) => {
                                warn!(error = %err, "skipping unexpected Gemini chunk");
                                continue;
                            }
                        };
                        if cancel.is_cancelled() {
                            return;
                        }
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    SseLine::Malformed(payload) => {
                        warn!(payload = %payload, "skipping unparsable Gemini chunk");
                    }
                    SseLine::Done | SseLine::Ignored => {}
                }
            }
        }
    };

    Ok(Box::pin(stream))
}

/// One-shot `generateContent` call returning the parsed response.
pub async fn generate_content(
    base_url: &str,
    api_key: &str,
    model_name: &str,
    body: &Value,
) -> Result<GeminiResponse, EruditeError> {
    let url = join_url(base_url, &format!("models/{model_name}:generateContent"));
    debug!(model = model_name, "Gemini generate_content");

    let resp = shared_client()
        .post(&url)
        .headers(gemini_headers(api_key))
        .json(body)
        .send()
        .await?;
    let resp = ensure_success(resp).await?;
    Ok(resp.json().await?)
}

// Gemini response types

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeminiPart {
    pub text: Option<String>,
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroundingChunk {
    pub web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

impl GeminiResponse {
    /// Concatenated non-thought text of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn grounding_chunks(&self) -> &[GroundingChunk] {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| m.grounding_chunks.as_slice())
            .unwrap_or_default()
    }
}
