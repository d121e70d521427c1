//! Request shapes and delta extraction for the HTTP/SSE provider families.

use reqwest::header::HeaderMap;
use serde_json::{json, Map, Value};

use super::http::{api_key_headers, bearer_headers};
use crate::types::{ChatRole, GenerationRequest};

/// Version header sent with every messages-family request.
pub const MESSAGES_API_VERSION: &str = "2023-06-01";

/// Token limit the messages family requires when none is configured.
pub const MESSAGES_DEFAULT_MAX_TOKENS: u32 = 4096;

/// The per-family quirks of one HTTP/SSE protocol.
pub trait WireProtocol: Send + Sync {
    fn name(&self) -> &'static str;

    fn build_headers(&self, api_key: &str) -> HeaderMap;

    fn build_body(&self, model_name: &str, request: &GenerationRequest) -> Value;

    /// Incremental text carried by one parsed `data:` payload, if any.
    fn extract_delta(&self, payload: &Value) -> Option<String>;
}

fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::Model => "assistant",
        ChatRole::User => "user",
    }
}

fn conversation(request: &GenerationRequest) -> Vec<Value> {
    request
        .history
        .iter()
        .map(|msg| json!({"role": wire_role(msg.role), "content": msg.text}))
        .chain(std::iter::once(
            json!({"role": "user", "content": request.prompt}),
        ))
        .collect()
}

/// `POST /chat/completions` with `choices[0].delta.content` deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatCompletionsWire;

impl WireProtocol for ChatCompletionsWire {
    fn name(&self) -> &'static str {
        "chat-completions"
    }

    fn build_headers(&self, api_key: &str) -> HeaderMap {
        bearer_headers(api_key)
    }

    fn build_body(&self, model_name: &str, request: &GenerationRequest) -> Value {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if let Some(system) = request.system() {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.extend(conversation(request));

        let mut body = Map::new();
        body.insert("model".into(), json!(model_name));
        body.insert("messages".into(), Value::Array(messages));
        body.insert("stream".into(), json!(true));
        body.insert("temperature".into(), json!(request.sampling.temperature));
        body.insert("top_p".into(), json!(request.sampling.top_p));
        if let Some(max) = request.sampling.effective_max_tokens() {
            body.insert("max_tokens".into(), json!(max));
        }
        Value::Object(body)
    }

    fn extract_delta(&self, payload: &Value) -> Option<String> {
        payload
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// `POST /messages` with `content_block_delta` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagesWire;

impl WireProtocol for MessagesWire {
    fn name(&self) -> &'static str {
        "messages"
    }

    fn build_headers(&self, api_key: &str) -> HeaderMap {
        api_key_headers(api_key, MESSAGES_API_VERSION)
    }

    fn build_body(&self, model_name: &str, request: &GenerationRequest) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), json!(model_name));
        body.insert("messages".into(), Value::Array(conversation(request)));
        body.insert("stream".into(), json!(true));
        if let Some(system) = request.system() {
            body.insert("system".into(), json!(system));
        }
        body.insert("temperature".into(), json!(request.sampling.temperature));
        body.insert("top_p".into(), json!(request.sampling.top_p));
        body.insert("top_k".into(), json!(request.sampling.top_k));
        body.insert(
            "max_tokens".into(),
            json!(request
                .sampling
                .effective_max_tokens()
                .unwrap_or(MESSAGES_DEFAULT_MAX_TOKENS)),
        );
        Value::Object(body)
    }

    fn extract_delta(&self, payload: &Value) -> Option<String> {
        if payload.get("type").and_then(Value::as_str) != Some("content_block_delta") {
            return None;
        }
        payload
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

pub static CHAT_COMPLETIONS: ChatCompletionsWire = ChatCompletionsWire;
pub static MESSAGES: MessagesWire = MessagesWire;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, SamplingConfig};
    use pretty_assertions::assert_eq;

    fn request(system: Option<&str>, max: Option<u32>) -> GenerationRequest {
        GenerationRequest::builder()
            .model("openai/gpt-4o".parse().unwrap())
            .prompt("next question")
            .maybe_system_instruction(system.map(str::to_string))
            .history(vec![ChatMessage::user("first"), ChatMessage::model("answer")])
            .sampling(SamplingConfig {
                max_output_tokens: max,
                ..SamplingConfig::default()
            })
            .build()
    }

    #[test]
    fn chat_completions_body_unshifts_system_and_maps_roles() {
        let body = CHAT_COMPLETIONS.build_body("gpt-4o", &request(Some("be brief"), Some(100)));
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(body["messages"][3]["content"], "next question");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 100);
        assert!(body.get("top_k").is_none());
    }

    #[test]
    fn chat_completions_omits_unset_max_tokens() {
        let body = CHAT_COMPLETIONS.build_body("deepseek-chat", &request(None, None));
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["messages"][0]["role"], "user");

        let zero = CHAT_COMPLETIONS.build_body("deepseek-chat", &request(None, Some(0)));
        assert!(zero.get("max_tokens").is_none());
    }

    #[test]
    fn messages_body_keeps_system_top_level() {
        let body = MESSAGES.build_body("claude-3-haiku", &request(Some("sys"), None));
        assert_eq!(body["system"], "sys");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["top_k"], 64);
        assert!(body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .all(|m| m["role"] != "system"));
    }

    #[test]
    fn messages_body_without_system_omits_field() {
        let body = MESSAGES.build_body("claude-3-haiku", &request(None, Some(512)));
        assert!(body.get("system").is_none());
        assert_eq!(body["max_tokens"], 512);
    }

    #[test]
    fn chat_completions_delta_path() {
        let payload = json!({"choices": [{"delta": {"content": "Hel"}}]});
        assert_eq!(CHAT_COMPLETIONS.extract_delta(&payload).as_deref(), Some("Hel"));
        let role_only = json!({"choices": [{"delta": {"role": "assistant"}}]});
        assert_eq!(CHAT_COMPLETIONS.extract_delta(&role_only), None);
        let empty = json!({"choices": [{"delta": {"content": ""}}]});
        assert_eq!(CHAT_COMPLETIONS.extract_delta(&empty), None);
    }

    #[test]
    fn messages_delta_requires_event_type() {
        let delta = json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "lo"}});
        assert_eq!(MESSAGES.extract_delta(&delta).as_deref(), Some("lo"));
        let start = json!({"type": "message_start", "delta": {"text": "nope"}});
        assert_eq!(MESSAGES.extract_delta(&start), None);
    }
}
