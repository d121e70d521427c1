//! Client side of the relay.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{RelayGenerateBody, GENERATE_PATH, SEARCH_PATH};
use crate::error::{EruditeError, Result};
use crate::generation::{guard_cancellation, FragmentStream, GenerationTransport};
use crate::provider::http::{ensure_success, join_url, shared_client};
use crate::search::SearchBackend;
use crate::types::{GenerationRequest, SearchQuery, SearchResult};

/// Generation through a relay; the relay holds the provider keys.
#[derive(Debug, Clone)]
pub struct RelayTransport {
    base_url: String,
}

impl RelayTransport {
    /// `base_url` is the relay origin, e.g. `http://127.0.0.1:8787`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GenerationTransport for RelayTransport {
    async fn generate_stream(&self, request: GenerationRequest) -> Result<FragmentStream> {
        if request.cancel.is_cancelled() {
            return Err(EruditeError::Aborted);
        }
        let body = RelayGenerateBody {
            model: request.model.to_string(),
            prompt: request.prompt.clone(),
            system_instruction: request.system().map(str::to_string),
            history: request.history.clone(),
            config: request.sampling,
        };
        let url = join_url(&self.base_url, GENERATE_PATH);
        debug!(url = %url, model = %request.model, "relay generate");

        let send = shared_client().post(&url).json(&body).send();
        let resp = tokio::select! {
            biased;
            _ = request.cancel.cancelled() => return Err(EruditeError::Aborted),
            resp = send => resp?,
        };
        let resp = ensure_success(resp).await?;
        if resp.content_length() == Some(0) {
            return Err(EruditeError::EmptyBody);
        }

        let byte_stream = resp.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = Utf8Decoder::default();
            futures::pin_mut!(byte_stream);
            while let Some(chunk) = byte_stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        let text = decoder.push(&bytes);
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    Err(err) => {
                        yield Err(EruditeError::Network(err));
                        return;
                    }
                }
            }
            let tail = decoder.finish();
            if !tail.is_empty() {
                yield Ok(tail);
            }
        };
        Ok(guard_cancellation(Box::pin(stream), request.cancel.clone()))
    }
}

/// Decodes UTF-8 across chunk boundaries, holding back an incomplete sequence.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            // Invalid bytes mid-stream: decode lossily.
            Err(_) => self.pending.len(),
        };
        let rest = self.pending.split_off(valid);
        let done = std::mem::replace(&mut self.pending, rest);
        String::from_utf8_lossy(&done).into_owned()
    }

    fn finish(&mut self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut self.pending)).into_owned()
    }
}

/// Search through a relay.
#[derive(Debug, Clone)]
pub struct RelaySearch {
    base_url: String,
}

impl RelaySearch {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SearchBackend for RelaySearch {
    async fn search(&self, query: &SearchQuery, cancel: &CancellationToken) -> Result<SearchResult> {
        let url = join_url(&self.base_url, SEARCH_PATH);
        let call = async {
            let resp = shared_client().post(&url).json(query).send().await?;
            let resp = ensure_success(resp).await?;
            Ok::<_, EruditeError>(resp.json::<SearchResult>().await?)
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EruditeError::Aborted),
            result = call => result,
        }
    }
}
