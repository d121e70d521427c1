//! The unified generation façade.
//!
//! Every workflow (note, synthesis, chat) calls [`GenerationTransport::generate_stream`]
//! with a different prompt/system/history triple. [`Generator`] resolves the
//! provider, looks up its key, and dispatches to the native or HTTP/SSE
//! adapter; the relay client implements the same trait over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{EruditeConfig, KeyLookup};
use crate::error::{EruditeError, Result};
use crate::models::ProviderKey;
use crate::provider::{gemini, open_http_stream, ProviderRegistry, ProviderRoute};
use crate::types::GenerationRequest;

pub use crate::provider::FragmentStream;

/// Something that can turn a [`GenerationRequest`] into a fragment stream.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Start a generation.
    ///
    /// Pre-flight failures are returned directly; failures after the first
    /// byte are yielded as the last stream item.
    async fn generate_stream(&self, request: GenerationRequest) -> Result<FragmentStream>;
}

/// Direct transport: keys live client-side and requests go straight to the provider.
#[derive(Clone)]
pub struct Generator {
    config: EruditeConfig,
    keys: Arc<dyn KeyLookup>,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Generator {
    /// Use `config` for both base URLs and key lookup.
    pub fn new(config: EruditeConfig) -> Self {
        let keys: Arc<dyn KeyLookup> = Arc::new(config.clone());
        Self { config, keys }
    }

    /// Replace the key lookup, keeping base URLs from the config.
    pub fn with_key_lookup(mut self, keys: Arc<dyn KeyLookup>) -> Self {
        self.keys = keys;
        self
    }

    pub fn config(&self) -> &EruditeConfig {
        &self.config
    }

    fn require_key(&self, provider: ProviderKey) -> Result<String> {
        self.keys
            .api_key(provider)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| EruditeError::MissingApiKey {
                provider: provider.as_str().to_string(),
                display_name: provider.display_name().to_string(),
                env_var: provider.env_keys()[0].to_string(),
            })
    }

    /// Generate and collect the full text.
    pub async fn generate_text(&self, request: GenerationRequest) -> Result<String> {
        collect_fragments(self.generate_stream(request).await?).await
    }
}

#[async_trait]
impl GenerationTransport for Generator {
    async fn generate_stream(&self, request: GenerationRequest) -> Result<FragmentStream> {
        let provider = request.model.provider;
        let api_key = self.require_key(provider)?;
        if request.cancel.is_cancelled() {
            return Err(EruditeError::Aborted);
        }

        let base_url = self.config.get_base_url(provider);
        let model_name = request.model.model_name.as_str();
        debug!(provider = %provider, model = model_name, history = request.history.len(), "dispatching generation");

        let inner = match ProviderRegistry::route(provider, base_url.as_deref()) {
            ProviderRoute::Native { base_url } => {
                gemini::open_native_stream(base_url, &api_key, model_name, &request).await?
            }
            ProviderRoute::Http(route) => {
                open_http_stream(route, &api_key, model_name, &request).await?
            }
        };

        Ok(guard_cancellation(inner, request.cancel.clone()))
    }
}

/// Re-check `cancel` at fragment granularity.
///
/// Once the token fires the stream yields a single `Aborted` and ends; an
/// inner error ends the stream after it is yielded.
pub fn guard_cancellation(inner: FragmentStream, cancel: CancellationToken) -> FragmentStream {
    let stream = async_stream::stream! {
        let mut inner = inner;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = inner.next() => Some(item),
            };
            match next {
                None => {
                    yield Err(EruditeError::Aborted);
                    break;
                }
                Some(None) => break,
                Some(Some(Ok(fragment))) => yield Ok(fragment),
                Some(Some(Err(err))) => {
                    yield Err(err);
                    break;
                }
            }
        }
    };
    Box::pin(stream)
}

/// Fold a fragment stream into one string, stopping at the first error.
pub async fn collect_fragments(mut stream: FragmentStream) -> Result<String> {
    let mut out = String::new();
    while let Some(fragment) = stream.next().await {
        out.push_str(&fragment?);
    }
    Ok(out)
}
