//! HTTP relay: keys stay on the server, clients stream through it.
//!
//! The server reuses [`Generator`] with server-side keys, and the client
//! side implements [`GenerationTransport`] and [`SearchBackend`], so both
//! deployment modes share the same adapters.
//!
//! [`GenerationTransport`]: crate::generation::GenerationTransport
//! [`SearchBackend`]: crate::search::SearchBackend

mod client;
mod server;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::EruditeConfig;
use crate::error::Result;
use crate::generation::Generator;
use crate::search::{GeminiSearch, SearchBackend};
use crate::types::{ChatMessage, SamplingConfig};

pub use client::{RelaySearch, RelayTransport};
pub use server::router;

pub const GENERATE_PATH: &str = "/api/generate";
pub const SEARCH_PATH: &str = "/api/search";

/// JSON body of a relay generate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayGenerateBody {
    /// `provider/model` selector.
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub config: SamplingConfig,
}

/// Shared server state.
#[derive(Clone)]
pub struct RelayState {
    config: EruditeConfig,
    generator: Generator,
    search: Arc<dyn SearchBackend>,
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RelayState {
    /// Serve with keys and base URLs from `config`.
    pub fn new(config: EruditeConfig) -> Self {
        Self {
            generator: Generator::new(config.clone()),
            search: Arc::new(GeminiSearch::new(config.clone())),
            config,
        }
    }

    /// Replace the search backend.
    pub fn with_search(mut self, search: Arc<dyn SearchBackend>) -> Self {
        self.search = search;
        self
    }
}

/// Bind `addr` and serve until `shutdown` fires.
pub async fn serve(addr: &str, state: RelayState, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "relay listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
