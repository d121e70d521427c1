//! Provider routing and streaming transport adapters.

pub mod gemini;
pub mod http;
pub mod http_stream;
pub mod registry;
pub mod sse;
pub mod wire;

use futures::stream::BoxStream;

use crate::error::EruditeError;

pub use http_stream::open_http_stream;
pub use registry::{HttpRoute, ProviderRegistry, ProviderRoute, ProviderSpec};
pub use sse::{classify_line, SseLine, SseLineBuffer};
pub use wire::{ChatCompletionsWire, MessagesWire, WireProtocol};

/// Lazy, finite sequence of text fragments in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String, EruditeError>>;
