//! Generic HTTP/SSE streaming adapter, parameterised by a [`WireProtocol`].

use futures::StreamExt;
use tracing::{debug, warn};

use super::http::{ensure_success, shared_client};
use super::registry::HttpRoute;
use super::sse::{classify_line, SseLine, SseLineBuffer};
use super::wire::WireProtocol;
use super::FragmentStream;
use crate::error::EruditeError;
use crate::types::GenerationRequest;

/// Issue the streaming `POST` and return its text fragments.
///
/// Failures before the body starts (cancellation, connect errors, non-2xx,
/// empty body) are returned directly; later ones are yielded as the final
/// stream item.
pub async fn open_http_stream(
    route: HttpRoute<'_>,
    api_key: &str,
    model_name: &str,
    request: &GenerationRequest,
) -> Result<FragmentStream, EruditeError> {
    let url = route.endpoint();
    let body = route.wire.build_body(model_name, request);
    let cancel = request.cancel.clone();

    debug!(provider = %route.provider, model = model_name, wire = route.wire.name(), "opening SSE stream");

    let send = shared_client()
        .post(&url)
        .headers(route.wire.build_headers(api_key))
        .json(&body)
        .send();
    let resp = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(EruditeError::Aborted),
        resp = send => resp?,
    };
    let resp = ensure_success(resp).await?;
    if resp.content_length() == Some(0) {
        return Err(EruditeError::EmptyBody);
    }

    Ok(sse_fragments(resp.bytes_stream(), route.wire, cancel))
}

/// Frame a byte stream into SSE lines and map each `data:` payload through `wire`.
pub fn sse_fragments<S, B>(
    bytes: S,
    wire: &'static dyn WireProtocol,
    cancel: tokio_util::sync::CancellationToken,
) -> FragmentStream
where
    S: futures::Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut buffer = SseLineBuffer::new();
        futures::pin_mut!(bytes);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                chunk = bytes.next() => Some(chunk),
            };
            let chunk = match next {
                // Dropping `bytes` on return releases the connection.
                None => {
                    yield Err(EruditeError::Aborted);
                    return;
                }
                Some(None) => break,
                Some(Some(Err(err))) => {
                    yield Err(EruditeError::Network(err));
                    return;
                }
                Some(Some(Ok(chunk))) => chunk,
            };

            for line in buffer.push(chunk.as_ref()) {
                match classify_line(&line) {
                    // Remaining lines of this chunk are discarded; reading continues.
                    SseLine::Done => break,
                    SseLine::Data(payload) => {
                        if let Some(text) = wire.extract_delta(&payload) {
                            yield Ok(text);
                        }
                    }
                    SseLine::Malformed(payload) => {
                        warn!(wire = wire.name(), payload = %payload, "skipping unparsable stream chunk");
                    }
                    SseLine::Ignored => {}
                }
            }
        }

        if let Some(line) = buffer.finish() {
            if let SseLine::Data(payload) = classify_line(&line) {
                if let Some(text) = wire.extract_delta(&payload) {
                    yield Ok(text);
                }
            }
        }
    };

    Box::pin(stream)
}
