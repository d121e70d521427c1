//! Relay request handlers.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::{RelayGenerateBody, RelayState, GENERATE_PATH, SEARCH_PATH};
use crate::error::EruditeError;
use crate::generation::GenerationTransport;
use crate::models::ModelSelector;
use crate::search::SEARCH_KEY_MISSING;
use crate::types::{GenerationRequest, SearchQuery, TimeRange};

/// Routes for the relay endpoints.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route(
            GENERATE_PATH,
            post(generate).fallback(|| async { text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed") }),
        )
        .route(
            SEARCH_PATH,
            post(search).fallback(|| async { json_error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed") }),
        )
        .with_state(state)
}

fn text(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message.into(),
    )
        .into_response()
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

async fn generate(State(state): State<RelayState>, Json(body): Json<RelayGenerateBody>) -> Response {
    let model = match ModelSelector::parse(&body.model) {
        Ok(model) => model,
        Err(err) => return text(StatusCode::BAD_REQUEST, err.to_string()),
    };
    debug!(model = %model, history = body.history.len(), "relay generate");

    // Cancelled when the response body is dropped, e.g. on client disconnect.
    let cancel = CancellationToken::new();
    let request = GenerationRequest::builder()
        .model(model)
        .prompt(body.prompt)
        .maybe_system_instruction(body.system_instruction)
        .history(body.history)
        .sampling(body.config)
        .cancel(cancel.clone())
        .build();

    match state.generator.generate_stream(request).await {
        Ok(fragments) => {
            let guard = cancel.drop_guard();
            let body = fragments.map(move |item| {
                let _alive = &guard;
                item.map(Bytes::from)
            });
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                Body::from_stream(body),
            )
                .into_response()
        }
        Err(EruditeError::MissingApiKey { provider, .. }) => text(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("API key for {provider} is not configured on the server."),
        ),
        Err(err) => {
            error!(error = %err, "relay generate failed");
            text(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    query: Option<String>,
    count: Option<u32>,
    time_range: Option<TimeRange>,
    sources_to_search: Option<Vec<String>>,
}

impl SearchBody {
    fn into_query(self) -> Option<SearchQuery> {
        Some(SearchQuery {
            query: self.query.filter(|q| !q.is_empty())?,
            count: self.count.filter(|c| *c > 0)?,
            time_range: self.time_range?,
            sources: self.sources_to_search?,
        })
    }
}

async fn search(State(state): State<RelayState>, Json(body): Json<SearchBody>) -> Response {
    let Some(query) = body.into_query() else {
        return json_error(StatusCode::BAD_REQUEST, "Missing required search parameters.");
    };

    // The backend owns its credentials; an injected one may need none.
    match state.search.search(&query, &CancellationToken::new()).await {
        Ok(result) => Json(result).into_response(),
        Err(EruditeError::Configuration(msg)) if msg == SEARCH_KEY_MISSING => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Gemini API key is not configured on the server.",
        ),
        Err(err) => {
            error!(error = %err, "relay search failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
