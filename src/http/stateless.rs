//! Stateless `/connect` front-end
//!
//! Every POST gets its own dispatcher, answers synchronously and keeps nothing afterwards.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::mcp::rpc::{json_rpc_error, PARSE_ERROR};
use crate::mcp::server::{is_internal_error, Dispatcher};
use crate::AppState;

/// Logs teardown of one request's dispatcher, including when the client aborts
/// and the handler future is dropped mid-flight.
struct RequestScope {
    request_id: Value,
    completed: bool,
}

impl RequestScope {
    fn open(payload: &Value) -> Self {
        let request_id = payload.get("id").cloned().unwrap_or(Value::Null);
        debug!(request_id = %request_id, "stateless request opened");
        Self {
            request_id,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        if self.completed {
            debug!(request_id = %self.request_id, "stateless request closed");
        } else {
            info!(request_id = %self.request_id, "stateless request aborted before completion");
        }
    }
}

pub async fn post_message(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(json_rpc_error(None, PARSE_ERROR, "Parse error")),
            )
                .into_response()
        }
    };

    let scope = RequestScope::open(&payload);
    let dispatcher = Dispatcher::new(state.backends.clone());
    let response = dispatcher.handle_json_rpc_value(payload).await;
    scope.complete();

    match response {
        Some(response) if is_internal_error(&response) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// `GET`/`DELETE` only make sense with a session.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32000,
                "message": "Method not allowed."
            },
            "id": null
        })),
    )
        .into_response()
}
