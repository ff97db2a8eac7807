//! Stateful `/connect` front-end
//!
//! `GET` opens an SSE channel bound to a fresh session id; `POST` messages
//! carrying that id are acknowledged with 202 and answered over the channel;
//! `DELETE` closes the session.

use std::{convert::Infallible, sync::Arc};

use async_stream::stream;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::http::SESSION_ID_HEADER;
use crate::mcp::rpc::{json_rpc_error, PARSE_ERROR};
use crate::mcp::server::{initialize_notification, Dispatcher};
use crate::mcp::session::{Session, SessionGuard};
use crate::AppState;

pub async fn open_session(State(state): State<AppState>) -> Result<Response, AppError> {
    let dispatcher = Arc::new(Dispatcher::new(state.backends.clone()));
    let (session, mut receiver) = Session::open(dispatcher);
    let session_id = session.id.clone();
    let initialize = initialize_notification(&session_id)?;

    state.sessions.put(session)?;
    let guard = SessionGuard::new(state.sessions.clone(), session_id.clone());
    info!(session_id = %session_id, connections = state.sessions.len(), "session opened");

    let events = stream! {
        let _guard = guard;
        yield Ok::<Event, Infallible>(Event::default().data(initialize.to_string()));
        while let Some(message) = receiver.recv().await {
            yield Ok(Event::default().data(message.to_string()));
        }
    };

    let sse = Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.keep_alive)
            .text("ping"),
    );

    Ok(([(SESSION_ID_HEADER, session_id)], sse).into_response())
}

pub async fn post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let session_id = session_id_from(&headers)?;
    let session = state
        .sessions
        .get(session_id)
        .ok_or_else(|| AppError::not_found("unknown_session", "session not found"))?;

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json_rpc_error(None, PARSE_ERROR, "Parse error")),
            )
                .into_response())
        }
    };

    let Session {
        id,
        channel,
        dispatcher,
    } = session;
    tokio::spawn(async move {
        let Some(response) = dispatcher.handle_json_rpc_value(payload).await else {
            return;
        };
        if channel.send(response).await.is_err() {
            warn!(session_id = %id, "session closed before response could be delivered");
        }
    });

    Ok(StatusCode::ACCEPTED.into_response())
}

pub async fn close_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let session_id = session_id_from(&headers)?;
    state
        .sessions
        .delete(session_id)
        .ok_or_else(|| AppError::not_found("unknown_session", "session not found"))?;

    info!(session_id = %session_id, "session closed by client");
    Ok(StatusCode::NO_CONTENT)
}

fn session_id_from(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::bad_request("missing_session_id", "Mcp-Session-Id header is required")
        })
}
