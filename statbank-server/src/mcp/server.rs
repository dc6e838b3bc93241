// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! MCP over HTTP
//!
//! Two ways in:
//!
//! - `POST /mcp`: one JSON-RPC message per request, answered inline.
//!   Notifications are acknowledged with `202 Accepted` and an empty body.
//! - `GET /mcp/sse` + `POST /mcp/messages?session_id=..`: the SSE transport.
//!   The stream opens with an `endpoint` event naming the message URL; every
//!   response to a message posted there arrives as a `message` event.

use async_stream::stream;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::mcp::handlers::McpHandler;
use crate::mcp::protocol::{MCP_PROTOCOL_VERSION, SERVER_NAME};

/// Path SSE clients post their messages to.
pub const SSE_MESSAGES_PATH: &str = "/mcp/messages";

const SSE_CHANNEL_CAPACITY: usize = 32;
const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Open SSE sessions, keyed by session id.
type SseSessions = Arc<DashMap<String, mpsc::Sender<String>>>;

/// MCP Server state
#[derive(Clone)]
pub struct McpServerState {
    pub handler: Arc<McpHandler>,
    sessions: SseSessions,
}

impl McpServerState {
    /// Number of connected SSE clients.
    pub fn sse_sessions(&self) -> usize {
        self.sessions.len()
    }
}

/// MCP HTTP server
#[derive(Clone)]
pub struct McpServer {
    state: McpServerState,
}

impl McpServer {
    pub fn new(handler: Arc<McpHandler>) -> Self {
        Self {
            state: McpServerState {
                handler,
                sessions: Arc::new(DashMap::new()),
            },
        }
    }

    pub fn state(&self) -> McpServerState {
        self.state.clone()
    }

    /// Router with the MCP endpoints, ready to merge.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Router::new()
            .route("/mcp", post(handle_mcp_request))
            .route("/mcp/health", get(handle_mcp_health))
            .route("/mcp/sse", get(handle_mcp_sse))
            .route(SSE_MESSAGES_PATH, post(handle_sse_message))
            .with_state(self.state.clone())
    }
}

/// GET /mcp/health
async fn handle_mcp_health(State(state): State<McpServerState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "protocol_version": MCP_PROTOCOL_VERSION,
        "server_name": SERVER_NAME,
        "server_version": env!("CARGO_PKG_VERSION"),
        "tools": state.handler.registry().len(),
        "sse_sessions": state.sse_sessions(),
        "capabilities": {
            "resources": true,
            "tools": true
        }
    }))
}

/// POST /mcp
async fn handle_mcp_request(State(state): State<McpServerState>, body: String) -> Response {
    match state.handler.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Drops the session from the table when its stream goes away.
struct SessionGuard {
    sessions: SseSessions,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        info!(session_id = %self.id, "MCP SSE client disconnected");
    }
}

/// GET /mcp/sse
async fn handle_mcp_sse(
    State(state): State<McpServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().simple().to_string();
    let (tx, mut rx) = mpsc::channel::<String>(SSE_CHANNEL_CAPACITY);
    state.sessions.insert(session_id.clone(), tx);
    info!(session_id = %session_id, "MCP SSE client connected");

    let endpoint = format!("{}?session_id={}", SSE_MESSAGES_PATH, session_id);
    let guard = SessionGuard {
        sessions: Arc::clone(&state.sessions),
        id: session_id,
    };

    let events = stream! {
        let _guard = guard;
        yield Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint));
        while let Some(message) = rx.recv().await {
            yield Ok(Event::default().event("message").data(message));
        }
    };

    Sse::new(events).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE))
}

#[derive(Debug, Deserialize)]
struct SessionParams {
    session_id: Option<String>,
}

fn session_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({"error": message, "kind": "invalid_argument"}))).into_response()
}

/// POST /mcp/messages?session_id=..
///
/// Accepted messages are handled in the background; the response goes out
/// on the session's event stream.
async fn handle_sse_message(
    State(state): State<McpServerState>,
    Query(params): Query<SessionParams>,
    body: String,
) -> Response {
    let Some(session_id) = params.session_id else {
        return session_error(StatusCode::BAD_REQUEST, "session_id is required".to_string());
    };
    let Some(sender) = state
        .sessions
        .get(&session_id)
        .map(|entry| entry.value().clone())
    else {
        warn!(session_id = %session_id, "Message for unknown MCP SSE session");
        return session_error(
            StatusCode::NOT_FOUND,
            format!("Unknown session: {}", session_id),
        );
    };

    let handler = Arc::clone(&state.handler);
    tokio::spawn(async move {
        let Some(response) = handler.handle_message(&body).await else {
            return;
        };
        match serde_json::to_string(&response) {
            Ok(text) => {
                if sender.send(text).await.is_err() {
                    debug!(session_id = %session_id, "MCP SSE client gone before response");
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize MCP response"),
        }
    });

    StatusCode::ACCEPTED.into_response()
}
