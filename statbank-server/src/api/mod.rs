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

//! REST surface over the Statbank API.

pub mod health;
pub mod statbank;

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use statbank_core::{StatbankClient, StatbankError};
use std::sync::Arc;

pub use health::health_check;
pub use statbank::{get_data, get_subject, get_table_info, list_subjects, list_tables};

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream rejected request ({status})")]
    Upstream {
        status: u16,
        detail: serde_json::Value,
        message: String,
    },

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StatbankError> for ApiError {
    fn from(err: StatbankError) -> Self {
        match err {
            StatbankError::InvalidArgument(msg) => ApiError::BadRequest(msg),
            StatbankError::UpstreamRejected { status, ref detail } => ApiError::Upstream {
                status,
                detail: detail.to_json(),
                message: err.to_string(),
            },
            StatbankError::Connectivity(msg) => ApiError::Unavailable(msg),
            StatbankError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("invalid_argument", msg),
            ),
            ApiError::Upstream {
                status,
                detail,
                message,
            } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    upstream_status: Some(status),
                    detail: Some(detail),
                    ..ErrorResponse::new("upstream_rejected", message)
                },
            ),
            ApiError::Unavailable(msg) => {
                tracing::error!(error = %msg, "Statbank unreachable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("connectivity", format!("Upstream unreachable: {}", msg)),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal", "Internal server error".to_string()),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(kind: &'static str, error: String) -> Self {
        Self {
            error,
            kind,
            upstream_status: None,
            detail: None,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<StatbankClient>,
    pub default_lang: Arc<str>,
}

impl AppState {
    pub fn new(client: StatbankClient, default_lang: impl Into<Arc<str>>) -> Self {
        Self {
            client: Arc::new(client),
            default_lang: default_lang.into(),
        }
    }

    /// Caller-supplied language, or the configured default.
    pub fn lang(&self, requested: Option<String>) -> String {
        requested
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or_else(|| self.default_lang.to_string())
    }
}

/// Routes mounted under `/api/v1`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/subjects", get(list_subjects))
        .route("/subjects/:subject_id", get(get_subject))
        .route("/tables", get(list_tables))
        .route("/tableinfo/:table_id", get(get_table_info))
        .route("/data/:table_id", post(get_data))
}
