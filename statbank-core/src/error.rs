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

//! Error taxonomy shared by every Statbank operation.

use std::fmt;
use thiserror::Error;

/// Maximum number of characters of a raw upstream body kept in an error.
pub const MAX_ERROR_BODY_CHARS: usize = 512;

/// Statbank errors.
#[derive(Error, Debug)]
pub enum StatbankError {
    /// Caller supplied a value the adapter refuses to forward.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream rejected request ({status}): {detail}")]
    UpstreamRejected { status: u16, detail: UpstreamDetail },

    /// No response was obtained from upstream.
    #[error("Upstream unreachable: {0}")]
    Connectivity(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StatbankError {
    /// Stable tag used by transports when reporting the error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::Connectivity(_) => "connectivity",
            Self::Internal(_) => "internal",
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Whatever could be recovered from an upstream error body.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamDetail {
    /// Body parsed as JSON.
    Json(serde_json::Value),
    /// Raw body, truncated to [`MAX_ERROR_BODY_CHARS`].
    Text(String),
}

impl UpstreamDetail {
    /// Build a detail from a raw error body, preferring structured data.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(truncate(body, MAX_ERROR_BODY_CHARS)),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Text(text) => serde_json::Value::String(text.clone()),
        }
    }
}

impl fmt::Display for UpstreamDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{}", value),
            Self::Text(text) if text.is_empty() => f.write_str("<empty body>"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<reqwest::Error> for StatbankError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Internal(format!("failed to decode upstream response: {}", err))
        } else if err.is_builder() {
            Self::Internal(format!("failed to build upstream request: {}", err))
        } else {
            Self::Connectivity(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StatbankError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

/// Result type for Statbank operations.
pub type Result<T> = std::result::Result<T, StatbankError>;

/// Truncate on a char boundary, marking the cut with an ellipsis.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_prefers_json() {
        let detail = UpstreamDetail::from_body(r#"{"message":"bad table"}"#);
        assert_eq!(
            detail,
            UpstreamDetail::Json(serde_json::json!({"message": "bad table"}))
        );
        assert!(detail.to_string().contains("bad table"));
    }

    #[test]
    fn test_detail_truncates_raw_body() {
        let body = "x".repeat(MAX_ERROR_BODY_CHARS + 100);
        match UpstreamDetail::from_body(&body) {
            UpstreamDetail::Text(text) => {
                assert_eq!(text.chars().count(), MAX_ERROR_BODY_CHARS + 1);
                assert!(text.ends_with('…'));
            }
            other => panic!("expected text detail, got {:?}", other),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("ØÆÅøæå", 3), "ØÆÅ…");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn test_error_message_contains_upstream_detail() {
        let err = StatbankError::UpstreamRejected {
            status: 400,
            detail: UpstreamDetail::from_body(r#"{"message":"bad table"}"#),
        };
        assert_eq!(err.kind(), "upstream_rejected");
        assert!(err.to_string().contains("bad table"));
        assert!(err.to_string().contains("400"));
    }
}
