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

//! Statbank Client
//!
//! Async client forwarding typed queries to the Statbank API. Every call is a
//! single POST round trip: no retries, no caching.

use crate::error::{Result, StatbankError, UpstreamDetail};
use crate::format::Encoding;
use crate::query::{DataQuery, Endpoint, SubjectsQuery, TableInfoQuery, TablesQuery};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Public Statbank endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.statbank.dk/v1";

/// Statbank client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Statbank API
    pub base_url: String,
    /// Per-request timeout (default: none, the socket decides)
    pub timeout: Option<Duration>,
    /// User-Agent header sent upstream
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            user_agent: concat!("statbank-mcp/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Decoded payload of a data query.
#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl TableData {
    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Json(_) => Encoding::Json,
            Self::Text(_) => Encoding::Text,
            Self::Binary(_) => Encoding::Binary,
        }
    }
}

/// Client for the Statbank API.
///
/// # Example
///
/// ```no_run
/// use statbank_core::{ClientConfig, DataFormat, DataQuery, StatbankClient, TableData};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = StatbankClient::new(ClientConfig::default())?;
///     let query = DataQuery::new("folk1c").with_format(DataFormat::Csv);
///
///     if let TableData::Text(csv) = client.get_table_data(&query).await? {
///         println!("{}", csv);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StatbankClient {
    config: ClientConfig,
    http_client: HttpClient,
}

impl StatbankClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = HttpClient::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| StatbankError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a client around an existing HTTP client.
    pub fn with_http_client(config: ClientConfig, http_client: HttpClient) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.path()
        )
    }

    /// POST a body and return the response once its status is a success.
    async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<reqwest::Response> {
        let url = self.url(endpoint);
        debug!(endpoint = endpoint.path(), body = %body, "Statbank request");

        let response = self.http_client.post(&url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let raw = match response.text().await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(
                        endpoint = endpoint.path(),
                        status = status.as_u16(),
                        error = %e,
                        "Failed to read Statbank error body"
                    );
                    String::new()
                }
            };
            warn!(
                endpoint = endpoint.path(),
                status = status.as_u16(),
                body = %raw,
                "Statbank rejected request"
            );
            return Err(StatbankError::UpstreamRejected {
                status: status.as_u16(),
                detail: UpstreamDetail::from_body(&raw),
            });
        }

        Ok(response)
    }

    async fn post_json(&self, endpoint: Endpoint, body: &Value) -> Result<Value> {
        let response = self.post(endpoint, body).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// List subjects.
    pub async fn list_subjects(&self, query: &SubjectsQuery) -> Result<Value> {
        self.post_json(Endpoint::Subjects, &query.to_body()).await
    }

    /// List tables.
    pub async fn list_tables(&self, query: &TablesQuery) -> Result<Value> {
        self.post_json(Endpoint::Tables, &query.to_body()).await
    }

    /// Get table metadata.
    pub async fn get_table_info(&self, query: &TableInfoQuery) -> Result<Value> {
        self.post_json(Endpoint::TableInfo, &query.to_body()).await
    }

    /// Get table data, decoded according to the requested format.
    ///
    /// Text formats are decoded with the charset the upstream declares in
    /// `Content-Type`, falling back to UTF-8.
    pub async fn get_table_data(&self, query: &DataQuery) -> Result<TableData> {
        let format = query.format;
        let response = self.post(Endpoint::Data, &query.to_body()).await?;

        let data = match format.encoding() {
            Encoding::Text => TableData::Text(response.text().await?),
            Encoding::Json => TableData::Json(serde_json::from_slice(&response.bytes().await?)?),
            Encoding::Binary if format.is_streamed() => {
                TableData::Binary(collect_stream(response).await?)
            }
            Encoding::Binary => TableData::Binary(response.bytes().await?),
        };
        debug!(format = %format, "Statbank data received");

        Ok(data)
    }
}

/// Drain a chunked response into a single buffer.
async fn collect_stream(response: reqwest::Response) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = StatbankClient::new(ClientConfig::new("http://localhost:9/v1/")).unwrap();
        assert_eq!(client.url(Endpoint::Data), "http://localhost:9/v1/data");
        assert_eq!(client.url(Endpoint::TableInfo), "http://localhost:9/v1/tableinfo");
    }

    #[test]
    fn test_table_data_encoding() {
        assert_eq!(TableData::Json(serde_json::json!({})).encoding(), Encoding::Json);
        assert_eq!(TableData::Text(String::new()).encoding(), Encoding::Text);
        assert_eq!(
            TableData::Binary(Bytes::from_static(b"PK")).encoding(),
            Encoding::Binary
        );
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.timeout.is_none());
        assert!(config.user_agent.starts_with("statbank-mcp/"));
    }
}
