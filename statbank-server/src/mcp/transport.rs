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

//! MCP transport abstraction (stdio and in-process channels).

use async_trait::async_trait;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::mcp::handlers::McpHandler;

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Channel closed")]
    ChannelClosed,
}

/// Transport abstraction for MCP JSON-RPC messages.
#[async_trait]
pub trait McpTransport: Send {
    /// Next inbound message, or `None` once the peer has gone away.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;
    /// Send one outbound message.
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;
}

/// Newline-delimited JSON over a reader/writer pair, stdin/stdout by default.
pub struct StdioTransport<R = BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    reader: R,
    writer: W,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self::from_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn from_io(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl<R, W> McpTransport for StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Channel-backed transport for tests and in-process use.
pub struct ChannelTransport {
    input: mpsc::Receiver<String>,
    output: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(input: mpsc::Receiver<String>, output: mpsc::Sender<String>) -> Self {
        Self { input, output }
    }

    /// A transport plus the peer ends: send requests in, read responses out.
    pub fn pair(buffer: usize) -> (Self, mpsc::Sender<String>, mpsc::Receiver<String>) {
        let (request_tx, request_rx) = mpsc::channel(buffer);
        let (response_tx, response_rx) = mpsc::channel(buffer);
        (Self::new(request_rx, response_tx), request_tx, response_rx)
    }
}

#[async_trait]
impl McpTransport for ChannelTransport {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.input.recv().await)
    }

    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        self.output
            .send(message.to_string())
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Answer messages from `transport` until the peer closes it.
pub async fn serve<T: McpTransport>(
    handler: &McpHandler,
    transport: &mut T,
) -> Result<(), TransportError> {
    info!("MCP transport loop started");

    while let Some(message) = transport.recv().await? {
        let Some(response) = handler.handle_message(&message).await else {
            continue;
        };
        let payload = serde_json::to_string(&response)?;
        transport.send(&payload).await?;
    }

    debug!("MCP peer closed the transport");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AppState;
    use serde_json::Value;
    use statbank_core::{ClientConfig, StatbankClient};

    fn handler() -> McpHandler {
        let client = StatbankClient::new(ClientConfig::new("http://127.0.0.1:9/v1")).unwrap();
        McpHandler::new(AppState::new(client, "da")).unwrap()
    }

    #[tokio::test]
    async fn test_stdio_lines_in_lines_out() {
        let input: &'static [u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n            \n            {\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n            {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n";
        let mut transport = StdioTransport::from_io(BufReader::new(input), Vec::new());

        serve(&handler(), &mut transport).await.unwrap();

        let (_, written) = transport.into_inner();
        let lines: Vec<Value> = String::from_utf8(written)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[0]["result"], serde_json::json!({}));
        assert_eq!(lines[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_channel_transport_round_trip() {
        let (mut transport, requests, mut responses) = ChannelTransport::pair(4);
        let handler = handler();

        requests
            .send(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#.to_string())
            .await
            .unwrap();
        drop(requests);

        serve(&handler, &mut transport).await.unwrap();

        let response: Value = serde_json::from_str(&responses.recv().await.unwrap()).unwrap();
        assert_eq!(response["id"], "a");
    }
}
