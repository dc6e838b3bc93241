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

//! Model Context Protocol (MCP) server
//!
//! Exposes the Statbank operations to AI assistants as MCP tools and
//! `statbank://` resources, speaking JSON-RPC 2.0.
//!
//! ## Transports
//!
//! - HTTP: `POST /mcp` takes one JSON-RPC message per request
//! - SSE: `GET /mcp/sse` streams responses to messages posted at `/mcp/messages`
//! - stdio: newline-delimited JSON on stdin/stdout
//!
//! ```rust,ignore
//! let handler = Arc::new(McpHandler::new(state)?);
//! let app = McpServer::new(handler).router();
//! ```

pub mod handlers;
pub mod protocol;
pub mod resource;
pub mod server;
pub mod tools;
pub mod transport;

pub use handlers::McpHandler;
pub use protocol::*;
pub use resource::{read_resource, ResourceUri};
pub use server::{McpServer, McpServerState};
pub use tools::{McpTool, RegistrationError, ToolError, ToolRegistry};
pub use transport::{serve, ChannelTransport, McpTransport, StdioTransport, TransportError};
