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

//! MCP Request Handlers
//!
//! Dispatches JSON-RPC 2.0 requests for the MCP protocol.

use serde::Serialize;
use serde_json::{json, Value};
use statbank_core::StatbankError;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::api::AppState;
use crate::mcp::protocol::*;
use crate::mcp::resource::{list_resources, list_templates, read_resource};
use crate::mcp::tools::{register_statbank_tools, RegistrationError, ToolError, ToolRegistry};

/// MCP request handler
pub struct McpHandler {
    state: AppState,
    registry: Arc<ToolRegistry>,
}

impl McpHandler {
    /// Create a handler with the Statbank tools registered.
    pub fn new(state: AppState) -> Result<Self, RegistrationError> {
        let registry = ToolRegistry::new();
        register_statbank_tools(&registry, &state)?;
        Ok(Self {
            state,
            registry: Arc::new(registry),
        })
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Invalid JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    JsonRpcId::Null,
                    JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
                ));
            }
        };

        let id = value
            .get("id")
            .cloned()
            .and_then(|id| serde_json::from_value(id).ok())
            .unwrap_or(JsonRpcId::Null);

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            )),
        }
    }

    /// Handle a JSON-RPC request. Notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!(
                    "Unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            ));
        }

        info!(method = %request.method, "MCP request received");

        let response = match request.method.as_str() {
            "ping" => JsonRpcResponse::success(id, json!({})),
            "initialize" => self.handle_initialize(id),
            // Some clients send the notification with an id
            "initialized" | "notifications/initialized" => JsonRpcResponse::success(id, json!({})),

            "resources/list" => to_response(
                id,
                &ListResourcesResult {
                    resources: list_resources(),
                    next_cursor: None,
                },
            ),
            "resources/templates/list" => to_response(
                id,
                &ListResourceTemplatesResult {
                    resource_templates: list_templates(),
                    next_cursor: None,
                },
            ),
            "resources/read" => self.handle_resources_read(id, request.params).await,

            "tools/list" => to_response(
                id,
                &ListToolsResult {
                    tools: self.registry.list(),
                    next_cursor: None,
                },
            ),
            "tools/call" => self.handle_tools_call(id, request.params).await,

            _ => {
                warn!(method = %request.method, "Unknown MCP method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(&request.method))
            }
        };

        Some(response)
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" | "initialized" => info!("MCP client initialized"),
            "notifications/cancelled" => debug!("MCP client cancelled a request"),
            other => debug!(method = %other, "Ignoring MCP notification"),
        }
    }

    fn handle_initialize(&self, id: JsonRpcId) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Query Statistics Denmark (Statbank): browse subjects and tables, \
                 inspect table metadata, then fetch data with get_data."
                    .to_string(),
            ),
        };

        to_response(id, &result)
    }

    async fn handle_resources_read(&self, id: JsonRpcId, params: Option<Value>) -> JsonRpcResponse {
        let params: ReadResourceParams = match parse_params(params) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        match read_resource(&self.state, &params.uri).await {
            Ok(result) => to_response(id, &result),
            Err(err) => JsonRpcResponse::error(id, resource_error(&params.uri, err)),
        }
    }

    async fn handle_tools_call(&self, id: JsonRpcId, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match parse_params(params) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::error(id, e),
        };

        let arguments = Value::Object(params.arguments.unwrap_or_default());
        debug!(tool = %params.name, arguments = %arguments, "Calling tool");

        match self.registry.execute(&params.name, arguments).await {
            Ok(result) => to_response(id, &result),
            Err(ToolError::NotFound(name)) => JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("Unknown tool: {}", name)),
            ),
            Err(ToolError::InvalidParams(msg)) => {
                JsonRpcResponse::error(id, JsonRpcError::invalid_params(msg))
            }
            Err(ToolError::Upstream(msg)) => {
                warn!(tool = %params.name, error = %msg, "Tool call failed upstream");
                to_response(id, &CallToolResult::error_text(msg))
            }
            Err(ToolError::Internal(msg)) => {
                error!(tool = %params.name, error = %msg, "Tool call failed");
                JsonRpcResponse::error(id, JsonRpcError::internal_error("Internal error"))
            }
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn to_response<T: Serialize>(id: JsonRpcId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            error!(error = %e, "Failed to serialize MCP result");
            JsonRpcResponse::error(id, JsonRpcError::internal_error("Internal error"))
        }
    }
}

fn resource_error(uri: &str, err: StatbankError) -> JsonRpcError {
    match err {
        StatbankError::InvalidArgument(msg) => JsonRpcError::invalid_params(msg),
        StatbankError::Internal(msg) => {
            error!(uri = %uri, error = %msg, "Resource read failed");
            JsonRpcError::internal_error("Internal error")
        }
        other => {
            warn!(uri = %uri, error = %other, "Resource read failed upstream");
            JsonRpcError {
                data: Some(json!({"kind": other.kind()})),
                ..JsonRpcError::internal_error(other.to_string())
            }
        }
    }
}
