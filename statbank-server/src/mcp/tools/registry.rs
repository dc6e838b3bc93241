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

//! MCP tool registry with JSON schema validation.

use async_trait::async_trait;
use dashmap::DashMap;
use jsonschema::JSONSchema;
use serde_json::Value;
use statbank_core::StatbankError;
use std::sync::Arc;
use thiserror::Error;

use crate::mcp::protocol::{CallToolResult, Tool};

/// Trait for MCP tools.
#[async_trait]
pub trait McpTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> &Value;

    /// Run the tool. `params` has already passed schema validation.
    async fn execute(&self, params: Value) -> Result<CallToolResult, ToolError>;
}

/// Registry for MCP tools.
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn McpTool>>,
    validators: DashMap<String, Arc<JSONSchema>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            validators: DashMap::new(),
        }
    }

    pub fn register(&self, tool: Arc<dyn McpTool>) -> Result<(), RegistrationError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistrationError::DuplicateName(name));
        }

        let validator = JSONSchema::options()
            .compile(tool.input_schema())
            .map_err(|e| RegistrationError::Schema(e.to_string()))?;
        self.validators.insert(name.clone(), Arc::new(validator));
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Registered tools, sorted by name.
    pub fn list(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools
            .iter()
            .map(|entry| {
                let tool = entry.value();
                Tool {
                    name: tool.name().to_string(),
                    description: Some(tool.description().to_string()),
                    input_schema: tool.input_schema().clone(),
                }
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute(&self, name: &str, params: Value) -> Result<CallToolResult, ToolError> {
        // Clone out of the maps so no shard lock is held across the await.
        let tool = self
            .tools
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let validator = self
            .validators
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        if let Err(errors) = validator.validate(&params) {
            let message: String = errors
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ToolError::InvalidParams(message));
        }

        tool.execute(params).await
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("Invalid tool params: {0}")]
    InvalidParams(String),
    /// Statbank refused the request or could not be reached
    #[error("{0}")]
    Upstream(String),
    #[error("Execution error: {0}")]
    Internal(String),
}

impl From<StatbankError> for ToolError {
    fn from(err: StatbankError) -> Self {
        match err {
            StatbankError::InvalidArgument(msg) => ToolError::InvalidParams(msg),
            StatbankError::UpstreamRejected { .. } | StatbankError::Connectivity(_) => {
                ToolError::Upstream(err.to_string())
            }
            StatbankError::Internal(msg) => ToolError::Internal(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Duplicate tool name: {0}")]
    DuplicateName(String),
    #[error("Invalid schema: {0}")]
    Schema(String),
}
