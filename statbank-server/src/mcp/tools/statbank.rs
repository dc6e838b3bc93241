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

//! Statbank tools: subjects, tables, table metadata and table data.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use statbank_core::{
    DataFormat, DataQuery, SubjectsQuery, TableData, TableInfoQuery, TablesQuery, TimeOrder,
    ValuePresentation, VariableFilter,
};
use std::sync::Arc;
use tracing::debug;

use crate::api::AppState;
use crate::mcp::protocol::{CallToolResult, ToolContent};
use crate::mcp::resource::{data_uri, table_data_content};
use crate::mcp::tools::registry::{McpTool, RegistrationError, ToolError, ToolRegistry};

/// Register the four Statbank tools.
pub fn register_statbank_tools(
    registry: &ToolRegistry,
    state: &AppState,
) -> Result<(), RegistrationError> {
    registry.register(Arc::new(GetSubjectsTool::new(state.clone())))?;
    registry.register(Arc::new(GetTablesTool::new(state.clone())))?;
    registry.register(Arc::new(GetTableInfoTool::new(state.clone())))?;
    registry.register(Arc::new(GetDataTool::new(state.clone())))?;
    Ok(())
}

fn parse_args<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// Pretty-printed JSON as text content.
fn json_content(value: &Value) -> Result<CallToolResult, ToolError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| ToolError::Internal(e.to_string()))?;
    Ok(CallToolResult::success(ToolContent::Text { text }))
}

fn lang_schema() -> Value {
    json!({
        "type": "string",
        "description": "Language code (\"da\" or \"en\")"
    })
}

fn subjects_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "items": {"type": "string"},
        "description": description
    })
}

// -----------------------------------------------------------------------------
// get_subjects
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetSubjectsArgs {
    #[serde(default)]
    subjects: Option<Vec<String>>,
    #[serde(default)]
    include_tables: bool,
    #[serde(default)]
    recursive: bool,
    #[serde(default)]
    omit_inactive_subjects: bool,
    #[serde(default)]
    lang: Option<String>,
}

pub struct GetSubjectsTool {
    state: AppState,
    schema: Value,
}

impl GetSubjectsTool {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "subjects": subjects_schema("Subject codes whose sub-subjects should be listed"),
                    "includeTables": {"type": "boolean", "description": "Include tables under each subject"},
                    "recursive": {"type": "boolean", "description": "Descend through all subject levels"},
                    "omitInactiveSubjects": {"type": "boolean", "description": "Leave out subjects that are no longer updated"},
                    "lang": lang_schema()
                },
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl McpTool for GetSubjectsTool {
    fn name(&self) -> &str {
        "get_subjects"
    }

    fn description(&self) -> &str {
        "List the Statbank subject hierarchy, optionally below given subject codes"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<CallToolResult, ToolError> {
        let args: GetSubjectsArgs = parse_args(params)?;
        let query = SubjectsQuery {
            subjects: args.subjects.unwrap_or_default(),
            include_tables: args.include_tables,
            recursive: args.recursive,
            omit_inactive_subjects: args.omit_inactive_subjects,
            lang: self.state.lang(args.lang),
        };

        let subjects = self.state.client.list_subjects(&query).await?;
        json_content(&subjects)
    }
}

// -----------------------------------------------------------------------------
// get_tables
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTablesArgs {
    #[serde(default)]
    subjects: Option<Vec<String>>,
    #[serde(default)]
    pastdays: Option<u32>,
    #[serde(default)]
    include_inactive: bool,
    #[serde(default)]
    lang: Option<String>,
}

pub struct GetTablesTool {
    state: AppState,
    schema: Value,
}

impl GetTablesTool {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "subjects": subjects_schema("Subject codes to filter tables on"),
                    "pastdays": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Only tables updated within this many days (0 = today)"
                    },
                    "includeInactive": {"type": "boolean", "description": "Include discontinued tables"},
                    "lang": lang_schema()
                },
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl McpTool for GetTablesTool {
    fn name(&self) -> &str {
        "get_tables"
    }

    fn description(&self) -> &str {
        "List Statbank tables, optionally filtered by subject and recent updates"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<CallToolResult, ToolError> {
        let args: GetTablesArgs = parse_args(params)?;
        let query = TablesQuery {
            subjects: args.subjects.unwrap_or_default(),
            past_days: args.pastdays,
            include_inactive: args.include_inactive,
            lang: self.state.lang(args.lang),
        };

        let tables = self.state.client.list_tables(&query).await?;
        json_content(&tables)
    }
}

// -----------------------------------------------------------------------------
// get_table_info
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GetTableInfoArgs {
    table_id: String,
    #[serde(default)]
    lang: Option<String>,
}

pub struct GetTableInfoTool {
    state: AppState,
    schema: Value,
}

impl GetTableInfoTool {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "table_id": {"type": "string", "minLength": 1, "description": "Table code, e.g. \"folk1c\""},
                    "lang": lang_schema()
                },
                "required": ["table_id"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl McpTool for GetTableInfoTool {
    fn name(&self) -> &str {
        "get_table_info"
    }

    fn description(&self) -> &str {
        "Get metadata for a Statbank table: variables, value codes and update times"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<CallToolResult, ToolError> {
        let args: GetTableInfoArgs = parse_args(params)?;
        let query = TableInfoQuery::new(args.table_id).with_lang(self.state.lang(args.lang));

        let info = self.state.client.get_table_info(&query).await?;
        json_content(&info)
    }
}

// -----------------------------------------------------------------------------
// get_data
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetDataArgs {
    #[serde(rename = "table_id")]
    table_id: String,
    #[serde(default)]
    variables: Option<Value>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    time_order: Option<String>,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    value_presentation: Option<String>,
}

impl GetDataArgs {
    fn into_query(self, state: &AppState) -> Result<DataQuery, ToolError> {
        let variables = match &self.variables {
            Some(value) => VariableFilter::parse_list(value)?,
            None => Vec::new(),
        };

        let mut query = DataQuery::new(self.table_id)
            .with_variables(variables)
            .with_lang(state.lang(self.lang));

        if let Some(format) = self.format.as_deref() {
            query = query.with_format(format.parse::<DataFormat>()?);
        }
        if let Some(order) = self.time_order.as_deref() {
            query = query.with_time_order(order.parse::<TimeOrder>()?);
        }
        if let Some(presentation) = self.value_presentation.as_deref() {
            query = query.with_value_presentation(presentation.parse::<ValuePresentation>()?);
        }

        Ok(query)
    }
}

pub struct GetDataTool {
    state: AppState,
    schema: Value,
}

impl GetDataTool {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "table_id": {"type": "string", "minLength": 1, "description": "Table code, e.g. \"folk1c\""},
                    "variables": {
                        "type": ["array", "null"],
                        "description": "Filters, each {\"code\": variable code, \"values\": value code or list of codes}. Empty or absent selects all values.",
                        "items": {
                            "type": "object",
                            "properties": {
                                "code": {"type": "string"},
                                "values": {
                                    "type": ["array", "string", "number"],
                                    "items": {"type": ["string", "number"]}
                                }
                            },
                            "required": ["code", "values"]
                        }
                    },
                    "format": {
                        "type": "string",
                        "description": format!("Output format (default JSONSTAT). One of: {}", DataFormat::valid_list())
                    },
                    "timeOrder": {"type": "string", "description": "\"Ascending\" or \"Descending\""},
                    "lang": lang_schema(),
                    "valuePresentation": {"type": "string", "description": "\"Code\" or \"Text\""}
                },
                "required": ["table_id"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl McpTool for GetDataTool {
    fn name(&self) -> &str {
        "get_data"
    }

    fn description(&self) -> &str {
        "Fetch data from a Statbank table in the requested output format"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<CallToolResult, ToolError> {
        let args: GetDataArgs = parse_args(params)?;
        let query = args.into_query(&self.state)?;
        debug!(table = %query.table, format = %query.format, "get_data");

        let data = self.state.client.get_table_data(&query).await?;
        match data {
            TableData::Json(value) => json_content(&value),
            other => {
                let uri = data_uri(&query.table, query.format);
                let content = table_data_content(uri, query.format, other)?;
                // Text formats go inline; binary ones travel as a base64 resource.
                let content = if content.blob.is_some() {
                    ToolContent::Resource { resource: content }
                } else {
                    ToolContent::Text {
                        text: content.text.unwrap_or_default(),
                    }
                };
                Ok(CallToolResult::success(content))
            }
        }
    }
}
