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

//! `statbank://` resource URIs.
//!
//! ```text
//! statbank://subjects
//! statbank://subjects/{subject_id}
//! statbank://tables
//! statbank://tableinfo/{table_id}
//! statbank://data/{table_id}
//! statbank://data/{table_id}/{format}
//! ```
//!
//! Variable filters are never carried in a URI; data resources fetch the
//! whole table in the chosen format.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use statbank_core::{
    DataFormat, DataQuery, Result, StatbankError, SubjectsQuery, TableData, TableInfoQuery,
    TablesQuery,
};
use std::fmt;

use crate::api::AppState;
use crate::mcp::protocol::{ReadResourceResult, Resource, ResourceContent, ResourceTemplate};

pub const URI_SCHEME: &str = "statbank://";

/// Format used by data resources that do not name one.
pub const DEFAULT_RESOURCE_FORMAT: DataFormat = DataFormat::Json;

const JSON_MIME: &str = "application/json";

/// A parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    Subjects,
    Subject(String),
    Tables,
    TableInfo(String),
    Data { table: String, format: DataFormat },
}

impl ResourceUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let path = uri
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| StatbankError::invalid(format!("Unsupported resource URI: {}", uri)))?;
        let segments: Vec<&str> = path.split('/').collect();

        let parsed = match segments.as_slice() {
            ["subjects"] => Self::Subjects,
            ["subjects", id] if !id.is_empty() => Self::Subject(id.to_string()),
            ["tables"] => Self::Tables,
            ["tableinfo", id] if !id.is_empty() => Self::TableInfo(id.to_string()),
            ["data", id] if !id.is_empty() => Self::Data {
                table: id.to_string(),
                format: DEFAULT_RESOURCE_FORMAT,
            },
            ["data", id, format] if !id.is_empty() => Self::Data {
                table: id.to_string(),
                format: format.parse()?,
            },
            _ => {
                return Err(StatbankError::invalid(format!(
                    "Unknown resource URI: {}",
                    uri
                )))
            }
        };
        Ok(parsed)
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subjects => write!(f, "{}subjects", URI_SCHEME),
            Self::Subject(id) => write!(f, "{}subjects/{}", URI_SCHEME, id),
            Self::Tables => write!(f, "{}tables", URI_SCHEME),
            Self::TableInfo(id) => write!(f, "{}tableinfo/{}", URI_SCHEME, id),
            Self::Data { table, format } => write!(f, "{}", data_uri(table, *format)),
        }
    }
}

pub fn data_uri(table: &str, format: DataFormat) -> String {
    format!("{}data/{}/{}", URI_SCHEME, table, format.as_str())
}

/// Static resources for `resources/list`.
pub fn list_resources() -> Vec<Resource> {
    vec![
        Resource {
            uri: ResourceUri::Subjects.to_string(),
            name: "Subjects".to_string(),
            description: Some("Top-level Statbank subjects".to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        },
        Resource {
            uri: ResourceUri::Tables.to_string(),
            name: "Tables".to_string(),
            description: Some("All active Statbank tables".to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        },
    ]
}

/// Parameterized resources for `resources/templates/list`.
pub fn list_templates() -> Vec<ResourceTemplate> {
    let template = |uri: &str, name: &str, description: &str, mime: Option<&str>| ResourceTemplate {
        uri_template: format!("{}{}", URI_SCHEME, uri),
        name: name.to_string(),
        description: Some(description.to_string()),
        mime_type: mime.map(String::from),
    };

    vec![
        template(
            "subjects/{subject_id}",
            "Subject",
            "Sub-subjects of one subject",
            Some(JSON_MIME),
        ),
        template(
            "tableinfo/{table_id}",
            "Table metadata",
            "Variables and value codes of one table",
            Some(JSON_MIME),
        ),
        template(
            "data/{table_id}",
            "Table data",
            "All data of one table as JSON",
            Some(JSON_MIME),
        ),
        template(
            "data/{table_id}/{format}",
            "Table data in format",
            "All data of one table in the given output format",
            None,
        ),
    ]
}

/// Wrap decoded table data as resource content.
pub fn table_data_content(
    uri: String,
    format: DataFormat,
    data: TableData,
) -> Result<ResourceContent> {
    let mime_type = Some(format.content_type().to_string());
    let content = match data {
        TableData::Json(value) => ResourceContent {
            uri,
            mime_type,
            text: Some(serde_json::to_string_pretty(&value)?),
            blob: None,
        },
        TableData::Text(text) => ResourceContent {
            uri,
            mime_type,
            text: Some(text),
            blob: None,
        },
        TableData::Binary(bytes) => ResourceContent {
            uri,
            mime_type,
            text: None,
            blob: Some(STANDARD.encode(&bytes)),
        },
    };
    Ok(content)
}

fn json_content(uri: String, value: &serde_json::Value) -> Result<ResourceContent> {
    Ok(ResourceContent {
        uri,
        mime_type: Some(JSON_MIME.to_string()),
        text: Some(serde_json::to_string_pretty(value)?),
        blob: None,
    })
}

/// Resolve a resource URI against the upstream.
pub async fn read_resource(state: &AppState, uri: &str) -> Result<ReadResourceResult> {
    let resource = ResourceUri::parse(uri)?;
    let lang = state.lang(None);

    let content = match &resource {
        ResourceUri::Subjects => {
            let query = SubjectsQuery::default().with_lang(lang);
            json_content(uri.to_string(), &state.client.list_subjects(&query).await?)?
        }
        ResourceUri::Subject(id) => {
            let query = SubjectsQuery::default()
                .with_subjects([id.as_str()])
                .with_lang(lang);
            json_content(uri.to_string(), &state.client.list_subjects(&query).await?)?
        }
        ResourceUri::Tables => {
            let query = TablesQuery {
                lang,
                ..TablesQuery::default()
            };
            json_content(uri.to_string(), &state.client.list_tables(&query).await?)?
        }
        ResourceUri::TableInfo(id) => {
            let query = TableInfoQuery::new(id.as_str()).with_lang(lang);
            json_content(uri.to_string(), &state.client.get_table_info(&query).await?)?
        }
        ResourceUri::Data { table, format } => {
            let query = DataQuery::new(table.as_str())
                .with_format(*format)
                .with_lang(lang);
            let data = state.client.get_table_data(&query).await?;
            table_data_content(uri.to_string(), *format, data)?
        }
    };

    Ok(ReadResourceResult {
        contents: vec![content],
    })
}
