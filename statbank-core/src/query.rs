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

//! Typed queries and the request bodies they produce.
//!
//! Optional flags are only written when set: upstream treats a missing key as
//! "use the default", which is not the same as an explicit `false`.

use crate::filter::VariableFilter;
use crate::format::{DataFormat, TimeOrder, ValuePresentation};
use serde_json::{json, Map, Value};

/// Language used when the caller does not pick one.
pub const DEFAULT_LANG: &str = "da";

/// Format requested for every metadata endpoint.
const METADATA_FORMAT: &str = "JSON";

/// Upstream sub-resource addressed by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Subjects,
    Tables,
    TableInfo,
    Data,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Subjects => "subjects",
            Self::Tables => "tables",
            Self::TableInfo => "tableinfo",
            Self::Data => "data",
        }
    }
}

fn metadata_body(lang: &str) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("format".into(), json!(METADATA_FORMAT));
    body.insert("lang".into(), json!(lang));
    body
}

/// List subjects, optionally below given subject codes.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectsQuery {
    pub subjects: Vec<String>,
    pub include_tables: bool,
    pub recursive: bool,
    pub omit_inactive_subjects: bool,
    pub lang: String,
}

impl Default for SubjectsQuery {
    fn default() -> Self {
        Self {
            subjects: Vec::new(),
            include_tables: false,
            recursive: false,
            omit_inactive_subjects: false,
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

impl SubjectsQuery {
    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn to_body(&self) -> Value {
        let mut body = metadata_body(&self.lang);
        if !self.subjects.is_empty() {
            body.insert("subjects".into(), json!(self.subjects));
        }
        if self.include_tables {
            body.insert("includeTables".into(), json!(true));
        }
        if self.recursive {
            body.insert("recursive".into(), json!(true));
        }
        if self.omit_inactive_subjects {
            body.insert("omitInactiveSubjects".into(), json!(true));
        }
        Value::Object(body)
    }
}

/// List tables, optionally restricted to subjects or recent updates.
#[derive(Debug, Clone, PartialEq)]
pub struct TablesQuery {
    pub subjects: Vec<String>,
    /// Only tables updated within this many days. `Some(0)` is sent as-is.
    pub past_days: Option<u32>,
    pub include_inactive: bool,
    pub lang: String,
}

impl Default for TablesQuery {
    fn default() -> Self {
        Self {
            subjects: Vec::new(),
            past_days: None,
            include_inactive: false,
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

impl TablesQuery {
    pub fn with_past_days(mut self, days: u32) -> Self {
        self.past_days = Some(days);
        self
    }

    pub fn to_body(&self) -> Value {
        let mut body = metadata_body(&self.lang);
        if !self.subjects.is_empty() {
            body.insert("subjects".into(), json!(self.subjects));
        }
        if let Some(days) = self.past_days {
            body.insert("pastdays".into(), json!(days));
        }
        if self.include_inactive {
            body.insert("includeInactive".into(), json!(true));
        }
        Value::Object(body)
    }
}

/// Metadata (variables and value codes) of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfoQuery {
    pub table: String,
    pub lang: String,
}

impl TableInfoQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            lang: DEFAULT_LANG.to_string(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn to_body(&self) -> Value {
        json!({
            "table": self.table,
            "format": METADATA_FORMAT,
            "lang": self.lang,
        })
    }
}

/// Tabular data retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuery {
    pub table: String,
    pub variables: Vec<VariableFilter>,
    pub format: DataFormat,
    pub time_order: Option<TimeOrder>,
    pub lang: String,
    pub value_presentation: Option<ValuePresentation>,
}

impl DataQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            variables: Vec::new(),
            format: DataFormat::default(),
            time_order: None,
            lang: DEFAULT_LANG.to_string(),
            value_presentation: None,
        }
    }

    pub fn with_variables(mut self, variables: Vec<VariableFilter>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_format(mut self, format: DataFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_time_order(mut self, order: TimeOrder) -> Self {
        self.time_order = Some(order);
        self
    }

    pub fn with_value_presentation(mut self, presentation: ValuePresentation) -> Self {
        self.value_presentation = Some(presentation);
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// `variables` is always present; an empty list lets upstream eliminate
    /// variables on its own.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("table".into(), json!(self.table));
        body.insert("format".into(), json!(self.format.as_str()));
        body.insert("lang".into(), json!(self.lang));
        body.insert("variables".into(), json!(self.variables));
        if let Some(order) = self.time_order {
            body.insert("timeOrder".into(), json!(order.as_str()));
        }
        if let Some(presentation) = self.value_presentation {
            body.insert("valuePresentation".into(), json!(presentation.as_str()));
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects_defaults_send_no_optional_keys() {
        assert_eq!(
            SubjectsQuery::default().to_body(),
            json!({"format": "JSON", "lang": "da"})
        );
    }

    #[test]
    fn test_subjects_flags_only_when_true() {
        let query = SubjectsQuery {
            subjects: vec!["02".into()],
            include_tables: true,
            recursive: false,
            omit_inactive_subjects: true,
            lang: "en".into(),
        };
        assert_eq!(
            query.to_body(),
            json!({
                "format": "JSON",
                "lang": "en",
                "subjects": ["02"],
                "includeTables": true,
                "omitInactiveSubjects": true,
            })
        );
    }

    #[test]
    fn test_tables_keeps_zero_past_days() {
        let body = TablesQuery::default().with_past_days(0).to_body();
        assert_eq!(body["pastdays"], json!(0));

        let unspecified = TablesQuery::default().to_body();
        assert!(unspecified.get("pastdays").is_none());
    }

    #[test]
    fn test_tables_empty_subjects_omitted() {
        let query = TablesQuery {
            include_inactive: true,
            ..Default::default()
        };
        assert_eq!(
            query.to_body(),
            json!({"format": "JSON", "lang": "da", "includeInactive": true})
        );
    }

    #[test]
    fn test_table_info_body() {
        assert_eq!(
            TableInfoQuery::new("folk1c").to_body(),
            json!({"table": "folk1c", "format": "JSON", "lang": "da"})
        );
    }

    #[test]
    fn test_data_body_always_has_variables() {
        let body = DataQuery::new("folk1c").to_body();
        assert_eq!(
            body,
            json!({"table": "folk1c", "format": "JSONSTAT", "lang": "da", "variables": []})
        );
    }

    #[test]
    fn test_data_body_with_options() {
        let body = DataQuery::new("folk1c")
            .with_variables(vec![VariableFilter::new("OMRÅDE", ["101"])])
            .with_format(DataFormat::Csv)
            .with_time_order(TimeOrder::Descending)
            .with_value_presentation(ValuePresentation::Code)
            .to_body();
        assert_eq!(
            body,
            json!({
                "table": "folk1c",
                "format": "CSV",
                "lang": "da",
                "variables": [{"code": "OMRÅDE", "values": ["101"]}],
                "timeOrder": "Descending",
                "valuePresentation": "Code",
            })
        );
    }
}
