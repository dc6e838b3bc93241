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

//! Variable filters restricting a data query to selected dimension values.

use crate::error::{Result, StatbankError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A `(code, values)` pair. `values` is always a list once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableFilter {
    pub code: String,
    pub values: Vec<String>,
}

impl VariableFilter {
    pub fn new<I, S>(code: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            code: code.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Coerce an untyped entry into a filter.
    ///
    /// A scalar `values` becomes a one-element list. Entries that are not an
    /// object, or lack either field, are rejected.
    pub fn from_value(entry: &Value) -> Result<Self> {
        let object = entry.as_object().ok_or_else(|| {
            StatbankError::invalid(format!(
                "Each variable must be an object with 'code' and 'values' keys, got {}",
                entry
            ))
        })?;

        let code = match object.get("code") {
            Some(Value::String(code)) if !code.trim().is_empty() => code.clone(),
            Some(Value::String(_)) => {
                return Err(StatbankError::invalid("Variable 'code' must not be empty"))
            }
            Some(other) => {
                return Err(StatbankError::invalid(format!(
                    "Variable 'code' must be a string, got {}",
                    other
                )))
            }
            None => {
                return Err(StatbankError::invalid(
                    "Each variable must have 'code' and 'values' keys (missing 'code')",
                ))
            }
        };

        let values = match object.get("values") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| scalar_to_string(item, &code))
                .collect::<Result<Vec<_>>>()?,
            Some(Value::Null) | None => {
                return Err(StatbankError::invalid(format!(
                    "Variable '{}' must have a 'values' key",
                    code
                )))
            }
            Some(scalar) => vec![scalar_to_string(scalar, &code)?],
        };

        Ok(Self { code, values })
    }

    /// Normalize an optional list of untyped entries. Absent means empty.
    pub fn normalize_all(entries: Option<&[Value]>) -> Result<Vec<Self>> {
        entries
            .unwrap_or_default()
            .iter()
            .map(Self::from_value)
            .collect()
    }

    /// Normalize a `variables` field of unknown shape. `null` means empty.
    pub fn parse_list(value: &Value) -> Result<Vec<Self>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Self::normalize_all(Some(items.as_slice())),
            other => Err(StatbankError::invalid(format!(
                "'variables' must be a list of {{code, values}} objects, got {}",
                other
            ))),
        }
    }
}

fn scalar_to_string(value: &Value, code: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(StatbankError::invalid(format!(
            "Values of variable '{}' must be strings, got {}",
            code, other
        ))),
    }
}

impl<'de> Deserialize<'de> for VariableFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(&raw).map_err(serde::de::Error::custom)
    }
}
