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

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use http::header;
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use statbank_core::{
    DataFormat, DataQuery, StatbankError, SubjectsQuery, TableData, TableInfoQuery, TablesQuery,
    TimeOrder, ValuePresentation, VariableFilter,
};
use tracing::debug;

use crate::api::{ApiError, AppState};

/// Query parameters for subject listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectsParams {
    /// Comma-separated subject codes
    pub subjects: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub include_tables: bool,
    #[serde(default, deserialize_with = "flag")]
    pub recursive: bool,
    #[serde(default, deserialize_with = "flag")]
    pub omit_inactive_subjects: bool,
    pub lang: Option<String>,
}

/// Query parameters for table listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesParams {
    pub subjects: Option<String>,
    /// Kept as text so a bad value reports as an invalid argument
    #[serde(alias = "pastDays")]
    pub pastdays: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub include_inactive: bool,
    pub lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LangParams {
    pub lang: Option<String>,
}

/// Query parameters for data retrieval. Variable filters travel in the body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataParams {
    pub format: Option<String>,
    pub time_order: Option<String>,
    pub lang: Option<String>,
    pub value_presentation: Option<String>,
}

/// Boolean query flag: `true`/`false`, `1`/`0` or `yes`/`no`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(de::Error::custom(format!(
            "expected true or false, got '{}'",
            other
        ))),
    }
}

/// Split a comma-separated list, dropping blanks.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

pub(crate) fn parse_past_days(raw: Option<&str>) -> Result<Option<u32>, StatbankError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<u32>().map(Some).map_err(|_| {
            StatbankError::invalid(format!(
                "pastdays must be a non-negative integer, got '{}'",
                value
            ))
        }),
    }
}

/// Variable filters from a data request body: empty, a list, or `{"variables": [...]}`.
fn parse_variables(body: &[u8]) -> Result<Vec<VariableFilter>, StatbankError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| StatbankError::invalid(format!("Request body is not valid JSON: {}", e)))?;

    match value {
        Value::Object(mut object) => {
            VariableFilter::parse_list(&object.remove("variables").unwrap_or(Value::Null))
        }
        other => VariableFilter::parse_list(&other),
    }
}

fn subjects_query(
    state: &AppState,
    params: SubjectsParams,
    subjects: Vec<String>,
) -> SubjectsQuery {
    SubjectsQuery {
        subjects,
        include_tables: params.include_tables,
        recursive: params.recursive,
        omit_inactive_subjects: params.omit_inactive_subjects,
        lang: state.lang(params.lang),
    }
}

/// GET /api/v1/subjects
pub async fn list_subjects(
    State(state): State<AppState>,
    params: Result<Query<SubjectsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let subjects = split_list(params.subjects.as_deref());
    let query = subjects_query(&state, params, subjects);
    Ok(Json(state.client.list_subjects(&query).await?))
}

/// GET /api/v1/subjects/:subject_id
pub async fn get_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    params: Result<Query<SubjectsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let query = subjects_query(&state, params, vec![subject_id]);
    Ok(Json(state.client.list_subjects(&query).await?))
}

/// GET /api/v1/tables
pub async fn list_tables(
    State(state): State<AppState>,
    params: Result<Query<TablesParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let query = TablesQuery {
        subjects: split_list(params.subjects.as_deref()),
        past_days: parse_past_days(params.pastdays.as_deref())?,
        include_inactive: params.include_inactive,
        lang: state.lang(params.lang),
    };
    Ok(Json(state.client.list_tables(&query).await?))
}

/// GET /api/v1/tableinfo/:table_id
pub async fn get_table_info(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    params: Result<Query<LangParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let query = TableInfoQuery::new(table_id).with_lang(state.lang(params.lang));
    Ok(Json(state.client.get_table_info(&query).await?))
}

/// POST /api/v1/data/:table_id
pub async fn get_data(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    params: Result<Query<DataParams>, QueryRejection>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let mut query = DataQuery::new(table_id)
        .with_variables(parse_variables(&body)?)
        .with_lang(state.lang(params.lang));

    if let Some(format) = params.format.as_deref() {
        query = query.with_format(format.parse::<DataFormat>()?);
    }
    if let Some(order) = params.time_order.as_deref() {
        query = query.with_time_order(order.parse::<TimeOrder>()?);
    }
    if let Some(presentation) = params.value_presentation.as_deref() {
        query = query.with_value_presentation(presentation.parse::<ValuePresentation>()?);
    }

    debug!(table = %query.table, format = %query.format, "Data request");
    let format = query.format;
    let data = state.client.get_table_data(&query).await?;

    Ok(match data {
        TableData::Json(value) => Json(value).into_response(),
        TableData::Text(text) => {
            ([(header::CONTENT_TYPE, format.content_type())], text).into_response()
        }
        TableData::Binary(bytes) => {
            ([(header::CONTENT_TYPE, format.content_type())], bytes).into_response()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("02, 03,,")), vec!["02", "03"]);
        assert!(split_list(Some("")).is_empty());
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_parse_past_days() {
        assert_eq!(parse_past_days(Some("0")).unwrap(), Some(0));
        assert_eq!(parse_past_days(Some(" 7 ")).unwrap(), Some(7));
        assert_eq!(parse_past_days(None).unwrap(), None);
        assert!(parse_past_days(Some("-1")).is_err());
        assert!(parse_past_days(Some("1.5")).is_err());
    }

    #[test]
    fn test_parse_variables_body_shapes() {
        assert!(parse_variables(b"").unwrap().is_empty());
        assert!(parse_variables(b"{}").unwrap().is_empty());

        let wrapped =
            parse_variables(r#"{"variables":[{"code":"KØN","values":"1"}]}"#.as_bytes()).unwrap();
        assert_eq!(wrapped, vec![VariableFilter::new("KØN", ["1"])]);

        let bare = parse_variables(r#"[{"code":"KØN","values":["1","2"]}]"#.as_bytes()).unwrap();
        assert_eq!(bare[0].values, vec!["1", "2"]);

        assert!(parse_variables(b"not json").is_err());
        assert!(parse_variables(br#"{"variables":[{"values":"1"}]}"#).is_err());
    }

    #[test]
    fn test_flags_accept_numeric_and_word_forms() {
        let uri: http::Uri = "/subjects?includeTables=1&recursive=yes&omitInactiveSubjects=0"
            .parse()
            .unwrap();
        let Query(params) = Query::<SubjectsParams>::try_from_uri(&uri).unwrap();
        assert!(params.include_tables);
        assert!(params.recursive);
        assert!(!params.omit_inactive_subjects);

        let uri: http::Uri = "/tables?includeInactive=maybe".parse().unwrap();
        let err = Query::<TablesParams>::try_from_uri(&uri).unwrap_err();
        assert!(ApiError::from(err).to_string().contains("maybe"));
    }
}
