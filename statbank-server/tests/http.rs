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

// REST and MCP routes against a mock Statbank upstream.

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::{Stream, StreamExt};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use statbank_server::{app, build_state, config::ServerConfig};
use tower::ServiceExt;

async fn upstream() -> ServerGuard {
    Server::new_async().await
}

fn router_for(server: &ServerGuard) -> Router {
    let mut config = ServerConfig::default();
    config.upstream.base_url = server.url();
    let state = build_state(&config).unwrap();
    app(state, &config).unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn mcp(body: Value) -> Request<Body> {
    post("/mcp", body.to_string())
}

#[tokio::test]
async fn test_health() {
    let server = upstream().await;
    let (status, _, body) = send(router_for(&server), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "statbank-server");
}

#[tokio::test]
async fn test_subjects_route_forwards_flags() {
    let mut server = upstream().await;
    let mock = server
        .mock("POST", "/subjects")
        .match_body(Matcher::Json(json!({
            "format": "JSON",
            "lang": "en",
            "subjects": ["02", "03"],
            "recursive": true
        })))
        .with_status(200)
        .with_body(r#"[{"id":"02"}]"#)
        .create_async()
        .await;

    let (status, _, body) = send(
        router_for(&server),
        get("/api/v1/subjects?subjects=02,%2003&recursive=true&lang=en"),
    )
    .await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()[0]["id"], "02");
}

#[tokio::test]
async fn test_numeric_flag_is_accepted() {
    let mut server = upstream().await;
    let mock = server
        .mock("POST", "/subjects")
        .match_body(Matcher::Json(
            json!({"format": "JSON", "lang": "da", "includeTables": true}),
        ))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let (status, _, _) = send(router_for(&server), get("/api/v1/subjects?includeTables=1")).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_query_string_is_json_bad_request() {
    let server = upstream().await;
    let (status, content_type, body) =
        send(router_for(&server), get("/api/v1/subjects?recursive=maybe")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["kind"], "invalid_argument");
    assert!(body["error"].as_str().unwrap().contains("maybe"));
}

#[tokio::test]
async fn test_subject_by_id() {
    let mut server = upstream().await;
    let mock = server
        .mock("POST", "/subjects")
        .match_body(Matcher::Json(json!({"format": "JSON", "lang": "da", "subjects": ["02"]})))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let (status, _, _) = send(router_for(&server), get("/api/v1/subjects/02")).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tables_route_keeps_zero_pastdays() {
    let mut server = upstream().await;
    let mock = server
        .mock("POST", "/tables")
        .match_body(Matcher::Json(json!({"format": "JSON", "lang": "da", "pastdays": 0})))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let (status, _, _) = send(router_for(&server), get("/api/v1/tables?pastdays=0")).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tables_route_rejects_bad_pastdays() {
    let server = upstream().await;
    let (status, _, body) = send(router_for(&server), get("/api/v1/tables?pastdays=soon")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["kind"], "invalid_argument");
}

#[tokio::test]
async fn test_tableinfo_route() {
    let mut server = upstream().await;
    let mock = server
        .mock("POST", "/tableinfo")
        .match_body(Matcher::Json(json!({"table": "folk1c", "format": "JSON", "lang": "da"})))
        .with_status(200)
        .with_body(r#"{"id":"FOLK1C"}"#)
        .create_async()
        .await;

    let (status, content_type, _) =
        send(router_for(&server), get("/api/v1/tableinfo/folk1c")).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_data_route_csv_with_filters() {
    let mut server = upstream().await;
    let csv = "OMRÅDE;TID;INDHOLD\nHele landet;2024K1;5961249\n";
    let mock = server
        .mock("POST", "/data")
        .match_body(Matcher::Json(json!({
            "table": "folk1c",
            "format": "CSV",
            "lang": "da",
            "variables": [{"code": "OMRÅDE", "values": ["000"]}],
            "timeOrder": "Descending"
        })))
        .with_status(200)
        .with_body(csv)
        .create_async()
        .await;

    let (status, content_type, body) = send(
        router_for(&server),
        post(
            "/api/v1/data/folk1c?format=csv&timeOrder=descending",
            json!({"variables": [{"code": "OMRÅDE", "values": "000"}]}).to_string(),
        ),
    )
    .await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/csv"));
    assert_eq!(String::from_utf8(body).unwrap(), csv);
}

#[tokio::test]
async fn test_data_route_binary_format() {
    let mut server = upstream().await;
    server
        .mock("POST", "/data")
        .match_body(Matcher::PartialJson(json!({"format": "XLSX", "variables": []})))
        .with_status(200)
        .with_body(b"PK\x03\x04")
        .create_async()
        .await;

    let (status, content_type, body) = send(
        router_for(&server),
        post("/api/v1/data/folk1c?format=xlsx", Body::empty()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        content_type.as_deref(),
        Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    );
    assert_eq!(body, b"PK\x03\x04");
}

#[tokio::test]
async fn test_data_route_unknown_format_is_bad_request() {
    let server = upstream().await;
    let (status, _, body) = send(
        router_for(&server),
        post("/api/v1/data/folk1c?format=yaml", Body::empty()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("HTML5InclNotes"));
}

#[tokio::test]
async fn test_upstream_rejection_is_bad_gateway() {
    let mut server = upstream().await;
    server
        .mock("POST", "/data")
        .with_status(400)
        .with_body(r#"{"message":"bad table"}"#)
        .create_async()
        .await;

    let (status, _, body) = send(
        router_for(&server),
        post("/api/v1/data/nope", Body::empty()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["kind"], "upstream_rejected");
    assert_eq!(body["upstream_status"], 400);
    assert_eq!(body["detail"]["message"], "bad table");
}

#[tokio::test]
async fn test_mcp_get_data_tool_returns_text() {
    let mut server = upstream().await;
    server
        .mock("POST", "/data")
        .match_body(Matcher::Json(json!({
            "table": "folk1c",
            "format": "CSV",
            "lang": "da",
            "variables": [{"code": "OMRÅDE", "values": ["101"]}]
        })))
        .with_status(200)
        .with_body("a;b\n1;2\n")
        .create_async()
        .await;

    let (status, _, body) = send(
        router_for(&server),
        mcp(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {
                "name": "get_data",
                "arguments": {
                    "table_id": "folk1c",
                    "variables": [{"code": "OMRÅDE", "values": "101"}],
                    "format": "csv"
                }
            }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["result"]["content"][0]["text"], "a;b\n1;2\n");
    assert!(body["result"].get("isError").is_none());
}

#[tokio::test]
async fn test_mcp_get_data_binary_is_blob() {
    let mut server = upstream().await;
    server
        .mock("POST", "/data")
        .with_status(200)
        .with_body(b"PK\x03\x04")
        .create_async()
        .await;

    let (_, _, body) = send(
        router_for(&server),
        mcp(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "get_data", "arguments": {"table_id": "folk1c", "format": "XLSX"}}
        })),
    )
    .await;

    let body: Value = serde_json::from_slice(&body).unwrap();
    let content = &body["result"]["content"][0];
    assert_eq!(content["type"], "resource");
    assert_eq!(content["resource"]["blob"], "UEsDBA==");
    assert_eq!(content["resource"]["uri"], "statbank://data/folk1c/XLSX");
}

#[tokio::test]
async fn test_mcp_upstream_rejection_is_tool_error() {
    let mut server = upstream().await;
    server
        .mock("POST", "/tableinfo")
        .with_status(400)
        .with_body(r#"{"message":"bad table"}"#)
        .create_async()
        .await;

    let (_, _, body) = send(
        router_for(&server),
        mcp(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "get_table_info", "arguments": {"table_id": "nope"}}
        })),
    )
    .await;

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["result"]["isError"], true);
    assert!(body["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("bad table"));
}

#[tokio::test]
async fn test_mcp_resource_read() {
    let mut server = upstream().await;
    let mock = server
        .mock("POST", "/tableinfo")
        .match_body(Matcher::Json(json!({"table": "folk1c", "format": "JSON", "lang": "da"})))
        .with_status(200)
        .with_body(r#"{"id":"FOLK1C"}"#)
        .create_async()
        .await;

    let (_, _, body) = send(
        router_for(&server),
        mcp(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "resources/read",
            "params": {"uri": "statbank://tableinfo/folk1c"}
        })),
    )
    .await;

    mock.assert_async().await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    let content = &body["result"]["contents"][0];
    assert_eq!(content["mimeType"], "application/json");
    let text: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
    assert_eq!(text["id"], "FOLK1C");
}

#[tokio::test]
async fn test_mcp_notification_is_accepted_without_body() {
    let server = upstream().await;
    let (status, _, body) = send(
        router_for(&server),
        mcp(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_empty());
}

/// Read one complete server-sent event off a streaming body.
async fn next_sse_event<S>(events: &mut S) -> String
where
    S: Stream<Item = Result<Bytes, axum::Error>> + Unpin,
{
    let mut buffer = String::new();
    while !buffer.contains("\n\n") {
        let chunk = events.next().await.expect("event stream closed").unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
    }
    buffer
}

fn sse_field<'a>(event: &'a str, name: &str) -> &'a str {
    event
        .lines()
        .find_map(|line| line.strip_prefix(name))
        .map(str::trim_start)
        .unwrap_or_else(|| panic!("no {} field in {:?}", name, event))
}

#[tokio::test]
async fn test_mcp_sse_session_round_trip() {
    let server = upstream().await;
    let router = router_for(&server);

    let response = router.clone().oneshot(get("/mcp/sse")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let mut events = response.into_body().into_data_stream();
    let opening = next_sse_event(&mut events).await;
    assert_eq!(sse_field(&opening, "event:"), "endpoint");
    let endpoint = sse_field(&opening, "data:").to_string();
    assert!(endpoint.starts_with("/mcp/messages?session_id="));

    let (_, _, health) = send(router.clone(), get("/mcp/health")).await;
    let health: Value = serde_json::from_slice(&health).unwrap();
    assert_eq!(health["sse_sessions"], 1);

    let ping = json!({"jsonrpc": "2.0", "id": 7, "method": "ping"});
    let (status, _, body) = send(router.clone(), post(&endpoint, ping.to_string())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_empty());

    let message = next_sse_event(&mut events).await;
    assert_eq!(sse_field(&message, "event:"), "message");
    let reply: Value = serde_json::from_str(sse_field(&message, "data:")).unwrap();
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["result"], json!({}));

    drop(events);
    let (status, _, _) = send(router, post(&endpoint, ping.to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mcp_sse_message_needs_known_session() {
    let server = upstream().await;
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string();

    let (status, _, body) = send(
        router_for(&server),
        post("/mcp/messages?session_id=nope", ping.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, _, _) = send(router_for(&server), post("/mcp/messages", ping)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
