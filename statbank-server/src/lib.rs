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

//! Statbank server: REST and MCP surfaces over the Statbank API.

pub mod api;
pub mod config;
pub mod mcp;

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{api_router, health_check, AppState};
use config::{LoggingConfig, ServerConfig};
use mcp::{McpHandler, McpServer, StdioTransport};
use statbank_core::StatbankClient;

/// Install the global subscriber. Logs go to stderr so stdout stays free
/// for the stdio transport.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;
    Ok(())
}

/// Shared state built from configuration.
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let client = StatbankClient::new(config.upstream.client_config())?;
    Ok(AppState::new(client, config.defaults.lang.as_str()))
}

/// Full application router: health, REST under `/api/v1`, MCP under `/mcp`.
pub fn app(state: AppState, config: &ServerConfig) -> Result<Router> {
    let handler = Arc::new(McpHandler::new(state.clone())?);

    let cors = if config.server.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_router())
        .with_state(state)
        .merge(McpServer::new(handler).router())
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    init_tracing(&config.logging)?;

    tracing::info!("Starting Statbank server");
    tracing::debug!("Configuration: {:#?}", config);

    config.validate()?;

    let state = build_state(&config)?;
    let app = app(state, &config)?;

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Listening on http://{} (upstream {})",
        addr,
        config.upstream.base_url
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Serve MCP over stdin/stdout until the client closes stdin.
pub async fn run_stdio(config: ServerConfig) -> Result<()> {
    init_tracing(&config.logging)?;

    tracing::info!("Starting Statbank MCP server on stdio");
    config.validate()?;

    let handler = McpHandler::new(build_state(&config)?)?;
    let mut transport = StdioTransport::new();
    mcp::serve(&handler, &mut transport).await?;

    tracing::info!("Stdio transport closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        futures::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
