// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Waveframe relay server.
//!
//! Hosts the OAuth2 PKCE handshake, session refresh, channel identity,
//! and upload relay endpoints in front of the YouTube Data API.

use std::sync::Arc;
use waveframe::{config::Config, services::YouTubeClient, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    waveframe::init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Waveframe relay");

    let youtube = YouTubeClient::new(&config);
    tracing::info!(
        client_id = %config.google_client_id,
        preconfigured_login = config.preconfigured_refresh_token.is_some(),
        "YouTube client initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        youtube,
    });

    // Build router
    let app = waveframe::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
