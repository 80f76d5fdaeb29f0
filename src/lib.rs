// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Waveframe: turn an audio file into a YouTube-ready video.
//!
//! This crate provides the audio-to-video conversion pipeline (a static
//! color frame muxed against the original audio), a durable cache for
//! the converted artifact, and the OAuth2 PKCE relay service that
//! uploads the result to a YouTube account.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;

use config::Config;
use services::YouTubeClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared application state for the relay service.
pub struct AppState {
    pub config: Config,
    pub youtube: YouTubeClient,
}

/// Initialize structured JSON logging.
pub fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("waveframe=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
