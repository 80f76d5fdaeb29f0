// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The Google/YouTube base URLs default to the real endpoints and are
//! overridable so tests can point them at a local mock server.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Operator-provisioned refresh token for the preconfigured-account login
    pub preconfigured_refresh_token: Option<String>,

    // --- Remote platform endpoints (overridable for tests) ---
    /// Google OAuth authorization page
    pub oauth_base_url: String,
    /// Google OAuth token endpoint
    pub token_url: String,
    /// YouTube Data API base (channels.list)
    pub youtube_api_base_url: String,
    /// YouTube upload base (videos.insert)
    pub youtube_upload_base_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            preconfigured_refresh_token: env::var("YOUTUBE_REFRESH_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            oauth_base_url: env::var("GOOGLE_OAUTH_BASE_URL")
                .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/v2/auth".to_string()),
            token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            youtube_api_base_url: env::var("YOUTUBE_API_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3".to_string()),
            youtube_upload_base_url: env::var("YOUTUBE_UPLOAD_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/upload/youtube/v3".to_string()),
        })
    }

    /// The OAuth redirect URI registered with Google for this deployment.
    pub fn redirect_uri(&self) -> String {
        format!("{}/api/youtube/callback", self.frontend_url)
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test_client_id".to_string(),
            google_client_secret: "test_secret".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
            preconfigured_refresh_token: None,
            oauth_base_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            youtube_api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            youtube_upload_base_url: "https://www.googleapis.com/upload/youtube/v3".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("GOOGLE_CLIENT_ID", "test_id");
        env::set_var("GOOGLE_CLIENT_SECRET", "test_secret");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google_client_id, "test_id");
        assert_eq!(config.google_client_secret, "test_secret");
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.redirect_uri(),
            "http://localhost:3000/api/youtube/callback"
        );
    }
}
