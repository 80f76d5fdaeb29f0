// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side session manager for the YouTube relay.
//!
//! The relay's HTTP-only cookies (carried by this client's cookie jar)
//! are the authoritative session state. Locally we keep only an
//! advisory `SessionState`: a logged-in flag that short-circuits
//! network calls when unset, and a cached channel identity. The flag is
//! never trusted without a live confirmation call.

use crate::error::{AppError, Result};
use crate::models::{ChannelInfo, ConvertedArtifact, SessionState};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::sync::Mutex;

#[derive(Debug, Deserialize)]
struct AuthUrlResponse {
    #[serde(rename = "authUrl")]
    auth_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    #[serde(default)]
    success: bool,
    #[serde(rename = "videoUrl", default)]
    video_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client of the relay service implementing the login, refresh,
/// and upload flows.
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    /// Advisory last-known auth state; cookies remain authoritative.
    state: Mutex<SessionState>,
    /// Optional JSON file the advisory state persists to (best-effort).
    state_path: Option<PathBuf>,
    /// Bumped on every successful refresh so concurrent 401 handlers
    /// share one in-flight refresh instead of stampeding the endpoint.
    refresh_epoch: Mutex<u64>,
}

impl SessionClient {
    /// Create a client against the relay at `base_url`, restoring any
    /// persisted advisory state from `state_path`.
    pub async fn connect(base_url: String, state_path: Option<PathBuf>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {e}")))?;

        let state = match &state_path {
            Some(path) => load_state(path).await,
            None => SessionState::default(),
        };

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            state: Mutex::new(state),
            state_path,
            refresh_epoch: Mutex::new(0),
        })
    }

    /// Begin the authorization handshake. Returns the consent URL the
    /// caller should navigate to; the relay has set the PKCE verifier
    /// cookie as a side effect.
    pub async fn authenticate(&self) -> Result<String> {
        let url = format!("{}/api/youtube", self.base_url);
        let response: AuthUrlResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?
            .json()
            .await
            .map_err(|e| AppError::YouTubeApi(format!("Bad auth URL response: {e}")))?;

        if response.auth_url.is_empty() {
            return Err(AppError::YouTubeApi("No auth URL received".to_string()));
        }
        Ok(response.auth_url)
    }

    /// Recognize the redirect back from the callback endpoint.
    ///
    /// `query` is the raw query string (`auth=success` or
    /// `error=<reason>`). On success the advisory flag is set and
    /// confirmed with a live call.
    pub async fn complete_login(&self, query: &str) -> Result<bool> {
        let mut auth_success = false;
        let mut error: Option<String> = None;
        for pair in query.trim_start_matches('?').split('&') {
            match pair.split_once('=') {
                Some(("auth", "success")) => auth_success = true,
                Some(("error", reason)) => error = Some(reason.to_string()),
                _ => {}
            }
        }

        if let Some(reason) = error {
            tracing::warn!(reason = %reason, "Authentication failed");
            return Ok(false);
        }
        if !auth_success {
            return Ok(false);
        }

        self.state.lock().await.logged_in = true;
        self.persist_state().await;
        Ok(self.is_authenticated().await)
    }

    /// Code-free login via the relay's operator-provisioned refresh token.
    pub async fn login_preconfigured(&self) -> Result<bool> {
        let url = format!("{}/api/youtube/preconfigured", self.base_url);
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Preconfigured login rejected");
            return Ok(false);
        }

        self.state.lock().await.logged_in = true;
        self.persist_state().await;
        Ok(self.is_authenticated().await)
    }

    /// Check authentication.
    ///
    /// The advisory flag short-circuits to `false` without any network
    /// call; when set, it is confirmed by fetching the channel identity
    /// through the refresh-retry wrapper. Any failure clears the flag.
    pub async fn is_authenticated(&self) -> bool {
        if !self.state.lock().await.logged_in {
            return false;
        }

        let url = format!("{}/api/youtube/channel", self.base_url);
        let response = match self.fetch_with_auth_retry(|http| http.get(&url)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Authentication check failed");
                self.invalidate().await;
                return false;
            }
        };

        if !response.status().is_success() {
            self.invalidate().await;
            return false;
        }

        match response.json::<ChannelInfo>().await {
            Ok(channel) => {
                let mut state = self.state.lock().await;
                state.logged_in = true;
                state.channel = Some(channel);
                drop(state);
                self.persist_state().await;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Bad channel response");
                self.invalidate().await;
                false
            }
        }
    }

    /// Last confirmed channel identity, if any.
    pub async fn channel_info(&self) -> Option<ChannelInfo> {
        self.state.lock().await.channel.clone()
    }

    /// Upload a converted artifact through the relay. Returns the
    /// canonical watch URL.
    ///
    /// A zero-length artifact is a local precondition failure; no
    /// network call is made.
    pub async fn upload_video(
        &self,
        artifact: &ConvertedArtifact,
        title: &str,
        description: &str,
        tags: &[String],
        privacy_status: &str,
    ) -> Result<String> {
        if !self.state.lock().await.logged_in {
            return Err(AppError::Unauthorized);
        }
        if artifact.is_empty() {
            return Err(AppError::Validation(
                "converted video is empty".to_string(),
            ));
        }

        let payload = serde_json::json!({
            "videoBlob": STANDARD.encode(&artifact.data),
            "title": title,
            "description": description,
            "tags": tags,
            "privacyStatus": privacy_status,
        });

        let url = format!("{}/api/youtube", self.base_url);
        let response = self
            .fetch_with_auth_retry(|http| http.post(&url).json(&payload))
            .await?;

        let status = response.status();
        let result: UploadResult = response
            .json()
            .await
            .map_err(|e| AppError::RemoteUpload(format!("Bad upload response: {e}")))?;

        if !status.is_success() || !result.success {
            return Err(AppError::RemoteUpload(
                result
                    .error
                    .unwrap_or_else(|| format!("upload failed with HTTP {status}")),
            ));
        }

        result
            .video_url
            .ok_or_else(|| AppError::RemoteUpload("upload response missing video URL".to_string()))
    }

    /// Log out. Local state clears synchronously; the server-side cookie
    /// expiry is fire-and-forget.
    pub async fn logout(&self) {
        {
            let mut state = self.state.lock().await;
            state.logged_in = false;
            state.channel = None;
        }
        self.persist_state().await;

        let http = self.http.clone();
        let url = format!("{}/api/youtube/logout", self.base_url);
        tokio::spawn(async move {
            if let Err(e) = http.post(&url).send().await {
                tracing::warn!(error = %e, "Logout request failed (local state already cleared)");
            }
        });
    }

    /// Wrapper applied to every authenticated relay call.
    ///
    /// On a 401: exactly one refresh attempt, then exactly one retry of
    /// the original request. If the refresh fails, the session is marked
    /// logged-out and the original 401 response is surfaced unchanged.
    pub async fn fetch_with_auth_retry<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let observed_epoch = *self.refresh_epoch.lock().await;

        let response = build(&self.http).send().await.map_err(transport_error)?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if !self.refresh_once(observed_epoch).await {
            self.invalidate().await;
            return Ok(response);
        }

        build(&self.http).send().await.map_err(transport_error)
    }

    /// Perform at most one refresh for the epoch the caller observed.
    ///
    /// Concurrent 401 handlers serialize on the epoch lock; whoever
    /// arrives after a successful rotation sees a newer epoch and skips
    /// straight to the retry.
    async fn refresh_once(&self, observed_epoch: u64) -> bool {
        let mut epoch = self.refresh_epoch.lock().await;
        if *epoch != observed_epoch {
            return true;
        }

        let url = format!("{}/api/youtube/refresh", self.base_url);
        match self.http.post(&url).send().await {
            Ok(response) if response.status().is_success() => {
                *epoch += 1;
                tracing::debug!("Access token refreshed");
                true
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Token refresh rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh request failed");
                false
            }
        }
    }

    /// Clear the advisory flag and channel cache.
    async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if state.logged_in || state.channel.is_some() {
            state.logged_in = false;
            state.channel = None;
            drop(state);
            self.persist_state().await;
        }
    }

    async fn persist_state(&self) {
        let Some(path) = &self.state_path else { return };
        let state = self.state.lock().await.clone();
        let json = match serde_json::to_vec_pretty(&state) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot serialize session state");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(path, json).await {
            tracing::warn!(error = %e, path = %path.display(), "Cannot persist session state");
        }
    }
}

async fn load_state(path: &PathBuf) -> SessionState {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Corrupt session state file, starting logged out");
            SessionState::default()
        }),
        Err(_) => SessionState::default(),
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    AppError::YouTubeApi(format!("Request failed: {e}"))
}
