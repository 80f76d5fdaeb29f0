// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth2 / YouTube Data API client used by the relay routes.
//!
//! Handles:
//! - Authorization-code exchange (with the PKCE verifier)
//! - Access-token refresh
//! - Channel identity lookup
//! - Multipart video insertion

use crate::config::Config;
use crate::error::AppError;
use crate::models::ChannelInfo;
use serde::Deserialize;

const MULTIPART_BOUNDARY: &str = "waveframe_upload_boundary";

/// OAuth scopes requested during authorization.
pub const OAUTH_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube.readonly",
];

/// YouTube API client.
#[derive(Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    api_base_url: String,
    upload_base_url: String,
}

/// Token endpoint response (code exchange and refresh).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Metadata for a video insertion.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy_status: String,
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    snippet: ChannelSnippet,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: String,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    #[serde(default)]
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideoInsertResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

// The token endpoint reports errors as {"error": "...", "error_description": "..."}
// while the Data API nests them as {"error": {"message": "..."}}.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GoogleErrorDetail {
    Api { message: String },
    OAuth(String),
}

impl YouTubeClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.redirect_uri(),
            token_url: config.token_url.clone(),
            api_base_url: config.youtube_api_base_url.clone(),
            upload_base_url: config.youtube_upload_base_url.clone(),
        }
    }

    /// Exchange an authorization code plus its PKCE verifier for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("code_verifier", code_verifier),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::YouTubeApi(format!("Token exchange request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = remote_error_message(response).await;
            tracing::error!(status = %status, error = %message, "Google token exchange failed");
            return Err(AppError::YouTubeApi(format!(
                "Token exchange rejected: {message}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::YouTubeApi(format!("Failed to parse token response: {e}")))
    }

    /// Rotate an access token using a refresh token.
    ///
    /// A provider rejection (revoked or garbage refresh token) maps to
    /// `Unauthorized`; transport failures surface as `YouTubeApi`.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::YouTubeApi(format!("Token refresh request failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            let message = remote_error_message(response).await;
            tracing::warn!(status = %status, error = %message, "Refresh token rejected");
            return Err(AppError::Unauthorized);
        }
        if !status.is_success() {
            let message = remote_error_message(response).await;
            return Err(AppError::YouTubeApi(format!(
                "Token refresh failed: {message}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::YouTubeApi(format!("Failed to parse refresh response: {e}")))
    }

    /// Fetch the authenticated account's channel identity
    /// (`channels.list(part=snippet, mine=true)`).
    pub async fn channel_info(&self, access_token: &str) -> Result<ChannelInfo, AppError> {
        let url = format!("{}/channels", self.api_base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("part", "snippet"), ("mine", "true")])
            .send()
            .await
            .map_err(|e| AppError::YouTubeApi(format!("Channel request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(AppError::Unauthorized);
        }
        if !status.is_success() {
            let message = remote_error_message(response).await;
            return Err(AppError::YouTubeApi(format!(
                "Channel lookup failed: {message}"
            )));
        }

        let list: ChannelListResponse = response
            .json()
            .await
            .map_err(|e| AppError::YouTubeApi(format!("Failed to parse channel response: {e}")))?;

        let channel = list
            .items
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("YouTube channel".to_string()))?;

        Ok(ChannelInfo {
            id: channel.id,
            title: channel.snippet.title,
            thumbnail_url: channel
                .snippet
                .thumbnails
                .and_then(|t| t.default)
                .map(|t| t.url)
                .unwrap_or_default(),
        })
    }

    /// Upload a video via multipart `videos.insert`. Returns the video ID.
    pub async fn insert_video(
        &self,
        access_token: &str,
        metadata: &VideoMetadata,
        video_data: &[u8],
    ) -> Result<String, AppError> {
        let url = format!(
            "{}/videos?uploadType=multipart&part=snippet,status&notifySubscribers=false",
            self.upload_base_url
        );

        let snippet = serde_json::json!({
            "snippet": {
                "title": metadata.title,
                "description": metadata.description,
                "categoryId": "22",
                "tags": metadata.tags,
            },
            "status": {
                "privacyStatus": metadata.privacy_status,
                "selfDeclaredMadeForKids": false,
            },
        });

        let body = multipart_related_body(&snippet.to_string(), video_data);

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::RemoteUpload(format!("Upload request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(AppError::Unauthorized);
        }
        if !status.is_success() {
            let message = remote_error_message(response).await;
            tracing::error!(status = %status, error = %message, "YouTube upload rejected");
            return Err(AppError::RemoteUpload(message));
        }

        let inserted: VideoInsertResponse = response
            .json()
            .await
            .map_err(|e| AppError::RemoteUpload(format!("Failed to parse upload response: {e}")))?;

        tracing::info!(video_id = %inserted.id, "Video uploaded");
        Ok(inserted.id)
    }
}

/// Canonical watch URL for an uploaded video.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Assemble a `multipart/related` body: JSON metadata part followed by
/// the raw video part.
fn multipart_related_body(metadata_json: &str, video_data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata_json.len() + video_data.len() + 256);
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: video/mp4\r\n\r\n");
    body.extend_from_slice(video_data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Best-effort extraction of the remote error message.
async fn remote_error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<GoogleErrorBody>(&body) {
        Ok(parsed) => match parsed.error {
            GoogleErrorDetail::Api { message } => message,
            GoogleErrorDetail::OAuth(code) => code,
        },
        Err(_) if !body.is_empty() => body,
        Err(_) => "no error detail".to_string(),
    }
}
