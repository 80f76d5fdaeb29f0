// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! YouTube OAuth and upload relay routes.
//!
//! Session tokens live exclusively in HTTP-only cookies set here; the
//! client never sees them.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::ChannelInfo;
use crate::services::pkce::PkcePair;
use crate::services::youtube::{watch_url, TokenResponse, VideoMetadata, OAUTH_SCOPES};
use crate::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const CODE_VERIFIER_COOKIE: &str = "code_verifier";

/// The PKCE handshake must complete within this window.
const VERIFIER_TTL_SECS: i64 = 300;
const REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_ACCESS_TTL_SECS: i64 = 3600;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/youtube", get(auth_start).post(upload_video))
        .route("/api/youtube/callback", get(auth_callback))
        .route("/api/youtube/preconfigured", post(preconfigured_login))
        .route("/api/youtube/refresh", post(refresh_token))
        .route("/api/youtube/channel", get(channel_identity))
        .route("/api/youtube/logout", post(logout))
}

// ─── Cookie helpers ──────────────────────────────────────────

fn session_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    session_cookie(name, String::new(), 0)
}

/// Set the access-token cookie (TTL from the token's reported expiry)
/// and, when a refresh token was issued, the refresh-token cookie.
fn apply_session_cookies(jar: CookieJar, tokens: &TokenResponse) -> CookieJar {
    let access_ttl = tokens.expires_in.unwrap_or(DEFAULT_ACCESS_TTL_SECS);
    let jar = jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        access_ttl,
    ));
    match &tokens.refresh_token {
        Some(refresh) => jar.add(session_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh.clone(),
            REFRESH_TOKEN_TTL_SECS,
        )),
        None => jar,
    }
}

fn frontend_redirect(state: &AppState, suffix: &str) -> Redirect {
    Redirect::temporary(&format!("{}?{}", state.config.frontend_url, suffix))
}

// ─── Authorization ───────────────────────────────────────────

#[derive(Serialize)]
struct AuthUrlResponse {
    #[serde(rename = "authUrl")]
    auth_url: String,
}

/// Start the handshake: generate a PKCE pair, stash the verifier in a
/// short-lived cookie, and hand back the consent URL.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AuthUrlResponse>)> {
    let pkce = PkcePair::generate()?;
    let scope = OAUTH_SCOPES.join(" ");

    let auth_url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&\
         access_type=offline&prompt=consent&include_granted_scopes=true&\
         scope={}&code_challenge={}&code_challenge_method=S256",
        state.config.oauth_base_url,
        urlencoding::encode(&state.config.google_client_id),
        urlencoding::encode(&state.config.redirect_uri()),
        urlencoding::encode(&scope),
        pkce.code_challenge,
    );

    let jar = jar.add(session_cookie(
        CODE_VERIFIER_COOKIE,
        pkce.code_verifier,
        VERIFIER_TTL_SECS,
    ));

    tracing::info!("Starting OAuth handshake");
    Ok((jar, Json(AuthUrlResponse { auth_url })))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: exchange `(code, verifier)` for tokens.
///
/// The verifier cookie is removed unconditionally (single use). Failures
/// redirect back with an error indicator and set no session cookies.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let verifier = jar.get(CODE_VERIFIER_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(removal_cookie(CODE_VERIFIER_COOKIE));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        let redirect = frontend_redirect(&state, &format!("error={}", urlencoding::encode(&error)));
        return (jar, redirect);
    }

    let (Some(code), Some(verifier)) = (params.code, verifier) else {
        tracing::warn!("OAuth callback missing code or verifier cookie");
        return (jar, frontend_redirect(&state, "error=missing_code_or_verifier"));
    };

    match state.youtube.exchange_code(&code, &verifier).await {
        Ok(tokens) => {
            tracing::info!(
                has_refresh_token = tokens.refresh_token.is_some(),
                "OAuth successful, session cookies set"
            );
            let jar = apply_session_cookies(jar, &tokens);
            (jar, frontend_redirect(&state, "auth=success"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Token exchange failed");
            (jar, frontend_redirect(&state, "error=auth_failed"))
        }
    }
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

/// Code-free login using the operator-provisioned refresh token.
/// Same cookie contract as callback success.
async fn preconfigured_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SuccessResponse>)> {
    let refresh_token = state
        .config
        .preconfigured_refresh_token
        .as_deref()
        .ok_or(AppError::Unauthorized)?;

    let mut tokens = state.youtube.refresh_access_token(refresh_token).await?;
    // The token endpoint does not echo the refresh token back on a
    // refresh grant; reuse the configured one for the cookie.
    tokens.refresh_token = Some(refresh_token.to_string());

    tracing::info!("Preconfigured account login");
    let jar = apply_session_cookies(jar, &tokens);
    Ok((jar, Json(SuccessResponse { success: true })))
}

/// Rotate the access-token cookie using the refresh-token cookie.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SuccessResponse>)> {
    let refresh = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let tokens = state.youtube.refresh_access_token(&refresh).await?;

    tracing::debug!("Access token rotated");
    let jar = apply_session_cookies(jar, &tokens);
    Ok((jar, Json(SuccessResponse { success: true })))
}

/// Fetch the authenticated account's channel identity.
async fn channel_identity(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<ChannelInfo>> {
    let access_token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let channel = state.youtube.channel_info(&access_token).await?;
    Ok(Json(channel))
}

// ─── Upload relay ────────────────────────────────────────────

const ALLOWED_PRIVACY_STATUSES: &[&str] = &["private", "unlisted", "public"];

fn default_privacy() -> String {
    "private".to_string()
}

#[derive(Deserialize, Validate)]
pub struct UploadRequest {
    #[serde(rename = "videoBlob")]
    video_blob: String,
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(rename = "privacyStatus", default = "default_privacy")]
    privacy_status: String,
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    #[serde(rename = "videoId")]
    video_id: String,
    #[serde(rename = "videoUrl")]
    video_url: String,
}

/// Relay a base64 video payload to YouTube as a multipart insert.
async fn upload_video(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>> {
    let access_token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !ALLOWED_PRIVACY_STATUSES.contains(&request.privacy_status.as_str()) {
        return Err(AppError::BadRequest(format!(
            "invalid privacy status: {}",
            request.privacy_status
        )));
    }

    let video_data = STANDARD
        .decode(&request.video_blob)
        .map_err(|_| AppError::BadRequest("videoBlob is not valid base64".to_string()))?;
    if video_data.is_empty() {
        return Err(AppError::BadRequest("video payload is empty".to_string()));
    }

    let metadata = VideoMetadata {
        title: request.title,
        description: request.description,
        tags: request.tags,
        privacy_status: request.privacy_status,
    };

    tracing::info!(
        title = %metadata.title,
        bytes = video_data.len(),
        privacy = %metadata.privacy_status,
        "Relaying video upload"
    );

    let video_id = state
        .youtube
        .insert_video(&access_token, &metadata, &video_data)
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        video_url: watch_url(&video_id),
        video_id,
    }))
}

/// Expire both session cookies.
async fn logout(jar: CookieJar) -> (CookieJar, Json<SuccessResponse>) {
    let jar = jar
        .add(removal_cookie(ACCESS_TOKEN_COOKIE))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE));
    (jar, Json(SuccessResponse { success: true }))
}
