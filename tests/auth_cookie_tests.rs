// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth cookie attribute tests.
//!
//! These tests verify the PKCE verifier cookie set when the handshake
//! starts, the cookie removal attributes on logout, and the endpoints
//! that must reject requests without session cookies.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use tower::ServiceExt;

mod common;

fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_auth_start_sets_verifier_cookie_and_url() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/youtube")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    let verifier_cookie = find_cookie(&set_cookies, "code_verifier");
    assert!(verifier_cookie.contains("HttpOnly"));
    assert!(verifier_cookie.contains("SameSite=Lax"));
    assert!(verifier_cookie.contains("Path=/"));
    assert!(verifier_cookie.contains("Max-Age=300"));

    let body = body_json(response).await;
    let auth_url = body["authUrl"].as_str().expect("authUrl present");
    assert!(auth_url.starts_with(&state.config.oauth_base_url));
    assert!(auth_url.contains("access_type=offline"));
    assert!(auth_url.contains("prompt=consent"));
    assert!(auth_url.contains("code_challenge_method=S256"));
    assert!(auth_url.contains("code_challenge="));
    assert!(auth_url.contains("youtube.upload"));
    assert!(auth_url.contains("youtube.readonly"));
}

#[tokio::test]
async fn test_logout_expires_both_session_cookies() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube/logout")
                .header(header::COOKIE, "access_token=a; refresh_token=r")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    for name in ["access_token", "refresh_token"] {
        let cookie = find_cookie(&set_cookies, name);
        assert!(cookie.contains("Max-Age=0"), "{name} not expired: {cookie}");
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
    }

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_callback_without_code_redirects_with_error() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/youtube/callback")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        format!(
            "{}?error=missing_code_or_verifier",
            state.config.frontend_url
        )
    );

    // No session cookie may be set on failure
    let set_cookies = set_cookie_headers(&response);
    assert!(!set_cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(!set_cookies.iter().any(|c| c.starts_with("refresh_token=")));
}

#[tokio::test]
async fn test_callback_provider_error_passes_through() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/youtube/callback?error=access_denied")
                .header(header::COOKIE, "code_verifier=v")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        format!("{}?error=access_denied", state.config.frontend_url)
    );

    // The verifier cookie is single use: it must be removed even on failure
    let set_cookies = set_cookie_headers(&response);
    let verifier_cookie = find_cookie(&set_cookies, "code_verifier");
    assert!(verifier_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_channel_without_cookie_is_unauthorized() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/youtube/channel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_preconfigured_login_unconfigured_is_unauthorized() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube/preconfigured")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_without_cookie_is_unauthorized() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"videoBlob":"AAAA","title":"My video"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_rejects_garbage_base64() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube")
                .header(header::COOKIE, "access_token=token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"videoBlob":"not!!base64","title":"My video"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_upload_rejects_empty_title() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube")
                .header(header::COOKIE, "access_token=token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"videoBlob":"AAAA","title":""}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_unknown_privacy_status() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube")
                .header(header::COOKIE, "access_token=token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"videoBlob":"AAAA","title":"My video","privacyStatus":"secret"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_happy_path_sets_session_cookies() {
    let server = httpmock::MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/token")
                .body_contains("code=abc123")
                .body_contains("code_verifier=test-verifier")
                .body_contains("grant_type=authorization_code");
            then.status(200).json_body(serde_json::json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": 1800
            }));
        })
        .await;

    let (app, state) = common::create_test_app_with_config(common::mock_remote_config(
        &server.base_url(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/youtube/callback?code=abc123")
                .header(header::COOKIE, "code_verifier=test-verifier")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    token_mock.assert_async().await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        format!("{}?auth=success", state.config.frontend_url)
    );

    let set_cookies = set_cookie_headers(&response);
    let access = find_cookie(&set_cookies, "access_token");
    assert!(access.contains("new-access"));
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("Max-Age=1800"));
    let refresh = find_cookie(&set_cookies, "refresh_token");
    assert!(refresh.contains("new-refresh"));
    let verifier = find_cookie(&set_cookies, "code_verifier");
    assert!(verifier.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_callback_exchange_failure_redirects_without_cookies() {
    let server = httpmock::MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST).path("/token");
            then.status(400)
                .json_body(serde_json::json!({"error": "invalid_grant"}));
        })
        .await;

    let (app, state) = common::create_test_app_with_config(common::mock_remote_config(
        &server.base_url(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/youtube/callback?code=stale")
                .header(header::COOKIE, "code_verifier=test-verifier")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(
        location,
        format!("{}?error=auth_failed", state.config.frontend_url)
    );

    let set_cookies = set_cookie_headers(&response);
    assert!(!set_cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(!set_cookies.iter().any(|c| c.starts_with("refresh_token=")));
}

#[tokio::test]
async fn test_upload_endpoint_echoes_file_as_base64() {
    let (app, _) = common::create_test_app();

    let boundary = "test_boundary";
    let payload = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"clip.mp3\"\r\n\
         Content-Type: audio/mpeg\r\n\r\n\
         hello audio\r\n\
         --{boundary}--\r\n"
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "File uploaded successfully");
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(body["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, b"hello audio");
}

#[tokio::test]
async fn test_upload_endpoint_without_file_is_bad_request() {
    let (app, _) = common::create_test_app();

    let boundary = "test_boundary";
    let payload = format!("--{boundary}--\r\n");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}
