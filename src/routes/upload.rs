// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File relay endpoint: accepts a multipart upload and echoes the
//! payload back base64-encoded.

use axum::{extract::Multipart, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/upload", post(relay_upload))
}

#[derive(Serialize)]
struct UploadRelayResponse {
    message: String,
    data: String,
}

async fn relay_upload(mut multipart: Multipart) -> Result<Json<UploadRelayResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("failed to read file field: {e}")))?;

            tracing::info!(bytes = bytes.len(), "File relayed");
            return Ok(Json(UploadRelayResponse {
                message: "File uploaded successfully".to_string(),
                data: STANDARD.encode(&bytes),
            }));
        }
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}
