// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Input audio and converted video artifact types.

use crate::error::{AppError, Result};
use std::path::Path;

/// MIME type of every converted artifact.
pub const VIDEO_MIME_TYPE: &str = "video/mp4";

/// A selected input audio file, held fully in memory.
#[derive(Debug, Clone)]
pub struct SourceAudio {
    pub file_name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl SourceAudio {
    pub fn new(file_name: String, media_type: String, data: Vec<u8>) -> Self {
        Self {
            file_name,
            media_type,
            data,
        }
    }

    /// Read an audio file from disk, deriving the MIME type from its extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Validation("file has no usable name".to_string()))?
            .to_string();

        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Validation(format!("cannot read {}: {}", path.display(), e)))?;

        Ok(Self {
            file_name,
            media_type,
            data,
        })
    }

    /// File extension in lower case, defaulting to `mp3` when absent.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "mp3".to_string())
    }
}

/// The converted video output of the transcoding pipeline.
#[derive(Debug, Clone)]
pub struct ConvertedArtifact {
    pub data: Vec<u8>,
    pub original_file_name: String,
    pub mime_type: String,
}

impl ConvertedArtifact {
    pub fn new(data: Vec<u8>, original_file_name: String) -> Self {
        Self {
            data,
            original_file_name,
            mime_type: VIDEO_MIME_TYPE.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
