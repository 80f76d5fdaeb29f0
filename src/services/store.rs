// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable single-record store for the most recent converted artifact.
//!
//! The manifest rename is the commit point: the blob and its original
//! file name are only ever observed together, never as a partial pair.

use crate::error::{AppError, Result};
use crate::models::{ConvertedArtifact, VIDEO_MIME_TYPE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

const MANIFEST_NAME: &str = "manifest.json";
const BLOB_PREFIX: &str = "artifact-";

/// Manifest record naming the committed blob file and its metadata.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    file_name: String,
    blob: String,
    mime_type: String,
    saved_at: String,
}

/// Stores at most one converted artifact under a data directory.
///
/// Directory creation is lazy and memoized; concurrent callers await
/// the same in-flight initialization. There is no cross-process writer
/// protection: last writer wins.
pub struct ArtifactStore {
    dir: PathBuf,
    init: OnceCell<()>,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            init: OnceCell::new(),
        }
    }

    async fn ensure_initialized(&self) -> Result<()> {
        self.init
            .get_or_try_init(|| async {
                tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
                    AppError::Storage(format!(
                        "cannot create data directory {}: {e}",
                        self.dir.display()
                    ))
                })
            })
            .await?;
        Ok(())
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_NAME)
    }

    /// Upsert the artifact and its original file name atomically.
    ///
    /// The blob is written and fsynced first; only then does the
    /// manifest rename commit the pair.
    pub async fn save(&self, data: &[u8], file_name: &str) -> Result<()> {
        self.ensure_initialized().await?;

        let blob_name = format!("{BLOB_PREFIX}{}.mp4", chrono::Utc::now().timestamp_millis());
        let blob_path = self.dir.join(&blob_name);

        let mut blob_file = tokio::fs::File::create(&blob_path)
            .await
            .map_err(|e| AppError::Storage(format!("cannot create blob file: {e}")))?;
        blob_file
            .write_all(data)
            .await
            .map_err(|e| AppError::Storage(format!("cannot write blob: {e}")))?;
        blob_file
            .sync_all()
            .await
            .map_err(|e| AppError::Storage(format!("cannot sync blob: {e}")))?;

        let manifest = Manifest {
            file_name: file_name.to_string(),
            blob: blob_name.clone(),
            mime_type: VIDEO_MIME_TYPE.to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| AppError::Storage(format!("cannot serialize manifest: {e}")))?;

        let tmp_path = self.dir.join(format!("{MANIFEST_NAME}.tmp"));
        tokio::fs::write(&tmp_path, &manifest_json)
            .await
            .map_err(|e| AppError::Storage(format!("cannot write manifest: {e}")))?;
        tokio::fs::rename(&tmp_path, self.manifest_path())
            .await
            .map_err(|e| AppError::Storage(format!("cannot commit manifest: {e}")))?;

        self.collect_garbage(&blob_name).await;

        tracing::debug!(file = file_name, bytes = data.len(), "Artifact saved");
        Ok(())
    }

    /// Load the stored artifact, or `None` when nothing is stored.
    ///
    /// A manifest pointing at a missing blob is a storage error, never a
    /// partial result.
    pub async fn load(&self) -> Result<Option<ConvertedArtifact>> {
        self.ensure_initialized().await?;

        let manifest_bytes = match tokio::fs::read(self.manifest_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Storage(format!("cannot read manifest: {e}"))),
        };

        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| AppError::Storage(format!("corrupt manifest: {e}")))?;

        let data = tokio::fs::read(self.dir.join(&manifest.blob))
            .await
            .map_err(|e| {
                AppError::Storage(format!("manifest names missing blob {}: {e}", manifest.blob))
            })?;

        Ok(Some(ConvertedArtifact {
            data,
            original_file_name: manifest.file_name,
            mime_type: manifest.mime_type,
        }))
    }

    /// Delete the stored record. Absent files are fine.
    pub async fn clear(&self) -> Result<()> {
        self.ensure_initialized().await?;

        // Removing the manifest first is the commit point for deletion.
        match tokio::fs::remove_file(self.manifest_path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::Storage(format!("cannot remove manifest: {e}"))),
        }

        self.collect_garbage("").await;
        Ok(())
    }

    /// Best-effort removal of blob files other than `keep`.
    async fn collect_garbage(&self, keep: &str) {
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(BLOB_PREFIX) && name != keep {
                if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                    tracing::warn!(file = name, error = %e, "Failed to remove stale blob");
                }
            }
        }
    }
}
