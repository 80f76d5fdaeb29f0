// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversion orchestrator: validates input, drives the engine,
//! persists outcomes, and publishes observable state.

use crate::error::{AppError, Result};
use crate::models::{ConvertedArtifact, SourceAudio, VideoDimensions};
use crate::services::ffmpeg::FFmpegConverter;
use crate::services::store::ArtifactStore;
use crate::services::validation::FileValidator;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Lifecycle of the single conversion slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConversionStatus {
    Idle,
    Validating,
    Converting,
    Completed,
    Cancelled,
    Failed,
}

/// Full observable snapshot published on every state change.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSnapshot {
    pub status: ConversionStatus,
    pub progress_percent: f64,
    pub remaining_seconds: Option<u64>,
    pub file_name: Option<String>,
}

impl ConversionSnapshot {
    fn idle() -> Self {
        Self {
            status: ConversionStatus::Idle,
            progress_percent: 0.0,
            remaining_seconds: None,
            file_name: None,
        }
    }
}

/// Coordinates the engine, validator, and artifact store behind a
/// single-slot pipeline. At most one conversion is in flight; a second
/// submission is rejected before it reaches the engine.
pub struct ConversionOrchestrator {
    engine: Arc<FFmpegConverter>,
    store: ArtifactStore,
    validator: FileValidator,
    snapshot: watch::Sender<ConversionSnapshot>,
    artifact: Mutex<Option<ConvertedArtifact>>,
    converting: AtomicBool,
}

impl ConversionOrchestrator {
    pub fn new(engine: Arc<FFmpegConverter>, store: ArtifactStore) -> Self {
        let (snapshot, _) = watch::channel(ConversionSnapshot::idle());
        Self {
            engine,
            store,
            validator: FileValidator::default(),
            snapshot,
            artifact: Mutex::new(None),
            converting: AtomicBool::new(false),
        }
    }

    /// Subscribe to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<ConversionSnapshot> {
        self.snapshot.subscribe()
    }

    /// The current in-memory artifact, if a conversion has completed.
    pub async fn artifact(&self) -> Option<ConvertedArtifact> {
        self.artifact.lock().await.clone()
    }

    /// Restore a previously persisted artifact before accepting input.
    ///
    /// Failure is non-fatal: the store degrades to non-persistent
    /// operation and the orchestrator stays idle.
    pub async fn rehydrate(&self) {
        match self.store.load().await {
            Ok(Some(artifact)) => {
                tracing::info!(
                    file = %artifact.original_file_name,
                    bytes = artifact.data.len(),
                    "Restored converted artifact"
                );
                self.publish(
                    ConversionStatus::Completed,
                    100.0,
                    None,
                    Some(artifact.original_file_name.clone()),
                );
                *self.artifact.lock().await = Some(artifact);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Could not restore saved artifact, continuing without");
            }
        }
    }

    /// Validate and convert a source file.
    ///
    /// Returns `Ok(None)` when the conversion was cancelled mid-flight.
    pub async fn convert_file(
        &self,
        source: SourceAudio,
        dimensions: VideoDimensions,
    ) -> Result<Option<ConvertedArtifact>> {
        if self.converting.swap(true, Ordering::SeqCst) {
            return Err(AppError::BadRequest(
                "a conversion is already in progress".to_string(),
            ));
        }

        let result = self.run_conversion(source, dimensions).await;
        self.converting.store(false, Ordering::SeqCst);
        result
    }

    async fn run_conversion(
        &self,
        source: SourceAudio,
        dimensions: VideoDimensions,
    ) -> Result<Option<ConvertedArtifact>> {
        self.publish(
            ConversionStatus::Validating,
            0.0,
            None,
            Some(source.file_name.clone()),
        );

        let current_files = usize::from(self.artifact.lock().await.is_some());
        if let Some(message) =
            self.validator
                .validate(current_files, &source.media_type, source.data.len() as u64)
        {
            self.publish(ConversionStatus::Idle, 0.0, None, None);
            return Err(AppError::Validation(message));
        }

        self.publish(
            ConversionStatus::Converting,
            0.0,
            None,
            Some(source.file_name.clone()),
        );

        let snapshot = self.snapshot.clone();
        let file_name = source.file_name.clone();
        let result = self
            .engine
            .convert_to_video(
                &source,
                move |progress| {
                    snapshot.send_replace(ConversionSnapshot {
                        status: ConversionStatus::Converting,
                        progress_percent: progress.progress,
                        remaining_seconds: progress.remaining_seconds,
                        file_name: Some(file_name.clone()),
                    });
                },
                dimensions,
            )
            .await;

        match result {
            Ok(Some(artifact)) => {
                // Persistence is best-effort: a storage failure never
                // reverts a successful in-memory conversion.
                if let Err(e) = self.store.save(&artifact.data, &artifact.original_file_name).await
                {
                    tracing::warn!(error = %e, "Failed to persist artifact, continuing without");
                }
                self.publish(
                    ConversionStatus::Completed,
                    100.0,
                    None,
                    Some(artifact.original_file_name.clone()),
                );
                *self.artifact.lock().await = Some(artifact.clone());
                Ok(Some(artifact))
            }
            Ok(None) => {
                tracing::info!(file = %source.file_name, "Conversion cancelled");
                self.publish(ConversionStatus::Cancelled, 0.0, None, None);
                if let Err(e) = self.store.clear().await {
                    tracing::warn!(error = %e, "Failed to clear artifact store");
                }
                Ok(None)
            }
            Err(e) => {
                tracing::error!(file = %source.file_name, error = %e, "Conversion failed");
                self.publish(ConversionStatus::Failed, 0.0, None, Some(source.file_name));
                Err(e)
            }
        }
    }

    /// Remove the active file: abort any in-flight conversion and drop
    /// the cached artifact, in memory and on disk.
    pub async fn remove_file(&self) {
        if self.converting.load(Ordering::SeqCst) {
            self.engine.abort().await;
        }
        *self.artifact.lock().await = None;
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "Failed to clear artifact store");
        }
        self.publish(ConversionStatus::Idle, 0.0, None, None);
    }

    fn publish(
        &self,
        status: ConversionStatus,
        progress_percent: f64,
        remaining_seconds: Option<u64>,
        file_name: Option<String>,
    ) {
        self.snapshot.send_replace(ConversionSnapshot {
            status,
            progress_percent,
            remaining_seconds,
            file_name,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_orchestrator() -> (tempfile::TempDir, ConversionOrchestrator) {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FFmpegConverter::default());
        let store = ArtifactStore::new(dir.path().join("store"));
        (dir, ConversionOrchestrator::new(engine, store))
    }

    #[tokio::test]
    async fn test_rejects_invalid_media_type_before_engine() {
        let (_dir, orchestrator) = test_orchestrator();
        let source = SourceAudio::new("movie.mp4".into(), "video/mp4".into(), vec![0u8; 16]);
        let dims = VideoDimensions {
            width: 1280,
            height: 720,
        };

        let err = orchestrator.convert_file(source, dims).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            orchestrator.subscribe().borrow().status,
            ConversionStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_rehydrate_restores_completed_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("store"));
        store.save(b"persisted video", "song.mp3").await.unwrap();

        let engine = Arc::new(FFmpegConverter::default());
        let orchestrator = ConversionOrchestrator::new(engine, ArtifactStore::new(dir.path().join("store")));
        orchestrator.rehydrate().await;

        let snapshot = orchestrator.subscribe().borrow().clone();
        assert_eq!(snapshot.status, ConversionStatus::Completed);
        assert_eq!(snapshot.file_name.as_deref(), Some("song.mp3"));

        let artifact = orchestrator.artifact().await.unwrap();
        assert_eq!(artifact.data, b"persisted video");
    }

    #[tokio::test]
    async fn test_rehydrate_empty_store_stays_idle() {
        let (_dir, orchestrator) = test_orchestrator();
        orchestrator.rehydrate().await;
        assert_eq!(
            orchestrator.subscribe().borrow().status,
            ConversionStatus::Idle
        );
        assert!(orchestrator.artifact().await.is_none());
    }

    #[tokio::test]
    async fn test_remove_file_clears_artifact_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("store"));
        store.save(b"persisted video", "song.mp3").await.unwrap();

        let engine = Arc::new(FFmpegConverter::default());
        let orchestrator =
            ConversionOrchestrator::new(engine, ArtifactStore::new(dir.path().join("store")));
        orchestrator.rehydrate().await;
        orchestrator.remove_file().await;

        assert!(orchestrator.artifact().await.is_none());
        assert_eq!(
            orchestrator.subscribe().borrow().status,
            ConversionStatus::Idle
        );

        let check = ArtifactStore::new(dir.path().join("store"));
        assert!(check.load().await.unwrap().is_none());
    }
}
