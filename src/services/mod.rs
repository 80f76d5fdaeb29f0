// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod conversion;
pub mod ffmpeg;
pub mod pkce;
pub mod store;
pub mod validation;
pub mod youtube;

pub use conversion::{ConversionOrchestrator, ConversionSnapshot, ConversionStatus};
pub use ffmpeg::{ConversionProgress, FFmpegConverter};
pub use pkce::PkcePair;
pub use store::ArtifactStore;
pub use validation::FileValidator;
pub use youtube::{TokenResponse, VideoMetadata, YouTubeClient};
