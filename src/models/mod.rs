// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod artifact;
pub mod channel;
pub mod dimensions;

pub use artifact::{ConvertedArtifact, SourceAudio, VIDEO_MIME_TYPE};
pub use channel::{ChannelInfo, SessionState};
pub use dimensions::{AspectRatio, Resolution, VideoDimensions};
