// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Output video dimensions derived from a resolution and aspect ratio.

use std::fmt;
use std::str::FromStr;

/// Named output resolution. The base dimensions assume 16:9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    R1080p,
    R720p,
    R480p,
}

impl Resolution {
    /// Base 16:9 dimensions for this resolution.
    pub fn base_dimensions(self) -> VideoDimensions {
        match self {
            Resolution::R1080p => VideoDimensions {
                width: 1920,
                height: 1080,
            },
            Resolution::R720p => VideoDimensions {
                width: 1280,
                height: 720,
            },
            Resolution::R480p => VideoDimensions {
                width: 854,
                height: 480,
            },
        }
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1080p" => Ok(Resolution::R1080p),
            "720p" => Ok(Resolution::R720p),
            "480p" => Ok(Resolution::R480p),
            other => Err(format!("unknown resolution: {other}")),
        }
    }
}

/// Supported aspect ratios for the rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Wide,   // 16:9
    Legacy, // 4:3
    Square, // 1:1
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" => Ok(AspectRatio::Wide),
            "4:3" => Ok(AspectRatio::Legacy),
            "1:1" => Ok(AspectRatio::Square),
            other => Err(format!("unknown aspect ratio: {other}")),
        }
    }
}

/// Pixel dimensions of the rendered video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for VideoDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl VideoDimensions {
    /// Map a (resolution, aspect ratio) pair to concrete pixel dimensions.
    ///
    /// The resolution fixes the frame height; non-16:9 ratios keep that
    /// height and scale the width to the requested ratio.
    pub fn for_target(resolution: Resolution, aspect_ratio: AspectRatio) -> Self {
        let base = resolution.base_dimensions();
        match aspect_ratio {
            AspectRatio::Wide => base,
            AspectRatio::Legacy => VideoDimensions {
                width: base.height * 4 / 3,
                height: base.height,
            },
            AspectRatio::Square => VideoDimensions {
                width: base.height,
                height: base.height,
            },
        }
    }
}
