// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transcoding engine wrapping the ffmpeg/ffprobe binaries.
//!
//! Handles:
//! - One-time binary verification (`load`)
//! - Audio-to-video rendering with progress callbacks
//! - Cooperative cancellation at phase boundaries
//! - Early input validation via a discarded decode pass

use crate::error::{AppError, Result};
use crate::models::{ConvertedArtifact, SourceAudio, VideoDimensions};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex as StdMutex;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Below this completed fraction the linear extrapolation is too noisy
/// to show a remaining-time estimate.
const PROGRESS_THRESHOLD: f64 = 0.01;

/// Remaining-time estimates at or above two hours are suppressed.
const REMAINING_CEILING_SECS: f64 = 7200.0;

/// Nominal duration of the generated color frame; `-shortest` truncates
/// the output to the audio length.
const FRAME_DURATION_SECS: &str = "999999999";

const AUDIO_BITRATE: &str = "192k";

/// Progress report forwarded to the caller during a conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionProgress {
    /// Percent complete, 0.0 to 100.0.
    pub progress: f64,
    pub elapsed_seconds: u64,
    /// Linear remaining-time estimate; absent early in the run and when
    /// the estimate exceeds the two-hour ceiling.
    pub remaining_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    format: Option<FFprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
}

/// Wraps the ffmpeg and ffprobe binaries behind a cancellable
/// conversion operation.
///
/// Only one conversion may be in flight per instance; callers serialize.
pub struct FFmpegConverter {
    ffmpeg_path: String,
    ffprobe_path: String,
    /// Memoized load state; the async lock makes concurrent `load`
    /// callers await the same in-flight verification.
    loaded: Mutex<bool>,
    /// Cancellation token for the conversion currently in flight.
    cancel: StdMutex<Option<CancellationToken>>,
}

impl Default for FFmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg".to_string(), "ffprobe".to_string())
    }
}

impl FFmpegConverter {
    pub fn new(ffmpeg_path: String, ffprobe_path: String) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            loaded: Mutex::new(false),
            cancel: StdMutex::new(None),
        }
    }

    /// Build a converter from `FFMPEG_PATH` / `FFPROBE_PATH`, falling
    /// back to binaries on `$PATH`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            std::env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
        )
    }

    /// Verify the ffmpeg/ffprobe binaries once per instance lifetime.
    ///
    /// Idempotent; an abort that lands mid-load leaves the engine
    /// unloaded and returns silently rather than erroring.
    pub async fn load(&self) -> Result<()> {
        let mut loaded = self.loaded.lock().await;
        if *loaded {
            return Ok(());
        }

        for (name, path) in [("ffmpeg", &self.ffmpeg_path), ("ffprobe", &self.ffprobe_path)] {
            let output = Command::new(path)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map_err(|e| {
                    AppError::EngineLoad(format!("{name} not available at {path}: {e}"))
                })?;
            if !output.success() {
                return Err(AppError::EngineLoad(format!(
                    "{name} at {path} exited with {output}"
                )));
            }
        }

        // Termination racing the load is benign: stay unloaded.
        if self
            .cancel
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|t| t.is_cancelled())
        {
            return Ok(());
        }

        *loaded = true;
        tracing::debug!(ffmpeg = %self.ffmpeg_path, ffprobe = %self.ffprobe_path, "Engine loaded");
        Ok(())
    }

    /// Signal cooperative cancellation of the in-flight conversion.
    ///
    /// Best-effort: the conversion observes the signal at its next phase
    /// boundary. The engine cannot be reused after a forced kill, so the
    /// loaded state resets and the next use runs a fresh `load`.
    pub async fn abort(&self) {
        let token = self.cancel.lock().unwrap().take();
        if let Some(token) = token {
            token.cancel();
            *self.loaded.lock().await = false;
            tracing::info!("Conversion abort requested");
        }
    }

    /// Convert an audio file into a static-frame video.
    ///
    /// Returns `Ok(None)` when the conversion was cancelled; errors are
    /// reserved for genuine failures.
    pub async fn convert_to_video<F>(
        &self,
        source: &SourceAudio,
        on_progress: F,
        dimensions: VideoDimensions,
    ) -> Result<Option<ConvertedArtifact>>
    where
        F: Fn(ConversionProgress) + Send,
    {
        if dimensions.width == 0 || dimensions.height == 0 {
            return Err(AppError::Conversion(format!(
                "target dimensions must be positive, got {dimensions}"
            )));
        }

        self.load().await?;

        let token = CancellationToken::new();
        *self.cancel.lock().unwrap() = Some(token.clone());

        let workdir = tempfile::tempdir()
            .map_err(|e| AppError::Conversion(format!("cannot create working directory: {e}")))?;
        let input_path = workdir.path().join(format!("input.{}", source.extension()));
        let output_path = workdir.path().join("output.mp4");

        tokio::fs::write(&input_path, &source.data)
            .await
            .map_err(|e| AppError::Conversion(format!("cannot write input file: {e}")))?;

        let started = Instant::now();

        if token.is_cancelled() {
            self.reset_after_abort().await;
            return Ok(None);
        }

        // Validation pass: read the container duration, then decode the
        // whole input once discarding output so corrupt files fail here
        // instead of mid-render.
        let duration = self.probe_duration(&input_path).await?;
        if self.validate_input(&input_path, &token).await?.is_none() {
            self.reset_after_abort().await;
            return Ok(None);
        }

        if token.is_cancelled() {
            self.reset_after_abort().await;
            return Ok(None);
        }

        tracing::info!(
            file = %source.file_name,
            duration_secs = duration,
            dimensions = %dimensions,
            "Starting render"
        );

        if self
            .render(&input_path, &output_path, dimensions, duration, started, &token, &on_progress)
            .await?
            .is_none()
        {
            self.reset_after_abort().await;
            return Ok(None);
        }

        if token.is_cancelled() {
            self.reset_after_abort().await;
            return Ok(None);
        }

        let data = tokio::fs::read(&output_path)
            .await
            .map_err(|e| AppError::Conversion(format!("cannot read rendered output: {e}")))?;

        self.cancel.lock().unwrap().take();

        tracing::info!(
            file = %source.file_name,
            output_bytes = data.len(),
            elapsed_secs = started.elapsed().as_secs(),
            "Conversion complete"
        );

        Ok(Some(ConvertedArtifact::new(
            data,
            source.file_name.clone(),
        )))
    }

    /// Container duration in seconds via ffprobe's JSON output.
    async fn probe_duration(&self, input: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-show_format", "-of", "json"])
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AppError::Conversion(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Conversion(format!(
                "input is not a readable media file: {}",
                stderr.trim()
            )));
        }

        let parsed: FFprobeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| AppError::Conversion(format!("failed to parse ffprobe output: {e}")))?;

        parsed
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| *d > 0.0)
            .ok_or_else(|| AppError::Conversion("input has no audio duration".to_string()))
    }

    /// Full decode to the null muxer. `Ok(None)` means cancelled.
    async fn validate_input(
        &self,
        input: &Path,
        token: &CancellationToken,
    ) -> Result<Option<()>> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-v", "error", "-i"])
            .arg(input)
            .args(["-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| AppError::Conversion(format!("failed to run ffmpeg: {e}")))?;

        // Dropping the in-flight future kills the child (kill_on_drop).
        let output = tokio::select! {
            _ = token.cancelled() => return Ok(None),
            output = child.wait_with_output() => output
                .map_err(|e| AppError::Conversion(format!("ffmpeg did not finish: {e}")))?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Conversion(format!(
                "input failed to decode: {}",
                stderr.trim()
            )));
        }

        Ok(Some(()))
    }

    /// Render the color frame muxed against the AAC-encoded audio.
    /// `Ok(None)` means cancelled.
    #[allow(clippy::too_many_arguments)]
    async fn render<F>(
        &self,
        input: &Path,
        output: &Path,
        dimensions: VideoDimensions,
        duration: f64,
        started: Instant,
        token: &CancellationToken,
        on_progress: &F,
    ) -> Result<Option<()>>
    where
        F: Fn(ConversionProgress) + Send,
    {
        let color_source = format!(
            "color=c=black:s={}x{}:d={}",
            dimensions.width, dimensions.height, FRAME_DURATION_SECS
        );

        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-f", "lavfi", "-i", &color_source, "-i"])
            .arg(input)
            .args([
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-tune",
                "zerolatency",
                "-crf",
                "35",
                "-c:a",
                "aac",
                "-b:a",
                AUDIO_BITRATE,
                "-shortest",
                "-progress",
                "pipe:1",
                "-nostats",
                "-y",
            ])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| AppError::Conversion(format!("failed to run ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Conversion("ffmpeg stdout unavailable".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        loop {
            let line = tokio::select! {
                _ = token.cancelled() => {
                    let _ = child.kill().await;
                    return Ok(None);
                }
                line = lines.next_line() => line
                    .map_err(|e| AppError::Conversion(format!("progress stream error: {e}")))?,
            };

            let Some(line) = line else { break };
            if let Some(fraction) = parse_out_time_fraction(&line, duration) {
                on_progress(progress_update(fraction, started.elapsed().as_secs_f64()));
            }
        }

        let status = tokio::select! {
            _ = token.cancelled() => {
                let _ = child.kill().await;
                return Ok(None);
            }
            status = child.wait() => status
                .map_err(|e| AppError::Conversion(format!("ffmpeg did not finish: {e}")))?,
        };

        if !status.success() {
            let mut stderr_text = String::new();
            if let Some(mut stderr) = child.stderr.take() {
                stderr.read_to_string(&mut stderr_text).await.ok();
            }
            return Err(AppError::Conversion(format!(
                "render failed: {}",
                stderr_text.trim()
            )));
        }

        Ok(Some(()))
    }

    async fn reset_after_abort(&self) {
        self.cancel.lock().unwrap().take();
        *self.loaded.lock().await = false;
    }
}

/// Parse an `out_time_us=<microseconds>` progress line into a completed
/// fraction of the given duration.
fn parse_out_time_fraction(line: &str, duration_secs: f64) -> Option<f64> {
    let micros: i64 = line.strip_prefix("out_time_us=")?.trim().parse().ok()?;
    if micros < 0 || duration_secs <= 0.0 {
        return None;
    }
    Some((micros as f64 / 1_000_000.0 / duration_secs).clamp(0.0, 1.0))
}

/// Rescale a 0.0-1.0 fraction to a percent and derive the remaining-time
/// estimate by linear extrapolation: `remaining = elapsed/fraction - elapsed`.
fn progress_update(fraction: f64, elapsed_secs: f64) -> ConversionProgress {
    let mut remaining_seconds = None;
    if fraction > PROGRESS_THRESHOLD {
        let remaining = (elapsed_secs / fraction - elapsed_secs).ceil();
        if remaining > 0.0 && remaining < REMAINING_CEILING_SECS {
            remaining_seconds = Some(remaining as u64);
        }
    }

    ConversionProgress {
        progress: (fraction * 100.0).clamp(0.0, 100.0),
        elapsed_seconds: elapsed_secs as u64,
        remaining_seconds,
    }
}
