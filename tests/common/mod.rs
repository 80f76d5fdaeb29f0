// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use waveframe::config::Config;
use waveframe::routes::create_router;
use waveframe::services::YouTubeClient;
use waveframe::AppState;

/// Check if the ffmpeg binaries are available on this machine.
#[allow(dead_code)]
pub fn ffmpeg_available() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Skip test with message if ffmpeg is not installed.
#[macro_export]
macro_rules! require_ffmpeg {
    () => {
        if !crate::common::ffmpeg_available() {
            eprintln!("⚠️  Skipping: ffmpeg not found on PATH");
            return;
        }
    };
}

/// Create a test app with default (unreachable-remote) config.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

/// Create a test app whose remote endpoints point wherever the config
/// says (usually a local mock server).
#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let youtube = YouTubeClient::new(&config);
    let state = Arc::new(AppState { config, youtube });
    (create_router(state.clone()), state)
}

/// Config whose Google/YouTube endpoints all target a mock server.
#[allow(dead_code)]
pub fn mock_remote_config(mock_base_url: &str) -> Config {
    let mut config = Config::test_default();
    config.token_url = format!("{mock_base_url}/token");
    config.oauth_base_url = format!("{mock_base_url}/auth");
    config.youtube_api_base_url = format!("{mock_base_url}/youtube/v3");
    config.youtube_upload_base_url = format!("{mock_base_url}/upload/youtube/v3");
    config
}

/// Generate a short sine-wave audio fixture with ffmpeg.
/// Returns the path; panics if generation fails.
#[allow(dead_code)]
pub fn generate_test_audio(dir: &std::path::Path, seconds: f64) -> std::path::PathBuf {
    let path = dir.join("tone.mp3");
    let status = std::process::Command::new("ffmpeg")
        .args([
            "-f",
            "lavfi",
            "-i",
            &format!("sine=frequency=440:duration={seconds}"),
            "-b:a",
            "64k",
            "-y",
        ])
        .arg(&path)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .expect("failed to run ffmpeg");
    assert!(status.success(), "ffmpeg could not generate test audio");
    path
}

/// Probe a media file's duration in seconds with ffprobe.
#[allow(dead_code)]
pub fn probe_duration(path: &std::path::Path) -> f64 {
    let output = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .expect("failed to run ffprobe");
    assert!(output.status.success(), "ffprobe failed");
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .expect("unparseable duration")
}
