// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Waveframe conversion CLI.
//!
//! Converts an audio file to a static-frame video, persisting the
//! result so a rerun can pick it up without reconverting:
//!
//! ```text
//! waveframe-convert song.mp3 --resolution 720p --aspect-ratio 4:3 --out song.mp4
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use waveframe::error::Result;
use waveframe::models::{AspectRatio, Resolution, SourceAudio, VideoDimensions};
use waveframe::services::{
    ArtifactStore, ConversionOrchestrator, ConversionStatus, FFmpegConverter,
};

struct Args {
    input: PathBuf,
    resolution: Resolution,
    aspect_ratio: AspectRatio,
    out: Option<PathBuf>,
    data_dir: PathBuf,
}

fn parse_args() -> std::result::Result<Args, String> {
    let mut input = None;
    let mut resolution = Resolution::R1080p;
    let mut aspect_ratio = AspectRatio::Wide;
    let mut out = None;
    let mut data_dir = PathBuf::from(".waveframe");

    let mut argv = std::env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--resolution" => {
                let value = argv.next().ok_or("--resolution needs a value")?;
                resolution = value.parse()?;
            }
            "--aspect-ratio" => {
                let value = argv.next().ok_or("--aspect-ratio needs a value")?;
                aspect_ratio = value.parse()?;
            }
            "--out" => out = Some(PathBuf::from(argv.next().ok_or("--out needs a value")?)),
            "--data-dir" => {
                data_dir = PathBuf::from(argv.next().ok_or("--data-dir needs a value")?)
            }
            other if other.starts_with("--") => return Err(format!("unknown flag: {other}")),
            other => {
                if input.replace(PathBuf::from(other)).is_some() {
                    return Err("only one input file is supported".to_string());
                }
            }
        }
    }

    Ok(Args {
        input: input.ok_or("usage: waveframe-convert <audio-file> [--resolution 1080p|720p|480p] [--aspect-ratio 16:9|4:3|1:1] [--out FILE] [--data-dir DIR]")?,
        resolution,
        aspect_ratio,
        out,
        data_dir,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    waveframe::init_logging();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let engine = Arc::new(FFmpegConverter::from_env());
    let store = ArtifactStore::new(args.data_dir.clone());
    let orchestrator = ConversionOrchestrator::new(engine, store);

    // Pick up a conversion that survived a previous run.
    orchestrator.rehydrate().await;
    if let Some(artifact) = orchestrator.artifact().await {
        if artifact.original_file_name == file_name_of(&args.input) {
            tracing::info!(
                file = %artifact.original_file_name,
                bytes = artifact.data.len(),
                "Reusing previously converted artifact"
            );
            return write_output(&artifact.data, &args).await;
        }
        // Different input than the cached one: drop it and reconvert.
        orchestrator.remove_file().await;
    }

    let source = SourceAudio::from_path(&args.input).await?;
    let dimensions = VideoDimensions::for_target(args.resolution, args.aspect_ratio);
    tracing::info!(
        file = %source.file_name,
        dimensions = %dimensions,
        "Converting"
    );

    let mut snapshots = orchestrator.subscribe();
    let progress_task = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if snapshot.status == ConversionStatus::Converting {
                tracing::info!(
                    percent = format!("{:.1}", snapshot.progress_percent),
                    remaining_secs = snapshot.remaining_seconds,
                    "Progress"
                );
            }
        }
    });

    let result = orchestrator.convert_file(source, dimensions).await;
    progress_task.abort();

    let artifact = match result? {
        Some(artifact) => artifact,
        None => {
            tracing::warn!("Conversion was cancelled");
            return Ok(());
        }
    };

    write_output(&artifact.data, &args).await
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn write_output(data: &[u8], args: &Args) -> Result<()> {
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| args.input.with_extension("mp4"));
    tokio::fs::write(&out, data).await.map_err(|e| {
        waveframe::error::AppError::Storage(format!("cannot write {}: {e}", out.display()))
    })?;
    tracing::info!(path = %out.display(), bytes = data.len(), "Video written");
    Ok(())
}
