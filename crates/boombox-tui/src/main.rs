mod action;
mod app;
mod cli;
mod components;
mod decode;
mod output;
mod theme;

use std::sync::{Arc, Mutex};

use clap::Parser;

use boombox_core::graph::{AudioPlatform, SoftwarePlatform, UnsupportedPlatform};
use boombox_core::media::PcmElement;
use boombox_core::{GraphAvailability, ToneParameters};

use crate::output::AudioOutput;

/// Used when no output device can be queried.
const FALLBACK_SAMPLE_RATE: u32 = 48_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let data_dir = boombox_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("boombox.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; the terminal belongs to the UI so logs go to a file.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("boombox log: {}", log_path.display());
    tracing::info!("boombox starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = args.resolve_config();

    // ── Tone settings from the last session ──────────────────────────────────
    let tone_path = boombox_core::platform::tone_state_path();
    let tone = if tone_path.exists() {
        ToneParameters::load(&tone_path)
    } else {
        ToneParameters {
            volume_level: config.player.default_volume,
            ..ToneParameters::default()
        }
        .clamped()
    };

    // ── Element + output device ──────────────────────────────────────────────
    let sample_rate = AudioOutput::default_rate().unwrap_or_else(|e| {
        tracing::warn!("{:#}; assuming {} Hz", e, FALLBACK_SAMPLE_RATE);
        FALLBACK_SAMPLE_RATE
    });
    let element = Arc::new(Mutex::new(PcmElement::new(sample_rate)));
    let graph = Arc::new(Mutex::new(GraphAvailability::Unavailable));

    let _output = match AudioOutput::start(element.clone(), graph.clone()) {
        Ok(output) => {
            tracing::info!("output running at {} Hz", output.sample_rate());
            Some(output)
        }
        Err(e) => {
            tracing::warn!("no audio output, running silent: {:#}", e);
            None
        }
    };

    let platform: Box<dyn AudioPlatform> = if args.no_audio_graph {
        tracing::info!("audio graph disabled by flag");
        Box::new(UnsupportedPlatform)
    } else {
        Box::new(SoftwarePlatform)
    };

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(
        &config,
        platform,
        args.paths,
        element,
        graph,
        tone,
        tone_path,
    );
    app.run().await?;

    Ok(())
}
