//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use boombox_core::config::Config;

#[derive(Parser, Debug)]
#[command(name = "boombox")]
#[command(about = "Terminal music player with tone controls and a spectrum display", long_about = None)]
pub struct Args {
    /// WAV files to play, in order
    #[arg(value_name = "FILE")]
    pub paths: Vec<PathBuf>,

    /// Config file (defaults to <config dir>/boombox/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Play without the tone/analyser graph
    #[arg(long)]
    pub no_audio_graph: bool,

    /// Spectrum refresh rate, overriding the config
    #[arg(long, value_name = "FPS")]
    pub fps: Option<u32>,
}

impl Args {
    /// Config from `--config` or the default location, with CLI overrides
    /// applied. Unreadable config falls back to defaults.
    pub fn resolve_config(&self) -> Config {
        let loaded = match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        };
        let mut config = loaded.unwrap_or_else(|e| {
            tracing::warn!("config unreadable, using defaults: {:#}", e);
            Config::default()
        });
        if let Some(fps) = self.fps {
            config.visualizer.frame_rate = fps.max(1);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paths_and_flags() {
        let args = Args::parse_from(["boombox", "a.wav", "b.wav", "--no-audio-graph", "--fps", "30"]);
        assert_eq!(args.paths, vec![PathBuf::from("a.wav"), PathBuf::from("b.wav")]);
        assert!(args.no_audio_graph);
        assert_eq!(args.fps, Some(30));
    }

    #[test]
    fn test_fps_override_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let args = Args::parse_from([
            "boombox".to_string(),
            "--config".to_string(),
            path.display().to_string(),
            "--fps".to_string(),
            "0".to_string(),
        ]);
        let config = args.resolve_config();
        assert_eq!(config.visualizer.frame_rate, 1);
        assert!(path.exists());
    }
}
