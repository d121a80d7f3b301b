use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;
use crate::spectrum::BandScaling;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

/// Filter graph constants. Frequencies are fixed per graph lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_bass_frequency")]
    pub bass_frequency_hz: f32,
    #[serde(default = "default_treble_frequency")]
    pub treble_frequency_hz: f32,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing_time_constant: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizerConfig {
    /// Display refresh rate of the sampling loop.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default)]
    pub scaling: BandScaling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Initial volume on the 0..100 UI scale.
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            bass_frequency_hz: default_bass_frequency(),
            treble_frequency_hz: default_treble_frequency(),
            fft_size: default_fft_size(),
            smoothing_time_constant: default_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            scaling: BandScaling::default(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            autoplay: default_autoplay(),
        }
    }
}

fn default_bass_frequency() -> f32 {
    300.0
}

fn default_treble_frequency() -> f32 {
    3000.0
}

fn default_fft_size() -> usize {
    256
}

fn default_smoothing() -> f32 {
    0.8
}

fn default_min_decibels() -> f32 {
    -100.0
}

fn default_max_decibels() -> f32 {
    -30.0
}

fn default_frame_rate() -> u32 {
    60
}

fn default_volume() -> f32 {
    50.0
}

fn default_autoplay() -> bool {
    true
}

impl Config {
    /// Load from the default location, writing defaults on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.visualizer.scaling = config.visualizer.scaling.sanitized();
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.bass_frequency_hz, 300.0);
        assert_eq!(config.audio.treble_frequency_hz, 3000.0);
        assert_eq!(config.audio.fft_size, 256);
        assert_eq!(config.visualizer.frame_rate, 60);
        assert_eq!(config.visualizer.scaling.bass_end, 3);
        assert_eq!(config.visualizer.scaling.mid_end, 11);
        assert_eq!(config.player.default_volume, 50.0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [audio]
            fft_size = 512

            [visualizer.scaling]
            bass_exponent = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.fft_size, 512);
        assert_eq!(config.audio.max_decibels, -30.0);
        assert_eq!(config.visualizer.scaling.bass_exponent, 3.0);
        assert_eq!(config.visualizer.scaling.treble_exponent, 0.5);
        assert!(config.player.autoplay);
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boombox").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.audio.fft_size, 256);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.visualizer.frame_rate, config.visualizer.frame_rate);
    }

    #[test]
    fn test_load_repairs_inverted_scaling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[visualizer.scaling]\nfloor = 50.0\nceiling = 10.0\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        let scaling = &config.visualizer.scaling;
        assert!(scaling.floor <= scaling.ceiling);
        let frame = crate::spectrum::run_frame(&[128; 128], scaling);
        assert!(frame.bars.iter().all(|b| (2.0..=100.0).contains(&b.height)));
    }
}
