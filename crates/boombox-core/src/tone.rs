//! Tone controls: bass, treble, balance and volume.
//!
//! Setters clamp their input, remember it, and write straight through to
//! the live graph parameter when a graph is attached. Without a graph the
//! value is kept and applied by [`ToneControls::attach`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dsp::biquad::{SHELF_GAIN_MAX_DB, SHELF_GAIN_MIN_DB};
use crate::graph::AudioGraphHandle;
use crate::media::MediaElement;

/// Range of the balance control in the UI.
pub const PAN_UI_RANGE: f32 = 50.0;
pub const VOLUME_MAX: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneParameters {
    /// Low-shelf gain, dB in [-20, 20].
    #[serde(default)]
    pub bass_gain_db: f32,
    /// High-shelf gain, dB in [-20, 20].
    #[serde(default)]
    pub treble_gain_db: f32,
    /// Balance in [-1, 1].
    #[serde(default)]
    pub pan_position: f32,
    /// Volume in [0, 100].
    #[serde(default = "default_volume_level")]
    pub volume_level: f32,
}

fn default_volume_level() -> f32 {
    50.0
}

impl Default for ToneParameters {
    fn default() -> Self {
        Self {
            bass_gain_db: 0.0,
            treble_gain_db: 0.0,
            pan_position: 0.0,
            volume_level: default_volume_level(),
        }
    }
}

impl ToneParameters {
    /// Copy with every field forced into range.
    pub fn clamped(self) -> Self {
        Self {
            bass_gain_db: clamp_gain(self.bass_gain_db, 0.0),
            treble_gain_db: clamp_gain(self.treble_gain_db, 0.0),
            pan_position: clamp_or(self.pan_position, -1.0, 1.0, 0.0),
            volume_level: clamp_or(self.volume_level, 0.0, VOLUME_MAX, default_volume_level()),
        }
    }

    /// Load from JSON, falling back to defaults on any error.
    pub fn load(path: &std::path::Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str::<Self>(&s).ok())
            .map(Self::clamped)
            .unwrap_or_default()
    }

    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn clamp_or(v: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if v.is_nan() {
        fallback
    } else {
        v.clamp(min, max)
    }
}

fn clamp_gain(db: f32, fallback: f32) -> f32 {
    clamp_or(db, SHELF_GAIN_MIN_DB, SHELF_GAIN_MAX_DB, fallback)
}

#[derive(Debug, Default)]
pub struct ToneControls {
    params: ToneParameters,
    graph: Option<AudioGraphHandle>,
}

impl ToneControls {
    pub fn new(params: ToneParameters) -> Self {
        Self {
            params: params.clamped(),
            graph: None,
        }
    }

    pub fn params(&self) -> ToneParameters {
        self.params
    }

    pub fn is_attached(&self) -> bool {
        self.graph.is_some()
    }

    /// Bind to a freshly ensured graph and push the stored values into it.
    /// Re-attaching the same graph is harmless.
    pub fn attach(&mut self, graph: AudioGraphHandle) {
        graph.bass_gain().set(self.params.bass_gain_db);
        graph.treble_gain().set(self.params.treble_gain_db);
        graph.pan().set(self.params.pan_position);
        self.graph = Some(graph);
    }

    pub fn set_bass(&mut self, db: f32) -> f32 {
        self.params.bass_gain_db = clamp_gain(db, self.params.bass_gain_db);
        if let Some(graph) = &self.graph {
            graph.bass_gain().set(self.params.bass_gain_db);
        }
        debug!("bass {:+.1} dB", self.params.bass_gain_db);
        self.params.bass_gain_db
    }

    pub fn set_treble(&mut self, db: f32) -> f32 {
        self.params.treble_gain_db = clamp_gain(db, self.params.treble_gain_db);
        if let Some(graph) = &self.graph {
            graph.treble_gain().set(self.params.treble_gain_db);
        }
        debug!("treble {:+.1} dB", self.params.treble_gain_db);
        self.params.treble_gain_db
    }

    /// Balance in normalised units, -1 (left) ..= 1 (right).
    pub fn set_pan(&mut self, position: f32) -> f32 {
        self.params.pan_position = clamp_or(position, -1.0, 1.0, self.params.pan_position);
        if let Some(graph) = &self.graph {
            graph.pan().set(self.params.pan_position);
        }
        debug!("pan {:+.2}", self.params.pan_position);
        self.params.pan_position
    }

    /// Balance from the UI control, -50 ..= 50.
    pub fn set_pan_ui(&mut self, value: f32) -> f32 {
        self.set_pan(value / PAN_UI_RANGE)
    }

    /// Volume on the 0..=100 scale, written to the element's native volume.
    pub fn set_volume(&mut self, level: f32, element: &mut dyn MediaElement) -> f32 {
        self.params.volume_level = clamp_or(level, 0.0, VOLUME_MAX, self.params.volume_level);
        self.apply_volume(element);
        self.params.volume_level
    }

    pub fn apply_volume(&self, element: &mut dyn MediaElement) {
        element.set_volume(self.params.volume_level / VOLUME_MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::graph::{GraphBuilder, SoftwarePlatform};
    use crate::media::{PcmData, PcmElement};

    fn attached() -> (ToneControls, AudioGraphHandle, PcmElement) {
        let mut el = PcmElement::new(8000);
        el.set_src("tone", PcmData::sine(440.0, 0.5, 0.5, 8000));
        let mut builder = GraphBuilder::new(Box::new(SoftwarePlatform), AudioConfig::default());
        let graph = builder.ensure_graph(&el).handle().cloned().unwrap();
        let mut tone = ToneControls::default();
        tone.attach(graph.clone());
        (tone, graph, el)
    }

    #[test]
    fn test_setters_clamp() {
        let mut tone = ToneControls::default();
        assert_eq!(tone.set_bass(35.0), 20.0);
        assert_eq!(tone.set_treble(-99.0), -20.0);
        assert_eq!(tone.set_pan(3.0), 1.0);
        assert_eq!(tone.set_pan_ui(-25.0), -0.5);
    }

    #[test]
    fn test_nan_keeps_current_value() {
        let (mut tone, graph, mut el) = attached();
        tone.set_bass(6.0);
        tone.set_treble(-4.0);
        tone.set_pan(0.25);
        tone.set_volume(30.0, &mut el);

        assert_eq!(tone.set_bass(f32::NAN), 6.0);
        assert_eq!(tone.set_treble(f32::NAN), -4.0);
        assert_eq!(tone.set_pan(f32::NAN), 0.25);
        assert_eq!(tone.set_volume(f32::NAN, &mut el), 30.0);
        assert_eq!(graph.bass_gain().get(), 6.0);
        assert_eq!(graph.treble_gain().get(), -4.0);
    }

    #[test]
    fn test_values_applied_on_attach() {
        let mut tone = ToneControls::default();
        tone.set_bass(6.0);
        tone.set_pan_ui(50.0);
        assert!(!tone.is_attached());

        let (_, graph, _) = attached();
        tone.attach(graph.clone());
        assert_eq!(graph.bass_gain().get(), 6.0);
        assert_eq!(graph.treble_gain().get(), 0.0);
        assert_eq!(graph.pan().get(), 1.0);
    }

    #[test]
    fn test_bass_only_touches_bass_node() {
        let (mut tone, graph, _) = attached();
        tone.set_treble(4.0);
        tone.set_pan(-0.3);

        tone.set_bass(-12.0);
        assert_eq!(graph.bass_gain().get(), -12.0);
        assert_eq!(graph.treble_gain().get(), 4.0);
        assert_eq!(graph.pan().get(), -0.3);
        assert_eq!(tone.params().treble_gain_db, 4.0);
        assert_eq!(tone.params().pan_position, -0.3);
    }

    #[test]
    fn test_volume_maps_to_element() {
        let (mut tone, _, mut el) = attached();
        assert_eq!(tone.set_volume(75.0, &mut el), 75.0);
        assert_eq!(el.volume(), 0.75);
        assert_eq!(tone.set_volume(140.0, &mut el), 100.0);
        assert_eq!(el.volume(), 1.0);
    }

    #[test]
    fn test_params_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.json");
        let params = ToneParameters {
            bass_gain_db: 3.0,
            treble_gain_db: -2.0,
            pan_position: 0.5,
            volume_level: 80.0,
        };
        params.save(&path).unwrap();
        assert_eq!(ToneParameters::load(&path), params);

        let missing = dir.path().join("missing.json");
        assert_eq!(ToneParameters::load(&missing), ToneParameters::default());
    }
}
