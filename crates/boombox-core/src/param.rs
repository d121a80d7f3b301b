//! AudioParam — a shared scalar written by the UI and read by the audio thread.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A clamped `f32` cell. Clones share the same value, writes are a single
/// atomic store (last write wins, no ramping).
#[derive(Debug, Clone)]
pub struct AudioParam {
    bits: Arc<AtomicU32>,
    min: f32,
    max: f32,
    default: f32,
}

impl AudioParam {
    pub fn new(default: f32, min: f32, max: f32) -> Self {
        let default = default.clamp(min, max);
        Self {
            bits: Arc::new(AtomicU32::new(default.to_bits())),
            min,
            max,
            default,
        }
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Store `value` clamped to the param range. NaN is ignored.
    pub fn set(&self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.bits
            .store(value.clamp(self.min, self.max).to_bits(), Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.set(self.default);
    }
}
