use std::f32::consts::FRAC_PI_2;

use crate::param::AudioParam;

/// Equal-power stereo panner for stereo input.
///
/// At `pan < 0` the right channel is folded into the left with a cosine
/// weight, at `pan > 0` the left is folded into the right. `pan == 0`
/// passes audio unchanged.
#[derive(Debug)]
pub struct StereoPanner {
    pan: AudioParam,
}

impl Default for StereoPanner {
    fn default() -> Self {
        Self::new()
    }
}

impl StereoPanner {
    pub fn new() -> Self {
        Self {
            pan: AudioParam::new(0.0, -1.0, 1.0),
        }
    }

    pub fn pan(&self) -> AudioParam {
        self.pan.clone()
    }

    /// Left/right weights for the current position.
    fn weights(pan: f32) -> (f32, f32) {
        let x = if pan <= 0.0 { pan + 1.0 } else { pan };
        let angle = x * FRAC_PI_2;
        (angle.cos(), angle.sin())
    }

    pub fn process(&mut self, frames: &mut [f32]) {
        let pan = self.pan.get();
        if pan == 0.0 {
            return;
        }
        let (gain_l, gain_r) = Self::weights(pan);
        for frame in frames.chunks_exact_mut(2) {
            let (l, r) = (frame[0], frame[1]);
            if pan <= 0.0 {
                frame[0] = l + r * gain_l;
                frame[1] = r * gain_r;
            } else {
                frame[0] = l * gain_l;
                frame[1] = r + l * gain_r;
            }
        }
    }
}
