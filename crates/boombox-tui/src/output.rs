//! Output device — the graph's destination.
//!
//! The cpal callback pulls one block from the shared element through the
//! current graph (or straight from the element when there is none) and
//! spreads the stereo result over the device's channels.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use boombox_core::media::PcmElement;
use boombox_core::GraphAvailability;

pub type SharedElement = Arc<Mutex<PcmElement>>;
pub type SharedGraph = Arc<Mutex<GraphAvailability>>;

pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keeps the device stream alive; playback stops when dropped.
pub struct AudioOutput {
    _stream: cpal::Stream,
    sample_rate: u32,
}

impl AudioOutput {
    /// Rate of the default output device, for sizing the element before the
    /// stream exists.
    pub fn default_rate() -> anyhow::Result<u32> {
        let device = cpal::default_host()
            .default_output_device()
            .context("no audio output device")?;
        Ok(device.default_output_config()?.sample_rate().0)
    }

    pub fn start(element: SharedElement, graph: SharedGraph) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no audio output device")?;
        let supported = device.default_output_config()?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            anyhow::bail!(
                "output device wants {:?} samples; only f32 is supported",
                supported.sample_format()
            );
        }
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0;
        info!(
            "audio output: {} ({} Hz, {} ch)",
            device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            channels
        );

        let mut stereo: Vec<f32> = Vec::new();
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                stereo.resize(frames * 2, 0.0);

                let current = lock(&graph).clone();
                current.render(&mut *lock(&element), &mut stereo);
                spread(&stereo, data, channels);
            },
            |e| error!("audio output stream error: {}", e),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Map interleaved stereo onto `channels` device channels. Mono devices get
/// the average; channels past the second repeat the right side.
fn spread(stereo: &[f32], out: &mut [f32], channels: usize) {
    if channels == 2 {
        out.copy_from_slice(&stereo[..out.len()]);
        return;
    }
    for (frame, src) in out.chunks_exact_mut(channels).zip(stereo.chunks_exact(2)) {
        if channels == 1 {
            frame[0] = 0.5 * (src[0] + src[1]);
            continue;
        }
        for (k, sample) in frame.iter_mut().enumerate() {
            *sample = src[k.min(1)];
        }
    }
}
