//! WAV decoding into the element's stereo PCM.

use std::path::Path;

use anyhow::Context;
use boombox_core::media::PcmData;

pub fn decode_wav(path: &Path) -> anyhow::Result<PcmData> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("reading {}", path.display()))?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("reading {}", path.display()))?
        }
    };

    tracing::debug!(
        "decoded {}: {} Hz, {} ch, {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len()
    );
    Ok(PcmData::from_interleaved(
        &samples,
        spec.channels,
        spec.sample_rate,
    )?)
}
