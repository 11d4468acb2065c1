use std::path::Path;
use std::time::Duration;

use super::frame::StereoFrame;
use crate::error::StoreError;

/// A decoded recording at the output device's sample rate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    /// Loads a WAV (mono or stereo, int or float) and resamples it to
    /// `target_rate`.
    pub fn load_wav(path: &Path, target_rate: u32) -> Result<Self, StoreError> {
        let wav_err = |source| StoreError::Wav { path: path.to_path_buf(), source };
        let mut reader = hound::WavReader::open(path).map_err(wav_err)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(wav_err)?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(wav_err)?
            }
        };

        let frames: Vec<StereoFrame> = match spec.channels {
            1 => samples.into_iter().map(|x| StereoFrame { left: x, right: x }).collect(),
            n => samples
                .chunks_exact(n as usize)
                .map(|c| StereoFrame { left: c[0], right: c[1] })
                .collect(),
        };

        Ok(Self {
            data: resample_linear(&frames, spec.sample_rate, target_rate),
            sample_rate: target_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.data.len() as f64 / self.sample_rate as f64)
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || source_rate == 0 || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let last = frames.len() - 1;

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            if idx >= last {
                return frames[last];
            }
            let frac = (src_pos - idx as f64) as f32;
            let (a, b) = (frames[idx], frames[idx + 1]);
            StereoFrame {
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            }
        })
        .collect()
}
