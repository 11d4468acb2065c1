//! Spectrum snapshot -> the handful of numbers the key oracle gets.
//!
//! The analyser works like a browser analyser node: a 2048-sample Blackman
//! window, FFT, and per-bin magnitudes in dB mapped from [-100, -30] dB onto
//! [0, 1]. The reduction then takes the mean bin value as amplitude and the
//! magnitude-weighted mean bin as average frequency.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Serialize;

pub const FFT_SIZE: usize = 2048;
pub const NUM_BINS: usize = FFT_SIZE / 2;
pub const SILENCE_THRESHOLD: f32 = 0.02;

const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFeatures {
    pub avg_frequency: f32,
    pub peak_frequency: f32,
    pub amplitude: f32,
    pub spectral_centroid: f32,
    pub zero_crossing_rate: f32,
}

impl AudioFeatures {
    /// Quiet input isn't worth an inference call.
    pub fn is_audible(&self) -> bool {
        self.amplitude > SILENCE_THRESHOLD
    }
}

/// Reduces normalized bins (0..=1) to features. `sample_rate` converts bin
/// indices to Hz.
pub fn reduce(bins: &[f32], sample_rate: u32) -> AudioFeatures {
    let n = bins.len().max(1);
    let hz_per_bin = sample_rate as f32 / (n as f32 * 2.0);

    let mut sum = 0.0f32;
    let mut weighted = 0.0f32;
    let mut peak = 0.0f32;
    let mut peak_idx = 0usize;
    for (i, &v) in bins.iter().enumerate() {
        sum += v;
        weighted += v * i as f32;
        if v > peak {
            peak = v;
            peak_idx = i;
        }
    }
    let avg_bin = if sum > 0.0 { weighted / sum } else { 0.0 };
    let avg_frequency = avg_bin * hz_per_bin;

    AudioFeatures {
        avg_frequency,
        peak_frequency: peak_idx as f32 * hz_per_bin,
        amplitude: sum / n as f32,
        // no separate centroid or zcr computation; the oracle gets the average
        spectral_centroid: avg_frequency,
        zero_crossing_rate: 0.0,
    }
}

pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    pub fn new() -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(FFT_SIZE);
        Self {
            fft,
            window: blackman(FFT_SIZE),
            scratch: vec![Complex::default(); FFT_SIZE],
        }
    }

    /// Normalized magnitudes for the most recent `FFT_SIZE` samples.
    /// Shorter input is zero-padded at the front.
    pub fn spectrum(&mut self, samples: &[f32]) -> Vec<f32> {
        let tail = &samples[samples.len().saturating_sub(FFT_SIZE)..];
        let pad = FFT_SIZE - tail.len();
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { tail[i - pad] };
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        self.scratch[..NUM_BINS]
            .iter()
            .map(|c| {
                let mag = c.norm() / FFT_SIZE as f32;
                let db = 20.0 * mag.max(1e-12).log10();
                ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0)
            })
            .collect()
    }

    pub fn features(&mut self, samples: &[f32], sample_rate: u32) -> AudioFeatures {
        let bins = self.spectrum(samples);
        reduce(&bins, sample_rate)
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

fn blackman(n: usize) -> Vec<f32> {
    let alpha = 0.16f32;
    let a0 = (1.0 - alpha) / 2.0;
    let a1 = 0.5;
    let a2 = alpha / 2.0;
    (0..n)
        .map(|i| {
            let x = std::f32::consts::TAU * i as f32 / n as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}

/// The most recent mono samples from the microphone, oldest first.
#[derive(Debug, Clone)]
pub struct AnalyserWindow {
    samples: VecDeque<f32>,
}

impl AnalyserWindow {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(FFT_SIZE),
        }
    }

    pub fn push(&mut self, input: &[f32]) {
        for &s in input {
            if self.samples.len() == FFT_SIZE {
                self.samples.pop_front();
            }
            self.samples.push_back(s);
        }
    }

    pub fn snapshot(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for AnalyserWindow {
    fn default() -> Self {
        Self::new()
    }
}
