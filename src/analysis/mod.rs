//! Live audio analysis: spectrum features and the periodic key sampler.

pub mod features;
pub mod sampler;

pub use features::{reduce, AnalyserWindow, AudioFeatures, SpectrumAnalyser, SILENCE_THRESHOLD};
pub use sampler::{Cadence, CancelToken, SampleOutcome, Sampler};
