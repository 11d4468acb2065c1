//! Microphone side: a cpal input stream that feeds both the analyser window
//! and the session recording.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::analysis::AnalyserWindow;
use crate::error::SessionError;

/// Everything the microphone heard during one session, mono.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl RecordedAudio {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

pub trait Microphone {
    fn open(&self) -> Result<Box<dyn CaptureStream>, SessionError>;
}

pub trait CaptureStream {
    /// Moves whatever the device produced since the last call into the
    /// analyser window and the recording.
    fn drain(&mut self);
    fn window(&self) -> Arc<Mutex<AnalyserWindow>>;
    fn sample_rate(&self) -> u32;
    /// Stops the device and hands back the recording.
    fn finish(self: Box<Self>) -> RecordedAudio;
}

/// Buffers the capture callback's blocks on the host side.
pub struct CaptureBuffer {
    rx: Receiver<Vec<f32>>,
    window: Arc<Mutex<AnalyserWindow>>,
    recorded: Vec<f32>,
    sample_rate: u32,
}

impl CaptureBuffer {
    pub fn new(rx: Receiver<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            rx,
            window: Arc::new(Mutex::new(AnalyserWindow::new())),
            recorded: Vec::new(),
            sample_rate,
        }
    }

    pub fn drain(&mut self) {
        while let Ok(block) = self.rx.try_recv() {
            if let Ok(mut w) = self.window.lock() {
                w.push(&block);
            }
            self.recorded.extend_from_slice(&block);
        }
    }

    pub fn window(&self) -> Arc<Mutex<AnalyserWindow>> {
        Arc::clone(&self.window)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn into_recording(mut self) -> RecordedAudio {
        self.drain();
        RecordedAudio { samples: self.recorded, sample_rate: self.sample_rate }
    }
}

/// The default input device of the default cpal host.
pub struct CpalMicrophone;

struct CpalCapture {
    stream: cpal::Stream,
    buffer: CaptureBuffer,
}

impl Microphone for CpalMicrophone {
    fn open(&self) -> Result<Box<dyn CaptureStream>, SessionError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| SessionError::Capture("no default input device".into()))?;
        let supported = device
            .default_input_config()
            .map_err(|e| SessionError::Capture(e.to_string()))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(SessionError::Capture(format!(
                "unsupported sample format {:?} (only f32 supported)",
                supported.sample_format()
            )));
        }
        let sample_rate = supported.sample_rate();
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;

        let (tx, rx) = crossbeam_channel::bounded::<Vec<f32>>(2048);
        let stream = build_input_stream_f32(&device, &config, channels, tx)?;
        stream.play().map_err(|e| SessionError::Capture(e.to_string()))?;
        debug!(sample_rate, channels, "capture started");

        Ok(Box::new(CpalCapture { stream, buffer: CaptureBuffer::new(rx, sample_rate) }))
    }
}

fn build_input_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    tx: Sender<Vec<f32>>,
) -> Result<cpal::Stream, SessionError> {
    let err_fn = |err| warn!("audio input stream error: {err}");
    device
        .build_input_stream(
            config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = if channels <= 1 {
                    data.to_vec()
                } else {
                    data.chunks_exact(channels)
                        .map(|c| c.iter().sum::<f32>() / channels as f32)
                        .collect()
                };
                let _ = tx.try_send(mono);
            },
            err_fn,
            None,
        )
        .map_err(|e| SessionError::Capture(e.to_string()))
}

impl CaptureStream for CpalCapture {
    fn drain(&mut self) {
        self.buffer.drain();
    }

    fn window(&self) -> Arc<Mutex<AnalyserWindow>> {
        self.buffer.window()
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    fn finish(self: Box<Self>) -> RecordedAudio {
        let CpalCapture { stream, buffer } = *self;
        if let Err(e) = stream.pause() {
            debug!("could not pause capture: {e}");
        }
        drop(stream);
        buffer.into_recording()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_feeds_window_and_recording() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut buf = CaptureBuffer::new(rx, 8000);
        tx.send(vec![0.1; 100]).unwrap();
        tx.send(vec![0.2; 50]).unwrap();
        buf.drain();
        assert_eq!(buf.window().lock().unwrap().len(), 150);
        tx.send(vec![0.3; 10]).unwrap();
        let rec = buf.into_recording();
        assert_eq!(rec.samples.len(), 160);
        assert_eq!(rec.samples[159], 0.3);
        assert_eq!(rec.duration(), Duration::from_millis(20));
    }

    #[test]
    fn empty_recording_has_no_duration() {
        assert_eq!(RecordedAudio::default().duration(), Duration::ZERO);
        assert!(RecordedAudio::default().is_empty());
    }
}
