use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{info, warn};

use crate::audio_api::AudioCommand;

pub mod capture;
mod engine;
mod frame;
mod sample_buffer;
mod voice;

pub use capture::{CaptureStream, CpalMicrophone, Microphone, RecordedAudio};
pub use frame::StereoFrame;
pub use sample_buffer::SampleBuffer;

use engine::Engine;

// Largest device buffer we render without growing the scratch block.
const MAX_BLOCK_FRAMES: usize = 8192;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    /// The sequencer's band clones this to reach the synth.
    pub fn sender(&self) -> Sender<AudioCommand> {
        self.tx.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream =
                build_output_stream_f32(&device, &config.into(), rx, sample_rate, channels)?;
            output_stream.play().context("failed to play output stream")?;
            info!(sample_rate, channels, "audio output started");

            Ok(AudioHandle { tx, sample_rate, _output_stream: output_stream })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    sample_rate: u32,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(sample_rate);
    let mut scratch = vec![StereoFrame::zero(); MAX_BLOCK_FRAMES];

    let err_fn = |err| warn!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            for chunk in data.chunks_mut(MAX_BLOCK_FRAMES * channels.max(1)) {
                let n_frames = chunk.len() / channels.max(1);
                let block = &mut scratch[..n_frames];
                engine.render_block(block);
                for (out, frame) in chunk.chunks_mut(channels.max(1)).zip(block.iter()) {
                    frame.write_to(out);
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
