use std::sync::Arc;

use crate::audio_api::{AudioCommand, Patch, TriggerParams};

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::voice::Voice;

// hard cap so we never allocate in the audio callback; scheduled notes
// hold a voice while they wait out their delay
const MAX_VOICES: usize = 64;
const MASTER_GAIN: f32 = 0.8;

// a recording being played back, mixed on top of the synth voices
struct Clip {
    buffer: Arc<SampleBuffer>,
    pos: usize,
}

pub struct Engine {
    voices: Vec<Voice>,
    clip: Option<Clip>,
}

impl Engine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            voices: vec![Voice::silent(sample_rate as f32); MAX_VOICES],
            clip: None,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Trigger(t) => self.trigger(t),
            AudioCommand::Release(patch) => self.release(patch),
            AudioCommand::CancelPending => {
                for v in self.voices.iter_mut().filter(|v| v.is_pending()) {
                    v.alive = false;
                }
            }
            AudioCommand::Play(buffer) => self.clip = Some(Clip { buffer, pos: 0 }),
        }
    }

    fn trigger(&mut self, t: TriggerParams) {
        for &freq in &t.freqs {
            let slot = self.free_slot();
            self.voices[slot].start(t.patch, freq, t.velocity, t.duration, t.delay);
        }
    }

    // first idle voice, else steal the one that has sounded longest
    fn free_slot(&self) -> usize {
        if let Some(i) = self.voices.iter().position(|v| !v.alive) {
            return i;
        }
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_pending())
            .max_by_key(|(_, v)| v.age())
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn release(&mut self, patch: Patch) {
        for v in self.voices.iter_mut().filter(|v| v.alive && v.patch == patch) {
            v.cut();
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.alive).count()
    }

    pub fn is_playing_clip(&self) -> bool {
        self.clip.is_some()
    }

    pub fn next_sample(&mut self) -> f32 {
        let mut out = 0.0f32;
        for v in &mut self.voices {
            out += v.next_sample();
        }
        (out * MASTER_GAIN).clamp(-1.0, 1.0)
    }

    fn next_clip_frame(&mut self) -> StereoFrame {
        let Some(clip) = self.clip.as_mut() else {
            return StereoFrame::zero();
        };
        match clip.buffer.data.get(clip.pos) {
            Some(&frame) => {
                clip.pos += 1;
                frame
            }
            None => {
                self.clip = None;
                StereoFrame::zero()
            }
        }
    }

    pub fn render_block(&mut self, frames: &mut [StereoFrame]) {
        for f in frames {
            let s = self.next_sample();
            let c = self.next_clip_frame();
            *f = StereoFrame {
                left: (s + c.left).clamp(-1.0, 1.0),
                right: (s + c.right).clamp(-1.0, 1.0),
            };
        }
    }
}
