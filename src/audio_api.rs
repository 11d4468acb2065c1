// Messages from the host loop to the synth running in the audio callback.

use std::sync::Arc;

use crate::audio::SampleBuffer;

/// Which synth patch a voice uses. One per band instrument family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Patch {
    Guitar,
    Bass,
    Piano,
    Kick,
    Snare,
    HiHat,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TriggerParams {
    pub patch: Patch,
    pub freqs: Vec<f32>,  // one voice per frequency; drums use a single nominal pitch
    pub duration: f32,    // seconds the gate stays open
    pub velocity: f32,    // 0.0 to 1.0
    pub delay: f32,       // seconds from now, lets the synth start sample-accurately
}

#[derive(Clone, Debug, PartialEq)]
pub enum AudioCommand {
    Trigger(TriggerParams),

    // Fade out everything a patch is playing and forget its queued triggers.
    Release(Patch),

    // Drop triggers that are queued but haven't started sounding yet. Sent
    // when the sequencer stops so a restart never doubles a step.
    CancelPending,

    // Play a stored recording from its start, replacing any clip already playing.
    Play(Arc<SampleBuffer>),
}
