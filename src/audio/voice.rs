use crate::audio_api::Patch;

// Linear ADSR, all times in seconds.
#[derive(Clone, Copy, Debug)]
struct Envelope {
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
}

impl Envelope {
    const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self { attack, decay, sustain, release }
    }

    // level while the gate is open, t seconds after note start
    fn held(&self, t: f32) -> f32 {
        if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            1.0 - (1.0 - self.sustain) * (t - self.attack) / self.decay
        } else {
            self.sustain
        }
    }
}

struct PatchSpec {
    env: Envelope,
    gain: f32, // linear, from the patch volume in dB
}

fn patch_spec(patch: Patch) -> PatchSpec {
    let (env, db) = match patch {
        Patch::Guitar => (Envelope::new(0.01, 0.4, 0.2, 0.8), -10.0),
        Patch::Piano => (Envelope::new(0.005, 0.6, 0.3, 1.2), -10.0),
        Patch::Bass => (Envelope::new(0.05, 0.3, 0.4, 0.5), -6.0),
        Patch::Kick => (Envelope::new(0.001, 0.2, 0.0, 0.05), -4.0),
        Patch::Snare => (Envelope::new(0.001, 0.15, 0.0, 0.05), -10.0),
        Patch::HiHat => (Envelope::new(0.001, 0.05, 0.0, 0.01), -18.0),
    };
    PatchSpec { env, gain: 10.0_f32.powf(db / 20.0) }
}

const GUITAR_HARMONICITY: f32 = 3.01;
const GUITAR_MOD_INDEX: f32 = 2.0;
const KICK_OCTAVES: f32 = 6.0;
const KICK_PITCH_DECAY: f32 = 0.05;
const BASS_CUTOFF_HZ: f32 = 320.0;
const RELEASE_ON_CUT: f32 = 0.01; // seconds, used when a patch is released

/// One sounding (or scheduled) note of a synth patch.
#[derive(Clone, Debug)]
pub struct Voice {
    pub patch: Patch,
    pub alive: bool,
    sample_rate: f32,
    freq: f32,
    velocity: f32,
    delay: u32,       // frames left before the note starts
    age: u32,         // frames since the note started
    gate: u32,        // frames the note is held before release
    release_len: f32, // seconds
    release_from: f32,
    phase: f32,
    mod_phase: f32,
    filter: f32,
    last_noise: f32,
    noise: fastrand::Rng,
}

impl Voice {
    pub fn silent(sample_rate: f32) -> Self {
        Self {
            patch: Patch::Piano,
            alive: false,
            sample_rate,
            freq: 0.0,
            velocity: 0.0,
            delay: 0,
            age: 0,
            gate: 0,
            release_len: 0.0,
            release_from: 0.0,
            phase: 0.0,
            mod_phase: 0.0,
            filter: 0.0,
            last_noise: 0.0,
            noise: fastrand::Rng::with_seed(0x5eed),
        }
    }

    pub fn start(&mut self, patch: Patch, freq: f32, velocity: f32, duration: f32, delay: f32) {
        let sr = self.sample_rate;
        self.patch = patch;
        self.alive = true;
        self.freq = freq;
        self.velocity = velocity;
        self.delay = (delay.max(0.0) * sr).round() as u32;
        self.age = 0;
        self.gate = (duration.max(0.0) * sr).round() as u32;
        self.release_len = patch_spec(patch).env.release;
        self.release_from = 0.0;
        self.phase = 0.0;
        self.mod_phase = 0.0;
        self.filter = 0.0;
        self.last_noise = 0.0;
    }

    pub fn is_pending(&self) -> bool {
        self.alive && self.delay > 0
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    /// Closes the gate now with a short fade.
    pub fn cut(&mut self) {
        if !self.alive {
            return;
        }
        if self.delay > 0 {
            self.alive = false;
            return;
        }
        if self.age < self.gate {
            self.gate = self.age;
        }
        self.release_len = self.release_len.min(RELEASE_ON_CUT);
    }

    fn level(&mut self) -> f32 {
        let sr = self.sample_rate;
        let env = patch_spec(self.patch).env;
        let t = self.age as f32 / sr;
        if self.age < self.gate {
            let level = env.held(t);
            self.release_from = level;
            return level;
        }
        let since = (self.age - self.gate) as f32 / sr;
        if since >= self.release_len || self.release_from <= 0.0 {
            self.alive = false;
            return 0.0;
        }
        // percussive envelopes keep decaying through the release
        let base = if env.sustain == 0.0 { env.held(t) } else { self.release_from };
        base * (1.0 - since / self.release_len)
    }

    fn oscillator(&mut self) -> f32 {
        let sr = self.sample_rate;
        let tau = std::f32::consts::TAU;
        let t = self.age as f32 / sr;
        let out = match self.patch {
            Patch::Guitar => {
                let m = self.mod_phase.sin() * GUITAR_MOD_INDEX;
                self.mod_phase = (self.mod_phase + tau * self.freq * GUITAR_HARMONICITY / sr) % tau;
                (self.phase + m).sin()
            }
            Patch::Piano => (2.0 / std::f32::consts::PI) * self.phase.sin().asin(),
            Patch::Bass => {
                let saw = self.phase / std::f32::consts::PI - 1.0;
                let a = (tau * BASS_CUTOFF_HZ / sr).min(1.0);
                self.filter += a * (saw - self.filter);
                self.filter
            }
            Patch::Kick => {
                let sweep = (1.0 - t / KICK_PITCH_DECAY).max(0.0) * KICK_OCTAVES;
                let f = self.freq * 2.0_f32.powf(sweep);
                self.phase = (self.phase + tau * f / sr) % tau;
                return self.phase.sin();
            }
            Patch::Snare => self.noise.f32() * 2.0 - 1.0,
            Patch::HiHat => {
                let n = self.noise.f32() * 2.0 - 1.0;
                let hp = n - self.last_noise;
                self.last_noise = n;
                hp * 0.5
            }
        };
        self.phase = (self.phase + tau * self.freq / sr) % tau;
        out
    }

    pub fn next_sample(&mut self) -> f32 {
        if !self.alive {
            return 0.0;
        }
        if self.delay > 0 {
            self.delay -= 1;
            return 0.0;
        }
        let level = self.level();
        if !self.alive {
            return 0.0;
        }
        let s = self.oscillator() * level * self.velocity * patch_spec(self.patch).gain;
        self.age = self.age.saturating_add(1);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delayed_voice_is_silent_until_due() {
        let mut v = Voice::silent(1000.0);
        v.start(Patch::Piano, 220.0, 1.0, 0.1, 0.005); // 5 frames late
        for _ in 0..5 {
            assert!(v.is_pending());
            assert_eq!(v.next_sample(), 0.0);
        }
        assert!(!v.is_pending());
        v.next_sample();
        assert_eq!(v.age(), 1);
    }

    #[test]
    fn voice_dies_after_release() {
        let mut v = Voice::silent(1000.0);
        v.start(Patch::HiHat, 0.0, 0.5, 0.01, 0.0);
        for _ in 0..200 {
            v.next_sample();
        }
        assert!(!v.alive);
    }

    #[test]
    fn cut_kills_pending_and_fades_sounding() {
        let mut pending = Voice::silent(1000.0);
        pending.start(Patch::Bass, 55.0, 0.7, 0.5, 0.05);
        pending.cut();
        assert!(!pending.alive);

        let mut ringing = Voice::silent(1000.0);
        ringing.start(Patch::Guitar, 196.0, 0.6, 2.0, 0.0);
        for _ in 0..50 {
            ringing.next_sample();
        }
        ringing.cut();
        for _ in 0..20 {
            ringing.next_sample();
        }
        assert!(!ringing.alive);
    }

    #[test]
    fn output_is_bounded() {
        for patch in [Patch::Guitar, Patch::Bass, Patch::Piano, Patch::Kick, Patch::Snare, Patch::HiHat] {
            let mut v = Voice::silent(44100.0);
            v.start(patch, 110.0, 1.0, 0.2, 0.0);
            for _ in 0..4410 {
                assert!(v.next_sample().abs() <= 1.0);
            }
        }
    }
}
