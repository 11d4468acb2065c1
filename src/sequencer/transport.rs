//! Musical transport driven by elapsed wall time.
//!
//! The host loop calls [`Transport::advance`] with the time since its last
//! call. The transport keeps its own position in seconds and hands back
//! every 16th-note step whose start falls within `position + lookahead`,
//! together with how far in the future that step should sound. Audible
//! timing is therefore carried by those offsets and not by how regularly
//! the host loop runs.

use std::f64::consts::PI;
use std::time::Duration;

/// A 16th-note step that is due to be played.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DueStep {
    /// Steps since the transport was started.
    pub index: u64,
    /// Seconds from now until the step sounds (never negative).
    pub offset: f64,
}

#[derive(Debug)]
pub struct Transport {
    bpm: f64,
    swing: f64,
    running: bool,
    position: f64, // seconds since start
    next_step: u64,
}

impl Transport {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: bpm.max(1.0),
            swing: 0.0,
            running: false,
            position: 0.0,
            next_step: 0,
        }
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        if !self.running {
            self.bpm = bpm.max(1.0);
            return;
        }
        // Re-anchor so steps already played keep their times and the next
        // step lands on the new grid.
        let from = self.step_time(self.next_step);
        self.bpm = bpm.max(1.0);
        let to = self.step_time(self.next_step);
        self.position += to - from;
    }

    pub fn tempo(&self) -> f64 {
        self.bpm
    }

    pub fn set_swing(&mut self, swing: f64) {
        self.swing = swing.clamp(0.0, 1.0);
    }

    pub fn swing(&self) -> f64 {
        self.swing
    }

    /// Starts from step zero. Has no effect while already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.position = 0.0;
        self.next_step = 0;
    }

    /// Returns whether the transport was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        self.position = 0.0;
        self.next_step = 0;
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Length of one 16th note in seconds.
    pub fn step_duration(&self) -> f64 {
        60.0 / self.bpm / 4.0
    }

    /// Start time of step `index`.
    ///
    /// Swing works on 8th-note pairs: inside each beat the 16ths are pushed
    /// late along a half sine of their position, so the off-beat 8th moves
    /// furthest (a third of a beat at full swing) and the downbeat stays put.
    pub fn step_time(&self, index: u64) -> f64 {
        let d = self.step_duration();
        let straight = index as f64 * d;
        let within_beat = (index % 4) as f64 / 4.0;
        let beat = d * 4.0;
        straight + (within_beat * PI).sin() * self.swing * beat / 3.0
    }

    pub fn advance(&mut self, elapsed: Duration, lookahead: Duration) -> Vec<DueStep> {
        let mut due = Vec::new();
        if !self.running {
            return due;
        }
        self.position += elapsed.as_secs_f64();
        let horizon = self.position + lookahead.as_secs_f64();
        while self.step_time(self.next_step) <= horizon {
            let offset = (self.step_time(self.next_step) - self.position).max(0.0);
            due.push(DueStep { index: self.next_step, offset });
            self.next_step += 1;
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_LOOKAHEAD: Duration = Duration::ZERO;

    #[test]
    fn stopped_transport_yields_nothing() {
        let mut t = Transport::new(120.0);
        assert!(t.advance(Duration::from_secs(1), NO_LOOKAHEAD).is_empty());
    }

    #[test]
    fn first_step_is_due_immediately() {
        let mut t = Transport::new(120.0);
        t.start();
        let due = t.advance(Duration::ZERO, NO_LOOKAHEAD);
        assert_eq!(due, vec![DueStep { index: 0, offset: 0.0 }]);
    }

    #[test]
    fn straight_sixteenths_at_120() {
        let mut t = Transport::new(120.0);
        assert!((t.step_duration() - 0.125).abs() < 1e-12);
        t.start();
        // one beat = 4 steps plus step 4 on the boundary
        let due = t.advance(Duration::from_millis(500), NO_LOOKAHEAD);
        let idx: Vec<u64> = due.iter().map(|d| d.index).collect();
        assert_eq!(idx, vec![0, 1, 2, 3, 4]);
        assert!(due.iter().all(|d| d.offset == 0.0));
    }

    #[test]
    fn lookahead_reports_future_offsets() {
        let mut t = Transport::new(120.0);
        t.start();
        let due = t.advance(Duration::ZERO, Duration::from_millis(300));
        let offsets: Vec<f64> = due.iter().map(|d| d.offset).collect();
        assert_eq!(offsets, vec![0.0, 0.125, 0.25]);
        // already-scheduled steps are not handed out twice
        let again = t.advance(Duration::from_millis(10), Duration::from_millis(300));
        assert!(again.is_empty());
    }

    #[test]
    fn swing_follows_position_in_beat() {
        let mut t = Transport::new(110.0);
        t.set_swing(0.6);
        let d = t.step_duration();
        let push = |i: u64| t.step_time(i) - i as f64 * d;
        let third_of_beat = 60.0 / 110.0 / 3.0;

        assert_eq!(push(0), 0.0);
        assert!((push(1) - 0.6 * third_of_beat * (PI / 4.0).sin()).abs() < 1e-12);
        assert!((push(2) - 0.6 * third_of_beat).abs() < 1e-12);
        assert!((push(3) - push(1)).abs() < 1e-12);
        assert_eq!(push(4), 0.0);

        // 0 / 77.1 / 109.1 / 77.1 ms
        let ms: Vec<i64> = (0..4).map(|i| (push(i) * 10_000.0).round() as i64).collect();
        assert_eq!(ms, vec![0, 771, 1091, 771]);
    }

    #[test]
    fn full_swing_keeps_steps_in_order() {
        let mut t = Transport::new(120.0);
        t.set_swing(1.0);
        let times: Vec<f64> = (0..17).map(|i| t.step_time(i)).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        // a third of a beat on the off-beat 8th
        assert!((t.step_time(2) - (0.25 + 0.5 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut t = Transport::new(90.0);
        t.start();
        assert!(t.stop());
        assert!(!t.stop());
        assert!(!t.is_running());
    }

    #[test]
    fn tempo_change_keeps_next_step_on_new_grid() {
        let mut t = Transport::new(120.0);
        t.start();
        t.advance(Duration::from_millis(260), NO_LOOKAHEAD); // steps 0..=2
        t.set_tempo(60.0);
        let due = t.advance(Duration::from_millis(240), NO_LOOKAHEAD);
        assert_eq!(due.first().map(|d| d.index), Some(3));
    }
}
