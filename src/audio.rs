//! Sound effect requests
//!
//! The core only decides *when* a sound should play. Playback belongs to an
//! [`AudioSink`] supplied by the host; the browser build synthesizes the
//! effects with Web Audio oscillators.

use std::cell::RefCell;
use std::rc::Rc;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Comet launched
    Lift,
    /// Main shell detonation
    Burst,
    /// Floral / falling-leaves sub-burst
    BurstSmall,
    /// Crackle shell popping
    Crackle,
    /// Crossette shell splitting
    CrackleSmall,
}

impl SoundEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundEffect::Lift => "lift",
            SoundEffect::Burst => "burst",
            SoundEffect::BurstSmall => "burstSmall",
            SoundEffect::Crackle => "crackle",
            SoundEffect::CrackleSmall => "crackleSmall",
        }
    }
}

/// Host audio backend
pub trait AudioSink {
    /// Play `effect` at `intensity` (0.0 - 1.0). Must not panic on failure.
    fn play(&mut self, effect: SoundEffect, intensity: f32);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _effect: SoundEffect, _intensity: f32) {}
}

/// Sink that records requests; clones share the same log
#[derive(Debug, Default, Clone)]
pub struct RecordingAudio {
    played: Rc<RefCell<Vec<(SoundEffect, f32)>>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<(SoundEffect, f32)> {
        self.played.borrow().clone()
    }

    pub fn count(&self, effect: SoundEffect) -> usize {
        self.played.borrow().iter().filter(|(e, _)| *e == effect).count()
    }

    pub fn clear(&self) {
        self.played.borrow_mut().clear();
    }
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, effect: SoundEffect, intensity: f32) {
        self.played.borrow_mut().push((effect, intensity));
    }
}

/// Minimum ms between two `BurstSmall` sounds
const BURST_SMALL_THROTTLE_MS: f64 = 20.0;
/// Sounds are muted while the show runs in slow motion
const MIN_SOUND_SPEED: f32 = 0.95;
/// How many shells remember their once-per-shell sounds
const RECENT_SHELLS: usize = 32;

/// Gates, throttles and forwards sound requests to the sink
pub struct SoundBoard {
    sink: Box<dyn AudioSink>,
    enabled: bool,
    last_burst_small: Option<f64>,
    recent: [(u32, SoundEffect); RECENT_SHELLS],
    recent_len: usize,
    recent_cursor: usize,
}

impl Default for SoundBoard {
    fn default() -> Self {
        Self::new(Box::new(NullAudio))
    }
}

impl SoundBoard {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            // Muted until the user turns sound on
            enabled: false,
            last_burst_small: None,
            recent: [(0, SoundEffect::Lift); RECENT_SHELLS],
            recent_len: 0,
            recent_cursor: 0,
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.sink = sink;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Request a sound. `now_ms` is unscaled running time.
    pub fn play(&mut self, effect: SoundEffect, intensity: f32, sim_speed: f32, now_ms: f64) {
        if !self.enabled || sim_speed < MIN_SOUND_SPEED {
            return;
        }

        if effect == SoundEffect::BurstSmall {
            if let Some(last) = self.last_burst_small
                && now_ms - last < BURST_SMALL_THROTTLE_MS
            {
                return;
            }
            self.last_burst_small = Some(now_ms);
        }

        self.sink.play(effect, intensity.clamp(0.0, 1.0));
    }

    /// Play `effect` for the first star of `shell_id` that asks for it
    pub fn play_once(
        &mut self,
        shell_id: u32,
        effect: SoundEffect,
        sim_speed: f32,
        now_ms: f64,
    ) {
        let key = (shell_id, effect);
        if self.recent[..self.recent_len].contains(&key) {
            return;
        }
        self.recent[self.recent_cursor] = key;
        self.recent_cursor = (self.recent_cursor + 1) % RECENT_SHELLS;
        self.recent_len = (self.recent_len + 1).min(RECENT_SHELLS);

        self.play(effect, 1.0, sim_speed, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> (SoundBoard, RecordingAudio) {
        let audio = RecordingAudio::new();
        let mut sound = SoundBoard::new(Box::new(audio.clone()));
        sound.set_enabled(true);
        (sound, audio)
    }

    #[test]
    fn test_starts_muted() {
        let audio = RecordingAudio::new();
        let mut sound = SoundBoard::new(Box::new(audio.clone()));
        assert!(!sound.is_enabled());
        sound.play(SoundEffect::Burst, 1.0, 1.0, 0.0);
        sound.play_once(1, SoundEffect::Crackle, 1.0, 0.0);
        assert!(audio.played().is_empty());
    }

    #[test]
    fn test_disabled_and_slow_motion_are_silent() {
        let (mut sound, audio) = board();
        sound.play(SoundEffect::Lift, 1.0, 0.5, 0.0);
        sound.set_enabled(false);
        sound.play(SoundEffect::Lift, 1.0, 1.0, 0.0);
        assert!(audio.played().is_empty());

        sound.set_enabled(true);
        sound.play(SoundEffect::Lift, 1.0, 1.0, 0.0);
        assert_eq!(audio.count(SoundEffect::Lift), 1);
    }

    #[test]
    fn test_burst_small_throttled() {
        let (mut sound, audio) = board();
        sound.play(SoundEffect::BurstSmall, 1.0, 1.0, 100.0);
        sound.play(SoundEffect::BurstSmall, 1.0, 1.0, 110.0);
        sound.play(SoundEffect::BurstSmall, 1.0, 1.0, 125.0);
        assert_eq!(audio.count(SoundEffect::BurstSmall), 2);
        // Other effects are not throttled
        sound.play(SoundEffect::Burst, 1.0, 1.0, 125.0);
        sound.play(SoundEffect::Burst, 1.0, 1.0, 125.0);
        assert_eq!(audio.count(SoundEffect::Burst), 2);
    }

    #[test]
    fn test_play_once_per_shell() {
        let (mut sound, audio) = board();
        for _ in 0..5 {
            sound.play_once(7, SoundEffect::Crackle, 1.0, 0.0);
        }
        sound.play_once(8, SoundEffect::Crackle, 1.0, 0.0);
        assert_eq!(audio.count(SoundEffect::Crackle), 2);
    }

    #[test]
    fn test_intensity_clamped() {
        let (mut sound, audio) = board();
        sound.play(SoundEffect::Burst, 3.0, 1.0, 0.0);
        assert_eq!(audio.played(), vec![(SoundEffect::Burst, 1.0)]);
    }
}
