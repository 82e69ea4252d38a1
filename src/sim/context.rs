//! Simulation context
//!
//! Everything the step, the shell controller and the sequencer share:
//! settings, clocks, stage size, the seeded RNG and cached shapes.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::color::ColorPicker;
use crate::consts::{FRAME_MS, MAX_FRAME_MS, WIDE_STAGE_WIDTH};
use crate::settings::{Quality, Settings};
use crate::shapes::ShapeLibrary;

/// Timing for one update, derived from the host's frame time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    /// Wall-clock frame time in ms, capped
    pub frame_time: f32,
    /// Frame time in nominal 60 Hz frames
    pub lag: f32,
    /// Simulation speed multiplier (0 freezes)
    pub speed: f32,
}

impl FrameStep {
    pub fn new(frame_ms: f32, speed: f32) -> Self {
        let frame_time = if frame_ms.is_finite() {
            frame_ms.clamp(0.0, MAX_FRAME_MS)
        } else {
            0.0
        };
        Self {
            frame_time,
            lag: frame_time / FRAME_MS,
            speed: speed.max(0.0),
        }
    }

    /// Simulated ms elapsed this frame
    #[inline]
    pub fn time_step(&self) -> f32 {
        self.frame_time * self.speed
    }

    /// Per-frame effect multiplier (speed scaled by lag)
    #[inline]
    pub fn speed_mult(&self) -> f32 {
        self.speed * self.lag
    }
}

/// Shared simulation state
pub struct SimContext {
    pub settings: Settings,
    /// Incremented once per update; used by the frame-stamp guard
    pub frame: u64,
    pub sim_speed: f32,
    /// Scaled simulation clock (ms); drives scheduled launches
    pub sim_time: f64,
    /// Unscaled running time (ms); drives sound throttling
    pub wall_time: f64,
    /// Logical stage size (physical size divided by the scale factor)
    pub stage: Vec2,
    pub rng: Pcg32,
    pub colors: ColorPicker,
    pub shapes: ShapeLibrary,
    next_shell_id: u32,
}

impl SimContext {
    pub fn new(settings: Settings, stage: Vec2, seed: u64) -> Self {
        Self {
            settings,
            frame: 0,
            sim_speed: 1.0,
            sim_time: 0.0,
            wall_time: 0.0,
            stage,
            rng: Pcg32::seed_from_u64(seed),
            colors: ColorPicker::new(),
            shapes: ShapeLibrary::default(),
            next_shell_id: 0,
        }
    }

    #[inline]
    pub fn quality(&self) -> Quality {
        self.settings.quality
    }

    /// Stages wide enough for the long pyramid and barrage variants
    #[inline]
    pub fn is_wide_stage(&self) -> bool {
        self.stage.x > WIDE_STAGE_WIDTH
    }

    /// Uniform float in `[0, 1)`
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    /// Id used to play once-per-shell sounds
    pub fn next_shell_id(&mut self) -> u32 {
        self.next_shell_id = self.next_shell_id.wrapping_add(1);
        self.next_shell_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_step_caps_frame_time() {
        let step = FrameStep::new(500.0, 1.0);
        assert_eq!(step.frame_time, MAX_FRAME_MS);
        assert!((step.lag - MAX_FRAME_MS / FRAME_MS).abs() < 1e-6);

        let nan = FrameStep::new(f32::NAN, 1.0);
        assert_eq!(nan.time_step(), 0.0);
    }

    #[test]
    fn test_frame_step_speed() {
        let step = FrameStep::new(FRAME_MS, 0.5);
        assert!((step.lag - 1.0).abs() < 1e-6);
        assert!((step.time_step() - FRAME_MS * 0.5).abs() < 1e-4);
        assert!((step.speed_mult() - 0.5).abs() < 1e-6);
        assert_eq!(FrameStep::new(FRAME_MS, -1.0).speed, 0.0);
    }

    #[test]
    fn test_shell_ids_are_distinct() {
        let mut ctx = SimContext::new(Settings::default(), Vec2::new(1280.0, 720.0), 1);
        let a = ctx.next_shell_id();
        let b = ctx.next_shell_id();
        assert_ne!(a, b);
        assert!(ctx.is_wide_stage());
    }
}
