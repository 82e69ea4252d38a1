//! Fireworks - a pooled particle fireworks show
//!
//! Core modules:
//! - `sim`: Particle pools, simulation context and the per-frame step
//! - `shells`: Shell recipes and the launch/burst controller
//! - `sequencer`: Compound launch patterns and scheduled launches
//! - `drones`: Drone formation show
//! - `renderer`: Draw commands for the trails/main layers and sky lighting
//! - `show`: Frame driver that ties everything together

pub mod audio;
pub mod color;
pub mod drones;
pub mod renderer;
pub mod sequencer;
pub mod settings;
pub mod shapes;
pub mod shells;
pub mod show;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod platform;

pub use color::Color;
pub use settings::{Quality, Settings, SettingsError, SkyLighting};
pub use shells::{ShellChoice, ShellKind, ShellSpec};
pub use show::Show;

use glam::Vec2;
use rand::Rng;

/// Simulation constants
pub mod consts {
    /// Downward acceleration applied per second of simulated time
    pub const GRAVITY: f32 = 0.9;
    /// Nominal frame duration (60 Hz); `lag` is measured in these
    pub const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Longest frame the driver will integrate in one step
    pub const MAX_FRAME_MS: f32 = 68.0;

    /// Largest stage the show lays itself out for
    pub const MAX_WIDTH: f32 = 7680.0;
    pub const MAX_HEIGHT: f32 = 4320.0;

    /// Per-frame velocity retention for stars, comets and sparks
    pub const STAR_AIR_DRAG: f32 = 0.98;
    pub const STAR_AIR_DRAG_HEAVY: f32 = 0.992;
    pub const SPARK_AIR_DRAG: f32 = 0.9;

    /// Line widths on the trails layer
    pub const STAR_DRAW_WIDTH: f32 = 3.0;
    pub const SPARK_DRAW_WIDTH: f32 = 1.0;
    pub const SPARK_DRAW_WIDTH_HIGH: f32 = 0.75;

    /// Stages wider than this get the long pyramid/barrage variants
    pub const WIDE_STAGE_WIDTH: f32 = 800.0;
}

/// Velocity for a heading angle. Angle 0 points down the screen, PI points up.
#[inline]
pub fn heading(angle: f32, speed: f32) -> Vec2 {
    Vec2::new(angle.sin(), angle.cos()) * speed
}

/// Uniform float in `[min, max)`
#[inline]
pub fn random_between<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    min + rng.random::<f32>() * (max - min)
}

/// Uniformly pick one element of a non-empty slice
#[inline]
pub fn random_choice<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.random_range(0..items.len()))
}

/// Cubic smoothstep; exactly 0 at `t = 0` and 1 at `t = 1`
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}
