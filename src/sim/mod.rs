//! Particle simulation
//!
//! Owns the particle pools and the shared context. Everything here is
//! deterministic for a given seed and sequence of frame times:
//! - Seeded RNG only
//! - Buckets iterated in a fixed colour order
//! - No rendering or platform dependencies

pub mod context;
pub mod effects;
pub mod particles;
pub mod pool;
pub mod step;

pub use context::{FrameStep, SimContext};
pub use effects::{Death, create_burst, create_particle_arc};
pub use particles::{BucketedPool, BurstFlash, DeathEffect, FlashQueue, Particles, Spark, Star};
pub use pool::{Pool, PoolHandle};

use glam::Vec2;

use crate::audio::{SoundBoard, SoundEffect};
use crate::settings::Settings;

/// Particle state plus everything needed to spawn more of it
pub struct Simulation {
    pub ctx: SimContext,
    pub particles: Particles,
    pub sound: SoundBoard,
    /// Reused between frames so retirements don't allocate
    deaths: Vec<Death>,
}

impl Simulation {
    pub fn new(settings: Settings, stage: Vec2, seed: u64) -> Self {
        let particles = Particles::new(settings.quality);
        Self {
            ctx: SimContext::new(settings, stage, seed),
            particles,
            sound: SoundBoard::default(),
            deaths: Vec::new(),
        }
    }

    /// Advance clocks and particles by one frame
    pub fn update(&mut self, step: FrameStep) {
        self.begin_frame(step);
        self.step_particles(step);
    }

    /// Bump the frame counter and clocks; run before anything spawns
    pub fn begin_frame(&mut self, step: FrameStep) {
        self.ctx.frame += 1;
        self.ctx.sim_time += step.time_step() as f64;
        self.ctx.wall_time += step.frame_time as f64;
    }

    /// Integrate every particle, then run queued death effects
    pub fn step_particles(&mut self, step: FrameStep) {
        step::update_particles(self, step);
    }

    /// Swap in new settings, resizing pool limits if the quality changed
    pub fn apply_settings(&mut self, settings: Settings) {
        if settings.quality != self.ctx.settings.quality {
            self.particles.set_quality(settings.quality);
            log::info!("Quality set to {}", settings.quality.as_str());
        }
        self.ctx.settings = settings;
    }

    pub fn play(&mut self, effect: SoundEffect, intensity: f32) {
        self.sound
            .play(effect, intensity, self.ctx.sim_speed, self.ctx.wall_time);
    }

    pub fn play_once(&mut self, shell_id: u32, effect: SoundEffect) {
        self.sound
            .play_once(shell_id, effect, self.ctx.sim_speed, self.ctx.wall_time);
    }

    /// Retire every particle
    pub fn clear(&mut self) {
        self.particles.clear();
        self.deaths.clear();
    }
}
