//! Show driver
//!
//! Owns the simulation, sequencer, drone show and renderer. The host calls
//! [`Show::tick`] once per animation frame and forwards input through the
//! other methods.

use glam::Vec2;

use crate::audio::AudioSink;
use crate::consts::{MAX_HEIGHT, MAX_WIDTH};
use crate::drones::DroneShow;
use crate::renderer::{FrameView, Layers, Renderer};
use crate::sequencer::Sequencer;
use crate::settings::Settings;
use crate::shapes::TextRasterizer;
use crate::sim::{FrameStep, Simulation};

/// Padding at the stage edges when scrubbing the speed, so 0 and 1 are
/// easy to hit
pub const SCRUB_EDGE_PX: f32 = 16.0;
/// Frames for the speed bar to fade out after the last speed change
const SPEED_BAR_FADE_FRAMES: f32 = 30.0;

pub struct Show {
    sim: Simulation,
    sequencer: Sequencer,
    drones: DroneShow,
    renderer: Renderer,
    /// Host surface size in CSS pixels
    viewport: Vec2,
    pixel_ratio: f32,
    paused: bool,
    menu_open: bool,
    scrubbing: bool,
    speed_bar_opacity: f32,
}

impl Show {
    pub fn new(settings: Settings, viewport: Vec2, seed: u64) -> Self {
        let stage = stage_size(viewport, settings.scale());
        let mut sim = Simulation::new(settings, stage, seed);
        let drones = DroneShow::new(&mut sim.ctx);
        log::info!(
            "Show created: {:.0}x{:.0} stage, quality {}, seed {}",
            stage.x,
            stage.y,
            sim.ctx.quality().as_str(),
            seed
        );
        Self {
            sim,
            sequencer: Sequencer::new(),
            drones,
            renderer: Renderer::new(),
            viewport,
            pixel_ratio: 1.0,
            paused: false,
            menu_open: false,
            scrubbing: false,
            speed_bar_opacity: 0.0,
        }
    }

    /// Advance one frame and draw it. Returns false (drawing nothing) while
    /// paused or while the menu is open.
    pub fn tick(&mut self, frame_ms: f32, layers: &mut Layers<'_>) -> bool {
        if !self.is_running() {
            return false;
        }
        let step = FrameStep::new(frame_ms, self.sim.ctx.sim_speed);
        self.update(step);
        self.render(step, layers);
        true
    }

    /// Advance one frame without drawing
    pub fn update(&mut self, step: FrameStep) {
        if !self.is_running() {
            return;
        }
        self.sim.begin_frame(step);

        if !self.scrubbing {
            self.speed_bar_opacity = (self.speed_bar_opacity - step.lag / SPEED_BAR_FADE_FRAMES).max(0.0);
        }

        self.sequencer.update(&mut self.sim, step);

        if self.sim.ctx.settings.drone_show && self.drones.update(&mut self.sim.ctx, step) {
            self.sequencer.launch_drone_burst(&mut self.sim);
        }

        self.sim.step_particles(step);
    }

    fn render(&mut self, step: FrameStep, layers: &mut Layers<'_>) {
        let settings = &self.sim.ctx.settings;
        let frame = FrameView {
            particles: &self.sim.particles,
            drones: settings.drone_show.then_some(&self.drones),
            settings,
            stage: self.sim.ctx.stage,
            pixel_ratio: self.pixel_ratio,
            sim_speed: self.sim.ctx.sim_speed,
            speed: step.speed_mult(),
            speed_bar_opacity: self.speed_bar_opacity,
        };
        self.renderer.render(&frame, layers);
        self.sim.particles.flashes.drain();
    }

    /// Launch the configured shell at a stage position (fractions, height
    /// measured from the bottom)
    pub fn launch(&mut self, x: f32, height: f32) {
        if !self.is_running() {
            return;
        }
        self.sequencer.launch_from_config(&mut self.sim, x, height);
    }

    /// Launch at a pointer position in CSS pixels
    pub fn launch_at_pointer(&mut self, pointer: Vec2) {
        let stage_px = self.viewport.min(Vec2::new(MAX_WIDTH, MAX_HEIGHT));
        if stage_px.x <= 0.0 || stage_px.y <= 0.0 {
            return;
        }
        self.launch(pointer.x / stage_px.x, 1.0 - pointer.y / stage_px.y);
    }

    pub fn set_sim_speed(&mut self, speed: f32) {
        let speed = if speed.is_finite() {
            speed.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.sim.ctx.sim_speed = speed;
        self.speed_bar_opacity = 1.0;
    }

    /// Set the speed from a horizontal pointer position along the speed bar
    pub fn scrub_speed(&mut self, x_px: f32, width_px: f32) {
        let span = width_px - SCRUB_EDGE_PX * 2.0;
        let speed = if span > 0.0 {
            (x_px - SCRUB_EDGE_PX) / span
        } else {
            1.0
        };
        self.scrubbing = true;
        self.set_sim_speed(speed);
    }

    /// Pointer released; let the speed bar fade
    pub fn end_scrub(&mut self) {
        self.scrubbing = false;
    }

    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.paused);
    }

    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            self.paused = paused;
            log::info!("{}", if paused { "Paused" } else { "Resumed" });
        }
    }

    pub fn toggle_menu(&mut self) {
        self.set_menu_open(!self.menu_open);
    }

    pub fn set_menu_open(&mut self, open: bool) {
        self.menu_open = open;
    }

    pub fn toggle_sound(&mut self) {
        self.set_sound_enabled(!self.sim.sound.is_enabled());
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sim.sound.set_enabled(enabled);
        log::info!("Sound {}", if enabled { "on" } else { "off" });
    }

    pub fn apply_settings(&mut self, settings: Settings) {
        let rescale = settings.scale() != self.sim.ctx.settings.scale();
        self.sim.apply_settings(settings);
        if rescale {
            self.resize(self.viewport);
        }
        log::info!("Settings applied");
    }

    /// Host surface resized (CSS pixels)
    pub fn resize(&mut self, viewport: Vec2) {
        self.viewport = viewport;
        self.sim.ctx.stage = stage_size(viewport, self.sim.ctx.settings.scale());
        log::debug!(
            "Stage resized to {:.0}x{:.0}",
            self.sim.ctx.stage.x,
            self.sim.ctx.stage.y
        );
    }

    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            1.0
        };
    }

    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.sim.sound.set_sink(sink);
    }

    pub fn set_text_rasterizer(&mut self, rasterizer: Box<dyn TextRasterizer>) {
        self.sim.ctx.shapes.set_rasterizer(rasterizer);
    }

    /// Background colour for the host to paint behind the layers
    pub fn sky_color(&self) -> [u8; 3] {
        self.renderer.sky_color()
    }

    pub fn is_running(&self) -> bool {
        !self.paused && !self.menu_open
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn is_sound_enabled(&self) -> bool {
        self.sim.sound.is_enabled()
    }

    pub fn sim_speed(&self) -> f32 {
        self.sim.ctx.sim_speed
    }

    pub fn speed_bar_opacity(&self) -> f32 {
        self.speed_bar_opacity
    }

    pub fn settings(&self) -> &Settings {
        &self.sim.ctx.settings
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn drones(&self) -> &DroneShow {
        &self.drones
    }
}

/// Logical stage for a viewport: capped at the maximum size, then divided
/// by the scale factor
fn stage_size(viewport: Vec2, scale: f32) -> Vec2 {
    viewport.clamp(Vec2::ZERO, Vec2::new(MAX_WIDTH, MAX_HEIGHT)) / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FRAME_MS;
    use crate::renderer::CommandRecorder;

    fn show() -> Show {
        Show::new(Settings::default(), Vec2::new(1200.0, 800.0), 7)
    }

    fn tick(show: &mut Show) -> bool {
        let mut trails = CommandRecorder::new();
        let mut main = CommandRecorder::new();
        show.tick(
            FRAME_MS,
            &mut Layers {
                trails: &mut trails,
                main: &mut main,
            },
        )
    }

    #[test]
    fn test_first_tick_launches_opening_shell() {
        let mut show = show();
        assert!(tick(&mut show));
        assert_eq!(show.simulation().particles.stars.len(), 1);
        assert_eq!(show.simulation().ctx.frame, 1);
    }

    #[test]
    fn test_paused_tick_is_noop() {
        let mut show = show();
        show.toggle_pause();
        assert!(!tick(&mut show));
        assert_eq!(show.simulation().ctx.frame, 0);
        assert!(show.simulation().particles.stars.is_empty());

        show.toggle_pause();
        show.toggle_menu();
        assert!(!tick(&mut show));
        show.toggle_menu();
        assert!(tick(&mut show));
    }

    #[test]
    fn test_launch_ignored_while_paused() {
        let mut show = show();
        show.set_paused(true);
        show.launch(0.5, 0.5);
        assert!(show.simulation().particles.stars.is_empty());
        show.set_paused(false);
        show.launch(0.5, 0.5);
        assert_eq!(show.simulation().particles.stars.len(), 1);
    }

    #[test]
    fn test_scrub_speed_with_edge_padding() {
        let mut show = show();
        show.scrub_speed(16.0, 1032.0);
        assert_eq!(show.sim_speed(), 0.0);
        show.scrub_speed(516.0, 1032.0);
        assert!((show.sim_speed() - 0.5).abs() < 1e-6);
        show.scrub_speed(2000.0, 1032.0);
        assert_eq!(show.sim_speed(), 1.0);
        assert_eq!(show.speed_bar_opacity(), 1.0);
    }

    #[test]
    fn test_speed_bar_fades_after_scrub() {
        let mut show = show();
        show.scrub_speed(516.0, 1032.0);
        tick(&mut show);
        assert_eq!(show.speed_bar_opacity(), 1.0);
        show.end_scrub();
        for _ in 0..15 {
            tick(&mut show);
        }
        assert!((show.speed_bar_opacity() - 0.5).abs() < 1e-3);
        for _ in 0..20 {
            tick(&mut show);
        }
        assert_eq!(show.speed_bar_opacity(), 0.0);
    }

    #[test]
    fn test_flashes_drained_after_render() {
        let mut show = show();
        show.simulation_mut()
            .particles
            .flashes
            .add(Vec2::new(10.0, 10.0), 20.0);
        let mut trails = CommandRecorder::new();
        let mut main = CommandRecorder::new();
        show.tick(
            FRAME_MS,
            &mut Layers {
                trails: &mut trails,
                main: &mut main,
            },
        );
        assert_eq!(trails.gradient_count(), 1);
        assert!(show.simulation().particles.flashes.is_empty());
    }

    #[test]
    fn test_scale_factor_shrinks_stage() {
        let mut show = show();
        let settings = Settings {
            scale_factor: 2.0,
            ..Default::default()
        };
        show.apply_settings(settings);
        assert_eq!(show.simulation().ctx.stage, Vec2::new(600.0, 400.0));
        show.resize(Vec2::new(10_000.0, 100.0));
        assert_eq!(show.simulation().ctx.stage, Vec2::new(MAX_WIDTH / 2.0, 50.0));
    }

    #[test]
    fn test_toggle_sound() {
        let mut show = show();
        assert!(!show.is_sound_enabled());
        show.toggle_sound();
        assert!(show.is_sound_enabled());
        show.toggle_sound();
        assert!(!show.is_sound_enabled());
    }

    #[test]
    fn test_pointer_launch_maps_to_fractions() {
        let mut show = show();
        show.launch_at_pointer(Vec2::new(600.0, 200.0));
        let comet = show
            .simulation()
            .particles
            .stars
            .pool()
            .iter()
            .next()
            .map(|(_, star)| star.pos)
            .unwrap();
        // x fraction 0.5 lands mid-stage
        assert_eq!(comet.x, 600.0);
        assert_eq!(comet.y, 800.0);
    }

    #[test]
    fn test_drone_show_draws_circles() {
        let settings = Settings {
            drone_show: true,
            auto_launch: false,
            ..Default::default()
        };
        let mut show = Show::new(settings, Vec2::new(1200.0, 800.0), 8);
        let mut trails = CommandRecorder::new();
        let mut main = CommandRecorder::new();
        show.tick(
            FRAME_MS,
            &mut Layers {
                trails: &mut trails,
                main: &mut main,
            },
        );
        assert_eq!(main.circle_count(), crate::drones::DRONE_COUNT);
    }
}
