//! Launch and burst controller
//!
//! A shell goes `Launching -> Rising -> Bursting`. [`launch`] spawns the
//! rising comet carrying its [`ShellSpec`]; when the comet burns out its death
//! effect calls [`burst`], which seeds the star set and any inner shells.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;

use super::{Glitter, ShellColor, ShellKind, ShellSpec, SparkParams};
use crate::audio::SoundEffect;
use crate::color::Color;
use crate::random_between;
use crate::settings::Quality;
use crate::sim::{DeathEffect, SimContext, Simulation, Star, create_burst, create_particle_arc};

/// Side padding kept free of launches
const LAUNCH_PAD_X: f32 = 60.0;
/// Highest burst point, measured from the top
const BURST_PAD_TOP: f32 = 50.0;
/// Lowest burst point as a fraction of stage height from the bottom
const MIN_BURST_HEIGHT: f32 = 0.45;

/// Launch geometry for a shell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchPlan {
    pub launch: Vec2,
    pub burst_y: f32,
    /// Initial comet speed (before the horsetail boost)
    pub velocity: f32,
}

impl LaunchPlan {
    /// `position` is the horizontal fraction, `height` the burst height
    /// fraction (0 = lowest, 1 = highest)
    pub fn new(stage: Vec2, position: f32, height: f32) -> Self {
        let position = position.clamp(0.0, 1.0);
        let height = height.clamp(0.0, 1.0);
        let width = stage.x;
        let stage_height = stage.y;

        let min_height = stage_height - stage_height * MIN_BURST_HEIGHT;
        let launch_x = position * (width - LAUNCH_PAD_X * 2.0) + LAUNCH_PAD_X;
        let launch_y = stage_height;
        let burst_y = min_height - height * (min_height - BURST_PAD_TOP);
        let distance = (launch_y - burst_y).max(0.0);

        Self {
            launch: Vec2::new(launch_x, launch_y),
            burst_y,
            velocity: (distance * 0.04).powf(0.64),
        }
    }
}

/// Fire a comet carrying `spec` from the bottom of the stage
pub fn launch(sim: &mut Simulation, spec: ShellSpec, position: f32, height: f32) {
    let plan = LaunchPlan::new(sim.ctx.stage, position, height);
    let quality = sim.ctx.quality();
    let color = spec.comet_color();

    let (speed, life) = if spec.horsetail {
        (plan.velocity * 1.2, plan.velocity * 100.0)
    } else {
        (plan.velocity, plan.velocity * 400.0)
    };

    let ctx = &mut sim.ctx;
    let mut comet = Star::new(&mut ctx.rng, plan.launch, color, PI, speed, life);
    comet.heavy = true;
    comet.spin_radius = random_between(&mut ctx.rng, 0.32, 0.85);
    comet.spark_freq = match quality {
        Quality::High => 8.0,
        _ => 32.0 / quality.factor(),
    };
    comet.spark_life = 320.0;
    comet.spark_life_variation = 3.0;
    if spec.glitter == Some(Glitter::Willow) || spec.falling_leaves {
        comet.spark_freq = 20.0 / quality.factor();
        comet.spark_speed = 0.5;
        comet.spark_life = 500.0;
    }
    if color == Color::Invisible {
        comet.spark_color = Color::Gold;
    }
    // Most comets burn out before reaching the burst point
    if ctx.random() > 0.4 && !spec.horsetail {
        comet.second_color = Some(Color::Invisible);
        comet.transition_time = ctx.random().powf(1.5) * 700.0 + 500.0;
    }

    log::debug!(
        "Launching {} (size {:.1}) at x {:.0}, bursting near y {:.0}",
        spec.kind,
        spec.size,
        plan.launch.x,
        plan.burst_y
    );
    sim.particles
        .stars
        .add(comet.with_death(DeathEffect::Detonate(Box::new(spec))));
    sim.play(SoundEffect::Lift, 1.0);
}

/// Per-star settings shared by every star of one burst
struct StarStyle {
    star_life: f32,
    star_life_variation: f32,
    initial_offset: Vec2,
    second_color: Option<Color>,
    strobe: bool,
    strobe_color: Option<Color>,
    on_death: Option<DeathEffect>,
    sparks: Option<(SparkParams, Color)>,
}

impl StarStyle {
    fn new(ctx: &mut SimContext, spec: &ShellSpec, comet_vel: Option<Vec2>) -> Self {
        let initial_offset = match comet_vel {
            Some(vel) if spec.horsetail => vel,
            _ if spec.horsetail => Vec2::ZERO,
            _ => Vec2::new(0.0, -spec.spread / 1800.0),
        };

        // Later effects take precedence
        let mut on_death = None;
        if spec.crossette {
            on_death = Some(DeathEffect::Crossette {
                shell_id: ctx.next_shell_id(),
            });
        }
        if spec.crackle {
            on_death = Some(DeathEffect::Crackle {
                shell_id: ctx.next_shell_id(),
            });
        }
        if spec.floral {
            on_death = Some(DeathEffect::Floral);
        }
        if spec.falling_leaves {
            on_death = Some(DeathEffect::FallingLeaves);
        }

        Self {
            star_life: spec.star_life,
            star_life_variation: spec.star_life_variation,
            initial_offset,
            second_color: spec.second_color,
            strobe: spec.strobe,
            strobe_color: spec.strobe_color,
            on_death,
            sparks: spec
                .glitter
                .map(|glitter| (glitter.params(ctx.quality()), spec.glitter_color)),
        }
    }

    fn life<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        self.star_life + rng.random::<f32>() * self.star_life * self.star_life_variation
    }

    fn apply_glitter<R: Rng + ?Sized>(&self, rng: &mut R, star: &mut Star) {
        if let Some((params, color)) = self.sparks {
            star.spark_freq = params.freq;
            star.spark_speed = params.speed;
            star.spark_life = params.life;
            star.spark_life_variation = params.life_variation;
            star.spark_color = color;
            star.spark_timer = rng.random::<f32>() * params.freq;
        }
    }

    /// Fully styled burst star
    fn star<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pos: Vec2,
        color: Color,
        angle: f32,
        speed: f32,
    ) -> Star {
        let life = self.life(rng);
        let mut star = Star::new(rng, pos, color, angle, speed, life)
            .with_velocity_offset(self.initial_offset);

        if let Some(second) = self.second_color {
            star.transition_time = self.star_life * (rng.random::<f32>() * 0.05 + 0.32);
            star.second_color = Some(second);
        }
        if self.strobe {
            star.transition_time = self.star_life * (rng.random::<f32>() * 0.08 + 0.46);
            star.strobe = true;
            star.strobe_freq = rng.random::<f32>() * 20.0 + 40.0;
            if let Some(strobe_color) = self.strobe_color {
                star.second_color = Some(strobe_color);
            }
        }
        star.on_death = self.on_death.clone();
        self.apply_glitter(rng, &mut star);
        star
    }
}

/// Burst `spec` at `pos`.
///
/// `comet_vel` is the velocity of the comet that carried the shell; inner
/// shells (pistils, streamers) pass `None`. Only launched shells make a
/// sound, and horsetail stars inherit the comet's motion.
pub fn burst(sim: &mut Simulation, spec: &ShellSpec, pos: Vec2, comet_vel: Option<Vec2>) {
    let speed = spec.burst_speed();
    let count = spec.burst_count();
    let style = StarStyle::new(&mut sim.ctx, spec, comet_vel);

    let Simulation { ctx, particles, .. } = &mut *sim;
    let stars = &mut particles.stars;
    let mut spawned = 0;

    match spec.color {
        ShellColor::Single(_) | ShellColor::Random if spec.ring => {
            let color = match spec.color {
                ShellColor::Single(color) => color,
                _ => ctx.colors.any(&mut ctx.rng),
            };
            let ring_start = ctx.random() * PI;
            let squash = ctx.random().powi(2) * 0.85 + 0.15;
            let rotation = Vec2::from_angle(-ring_start);
            create_particle_arc(&mut ctx.rng, 0.0, TAU, count, 0.0, |rng, angle| {
                let squashed = Vec2::new(angle.sin() * speed * squash, angle.cos() * speed);
                let life = style.life(rng);
                let mut star = Star::new(rng, pos, color, 0.0, 0.0, life);
                star.vel = rotation.rotate(squashed);
                style.apply_glitter(rng, &mut star);
                stars.add(star);
                spawned += 1;
            });
        }
        ShellColor::Single(_) | ShellColor::Random if spec.shape.is_some() => {
            let fixed = spec.color.single();
            if let Some(shape) = &spec.shape {
                let points = if shape.points.is_empty() {
                    ctx.shapes.star.clone()
                } else {
                    shape.points.clone()
                };
                let rotation = Vec2::from_angle(shape.rotation);
                let n = shape.count.max(1);
                for i in 0..n {
                    let point = points[i * points.len() / n];
                    let color = match fixed {
                        Some(color) => color,
                        None => ctx.colors.any(&mut ctx.rng),
                    };
                    let mut star = style.star(&mut ctx.rng, pos, color, 0.0, 0.0);
                    star.vel = rotation.rotate(point) * speed + style.initial_offset;
                    stars.add(star);
                    spawned += 1;
                }
            }
        }
        ShellColor::Single(color) => {
            spawned += create_burst(&mut ctx.rng, count, 0.0, TAU, |rng, angle, mult| {
                stars.add(style.star(rng, pos, color, angle, mult * speed));
            });
        }
        ShellColor::Random => {
            let colors = &mut ctx.colors;
            spawned += create_burst(&mut ctx.rng, count, 0.0, TAU, |rng, angle, mult| {
                let color = colors.any(rng);
                stars.add(style.star(rng, pos, color, angle, mult * speed));
            });
        }
        ShellColor::Pair(first, second) => {
            if ctx.random() < 0.5 {
                // Two half-sphere arcs
                let start = ctx.random() * PI;
                for (color, arc_start) in [(first, start), (second, start + PI)] {
                    spawned += create_burst(&mut ctx.rng, count, arc_start, PI, |rng, angle, mult| {
                        stars.add(style.star(rng, pos, color, angle, mult * speed));
                    });
                }
            } else {
                for color in [first, second] {
                    spawned += create_burst(&mut ctx.rng, count / 2.0, 0.0, TAU, |rng, angle, mult| {
                        stars.add(style.star(rng, pos, color, angle, mult * speed));
                    });
                }
            }
        }
    }

    if spawned == 0 {
        let color = match spec.color {
            ShellColor::Single(color) | ShellColor::Pair(color, _) => color,
            ShellColor::Random => ctx.colors.any(&mut ctx.rng),
        };
        let angle = ctx.random() * TAU;
        stars.add(style.star(&mut ctx.rng, pos, color, angle, speed));
    }

    if let Some(pistil_color) = spec.pistil {
        let mut inner = ShellSpec::new(
            ShellKind::Crysanthemum,
            spec.size,
            spec.spread * 0.5,
            spec.star_life * 0.6,
            ShellColor::Single(pistil_color),
        );
        inner.star_life_variation = spec.star_life_variation;
        inner.star_density = 1.4;
        inner.glitter = Some(Glitter::Light);
        inner.glitter_color = if pistil_color == Color::Gold {
            Color::Gold
        } else {
            Color::White
        };
        burst(sim, &inner, pos, None);
    }

    if spec.streamers {
        let mut inner = ShellSpec::new(
            ShellKind::Crysanthemum,
            spec.size,
            spec.spread * 0.9,
            spec.star_life * 0.8,
            ShellColor::Single(Color::White),
        );
        inner.star_life_variation = spec.star_life_variation;
        inner.star_count = Some((spec.spread / 45.0).max(6.0).floor());
        inner.glitter = Some(Glitter::Streamer);
        burst(sim, &inner, pos, None);
    }

    sim.particles.flashes.add(pos, spec.spread / 4.0);

    if comet_vel.is_some() {
        let max_diff = 2.0;
        let below_configured = (sim.ctx.settings.shell_size() - spec.size).min(max_diff);
        let scale = (1.0 - below_configured / max_diff) * 0.3 + 0.7;
        sim.play(SoundEffect::Burst, scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::shells::build_shell;

    fn sim(seed: u64) -> Simulation {
        Simulation::new(Settings::default(), Vec2::new(1200.0, 800.0), seed)
    }

    fn total_stars(sim: &Simulation) -> usize {
        sim.particles.stars.len()
    }

    #[test]
    fn test_launch_plan_bounds() {
        let stage = Vec2::new(1000.0, 800.0);
        let low = LaunchPlan::new(stage, 0.0, 0.0);
        assert_eq!(low.launch, Vec2::new(60.0, 800.0));
        assert!((low.burst_y - 440.0).abs() < 1e-3);
        let high = LaunchPlan::new(stage, 1.0, 1.0);
        assert_eq!(high.launch.x, 940.0);
        assert!((high.burst_y - 50.0).abs() < 1e-3);
        assert!((high.velocity - (750.0_f32 * 0.04).powf(0.64)).abs() < 1e-4);
        // Out of range fractions are clamped
        assert_eq!(LaunchPlan::new(stage, 3.0, -1.0), LaunchPlan::new(stage, 1.0, 0.0));
    }

    #[test]
    fn test_launch_spawns_heavy_comet() {
        let mut sim = sim(1);
        let spec = build_shell(&mut sim.ctx, ShellKind::Palm, 2.0);
        let comet_color = spec.comet_color();
        launch(&mut sim, spec, 0.5, 0.5);

        assert_eq!(total_stars(&sim), 1);
        let comet = sim.particles.stars.iter_color(comet_color).next().unwrap();
        assert!(comet.heavy);
        assert!(comet.vel.y < 0.0);
        assert!((0.32..0.85).contains(&comet.spin_radius));
        assert!(matches!(comet.on_death, Some(DeathEffect::Detonate(_))));
    }

    #[test]
    fn test_horsetail_comet_never_burns_out() {
        let mut sim = sim(2);
        for _ in 0..50 {
            let spec = build_shell(&mut sim.ctx, ShellKind::HorseTail, 1.0);
            launch(&mut sim, spec, 0.5, 1.0);
        }
        for color in Color::ALL {
            for comet in sim.particles.stars.iter_color(color) {
                assert!(comet.second_color.is_none());
            }
        }
    }

    #[test]
    fn test_invisible_comet_sparks_gold() {
        let mut sim = sim(3);
        let spec = build_shell(&mut sim.ctx, ShellKind::Willow, 1.0);
        launch(&mut sim, spec, 0.5, 0.5);
        let comet = sim.particles.stars.iter_color(Color::Invisible).next().unwrap();
        assert_eq!(comet.spark_color, Color::Gold);
        assert_eq!(comet.spark_speed, 0.5);
        assert_eq!(comet.spark_life, 500.0);
    }

    #[test]
    fn test_burst_star_speeds_within_spread() {
        let mut sim = sim(4);
        let mut spec = build_shell(&mut sim.ctx, ShellKind::Crysanthemum, 1.0);
        spec.pistil = None;
        spec.streamers = false;
        spec.color = ShellColor::Single(Color::Green);
        burst(&mut sim, &spec, Vec2::new(600.0, 300.0), None);

        let offset = Vec2::new(0.0, -spec.spread / 1800.0);
        let max_speed = spec.burst_speed();
        let mut n = 0;
        for star in sim.particles.stars.iter_color(Color::Green) {
            let own = (star.vel - offset).length();
            assert!(own <= max_speed + 1e-3);
            let life = star.life;
            assert!(life >= spec.star_life && life <= spec.star_life * (1.0 + spec.star_life_variation));
            n += 1;
        }
        assert!(n as f32 >= spec.burst_count() * 0.5);
        assert_eq!(sim.particles.flashes.len(), 1);
        assert_eq!(sim.particles.flashes.iter().next().unwrap().radius, spec.spread / 4.0);
    }

    #[test]
    fn test_ghost_stars_start_invisible() {
        let mut sim = sim(5);
        let mut spec = build_shell(&mut sim.ctx, ShellKind::Ghost, 2.0);
        spec.pistil = None;
        spec.streamers = false;
        burst(&mut sim, &spec, Vec2::new(600.0, 300.0), None);

        let second = spec.second_color.unwrap();
        assert!(sim.particles.stars.count(Color::Invisible) > 0);
        for star in sim.particles.stars.iter_color(Color::Invisible) {
            assert_eq!(star.second_color, Some(second));
            let fraction = star.transition_time / spec.star_life;
            assert!((0.32..0.37).contains(&fraction));
        }
    }

    #[test]
    fn test_strobe_stars() {
        let mut sim = sim(6);
        let mut spec = build_shell(&mut sim.ctx, ShellKind::Strobe, 1.0);
        spec.pistil = None;
        burst(&mut sim, &spec, Vec2::new(600.0, 300.0), None);
        let color = spec.color.single().unwrap();
        for star in sim.particles.stars.iter_color(color) {
            assert!(star.strobe);
            assert!((40.0..60.0).contains(&star.strobe_freq));
            let fraction = star.transition_time / spec.star_life;
            assert!((0.46..0.54).contains(&fraction));
            assert_eq!(star.spark_color, Color::White);
        }
    }

    #[test]
    fn test_ring_burst() {
        let mut sim = sim(7);
        let mut spec = build_shell(&mut sim.ctx, ShellKind::Ring, 1.0);
        spec.pistil = None;
        spec.streamers = false;
        burst(&mut sim, &spec, Vec2::new(600.0, 300.0), None);
        let color = spec.color.single().unwrap();
        let expected = (spec.burst_count() - 0.5).ceil() as usize;
        assert_eq!(sim.particles.stars.count(color), expected);
        for star in sim.particles.stars.iter_color(color) {
            assert!(star.vel.length() <= spec.burst_speed() + 1e-3);
        }
    }

    #[test]
    fn test_shape_burst_uses_shape_count() {
        let mut sim = sim(8);
        let spec = build_shell(&mut sim.ctx, ShellKind::Heart, 1.0);
        burst(&mut sim, &spec, Vec2::new(600.0, 300.0), None);
        assert_eq!(sim.particles.stars.count(Color::Red), 400);
    }

    #[test]
    fn test_pistil_and_streamers_add_inner_shells() {
        let mut sim = sim(9);
        let mut spec = build_shell(&mut sim.ctx, ShellKind::Crossette, 1.0);
        spec.color = ShellColor::Single(Color::Red);
        spec.pistil = Some(Color::Gold);
        spec.streamers = true;
        burst(&mut sim, &spec, Vec2::new(600.0, 300.0), None);
        assert!(sim.particles.stars.count(Color::Gold) > 0);
        assert!(sim.particles.stars.count(Color::White) >= 6);
        assert_eq!(sim.particles.flashes.len(), 3);
        // Crossette effect only on the outer stars
        for star in sim.particles.stars.iter_color(Color::Red) {
            assert!(matches!(star.on_death, Some(DeathEffect::Crossette { .. })));
        }
        for star in sim.particles.stars.iter_color(Color::Gold) {
            assert!(star.on_death.is_none());
        }
    }

    #[test]
    fn test_zero_spread_still_bursts() {
        let mut sim = sim(10);
        let mut spec = ShellSpec::new(
            ShellKind::Crysanthemum,
            0.0,
            0.0,
            100.0,
            ShellColor::Single(Color::Blue),
        );
        spec.star_count = Some(0.0);
        burst(&mut sim, &spec, Vec2::new(10.0, 10.0), None);
        assert!(sim.particles.stars.count(Color::Blue) >= 1);
    }

    #[test]
    fn test_horsetail_stars_inherit_comet_velocity() {
        let mut sim = sim(11);
        let mut spec = build_shell(&mut sim.ctx, ShellKind::HorseTail, 1.0);
        spec.color = ShellColor::Single(Color::Purple);
        spec.strobe = false;
        spec.pistil = None;
        spec.streamers = false;
        let comet_vel = Vec2::new(3.0, -5.0);
        burst(&mut sim, &spec, Vec2::new(600.0, 300.0), Some(comet_vel));
        let mean = sim
            .particles
            .stars
            .iter_color(Color::Purple)
            .map(|s| s.vel)
            .fold(Vec2::ZERO, |a, v| a + v)
            / sim.particles.stars.count(Color::Purple) as f32;
        assert!((mean - comet_vel).length() < spec.burst_speed() * 0.5);
    }
}
