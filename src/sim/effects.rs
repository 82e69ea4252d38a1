//! Burst geometry and star death effects

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;

use super::particles::{DeathEffect, Spark, Star};
use super::Simulation;
use crate::audio::SoundEffect;
use crate::color::Color;
use crate::settings::Quality;
use crate::shells;

/// Star that burned out this frame, waiting for its effect to run
#[derive(Debug, Clone)]
pub struct Death {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: Color,
    pub effect: DeathEffect,
}

/// Evenly spaced angles along an arc, each jittered by up to
/// `randomness` steps.
///
/// Fractional counts round half down, so `count` 4.5 yields four angles.
pub fn create_particle_arc<R: Rng + ?Sized>(
    rng: &mut R,
    start: f32,
    arc_length: f32,
    count: f32,
    randomness: f32,
    mut spawn: impl FnMut(&mut R, f32),
) {
    if count.is_nan() || count <= 0.0 {
        return;
    }
    let angle_delta = arc_length / count;
    let steps = (count - 0.5).ceil().max(0.0) as usize;
    for i in 0..steps {
        let angle = start + angle_delta * i as f32;
        let jitter = rng.random::<f32>() * angle_delta * randomness;
        spawn(rng, angle + jitter);
    }
}

/// Spread roughly `count` particles over a sphere seen from the side.
///
/// The sphere is sliced into latitude rings; each ring gets particles in
/// proportion to its circumference and passes its projected radius to
/// `spawn` as a speed multiplier. `start` and `arc_length` restrict the
/// burst to part of every ring. Returns the number of spawn calls.
pub fn create_burst<R: Rng + ?Sized>(
    rng: &mut R,
    count: f32,
    start: f32,
    arc_length: f32,
    mut spawn: impl FnMut(&mut R, f32, f32),
) -> usize {
    if count.is_nan() || count <= 0.0 {
        return 0;
    }

    let radius = 0.5 * (count / PI).sqrt();
    let circumference = TAU * radius;
    let half = circumference / 2.0;
    let rings = half.floor() as usize;

    let mut spawned = 0;
    for i in 0..=rings {
        let ring_angle = i as f32 / half * (PI / 2.0);
        let ring_size = ring_angle.cos();
        let parts_per_full_ring = circumference * ring_size;
        if parts_per_full_ring.is_nan() || parts_per_full_ring <= 0.0 {
            continue;
        }
        let parts_per_arc = parts_per_full_ring * (arc_length / TAU);

        let angle_inc = TAU / parts_per_full_ring;
        let angle_offset = rng.random::<f32>() * angle_inc + start;
        let max_random_offset = angle_inc * 0.33;

        let mut j = 0;
        while (j as f32) < parts_per_arc {
            let random_offset = rng.random::<f32>() * max_random_offset;
            let angle = angle_inc * j as f32 + angle_offset + random_offset;
            spawn(rng, angle, ring_size);
            spawned += 1;
            j += 1;
        }
    }
    spawned
}

/// Run the effect of a star that burned out
pub(crate) fn apply_death(sim: &mut Simulation, death: Death) {
    match death.effect {
        DeathEffect::Detonate(spec) => shells::burst(sim, &spec, death.pos, Some(death.vel)),
        DeathEffect::Crossette { shell_id } => {
            sim.play_once(shell_id, SoundEffect::CrackleSmall);
            crossette(sim, death.pos, death.color);
        }
        DeathEffect::Crackle { shell_id } => {
            sim.play_once(shell_id, SoundEffect::Crackle);
            crackle(sim, death.pos);
        }
        DeathEffect::Floral => floral(sim, death.pos, death.vel, death.color),
        DeathEffect::FallingLeaves => falling_leaves(sim, death.pos, death.vel),
    }
}

/// Four sub-stars flying off in a cross
fn crossette(sim: &mut Simulation, pos: Vec2, color: Color) {
    let Simulation { ctx, particles, .. } = sim;
    let start = ctx.random() * PI / 2.0;
    let stars = &mut particles.stars;
    create_particle_arc(&mut ctx.rng, start, TAU, 4.0, 0.5, |rng, angle| {
        let speed = rng.random::<f32>() * 0.6 + 0.75;
        stars.add(Star::new(rng, pos, color, angle, speed, 600.0));
    });
}

/// Ring of short-lived gold sparks
fn crackle(sim: &mut Simulation, pos: Vec2) {
    let Simulation { ctx, particles, .. } = sim;
    let count = if ctx.quality() == Quality::High { 32.0 } else { 16.0 };
    let sparks = &mut particles.sparks;
    create_particle_arc(&mut ctx.rng, 0.0, TAU, count, 1.8, |rng, angle| {
        let speed = rng.random::<f32>().powf(0.45) * 2.4;
        let life = 300.0 + rng.random::<f32>() * 200.0;
        sparks.add(Spark::new(pos, Color::Gold, angle, speed, life));
    });
}

/// Small burst of stars in the dying star's colour
fn floral(sim: &mut Simulation, pos: Vec2, vel: Vec2, color: Color) {
    let Simulation { ctx, particles, .. } = sim;
    let count = 12.0 + 6.0 * ctx.quality().factor();
    let stars = &mut particles.stars;
    create_burst(&mut ctx.rng, count, 0.0, TAU, |rng, angle, speed_mult| {
        let life = 1000.0 + rng.random::<f32>() * 300.0;
        let star = Star::new(rng, pos, color, angle, speed_mult * 2.4, life)
            .with_velocity_offset(vel);
        stars.add(star);
    });
    particles.flashes.add(pos, 46.0);
    sim.play(SoundEffect::BurstSmall, 1.0);
}

/// Slow invisible stars trailing gold sparks
fn falling_leaves(sim: &mut Simulation, pos: Vec2, vel: Vec2) {
    let Simulation { ctx, particles, .. } = sim;
    let spark_freq = 144.0 / ctx.quality().factor();
    let stars = &mut particles.stars;
    create_burst(&mut ctx.rng, 7.0, 0.0, TAU, |rng, angle, speed_mult| {
        let life = 2400.0 + rng.random::<f32>() * 600.0;
        let mut star = Star::new(rng, pos, Color::Invisible, angle, speed_mult * 2.4, life)
            .with_velocity_offset(vel);
        star.spark_color = Color::Gold;
        star.spark_freq = spark_freq;
        star.spark_speed = 0.28;
        star.spark_life = 750.0;
        star.spark_life_variation = 3.2;
        stars.add(star);
    });
    particles.flashes.add(pos, 46.0);
    sim.play(SoundEffect::BurstSmall, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_particle_arc_counts() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut angles = Vec::new();
        create_particle_arc(&mut rng, 0.0, TAU, 4.0, 0.0, |_, a| angles.push(a));
        assert_eq!(angles.len(), 4);
        for (i, a) in angles.iter().enumerate() {
            assert!((a - i as f32 * PI / 2.0).abs() < 1e-5);
        }

        let mut n = 0;
        create_particle_arc(&mut rng, 0.0, TAU, 41.47, 1.0, |_, _| n += 1);
        assert_eq!(n, 41);

        let mut none = 0;
        create_particle_arc(&mut rng, 0.0, TAU, 0.0, 1.0, |_, _| none += 1);
        assert_eq!(none, 0);
    }

    #[test]
    fn test_burst_count_tracks_request() {
        let mut rng = Pcg32::seed_from_u64(2);
        for count in [6.0_f32, 50.0, 200.0, 800.0] {
            let mut n = 0;
            let mut max_mult: f32 = 0.0;
            let spawned = create_burst(&mut rng, count, 0.0, TAU, |_, _, mult| {
                n += 1;
                max_mult = max_mult.max(mult);
                assert!((0.0..=1.0).contains(&mult));
            });
            assert_eq!(spawned, n);
            // Ring rounding adds a little, never doubles
            assert!(n as f32 >= count * 0.5, "count {count} gave {n}");
            assert!(n as f32 <= count * 1.6 + 4.0, "count {count} gave {n}");
            assert_eq!(max_mult, 1.0);
        }
    }

    #[test]
    fn test_half_arc_burst_has_half_the_stars() {
        let mut rng = Pcg32::seed_from_u64(3);
        let full = create_burst(&mut rng, 400.0, 0.0, TAU, |_, _, _| {});
        let half = create_burst(&mut rng, 400.0, 0.0, PI, |_, _, _| {});
        assert!((half as f32 - full as f32 / 2.0).abs() < full as f32 * 0.15);
    }

    #[test]
    fn test_crackle_death_spawns_gold_sparks() {
        let settings = Settings {
            quality: Quality::High,
            ..Default::default()
        };
        let mut sim = Simulation::new(settings, Vec2::new(800.0, 600.0), 4);
        apply_death(
            &mut sim,
            Death {
                pos: Vec2::new(100.0, 100.0),
                vel: Vec2::ZERO,
                color: Color::Red,
                effect: DeathEffect::Crackle { shell_id: 1 },
            },
        );
        assert_eq!(sim.particles.sparks.count(Color::Gold), 32);
        assert!(sim.particles.stars.is_empty());
    }

    #[test]
    fn test_crossette_spawns_four_same_colour_stars() {
        let mut sim = Simulation::new(Settings::default(), Vec2::new(800.0, 600.0), 5);
        apply_death(
            &mut sim,
            Death {
                pos: Vec2::new(100.0, 100.0),
                vel: Vec2::ZERO,
                color: Color::Purple,
                effect: DeathEffect::Crossette { shell_id: 1 },
            },
        );
        assert_eq!(sim.particles.stars.count(Color::Purple), 4);
        for star in sim.particles.stars.iter_color(Color::Purple) {
            assert_eq!(star.life, 600.0);
            let speed = star.vel.length();
            assert!((0.75..1.35).contains(&speed));
        }
    }

    #[test]
    fn test_falling_leaves_death() {
        let mut sim = Simulation::new(Settings::default(), Vec2::new(800.0, 600.0), 6);
        let vel = Vec2::new(0.5, -0.25);
        apply_death(
            &mut sim,
            Death {
                pos: Vec2::new(100.0, 100.0),
                vel,
                color: Color::Invisible,
                effect: DeathEffect::FallingLeaves,
            },
        );
        let leaves: Vec<_> = sim.particles.stars.iter_color(Color::Invisible).collect();
        assert!(!leaves.is_empty());
        for leaf in leaves {
            assert_eq!(leaf.spark_color, Color::Gold);
            assert!(leaf.spark_freq > 0.0);
            assert!((2400.0..3000.0).contains(&leaf.life));
        }
        assert_eq!(sim.particles.flashes.len(), 1);
    }
}
