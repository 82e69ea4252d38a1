//! Per-frame particle update
//!
//! Buckets are walked in reverse so retired particles can be removed in
//! place. A star that changes colour moves to another bucket mid-pass; the
//! frame stamp keeps it from being integrated a second time when the walk
//! reaches that bucket.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::context::FrameStep;
use super::effects::{self, Death};
use super::particles::{Particles, Spark};
use super::Simulation;
use crate::color::Color;
use crate::consts::{GRAVITY, SPARK_AIR_DRAG, STAR_AIR_DRAG, STAR_AIR_DRAG_HEAVY};

/// Integrate stars and sparks, then run death effects queued during the pass
pub(crate) fn update_particles(sim: &mut Simulation, step: FrameStep) {
    let time_step = step.time_step();
    let speed = step.speed_mult();

    let star_drag = 1.0 - (1.0 - STAR_AIR_DRAG) * speed;
    let star_drag_heavy = 1.0 - (1.0 - STAR_AIR_DRAG_HEAVY) * speed;
    let spark_drag = 1.0 - (1.0 - SPARK_AIR_DRAG) * speed;
    let gravity = time_step / 1000.0 * GRAVITY;

    {
        let Simulation {
            ctx,
            particles,
            deaths,
            ..
        } = &mut *sim;
        let Particles { stars, sparks, .. } = particles;
        let frame = ctx.frame;

        for color in Color::ALL {
            let ci = color.index();

            // Stars
            let mut i = stars.active[ci].len();
            while i > 0 {
                i -= 1;
                let handle = stars.active[ci][i];
                let star = &mut stars.pool[handle];

                if star.update_frame == frame {
                    continue;
                }
                star.update_frame = frame;

                star.life -= time_step;
                if star.life <= 0.0 {
                    if let Some(effect) = star.on_death.take() {
                        deaths.push(Death {
                            pos: star.pos,
                            vel: star.vel,
                            color: star.color,
                            effect,
                        });
                    }
                    stars.active[ci].remove(i);
                    stars.pool.release(handle);
                    continue;
                }

                let burn_rate = (star.life / star.full_life).sqrt();
                let burn_rate_inverse = 1.0 - burn_rate;

                star.prev_pos = star.pos;
                star.pos += star.vel * speed;
                star.vel *= if star.heavy {
                    star_drag_heavy
                } else {
                    star_drag
                };
                star.vel.y += gravity;

                if star.spin_radius != 0.0 {
                    star.spin_angle += star.spin_speed * speed;
                    star.pos += Vec2::new(star.spin_angle.sin(), star.spin_angle.cos())
                        * star.spin_radius
                        * speed;
                }

                if star.spark_freq > 0.0 {
                    star.spark_timer -= time_step;
                    while star.spark_timer < 0.0 {
                        star.spark_timer +=
                            star.spark_freq * 0.75 + star.spark_freq * burn_rate_inverse * 4.0;
                        let angle = ctx.rng.random::<f32>() * TAU;
                        let spark_speed = ctx.rng.random::<f32>() * star.spark_speed * burn_rate;
                        let life = star.spark_life * 0.8
                            + ctx.rng.random::<f32>() * star.spark_life_variation * star.spark_life;
                        sparks.add(Spark::new(
                            star.pos,
                            star.spark_color,
                            angle,
                            spark_speed,
                            life,
                        ));
                    }
                }

                if star.life < star.transition_time {
                    let mut moved_to = None;
                    if let Some(second) = star.second_color
                        && !star.color_changed
                    {
                        star.color_changed = true;
                        star.color = second;
                        if second == Color::Invisible {
                            star.spark_freq = 0.0;
                        }
                        moved_to = Some(second);
                    }

                    if star.strobe {
                        // on:off:off in steps of strobe_freq ms
                        star.visible = (star.life / star.strobe_freq).floor() as i64 % 3 == 0;
                    }

                    if let Some(second) = moved_to {
                        let handle = stars.active[ci].remove(i);
                        stars.active[second.index()].push(handle);
                    }
                }
            }

            // Sparks
            let bucket = &mut sparks.active[ci];
            let mut i = bucket.len();
            while i > 0 {
                i -= 1;
                let handle = bucket[i];
                let spark = &mut sparks.pool[handle];
                spark.life -= time_step;
                if spark.life <= 0.0 {
                    bucket.remove(i);
                    sparks.pool.release(handle);
                } else {
                    spark.prev_pos = spark.pos;
                    spark.pos += spark.vel * speed;
                    spark.vel *= spark_drag;
                    spark.vel.y += gravity;
                }
            }
        }
    }

    if !sim.deaths.is_empty() {
        let mut pending = std::mem::take(&mut sim.deaths);
        for death in pending.drain(..) {
            effects::apply_death(sim, death);
        }
        // Keep the allocation for next frame
        sim.deaths = pending;
    }
}
