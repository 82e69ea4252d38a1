//! Launch sequencer
//!
//! Picks compound launch patterns for auto-fire and keeps the delayed
//! launches they schedule. Delays run on the scaled simulation clock, so
//! slowing the show down slows the sequences with it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f32::consts::{FRAC_PI_2, PI};

use crate::shells::recipes::shell_from_config;
use crate::shells::{self, ShellChoice, ShellKind, ShellSpec, build_shell, random_fast_kind, random_kind};
use crate::sim::{FrameStep, SimContext, Simulation};

/// Minimum time between small barrages (ms of simulation time)
pub const BARRAGE_COOLDOWN_MS: f64 = 15_000.0;
/// Shells fired per finale volley
pub const FINALE_COUNT: u32 = 32;
/// Delay returned by the opening shell
const FIRST_SEQUENCE_MS: f32 = 2400.0;
/// Auto-launch waits this much longer than a sequence asks for
const AUTO_LAUNCH_STRETCH: f32 = 1.25;

/// Where a delayed launch gets its shell from
#[derive(Debug, Clone)]
pub enum LaunchSource {
    /// Built when scheduled
    Spec(Box<ShellSpec>),
    /// Built when fired
    Kind { kind: ShellKind, size: f32 },
    /// Random recipe rolled when fired
    RandomKind { size: f32 },
}

#[derive(Debug, Clone)]
pub struct ScheduledLaunch {
    pub fire_at: f64,
    pub source: LaunchSource,
    pub x: f32,
    pub height: f32,
}

struct Entry {
    seq: u64,
    launch: ScheduledLaunch,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the max-heap pops the earliest launch first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .launch
            .fire_at
            .total_cmp(&self.launch.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Delayed launches ordered by fire time, FIFO on ties
#[derive(Default)]
pub struct ScheduledQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl ScheduledQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, launch: ScheduledLaunch) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { seq, launch });
    }

    /// Next launch due at or before `now`
    pub fn pop_due(&mut self, now: f64) -> Option<ScheduledLaunch> {
        if self.heap.peek()?.launch.fire_at <= now {
            self.heap.pop().map(|entry| entry.launch)
        } else {
            None
        }
    }

    pub fn next_fire_time(&self) -> Option<f64> {
        self.heap.peek().map(|entry| entry.launch.fire_at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

/// Size and launch position for a randomly sized shell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub size: f32,
    pub x: f32,
    pub height: f32,
}

/// Keep launches off the outer 18% of the stage
pub fn fit_x(position: f32) -> f32 {
    const EDGE: f32 = 0.18;
    (1.0 - EDGE * 2.0) * position + EDGE
}

/// Keep bursts below 75% of the usable height
pub fn fit_height(position: f32) -> f32 {
    position * 0.75
}

/// Random size at or below the configured one; smaller shells burst lower
/// and further from the centre
pub fn random_placement(ctx: &mut SimContext) -> Placement {
    let base = ctx.settings.shell_size();
    let max_variance = base.min(2.5);
    let variance = ctx.random() * max_variance;
    let size = base - variance;
    let height = if max_variance == 0.0 {
        ctx.random()
    } else {
        1.0 - variance / max_variance
    };
    let center_offset = ctx.random() * (1.0 - height * 0.65) * 0.5;
    let x = if ctx.random() < 0.5 {
        0.5 - center_offset
    } else {
        0.5 + center_offset
    };
    Placement {
        size,
        x: fit_x(x),
        height: fit_height(height),
    }
}

/// Auto-fire state and the delayed launch queue
pub struct Sequencer {
    queue: ScheduledQueue,
    first_sequence: bool,
    finale_count: u32,
    /// Simulation time of the last small barrage
    barrage_last_called: f64,
    /// ms of simulation time until the next sequence
    auto_launch_time: f32,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            queue: ScheduledQueue::new(),
            first_sequence: true,
            finale_count: 0,
            barrage_last_called: 0.0,
            auto_launch_time: 0.0,
        }
    }

    /// Launches still waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn auto_launch_time(&self) -> f32 {
        self.auto_launch_time
    }

    /// Drop queued launches
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Fire due launches, then run auto-launch
    pub fn update(&mut self, sim: &mut Simulation, step: FrameStep) {
        self.fire_due(sim);

        if sim.ctx.settings.auto_launch {
            self.auto_launch_time -= step.time_step();
            if self.auto_launch_time <= 0.0 {
                self.auto_launch_time = self.start_sequence(sim) * AUTO_LAUNCH_STRETCH;
            }
        }
    }

    /// Fire every queued launch whose time has come
    pub fn fire_due(&mut self, sim: &mut Simulation) {
        while let Some(launch) = self.queue.pop_due(sim.ctx.sim_time) {
            let spec = match launch.source {
                LaunchSource::Spec(spec) => *spec,
                LaunchSource::Kind { kind, size } => build_shell(&mut sim.ctx, kind, size),
                LaunchSource::RandomKind { size } => {
                    let kind = random_kind(&mut sim.ctx.rng);
                    build_shell(&mut sim.ctx, kind, size)
                }
            };
            shells::launch(sim, spec, launch.x, launch.height);
        }
    }

    fn schedule(&mut self, sim: &Simulation, delay_ms: f32, source: LaunchSource, x: f32, height: f32) {
        self.queue.push(ScheduledLaunch {
            fire_at: sim.ctx.sim_time + delay_ms.max(0.0) as f64,
            source,
            x,
            height,
        });
    }

    /// Pick and run the next sequence; returns ms until the next pick
    pub fn start_sequence(&mut self, sim: &mut Simulation) -> f32 {
        if self.first_sequence {
            self.first_sequence = false;
            let size = sim.ctx.settings.shell_size();
            let spec = build_shell(&mut sim.ctx, ShellKind::Crysanthemum, size);
            shells::launch(sim, spec, 0.5, 0.5);
            return FIRST_SEQUENCE_MS;
        }

        if sim.ctx.settings.finale {
            self.seq_random_fast_shell(sim);
            if self.finale_count < FINALE_COUNT {
                self.finale_count += 1;
                return 170.0;
            }
            self.finale_count = 0;
            log::debug!("Finale volley complete");
            return 6000.0;
        }

        let roll = sim.ctx.random();
        self.run_sequence(sim, roll)
    }

    /// Sequence selection for a given roll in `[0, 1)`
    fn run_sequence(&mut self, sim: &mut Simulation, roll: f32) -> f32 {
        let barrage_ready = sim.ctx.sim_time - self.barrage_last_called > BARRAGE_COOLDOWN_MS;
        if roll < 0.08 && barrage_ready {
            self.seq_small_barrage(sim)
        } else if roll < 0.1 {
            self.seq_pyramid(sim)
        } else if roll < 0.6 {
            self.seq_random_shell(sim)
        } else if roll < 0.8 {
            self.seq_two_random(sim)
        } else {
            self.seq_triple(sim)
        }
    }

    /// One configured shell at a random placement
    pub fn seq_random_shell(&mut self, sim: &mut Simulation) -> f32 {
        let placement = random_placement(&mut sim.ctx);
        let spec = shell_from_config(&mut sim.ctx, placement.size);
        let extra_delay = if spec.falling_leaves {
            4600.0
        } else {
            spec.star_life
        };
        log::debug!("Sequence: single {}", spec.kind);
        shells::launch(sim, spec, placement.x, placement.height);
        900.0 + sim.ctx.random() * 600.0 + extra_delay
    }

    /// One quick-to-finish shell at a random placement
    pub fn seq_random_fast_shell(&mut self, sim: &mut Simulation) -> f32 {
        let kind = random_fast_kind(&mut sim.ctx);
        let placement = random_placement(&mut sim.ctx);
        let spec = build_shell(&mut sim.ctx, kind, placement.size);
        let extra_delay = spec.star_life;
        shells::launch(sim, spec, placement.x, placement.height);
        900.0 + sim.ctx.random() * 600.0 + extra_delay
    }

    /// Left and right shells, the second 100 ms later
    pub fn seq_two_random(&mut self, sim: &mut Simulation) -> f32 {
        let first = random_placement(&mut sim.ctx);
        let second = random_placement(&mut sim.ctx);
        let left = shell_from_config(&mut sim.ctx, first.size);
        let right = shell_from_config(&mut sim.ctx, second.size);
        let left_offset = sim.ctx.random() * 0.2 - 0.1;
        let right_offset = sim.ctx.random() * 0.2 - 0.1;

        let extra_delay = if left.falling_leaves || right.falling_leaves {
            4600.0
        } else {
            left.star_life.max(right.star_life)
        };
        log::debug!("Sequence: double {} + {}", left.kind, right.kind);

        shells::launch(sim, left, 0.3 + left_offset, first.height);
        self.schedule(
            sim,
            100.0,
            LaunchSource::Spec(Box::new(right)),
            0.7 + right_offset,
            second.height,
        );
        900.0 + sim.ctx.random() * 600.0 + extra_delay
    }

    /// A centre shell, then two smaller low ones on either side
    pub fn seq_triple(&mut self, sim: &mut Simulation) -> f32 {
        let kind = random_fast_kind(&mut sim.ctx);
        let base_size = sim.ctx.settings.shell_size();
        let small_size = (base_size - 1.25).max(0.0);
        log::debug!("Sequence: triple {kind}");

        let offset = sim.ctx.random() * 0.08 - 0.04;
        let center = build_shell(&mut sim.ctx, kind, base_size);
        shells::launch(sim, center, 0.5 + offset, 0.7);

        let left_delay = 1000.0 + sim.ctx.random() * 400.0;
        let right_delay = 1000.0 + sim.ctx.random() * 400.0;
        for (delay, x) in [(left_delay, 0.2), (right_delay, 0.8)] {
            let offset = sim.ctx.random() * 0.08 - 0.04;
            let source = LaunchSource::Kind {
                kind,
                size: small_size,
            };
            self.schedule(sim, delay, source, x + offset, 0.1);
        }
        4000.0
    }

    /// Recipe for the regular shells of a pyramid or barrage
    fn main_source(sim: &mut Simulation, size: f32) -> LaunchSource {
        let choice = sim.ctx.settings.shell;
        let kind = match choice {
            ShellChoice::Kind(kind) => kind,
            ShellChoice::Random if sim.ctx.random() < 0.78 => ShellKind::Crysanthemum,
            ShellChoice::Random => ShellKind::Ring,
        };
        LaunchSource::Kind { kind, size }
    }

    /// Pairs closing in on the centre, rising towards it, capped by a
    /// large special shell
    pub fn seq_pyramid(&mut self, sim: &mut Simulation) -> f32 {
        let half_count: u32 = if sim.ctx.is_wide_stage() { 7 } else { 4 };
        let large_size = sim.ctx.settings.shell_size();
        let small_size = (large_size - 3.0).max(0.0);
        let main = Self::main_source(sim, small_size);
        let special = match sim.ctx.settings.shell {
            ShellChoice::Kind(kind) => LaunchSource::Kind {
                kind,
                size: large_size,
            },
            ShellChoice::Random => LaunchSource::RandomKind { size: large_size },
        };
        log::debug!("Sequence: pyramid of {} pairs", half_count);

        let pyramid_height = |x: f32| {
            let h = if x <= 0.5 { x / 0.5 } else { (1.0 - x) / 0.5 };
            h * 0.42
        };

        let mut delay = 0.0;
        for count in 0..=half_count {
            if count == half_count {
                self.schedule(sim, delay, special.clone(), 0.5, 0.75);
            } else {
                let offset = count as f32 / half_count as f32 * 0.5;
                let delay_offset = sim.ctx.random() * 30.0 + 30.0;
                self.schedule(sim, delay, main.clone(), offset, pyramid_height(offset));
                self.schedule(
                    sim,
                    delay + delay_offset,
                    main.clone(),
                    1.0 - offset,
                    pyramid_height(1.0 - offset),
                );
            }
            delay += 200.0;
        }

        3400.0 + half_count as f32 * 250.0
    }

    /// Fast outward sweep of small shells along a cosine wave of heights
    pub fn seq_small_barrage(&mut self, sim: &mut Simulation) -> f32 {
        self.barrage_last_called = sim.ctx.sim_time;
        let wide = sim.ctx.is_wide_stage();
        let barrage_count: u32 = if wide { 11 } else { 5 };
        let special_index: u32 = if wide { 3 } else { 1 };
        let size = (sim.ctx.settings.shell_size() - 2.0).max(0.0);
        let main = Self::main_source(sim, size);
        let choice = sim.ctx.settings.shell;
        let special = match choice {
            ShellChoice::Kind(kind) => LaunchSource::Kind { kind, size },
            ShellChoice::Random => LaunchSource::Kind {
                kind: random_fast_kind(&mut sim.ctx),
                size,
            },
        };
        log::debug!("Sequence: small barrage of {}", barrage_count);

        let wave_height = |x: f32| ((x * 5.0 * PI + FRAC_PI_2).cos() + 1.0) / 2.0 * 0.75;

        let mut count = 0;
        let mut delay = 0.0;
        while count < barrage_count {
            if count == 0 {
                self.fire_source(sim, main.clone(), 0.5, wave_height(0.5));
                count += 1;
            } else {
                let offset = (count + 1) as f32 / barrage_count as f32 / 2.0;
                let delay_offset = sim.ctx.random() * 30.0 + 30.0;
                let source = if count == special_index {
                    &special
                } else {
                    &main
                };
                self.schedule(sim, delay, source.clone(), 0.5 + offset, wave_height(0.5 + offset));
                self.schedule(
                    sim,
                    delay + delay_offset,
                    source.clone(),
                    0.5 - offset,
                    wave_height(0.5 - offset),
                );
                count += 2;
            }
            delay += 200.0;
        }

        3400.0 + barrage_count as f32 * 120.0
    }

    /// Three fast shells fired as the drones change formation
    pub fn launch_drone_burst(&mut self, sim: &mut Simulation) {
        let size = sim.ctx.settings.shell_size().max(2.5);
        let kind = random_fast_kind(&mut sim.ctx);
        log::debug!("Drone burst: {kind}");
        for (i, offset) in [-0.22, 0.0, 0.22].into_iter().enumerate() {
            self.schedule(
                sim,
                i as f32 * 120.0,
                LaunchSource::Kind { kind, size },
                0.5 + offset,
                0.6,
            );
        }
    }

    /// Fire the configured shell at a pointer position (fractions of the
    /// stage, height measured from the bottom)
    pub fn launch_from_config(&mut self, sim: &mut Simulation, x: f32, height: f32) {
        let size = sim.ctx.settings.shell_size();
        let spec = shell_from_config(&mut sim.ctx, size);
        shells::launch(sim, spec, x, height);
    }

    fn fire_source(&mut self, sim: &mut Simulation, source: LaunchSource, x: f32, height: f32) {
        self.schedule(sim, 0.0, source, x, height);
        self.fire_due(sim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use glam::Vec2;

    fn sim() -> Simulation {
        Simulation::new(Settings::default(), Vec2::new(1200.0, 800.0), 42)
    }

    fn comets(sim: &Simulation) -> usize {
        sim.particles.stars.len()
    }

    fn launch_at(fire_at: f64, x: f32) -> ScheduledLaunch {
        ScheduledLaunch {
            fire_at,
            source: LaunchSource::RandomKind { size: 1.0 },
            x,
            height: 0.5,
        }
    }

    #[test]
    fn test_queue_orders_by_time_then_fifo() {
        let mut queue = ScheduledQueue::new();
        queue.push(launch_at(300.0, 0.0));
        queue.push(launch_at(100.0, 0.1));
        queue.push(launch_at(100.0, 0.2));
        queue.push(launch_at(200.0, 0.3));

        assert!(queue.pop_due(50.0).is_none());
        assert_eq!(queue.next_fire_time(), Some(100.0));

        let order: Vec<f32> = std::iter::from_fn(|| queue.pop_due(1000.0))
            .map(|l| l.x)
            .collect();
        assert_eq!(order, vec![0.1, 0.2, 0.3, 0.0]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fit_bounds() {
        assert!((fit_x(0.0) - 0.18).abs() < 1e-6);
        assert!((fit_x(1.0) - 0.82).abs() < 1e-6);
        assert_eq!(fit_height(1.0), 0.75);
    }

    #[test]
    fn test_random_placement_within_bounds() {
        let mut sim = sim();
        for _ in 0..500 {
            let p = random_placement(&mut sim.ctx);
            assert!(p.size <= 3.0 && p.size >= 0.5);
            assert!((0.18..=0.82).contains(&p.x));
            assert!((0.0..=0.75).contains(&p.height));
        }
    }

    #[test]
    fn test_first_sequence_is_centre_crysanthemum() {
        let mut sim = sim();
        let mut seq = Sequencer::new();
        let delay = seq.start_sequence(&mut sim);
        assert_eq!(delay, 2400.0);
        assert_eq!(comets(&sim), 1);
        assert!(seq.queue.is_empty());
    }

    #[test]
    fn test_finale_volley() {
        let mut sim = sim();
        sim.ctx.settings.finale = true;
        let mut seq = Sequencer::new();
        seq.start_sequence(&mut sim);

        for _ in 0..FINALE_COUNT {
            assert_eq!(seq.start_sequence(&mut sim), 170.0);
        }
        assert_eq!(seq.start_sequence(&mut sim), 6000.0);
        assert_eq!(seq.start_sequence(&mut sim), 170.0);
        assert_eq!(comets(&sim), 1 + FINALE_COUNT as usize + 2);
    }

    #[test]
    fn test_pyramid_schedules_pairs_and_special() {
        let mut sim = sim();
        let mut seq = Sequencer::new();
        let delay = seq.seq_pyramid(&mut sim);
        assert_eq!(delay, 3400.0 + 7.0 * 250.0);
        assert_eq!(seq.pending(), 15);
        assert_eq!(comets(&sim), 0);

        seq.fire_due(&mut sim);
        assert_eq!(comets(&sim), 1);

        sim.ctx.sim_time = 2000.0;
        seq.fire_due(&mut sim);
        assert_eq!(comets(&sim), 15);
    }

    #[test]
    fn test_narrow_stage_pyramid() {
        let mut sim = Simulation::new(Settings::default(), Vec2::new(600.0, 800.0), 3);
        let mut seq = Sequencer::new();
        assert_eq!(seq.seq_pyramid(&mut sim), 3400.0 + 4.0 * 250.0);
        assert_eq!(seq.pending(), 9);
    }

    #[test]
    fn test_barrage_fires_centre_immediately() {
        let mut sim = sim();
        let mut seq = Sequencer::new();
        let delay = seq.seq_small_barrage(&mut sim);
        assert_eq!(delay, 3400.0 + 11.0 * 120.0);
        assert_eq!(comets(&sim), 1);
        assert_eq!(seq.pending(), 10);
    }

    #[test]
    fn test_barrage_cooldown_falls_through() {
        let mut sim = sim();
        let mut seq = Sequencer::new();
        seq.first_sequence = false;

        // Still inside the cooldown from the start of the show
        assert_eq!(seq.run_sequence(&mut sim, 0.05), 3400.0 + 7.0 * 250.0);
        seq.clear();

        sim.ctx.sim_time = 20_000.0;
        assert_eq!(seq.run_sequence(&mut sim, 0.05), 3400.0 + 11.0 * 120.0);
        seq.clear();
        // A second barrage straight away is not allowed
        assert_eq!(seq.run_sequence(&mut sim, 0.05), 3400.0 + 7.0 * 250.0);
        seq.clear();

        sim.ctx.sim_time += BARRAGE_COOLDOWN_MS + 1.0;
        assert_eq!(seq.run_sequence(&mut sim, 0.05), 3400.0 + 11.0 * 120.0);
    }

    #[test]
    fn test_triple_schedules_two_small_shells() {
        let mut sim = sim();
        let mut seq = Sequencer::new();
        assert_eq!(seq.seq_triple(&mut sim), 4000.0);
        assert_eq!(comets(&sim), 1);
        assert_eq!(seq.pending(), 2);
        let next = seq.queue.next_fire_time().unwrap();
        assert!((1000.0..1400.0).contains(&next));

        sim.ctx.sim_time = 1400.0;
        seq.fire_due(&mut sim);
        assert_eq!(comets(&sim), 3);
    }

    #[test]
    fn test_two_random_second_after_100ms() {
        let mut sim = sim();
        let mut seq = Sequencer::new();
        let delay = seq.seq_two_random(&mut sim);
        assert!(delay >= 900.0);
        assert_eq!(comets(&sim), 1);
        assert_eq!(seq.queue.next_fire_time(), Some(100.0));
    }

    #[test]
    fn test_drone_burst_three_shells_120ms_apart() {
        let mut sim = sim();
        let mut seq = Sequencer::new();
        seq.launch_drone_burst(&mut sim);
        assert_eq!(seq.pending(), 3);
        let mut times = Vec::new();
        while let Some(launch) = seq.queue.pop_due(f64::MAX) {
            times.push(launch.fire_at);
            assert_eq!(launch.height, 0.6);
            match launch.source {
                LaunchSource::Kind { size, .. } => assert!(size >= 2.5),
                other => panic!("unexpected source {other:?}"),
            }
        }
        assert_eq!(times, vec![0.0, 120.0, 240.0]);
    }

    #[test]
    fn test_auto_launch_timer() {
        let mut sim = sim();
        let mut seq = Sequencer::new();
        let step = FrameStep::new(16.0, 1.0);

        seq.update(&mut sim, step);
        assert_eq!(comets(&sim), 1);
        assert_eq!(seq.auto_launch_time(), 2400.0 * 1.25);

        seq.update(&mut sim, step);
        assert_eq!(seq.auto_launch_time(), 2400.0 * 1.25 - 16.0);
        assert_eq!(comets(&sim), 1);
    }

    #[test]
    fn test_auto_launch_disabled() {
        let mut sim = sim();
        sim.ctx.settings.auto_launch = false;
        let mut seq = Sequencer::new();
        seq.update(&mut sim, FrameStep::new(16.0, 1.0));
        assert_eq!(comets(&sim), 0);
    }

    #[test]
    fn test_frozen_speed_holds_auto_launch() {
        let mut sim = sim();
        let mut seq = Sequencer::new();
        seq.update(&mut sim, FrameStep::new(16.0, 1.0));
        let before = seq.auto_launch_time();
        for _ in 0..100 {
            seq.update(&mut sim, FrameStep::new(16.0, 0.0));
        }
        assert_eq!(seq.auto_launch_time(), before);
    }
}
