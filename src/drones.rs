//! Drone formation show
//!
//! A fixed fleet of drones glides through a loop of formations. Each
//! formation holds for one segment while the drones ease towards the next
//! one; every change of segment asks for a bonus burst of shells.

use glam::Vec2;
use std::f32::consts::TAU;

use crate::ease_in_out;
use crate::settings::Quality;
use crate::shapes::{Shape, ShapeLibrary};
use crate::sim::{FrameStep, Pool, SimContext};

pub const DRONE_COUNT: usize = 1150;
/// One full loop through every formation (ms)
pub const SHOW_DURATION_MS: f32 = 90_000.0;
/// Text shown when the configured text is blank
pub const DRONE_FALLBACK_TEXT: &str = "WOW 2027";
/// Drone fill alpha
pub const DRONE_ALPHA: f32 = 0.9;
/// Pale cyan/blue tints, assigned round-robin
pub const DRONE_TINTS: [[u8; 3]; 4] = [
    [120, 200, 255],
    [180, 240, 255],
    [120, 255, 220],
    [200, 200, 255],
];

const APPROACH: f32 = 0.08;
const DRIFT: f32 = 0.08;
const DRIFT_SPEED: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formation {
    Heart,
    Star,
    Text,
    Smiley,
    Diamond,
    Ring,
}

impl Formation {
    /// Show order
    pub const ALL: [Formation; 6] = [
        Formation::Heart,
        Formation::Star,
        Formation::Text,
        Formation::Smiley,
        Formation::Diamond,
        Formation::Ring,
    ];

    /// Normalized points of this formation. Text must already be
    /// rasterized (see [`Formation::prepare`]); until then it shows the star.
    pub fn points<'a>(&self, shapes: &'a ShapeLibrary, text: &str) -> &'a Shape {
        match self {
            Formation::Heart => &shapes.heart,
            Formation::Star => &shapes.star,
            Formation::Text => shapes
                .cached_text(text, DRONE_FALLBACK_TEXT)
                .unwrap_or(&shapes.star),
            Formation::Smiley => &shapes.smiley,
            Formation::Diamond => &shapes.diamond,
            Formation::Ring => &shapes.ring,
        }
    }

    /// Rasterize the text formation if it isn't cached yet
    pub fn prepare(&self, shapes: &mut ShapeLibrary, text: &str) {
        if *self == Formation::Text && shapes.cached_text(text, DRONE_FALLBACK_TEXT).is_none() {
            shapes.text_points(text, DRONE_FALLBACK_TEXT);
        }
    }
}

/// Duration of a single formation (ms)
pub const SEGMENT_MS: f32 = SHOW_DURATION_MS / Formation::ALL.len() as f32;

#[derive(Debug, Clone)]
pub struct Drone {
    pub pos: Vec2,
    pub tint: [u8; 3],
    /// Phase of the small circular hover
    pub drift: f32,
}

/// Fill radius for drones at a quality tier
pub fn drone_radius(quality: Quality) -> f32 {
    quality.select(1.2, 1.6, 2.2)
}

pub struct DroneShow {
    drones: Pool<Drone>,
    time: f32,
    last_segment: Option<usize>,
}

impl DroneShow {
    pub fn new(ctx: &mut SimContext) -> Self {
        let mut drones = Pool::with_max_capacity(DRONE_COUNT);
        for i in 0..DRONE_COUNT {
            let drone = Drone {
                pos: Vec2::ZERO,
                tint: DRONE_TINTS[i % DRONE_TINTS.len()],
                drift: ctx.random() * TAU,
            };
            // Capacity matches the fleet, so this never drops
            let _ = drones.acquire(drone);
        }
        Self {
            drones,
            time: 0.0,
            last_segment: None,
        }
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Drone> {
        self.drones.iter().map(|(_, drone)| drone)
    }

    /// Position in the loop (ms)
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Formation the drones are leaving
    pub fn formation(&self) -> Formation {
        Formation::ALL[self.segment_index()]
    }

    fn segment_index(&self) -> usize {
        ((self.time / SEGMENT_MS) as usize).min(Formation::ALL.len() - 1)
    }

    /// Move the drones one frame; returns true when the formation changed
    /// and a bonus burst should be launched
    pub fn update(&mut self, ctx: &mut SimContext, step: FrameStep) -> bool {
        self.time = (self.time + step.time_step()) % SHOW_DURATION_MS;
        let segment = self.segment_index();
        let next = (segment + 1) % Formation::ALL.len();
        let eased = ease_in_out((self.time % SEGMENT_MS) / SEGMENT_MS);

        let changed = self.last_segment.is_some_and(|last| last != segment);
        if changed {
            log::debug!("Drones forming {:?}", Formation::ALL[next]);
        }
        self.last_segment = Some(segment);

        let text = &ctx.settings.text_burst;
        Formation::ALL[segment].prepare(&mut ctx.shapes, text);
        Formation::ALL[next].prepare(&mut ctx.shapes, text);
        let current = Formation::ALL[segment].points(&ctx.shapes, text);
        let upcoming = Formation::ALL[next].points(&ctx.shapes, text);
        if current.is_empty() || upcoming.is_empty() {
            return changed;
        }

        let stage = ctx.stage;
        let scale = (stage.x * 0.3).min(stage.y * 0.22);
        let center = Vec2::new(stage.x * 0.5, stage.y * 0.32);
        let mult = step.speed_mult();
        let approach = (APPROACH * mult).min(1.0);

        for (i, (_, drone)) in self.drones.iter_mut().enumerate() {
            let from = center + current[i % current.len()] * scale;
            let to = center + upcoming[i % upcoming.len()] * scale;
            let target = from.lerp(to, eased);

            drone.pos += (target - drone.pos) * approach;
            drone.drift += DRIFT_SPEED * mult;
            drone.pos += Vec2::new(drone.drift.cos(), drone.drift.sin()) * DRIFT * mult;
        }

        changed
    }
}
