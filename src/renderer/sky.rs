//! Sky lighting
//!
//! Tints the background by the colours of the stars currently burning.
//! A few stars already light the sky noticeably; more keep brightening it
//! on a flattening curve.

use glam::Vec3;

use crate::color::Color;
use crate::sim::{BucketedPool, Star};

/// Stars needed for full sky brightness
const MAX_STAR_COUNT: f32 = 500.0;
/// Fraction of the remaining distance covered per nominal frame
const COLOR_CHANGE: f32 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkyLight {
    current: Vec3,
    target: Vec3,
}

impl SkyLight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the target from star counts and ease towards it
    pub fn update(&mut self, stars: &BucketedPool<Star>, max_saturation: f32, speed: f32) {
        let mut total = 0usize;
        let mut sum = Vec3::ZERO;
        for color in Color::VISIBLE {
            let count = stars.count(color);
            let [r, g, b] = color.rgb();
            total += count;
            sum += Vec3::new(r as f32, g as f32, b as f32) * count as f32;
        }

        let intensity = (total as f32 / MAX_STAR_COUNT).min(1.0).powf(0.3);
        let max_component = sum.max_element().max(1.0);
        self.target = sum / max_component * max_saturation * intensity;
        self.current += (self.target - self.current) / COLOR_CHANGE * speed;
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Current colour, truncated to whole channel values
    pub fn color(&self) -> [u8; 3] {
        let c = self.current.clamp(Vec3::ZERO, Vec3::splat(255.0));
        [c.x as u8, c.y as u8, c.z as u8]
    }
}
