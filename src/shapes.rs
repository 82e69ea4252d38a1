//! Parametric point sets for shaped bursts and drone formations
//!
//! Every generated shape is normalized into the `[-1, 1]` box: centred at
//! the origin with its larger axis spanning exactly -1..1.

use std::borrow::Cow;
use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::rc::Rc;

use font8x8::{BASIC_FONTS, UnicodeFonts};
use glam::Vec2;

/// Shared, immutable point cloud
pub type Shape = Rc<[Vec2]>;

/// Offscreen raster size used for text shapes
pub const TEXT_RASTER_WIDTH: usize = 1200;
pub const TEXT_RASTER_HEIGHT: usize = 320;
/// Longest text (in characters) that gets rasterized
pub const MAX_TEXT_CHARS: usize = 50;
/// Pixels at or above this alpha count as ink
const ALPHA_THRESHOLD: u8 = 10;
/// Distinct text values kept rasterized at once
const TEXT_CACHE_LIMIT: usize = 8;

/// Centre the points on the origin and scale the larger axis to -1..1.
///
/// Degenerate input (empty, or a single point) is returned centred without
/// scaling.
pub fn normalize_points(points: &[Vec2]) -> Vec<Vec2> {
    if points.is_empty() {
        return Vec::new();
    }
    let (min, max) = points
        .iter()
        .fold((Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)), |(lo, hi), p| {
            (lo.min(*p), hi.max(*p))
        });

    let extent = (max - min).max_element();
    let scale = if extent > 0.0 { extent } else { 1.0 };
    let mid = (min + max) / 2.0;

    points.iter().map(|p| (*p - mid) / (scale / 2.0)).collect()
}

/// `count + 1` evenly spaced points from `a` to `b` inclusive
pub fn add_line_points(points: &mut Vec<Vec2>, a: Vec2, b: Vec2, count: usize) {
    let count = count.max(1);
    for i in 0..=count {
        let t = i as f32 / count as f32;
        points.push(a.lerp(b, t));
    }
}

/// Arc of `count + 1` points from `start` to `end` radians
pub fn circle_points(radius: f32, count: usize, center: Vec2, start: f32, end: f32) -> Vec<Vec2> {
    let count = count.max(1);
    let step = (end - start) / count as f32;
    (0..=count)
        .map(|i| {
            let angle = start + step * i as f32;
            center + Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// Classic parametric heart, point up on screen (y grows downward)
pub fn heart_points() -> Vec<Vec2> {
    let steps = 220;
    let points: Vec<Vec2> = (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32 * TAU;
            let x = 16.0 * t.sin().powi(3);
            let y = 13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos();
            Vec2::new(x, -y)
        })
        .collect();
    normalize_points(&points)
}

/// Five-pointed star outline
pub fn star_points() -> Vec<Vec2> {
    let outer = 1.0;
    let inner = 0.45;
    let points: Vec<Vec2> = (0..=10)
        .map(|i| {
            let angle = i as f32 / 10.0 * TAU - FRAC_PI_2;
            let radius = if i % 2 == 0 { outer } else { inner };
            Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect();
    normalize_points(&points)
}

pub fn smiley_points() -> Vec<Vec2> {
    let mut points = circle_points(1.0, 220, Vec2::ZERO, 0.0, TAU);
    points.extend(circle_points(0.14, 40, Vec2::new(-0.35, -0.25), 0.0, TAU));
    points.extend(circle_points(0.14, 40, Vec2::new(0.35, -0.25), 0.0, TAU));
    points.extend(circle_points(0.55, 120, Vec2::new(0.0, 0.15), PI * 0.15, PI * 0.85));
    normalize_points(&points)
}

pub fn diamond_points() -> Vec<Vec2> {
    let mut points = Vec::with_capacity(4 * 81);
    let corners = [
        Vec2::new(0.0, -1.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(-1.0, 0.0),
    ];
    for i in 0..corners.len() {
        add_line_points(&mut points, corners[i], corners[(i + 1) % corners.len()], 80);
    }
    normalize_points(&points)
}

pub fn ring_points() -> Vec<Vec2> {
    normalize_points(&circle_points(1.0, 260, Vec2::ZERO, 0.0, TAU))
}

/// Single-channel coverage raster
#[derive(Debug, Clone)]
pub struct AlphaMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl AlphaMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    #[inline]
    pub fn alpha_at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Fill an axis-aligned rectangle, clipped to the mask
    pub fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize, alpha: u8) {
        let x1 = (x0 + w).min(self.width);
        let y1 = (y0 + h).min(self.height);
        for y in y0.min(y1)..y1 {
            let row = y * self.width;
            self.data[row + x0.min(x1)..row + x1].fill(alpha);
        }
    }

    /// Ink pixels with at least one 4-neighbour below the ink threshold.
    ///
    /// Sampled on the odd rows and odd columns only (`1, 3, 5, ...`).
    pub fn edge_points(&self) -> Vec<Vec2> {
        let mut points = Vec::new();
        if self.width < 3 || self.height < 3 {
            return points;
        }
        let ink = |x: usize, y: usize| self.alpha_at(x, y) >= ALPHA_THRESHOLD;
        for y in (1..self.height - 1).step_by(2) {
            for x in (1..self.width - 1).step_by(2) {
                if !ink(x, y) {
                    continue;
                }
                if !ink(x - 1, y) || !ink(x + 1, y) || !ink(x, y - 1) || !ink(x, y + 1) {
                    points.push(Vec2::new(x as f32, y as f32));
                }
            }
        }
        points
    }
}

/// Turns text into a coverage raster.
///
/// Returning `None` means the rasterizer isn't ready (e.g. a font is still
/// loading); callers fall back to a default shape and retry later.
pub trait TextRasterizer {
    fn rasterize(&self, text: &str, width: usize, height: usize) -> Option<AlphaMask>;
}

/// Rasterizer using the built-in 8x8 bitmap font, centred and auto-fit to
/// 90% of the raster width
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFontRasterizer;

impl BitmapFontRasterizer {
    const GLYPH_SIZE: usize = 8;
    const START_FONT_SIZE: f32 = 150.0;
    const MIN_FONT_SIZE: f32 = 36.0;
    const FONT_STEP: f32 = 6.0;
}

impl TextRasterizer for BitmapFontRasterizer {
    fn rasterize(&self, text: &str, width: usize, height: usize) -> Option<AlphaMask> {
        let mut mask = AlphaMask::new(width, height);
        let glyphs: Vec<[u8; 8]> = text
            .chars()
            .map(|c| BASIC_FONTS.get(c).unwrap_or([0; 8]))
            .collect();
        if glyphs.is_empty() {
            return Some(mask);
        }

        let text_width = |font_size: f32| glyphs.len() as f32 * font_size;
        let mut font_size = Self::START_FONT_SIZE;
        while text_width(font_size) > width as f32 * 0.9 && font_size > Self::MIN_FONT_SIZE {
            font_size -= Self::FONT_STEP;
        }

        let cell = font_size / Self::GLYPH_SIZE as f32;
        let origin_x = (width as f32 - text_width(font_size)) / 2.0;
        let origin_y = (height as f32 - font_size) / 2.0;

        for (i, rows) in glyphs.iter().enumerate() {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..Self::GLYPH_SIZE {
                    // font8x8 stores the leftmost pixel in the lowest bit
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    let x = origin_x + ((i * Self::GLYPH_SIZE + col) as f32) * cell;
                    let y = origin_y + row as f32 * cell;
                    let x0 = x.round().max(0.0) as usize;
                    let y0 = y.round().max(0.0) as usize;
                    let x1 = (x + cell).round().max(0.0) as usize;
                    let y1 = (y + cell).round().max(0.0) as usize;
                    mask.fill_rect(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0), 255);
                }
            }
        }

        Some(mask)
    }
}

/// Trim and truncate user text, substituting `fallback` when nothing is left
pub fn sanitize_text<'a>(text: &'a str, fallback: &'a str) -> Cow<'a, str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Cow::Borrowed(fallback);
    }
    match trimmed.char_indices().nth(MAX_TEXT_CHARS) {
        Some((end, _)) => Cow::Borrowed(&trimmed[..end]),
        None => Cow::Borrowed(trimmed),
    }
}

/// Pre-built formation shapes plus a cache for rasterized text
pub struct ShapeLibrary {
    pub heart: Shape,
    pub star: Shape,
    pub smiley: Shape,
    pub diamond: Shape,
    pub ring: Shape,
    rasterizer: Box<dyn TextRasterizer>,
    /// Edge points per sanitized text value
    text_cache: HashMap<String, Shape>,
}

impl Default for ShapeLibrary {
    fn default() -> Self {
        Self::new(Box::new(BitmapFontRasterizer))
    }
}

impl ShapeLibrary {
    pub fn new(rasterizer: Box<dyn TextRasterizer>) -> Self {
        Self {
            heart: heart_points().into(),
            star: star_points().into(),
            smiley: smiley_points().into(),
            diamond: diamond_points().into(),
            ring: ring_points().into(),
            rasterizer,
            text_cache: HashMap::new(),
        }
    }

    pub fn set_rasterizer(&mut self, rasterizer: Box<dyn TextRasterizer>) {
        self.rasterizer = rasterizer;
        self.text_cache.clear();
    }

    /// Previously rasterized points of `text`, without rasterizing
    pub fn cached_text(&self, text: &str, fallback_text: &str) -> Option<&Shape> {
        self.text_cache.get(sanitize_text(text, fallback_text).as_ref())
    }

    /// Normalized edge points of `text`, cached by text value.
    ///
    /// Falls back to the star outline when the text produces no ink or the
    /// rasterizer isn't ready.
    pub fn text_points(&mut self, text: &str, fallback_text: &str) -> Shape {
        let text = sanitize_text(text, fallback_text);
        if let Some(shape) = self.text_cache.get(text.as_ref()) {
            return shape.clone();
        }

        let Some(mask) = self
            .rasterizer
            .rasterize(&text, TEXT_RASTER_WIDTH, TEXT_RASTER_HEIGHT)
        else {
            log::debug!("Text rasterizer not ready, using star outline for {text:?}");
            return self.star.clone();
        };

        let edges = mask.edge_points();
        let shape: Shape = if edges.is_empty() {
            log::warn!("Text {text:?} produced no ink, using star outline");
            self.star.clone()
        } else {
            log::debug!("Rasterized {text:?} into {} edge points", edges.len());
            normalize_points(&edges).into()
        };
        if self.text_cache.len() >= TEXT_CACHE_LIMIT {
            self.text_cache.clear();
        }
        self.text_cache.insert(text.into_owned(), shape.clone());
        shape
    }
}
