//! Rendering module
//!
//! Draws the simulation onto two layered 2D surfaces: a persistent trails
//! layer that is faded a little each frame, and a main layer cleared every
//! frame. The renderer only reads simulation state; surfaces are supplied
//! by the host through the [`Surface`] trait.

pub mod recorder;
pub mod sky;

pub use recorder::{CommandRecorder, DrawCommand};
pub use sky::SkyLight;

use glam::Vec2;

use crate::color::Color;
use crate::consts::{SPARK_DRAW_WIDTH, SPARK_DRAW_WIDTH_HIGH, STAR_DRAW_WIDTH};
use crate::drones::{DRONE_ALPHA, DRONE_TINTS, DroneShow, drone_radius};
use crate::settings::{Quality, Settings};
use crate::sim::Particles;

/// Height of the speed bar along the bottom edge
pub const SPEED_BAR_HEIGHT: f32 = 6.0;
/// Main-layer streak length relative to star velocity
const STAR_STREAK: f32 = 1.6;

/// Colour with straight (non-premultiplied) alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 1.0);

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb([r, g, b]: [u8; 3], a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// CSS `rgba()` string
    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl From<Color> for Rgba {
    fn from(color: Color) -> Self {
        Rgba::rgb(color.rgb(), 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    SourceOver,
    /// Keep the brighter of source and destination per channel
    Lighten,
    /// Additive
    Lighter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba,
    pub width: f32,
    pub cap: LineCap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

/// Burst flash gradient: white core fading through orange
pub const FLASH_STOPS: [GradientStop; 4] = [
    GradientStop {
        offset: 0.024,
        color: Rgba::new(255, 255, 255, 1.0),
    },
    GradientStop {
        offset: 0.125,
        color: Rgba::new(255, 160, 20, 0.2),
    },
    GradientStop {
        offset: 0.32,
        color: Rgba::new(255, 140, 20, 0.11),
    },
    GradientStop {
        offset: 1.0,
        color: Rgba::new(255, 120, 20, 0.0),
    },
];

/// A 2D drawing target
pub trait Surface {
    /// Uniform scale applied to everything drawn until the next call; 1.0
    /// resets to identity
    fn set_scale(&mut self, scale: f32);
    fn set_composite(&mut self, mode: Composite);
    fn set_alpha(&mut self, alpha: f32);
    fn clear_rect(&mut self, origin: Vec2, size: Vec2);
    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Rgba);
    /// Fill the square around `center` with a radial gradient
    fn fill_radial_gradient(&mut self, center: Vec2, radius: f32, stops: &[GradientStop]);
    /// Stroke every segment as one batch
    fn stroke_segments(&mut self, segments: &[(Vec2, Vec2)], style: StrokeStyle);
    fn fill_circles(&mut self, centers: &[Vec2], radius: f32, color: Rgba);
}

/// The two stacked drawing layers
pub struct Layers<'a> {
    pub trails: &'a mut dyn Surface,
    pub main: &'a mut dyn Surface,
}

/// Everything the renderer reads for one frame
pub struct FrameView<'a> {
    pub particles: &'a Particles,
    /// Present only while the drone show is running
    pub drones: Option<&'a DroneShow>,
    pub settings: &'a Settings,
    /// Logical stage size
    pub stage: Vec2,
    /// Device pixels per CSS pixel
    pub pixel_ratio: f32,
    pub sim_speed: f32,
    /// Speed multiplier for this frame (speed scaled by lag)
    pub speed: f32,
    pub speed_bar_opacity: f32,
}

/// Frame renderer; keeps the sky colour and scratch buffers between frames
#[derive(Default)]
pub struct Renderer {
    sky: SkyLight,
    segments: Vec<(Vec2, Vec2)>,
    streaks: Vec<(Vec2, Vec2)>,
    circles: Vec<Vec2>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current sky colour, for the host to paint behind both layers
    pub fn sky_color(&self) -> [u8; 3] {
        self.sky.color()
    }

    pub fn render(&mut self, frame: &FrameView<'_>, layers: &mut Layers<'_>) {
        let settings = frame.settings;
        let quality = settings.quality;
        let stars = &frame.particles.stars;

        if settings.sky_lighting.max_saturation() > 0.0 {
            self.sky
                .update(stars, settings.sky_lighting.max_saturation(), frame.speed);
        }

        let scale = frame.pixel_ratio * settings.scale();
        layers.trails.set_scale(scale);
        layers.main.set_scale(scale);

        let stage = frame.stage;
        let fade = if settings.long_exposure {
            0.0025
        } else {
            0.175 * frame.speed
        };
        layers.trails.set_composite(Composite::SourceOver);
        layers
            .trails
            .fill_rect(Vec2::ZERO, stage, Rgba::new(0, 0, 0, fade));
        layers.main.clear_rect(Vec2::ZERO, stage);

        // Gradients are drawn source-over; lighten breaks them on some
        // canvas implementations
        for flash in frame.particles.flashes.iter() {
            layers
                .trails
                .fill_radial_gradient(flash.pos, flash.radius, &FLASH_STOPS);
        }

        layers.trails.set_composite(Composite::Lighten);

        let star_cap = if quality == Quality::Low {
            LineCap::Square
        } else {
            LineCap::Round
        };
        self.streaks.clear();
        for color in Color::VISIBLE {
            self.segments.clear();
            for star in stars.iter_color(color).filter(|s| s.visible) {
                self.segments.push((star.pos, star.prev_pos));
                self.streaks.push((star.pos, star.pos - star.vel * STAR_STREAK));
            }
            if !self.segments.is_empty() {
                layers.trails.stroke_segments(
                    &self.segments,
                    StrokeStyle {
                        color: color.into(),
                        width: STAR_DRAW_WIDTH,
                        cap: star_cap,
                    },
                );
            }
        }
        if !self.streaks.is_empty() {
            layers.main.stroke_segments(
                &self.streaks,
                StrokeStyle {
                    color: Rgba::WHITE,
                    width: 1.0,
                    cap: LineCap::Butt,
                },
            );
        }

        let spark_width = if quality == Quality::High {
            SPARK_DRAW_WIDTH_HIGH
        } else {
            SPARK_DRAW_WIDTH
        };
        for color in Color::VISIBLE {
            self.segments.clear();
            self.segments.extend(
                frame
                    .particles
                    .sparks
                    .iter_color(color)
                    .map(|spark| (spark.pos, spark.prev_pos)),
            );
            if !self.segments.is_empty() {
                layers.trails.stroke_segments(
                    &self.segments,
                    StrokeStyle {
                        color: color.into(),
                        width: spark_width,
                        cap: LineCap::Butt,
                    },
                );
            }
        }

        if let Some(drones) = frame.drones {
            self.render_drones(drones, quality, layers.main);
        }

        if frame.speed_bar_opacity > 0.0 {
            layers.main.set_alpha(frame.speed_bar_opacity);
            layers.main.fill_rect(
                Vec2::new(0.0, stage.y - SPEED_BAR_HEIGHT),
                Vec2::new(stage.x * frame.sim_speed, SPEED_BAR_HEIGHT),
                Color::Blue.into(),
            );
            layers.main.set_alpha(1.0);
        }

        layers.trails.set_scale(1.0);
        layers.main.set_scale(1.0);
    }

    fn render_drones(&mut self, drones: &DroneShow, quality: Quality, main: &mut dyn Surface) {
        let radius = drone_radius(quality);
        main.set_composite(Composite::Lighter);
        for tint in DRONE_TINTS {
            self.circles.clear();
            self.circles
                .extend(drones.iter().filter(|d| d.tint == tint).map(|d| d.pos));
            if !self.circles.is_empty() {
                main.fill_circles(&self.circles, radius, Rgba::rgb(tint, DRONE_ALPHA));
            }
        }
        main.set_composite(Composite::SourceOver);
    }
}
