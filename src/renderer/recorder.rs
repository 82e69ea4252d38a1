//! Recording surface
//!
//! Stores draw calls instead of executing them. Used by the headless
//! driver and by tests to inspect what a frame would have drawn.

use glam::Vec2;

use super::{Composite, GradientStop, Rgba, StrokeStyle, Surface};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    SetScale(f32),
    SetComposite(Composite),
    SetAlpha(f32),
    ClearRect {
        origin: Vec2,
        size: Vec2,
    },
    FillRect {
        origin: Vec2,
        size: Vec2,
        color: Rgba,
    },
    RadialGradient {
        center: Vec2,
        radius: f32,
        stops: Vec<GradientStop>,
    },
    StrokeSegments {
        segments: Vec<(Vec2, Vec2)>,
        style: StrokeStyle,
    },
    FillCircles {
        centers: Vec<Vec2>,
        radius: f32,
        color: Rgba,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CommandRecorder {
    pub commands: Vec<DrawCommand>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Every stroke batch with its style
    pub fn strokes(&self) -> impl Iterator<Item = (&[(Vec2, Vec2)], StrokeStyle)> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::StrokeSegments { segments, style } => Some((segments.as_slice(), *style)),
            _ => None,
        })
    }

    /// Segments stroked in `color`
    pub fn segment_count(&self, color: Rgba) -> usize {
        self.strokes()
            .filter(|(_, style)| style.color == color)
            .map(|(segments, _)| segments.len())
            .sum()
    }

    /// Circles filled in any colour
    pub fn circle_count(&self) -> usize {
        self.commands
            .iter()
            .map(|command| match command {
                DrawCommand::FillCircles { centers, .. } => centers.len(),
                _ => 0,
            })
            .sum()
    }

    /// Burst flash gradients drawn
    pub fn gradient_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::RadialGradient { .. }))
            .count()
    }
}

impl Surface for CommandRecorder {
    fn set_scale(&mut self, scale: f32) {
        self.commands.push(DrawCommand::SetScale(scale));
    }

    fn set_composite(&mut self, mode: Composite) {
        self.commands.push(DrawCommand::SetComposite(mode));
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::SetAlpha(alpha));
    }

    fn clear_rect(&mut self, origin: Vec2, size: Vec2) {
        self.commands.push(DrawCommand::ClearRect { origin, size });
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Rgba) {
        self.commands.push(DrawCommand::FillRect {
            origin,
            size,
            color,
        });
    }

    fn fill_radial_gradient(&mut self, center: Vec2, radius: f32, stops: &[GradientStop]) {
        self.commands.push(DrawCommand::RadialGradient {
            center,
            radius,
            stops: stops.to_vec(),
        });
    }

    fn stroke_segments(&mut self, segments: &[(Vec2, Vec2)], style: StrokeStyle) {
        self.commands.push(DrawCommand::StrokeSegments {
            segments: segments.to_vec(),
            style,
        });
    }

    fn fill_circles(&mut self, centers: &[Vec2], radius: f32, color: Rgba) {
        self.commands.push(DrawCommand::FillCircles {
            centers: centers.to_vec(),
            radius,
            color,
        });
    }
}
