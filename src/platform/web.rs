//! Canvas 2D surface and Web Audio sink
//!
//! Sound effects are synthesized with oscillators, so no audio assets are
//! needed.

use glam::Vec2;
use web_sys::{AudioContext, CanvasRenderingContext2d, GainNode, OscillatorNode, OscillatorType};

use crate::audio::{AudioSink, SoundEffect};
use crate::renderer::{Composite, GradientStop, LineCap, Rgba, StrokeStyle, Surface};

/// A canvas 2D context drawn through the renderer's [`Surface`] calls
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.ctx
    }
}

fn composite_op(mode: Composite) -> &'static str {
    match mode {
        Composite::SourceOver => "source-over",
        Composite::Lighten => "lighten",
        Composite::Lighter => "lighter",
    }
}

fn line_cap(cap: LineCap) -> &'static str {
    match cap {
        LineCap::Butt => "butt",
        LineCap::Round => "round",
        LineCap::Square => "square",
    }
}

impl Surface for CanvasSurface {
    fn set_scale(&mut self, scale: f32) {
        let s = scale as f64;
        self.ctx.set_transform(s, 0.0, 0.0, s, 0.0, 0.0).ok();
    }

    fn set_composite(&mut self, mode: Composite) {
        self.ctx
            .set_global_composite_operation(composite_op(mode))
            .ok();
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ctx.set_global_alpha(alpha as f64);
    }

    fn clear_rect(&mut self, origin: Vec2, size: Vec2) {
        self.ctx.clear_rect(
            origin.x as f64,
            origin.y as f64,
            size.x as f64,
            size.y as f64,
        );
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Rgba) {
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill_rect(
            origin.x as f64,
            origin.y as f64,
            size.x as f64,
            size.y as f64,
        );
    }

    fn fill_radial_gradient(&mut self, center: Vec2, radius: f32, stops: &[GradientStop]) {
        let (x, y, r) = (center.x as f64, center.y as f64, radius as f64);
        let Ok(gradient) = self.ctx.create_radial_gradient(x, y, 0.0, x, y, r) else {
            return;
        };
        for stop in stops {
            gradient.add_color_stop(stop.offset, &stop.color.css()).ok();
        }
        self.ctx.set_fill_style_canvas_gradient(&gradient);
        self.ctx.fill_rect(x - r, y - r, r * 2.0, r * 2.0);
    }

    fn stroke_segments(&mut self, segments: &[(Vec2, Vec2)], style: StrokeStyle) {
        self.ctx.set_stroke_style_str(&style.color.css());
        self.ctx.set_line_width(style.width as f64);
        self.ctx.set_line_cap(line_cap(style.cap));
        self.ctx.begin_path();
        for (from, to) in segments {
            self.ctx.move_to(from.x as f64, from.y as f64);
            self.ctx.line_to(to.x as f64, to.y as f64);
        }
        self.ctx.stroke();
    }

    fn fill_circles(&mut self, centers: &[Vec2], radius: f32, color: Rgba) {
        self.ctx.set_fill_style_str(&color.css());
        for center in centers {
            self.ctx.begin_path();
            self.ctx
                .arc(
                    center.x as f64,
                    center.y as f64,
                    radius as f64,
                    0.0,
                    std::f64::consts::TAU,
                )
                .ok();
            self.ctx.fill();
        }
    }
}

/// Sound effects synthesized on a Web Audio context
pub struct WebAudioSink {
    ctx: Option<AudioContext>,
    master_volume: f32,
}

impl Default for WebAudioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl WebAudioSink {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            master_volume: 0.8,
        }
    }

    /// Resume the context (browsers require a user gesture first)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    fn create_osc(
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Rising whistle of a comet
    fn play_lift(ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = Self::create_osc(ctx, 500.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(0.001, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(vol * 0.12, t + 0.1)
            .ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.001, t + 0.9)
            .ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(1400.0, t + 0.9)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 1.0).ok();
    }

    /// Deep boom with a bright crack on top
    fn play_burst(ctx: &AudioContext, vol: f32, small: bool) {
        let t = ctx.current_time();
        let (low, length) = if small { (140.0, 0.25) } else { (90.0, 0.6) };

        if let Some((osc, gain)) = Self::create_osc(ctx, low, OscillatorType::Sawtooth) {
            gain.gain().set_value_at_time(vol * 0.5, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + length)
                .ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(low / 3.0, t + length)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + length + 0.1).ok();
        }

        if let Some((osc, gain)) = Self::create_osc(ctx, 1500.0, OscillatorType::Square) {
            gain.gain().set_value_at_time(vol * 0.15, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.08)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.1).ok();
        }
    }

    /// Rapid crackling pops
    fn play_crackle(ctx: &AudioContext, vol: f32, small: bool) {
        let t = ctx.current_time();
        let pops = if small { 6 } else { 14 };
        let Some((osc, gain)) = Self::create_osc(ctx, 2500.0, OscillatorType::Square) else {
            return;
        };

        for i in 0..pops {
            let at = t + i as f64 * 0.035;
            let freq = if i % 2 == 0 { 3200.0 } else { 1800.0 };
            osc.frequency().set_value_at_time(freq, at).ok();
            gain.gain().set_value_at_time(vol * 0.2, at).ok();
            gain.gain().set_value_at_time(0.001, at + 0.015).ok();
        }

        osc.start().ok();
        osc.stop_with_when(t + pops as f64 * 0.035 + 0.05).ok();
    }
}

impl AudioSink for WebAudioSink {
    fn play(&mut self, effect: SoundEffect, intensity: f32) {
        let vol = self.master_volume * intensity;
        if vol <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match effect {
            SoundEffect::Lift => Self::play_lift(ctx, vol),
            SoundEffect::Burst => Self::play_burst(ctx, vol, false),
            SoundEffect::BurstSmall => Self::play_burst(ctx, vol * 0.25, true),
            SoundEffect::Crackle => Self::play_crackle(ctx, vol * 0.2, false),
            SoundEffect::CrackleSmall => Self::play_crackle(ctx, vol * 0.3, true),
        }
    }
}
