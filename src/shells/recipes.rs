//! Randomized shell recipes, one per [`ShellKind`]

use std::f32::consts::TAU;

use rand::Rng;

use super::{Glitter, ShapeSpec, ShellChoice, ShellColor, ShellKind, ShellSpec};
use crate::color::{Color, ColorOptions, ColorPicker};
use crate::settings::Quality;
use crate::sim::SimContext;

/// Fallback text for the Text shell when the configured text is blank
pub const DEFAULT_BURST_TEXT: &str = "WOW 2026";

const LIMIT_WHITE: ColorOptions = ColorOptions {
    not_same: false,
    not_color: None,
    limit_white: true,
};

const NOT_SAME: ColorOptions = ColorOptions {
    not_same: true,
    not_color: None,
    limit_white: false,
};

/// Build a fresh spec of `kind` at `size`
pub fn build_shell(ctx: &mut SimContext, kind: ShellKind, size: f32) -> ShellSpec {
    let size = size.max(0.0);
    match kind {
        ShellKind::Crackle => crackle(ctx, size),
        ShellKind::Crossette => crossette(ctx, size),
        ShellKind::Crysanthemum => crysanthemum(ctx, size),
        ShellKind::FallingLeaves => falling_leaves(size),
        ShellKind::Floral => floral(ctx, size),
        ShellKind::Ghost => ghost(ctx, size),
        ShellKind::HorseTail => horsetail(ctx, size),
        ShellKind::Palm => palm(ctx, size),
        ShellKind::Ring => ring(ctx, size),
        ShellKind::Strobe => strobe(ctx, size),
        ShellKind::Willow => willow(size),
        ShellKind::Heart => heart(ctx, size),
        ShellKind::Smiley => smiley(ctx, size),
        ShellKind::Star => star(ctx, size),
        ShellKind::Text => text(ctx, size),
    }
}

/// Crysanthemum half the time, otherwise any recipe
pub fn random_kind<R: Rng + ?Sized>(rng: &mut R) -> ShellKind {
    if rng.random::<f32>() < 0.5 {
        ShellKind::Crysanthemum
    } else {
        ShellKind::ALL[rng.random_range(0..ShellKind::ALL.len())]
    }
}

/// Resolve a settings choice to a concrete recipe
pub fn resolve_choice(ctx: &mut SimContext, choice: ShellChoice) -> ShellKind {
    match choice {
        ShellChoice::Random => random_kind(&mut ctx.rng),
        ShellChoice::Kind(kind) => kind,
    }
}

/// The configured shell, or a random recipe cheap enough for rapid fire
pub fn random_fast_kind(ctx: &mut SimContext) -> ShellKind {
    match ctx.settings.shell {
        ShellChoice::Kind(kind) => kind,
        ShellChoice::Random => loop {
            let kind = random_kind(&mut ctx.rng);
            if !kind.is_slow() {
                break kind;
            }
        },
    }
}

/// Build the shell selected in settings
pub fn shell_from_config(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let choice = ctx.settings.shell;
    let kind = resolve_choice(ctx, choice);
    build_shell(ctx, kind, size)
}

fn pick(ctx: &mut SimContext, options: ColorOptions) -> Color {
    ctx.colors.pick(&mut ctx.rng, options)
}

fn any_color(ctx: &mut SimContext) -> Color {
    ctx.colors.any(&mut ctx.rng)
}

fn pistil_color(ctx: &mut SimContext, shell_color: Color) -> Color {
    ctx.colors.pistil_color(&mut ctx.rng, shell_color)
}

fn not_color(color: Color) -> ColorOptions {
    ColorOptions {
        not_color: Some(color),
        ..Default::default()
    }
}

fn shape_count(quality: Quality, low: usize, normal: usize, high: usize) -> usize {
    quality.select(low, normal, high)
}

fn crysanthemum(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let glitter = ctx.random() < 0.25;
    let single = ctx.random() < 0.72;
    let color = if single {
        ShellColor::Single(pick(ctx, LIMIT_WHITE))
    } else {
        let first = any_color(ctx);
        ShellColor::Pair(first, pick(ctx, NOT_SAME))
    };

    let pistil = match color {
        ShellColor::Single(c) if ctx.random() < 0.42 => Some(pistil_color(ctx, c)),
        _ => None,
    };

    let second_color = match color {
        ShellColor::Single(c) if ctx.random() < 0.2 || c == Color::White => match pistil {
            Some(p) => Some(p),
            None => Some(pick(
                ctx,
                ColorOptions {
                    not_color: Some(c),
                    limit_white: true,
                    ..Default::default()
                },
            )),
        },
        _ => None,
    };

    let streamers =
        pistil.is_none() && color != ShellColor::Single(Color::White) && ctx.random() < 0.42;

    let mut star_density = if glitter { 1.1 } else { 1.25 };
    match ctx.quality() {
        Quality::Low => star_density *= 0.8,
        Quality::High => star_density = 1.2,
        Quality::Normal => {}
    }

    let mut spec = ShellSpec::new(
        ShellKind::Crysanthemum,
        size,
        300.0 + size * 100.0,
        900.0 + size * 200.0,
        color,
    );
    spec.star_density = star_density;
    spec.second_color = second_color;
    spec.glitter = glitter.then_some(Glitter::Light);
    spec.glitter_color = ColorPicker::white_or_gold(&mut ctx.rng);
    spec.pistil = pistil;
    spec.streamers = streamers;
    spec
}

fn ghost(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let mut spec = crysanthemum(ctx, size);
    spec.kind = ShellKind::Ghost;
    // Ghost stars fade in late, so they need longer to be seen
    spec.star_life *= 1.5;
    let ghost_color = pick(ctx, not_color(Color::White));
    spec.streamers = true;
    spec.color = ShellColor::Single(Color::Invisible);
    spec.second_color = Some(ghost_color);
    // Invisible stars would still spew glitter
    spec.glitter = None;
    spec
}

fn strobe(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let color = pick(ctx, LIMIT_WHITE);
    let mut spec = ShellSpec::new(
        ShellKind::Strobe,
        size,
        280.0 + size * 92.0,
        1100.0 + size * 200.0,
        ShellColor::Single(color),
    );
    spec.star_life_variation = 0.4;
    spec.star_density = 1.1;
    spec.glitter = Some(Glitter::Light);
    spec.glitter_color = Color::White;
    spec.strobe = true;
    spec.strobe_color = (ctx.random() < 0.5).then_some(Color::White);
    let has_pistil = ctx.random() < 0.5;
    let pistil = pistil_color(ctx, color);
    spec.pistil = has_pistil.then_some(pistil);
    spec
}

fn palm(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let color = any_color(ctx);
    let thick = ctx.random() < 0.5;
    let mut spec = ShellSpec::new(
        ShellKind::Palm,
        size,
        250.0 + size * 75.0,
        1800.0 + size * 200.0,
        ShellColor::Single(color),
    );
    spec.star_density = if thick { 0.15 } else { 0.4 };
    spec.glitter = Some(if thick { Glitter::Thick } else { Glitter::Heavy });
    spec
}

fn ring(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let color = any_color(ctx);
    let has_pistil = ctx.random() < 0.75;
    let pistil = pistil_color(ctx, color);
    let mut spec = ShellSpec::new(
        ShellKind::Ring,
        size,
        300.0 + size * 100.0,
        900.0 + size * 200.0,
        ShellColor::Single(color),
    );
    spec.ring = true;
    spec.star_count = Some(2.2 * TAU * (size + 1.0));
    spec.pistil = has_pistil.then_some(pistil);
    spec.glitter = (!has_pistil).then_some(Glitter::Light);
    spec.glitter_color = if color == Color::Gold {
        Color::Gold
    } else {
        Color::White
    };
    spec.streamers = ctx.random() < 0.3;
    spec
}

fn crossette(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let color = pick(ctx, LIMIT_WHITE);
    let mut spec = ShellSpec::new(
        ShellKind::Crossette,
        size,
        300.0 + size * 100.0,
        750.0 + size * 160.0,
        ShellColor::Single(color),
    );
    spec.star_life_variation = 0.4;
    spec.star_density = 0.85;
    spec.crossette = true;
    let has_pistil = ctx.random() < 0.5;
    let pistil = pistil_color(ctx, color);
    spec.pistil = has_pistil.then_some(pistil);
    spec
}

fn floral(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let color = if ctx.random() < 0.65 {
        ShellColor::Random
    } else if ctx.random() < 0.15 {
        ShellColor::Single(any_color(ctx))
    } else {
        let first = any_color(ctx);
        ShellColor::Pair(first, pick(ctx, NOT_SAME))
    };
    let mut spec = ShellSpec::new(
        ShellKind::Floral,
        size,
        300.0 + size * 120.0,
        500.0 + size * 50.0,
        color,
    );
    spec.star_density = 0.12;
    spec.star_life_variation = 0.5;
    spec.floral = true;
    spec
}

fn falling_leaves(size: f32) -> ShellSpec {
    let mut spec = ShellSpec::new(
        ShellKind::FallingLeaves,
        size,
        300.0 + size * 120.0,
        500.0 + size * 50.0,
        ShellColor::Single(Color::Invisible),
    );
    spec.star_density = 0.12;
    spec.star_life_variation = 0.5;
    spec.glitter = Some(Glitter::Medium);
    spec.glitter_color = Color::Gold;
    spec.falling_leaves = true;
    spec
}

fn willow(size: f32) -> ShellSpec {
    let mut spec = ShellSpec::new(
        ShellKind::Willow,
        size,
        300.0 + size * 100.0,
        3000.0 + size * 300.0,
        ShellColor::Single(Color::Invisible),
    );
    spec.star_density = 0.6;
    spec.glitter = Some(Glitter::Willow);
    spec.glitter_color = Color::Gold;
    spec
}

fn crackle(ctx: &mut SimContext, size: f32) -> ShellSpec {
    // Mostly gold
    let color = if ctx.random() < 0.75 {
        Color::Gold
    } else {
        any_color(ctx)
    };
    let mut spec = ShellSpec::new(
        ShellKind::Crackle,
        size,
        380.0 + size * 75.0,
        600.0 + size * 100.0,
        ShellColor::Single(color),
    );
    spec.star_density = if ctx.quality() == Quality::Low { 0.65 } else { 1.0 };
    spec.star_life_variation = 0.32;
    spec.glitter = Some(Glitter::Light);
    spec.glitter_color = Color::Gold;
    spec.crackle = true;
    let has_pistil = ctx.random() < 0.65;
    let pistil = pistil_color(ctx, color);
    spec.pistil = has_pistil.then_some(pistil);
    spec
}

fn horsetail(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let color = any_color(ctx);
    let mut spec = ShellSpec::new(
        ShellKind::HorseTail,
        size,
        250.0 + size * 38.0,
        2500.0 + size * 300.0,
        ShellColor::Single(color),
    );
    spec.horsetail = true;
    spec.star_density = 0.9;
    spec.glitter = Some(Glitter::Medium);
    spec.glitter_color = if ctx.random() < 0.5 {
        ColorPicker::white_or_gold(&mut ctx.rng)
    } else {
        color
    };
    // White horsetails strobe
    spec.strobe = color == Color::White;
    spec
}

fn shaped(
    kind: ShellKind,
    size: f32,
    spread: f32,
    star_life: f32,
    color: Color,
    shape: ShapeSpec,
) -> ShellSpec {
    let mut spec = ShellSpec::new(kind, size, spread, star_life, ShellColor::Single(color));
    spec.star_life_variation = 0.2;
    spec.glitter = Some(Glitter::Light);
    spec.glitter_color = Color::White;
    spec.star_count = Some(shape.count as f32);
    spec.shape = Some(shape);
    spec
}

fn heart(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let shape = ShapeSpec {
        points: ctx.shapes.heart.clone(),
        rotation: ctx.random() * TAU,
        count: shape_count(ctx.quality(), 260, 400, 520),
    };
    shaped(
        ShellKind::Heart,
        size,
        260.0 + size * 90.0,
        1200.0 + size * 240.0,
        Color::Red,
        shape,
    )
}

fn star(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let color = pick(ctx, LIMIT_WHITE);
    let shape = ShapeSpec {
        points: ctx.shapes.star.clone(),
        rotation: ctx.random() * TAU,
        count: shape_count(ctx.quality(), 260, 420, 520),
    };
    shaped(
        ShellKind::Star,
        size,
        260.0 + size * 90.0,
        1100.0 + size * 220.0,
        color,
        shape,
    )
}

fn smiley(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let shape = ShapeSpec {
        points: ctx.shapes.smiley.clone(),
        rotation: ctx.random() * TAU,
        count: shape_count(ctx.quality(), 260, 420, 520),
    };
    shaped(
        ShellKind::Smiley,
        size,
        260.0 + size * 90.0,
        1150.0 + size * 220.0,
        Color::Gold,
        shape,
    )
}

fn text(ctx: &mut SimContext, size: f32) -> ShellSpec {
    let color = pick(ctx, LIMIT_WHITE);
    let burst_text = ctx.settings.text_burst.clone();
    let shape = ShapeSpec {
        points: ctx.shapes.text_points(&burst_text, DEFAULT_BURST_TEXT),
        rotation: 0.0,
        count: shape_count(ctx.quality(), 420, 700, 900),
    };
    shaped(
        ShellKind::Text,
        size,
        320.0 + size * 120.0,
        1300.0 + size * 260.0,
        color,
        shape,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use glam::Vec2;

    fn context(quality: Quality, seed: u64) -> SimContext {
        let settings = Settings {
            quality,
            ..Default::default()
        };
        SimContext::new(settings, Vec2::new(1280.0, 720.0), seed)
    }

    #[test]
    fn test_every_recipe_builds() {
        let mut ctx = context(Quality::Normal, 1);
        for kind in ShellKind::ALL {
            for size in [0.0, 1.0, 3.0, 5.0] {
                let spec = build_shell(&mut ctx, kind, size);
                assert_eq!(spec.kind, kind);
                assert!(spec.spread > 0.0);
                assert!(spec.star_life > 0.0);
                assert!(spec.burst_count() >= 1.0);
            }
        }
    }

    #[test]
    fn test_crysanthemum_parameters() {
        let mut ctx = context(Quality::Normal, 2);
        for _ in 0..200 {
            let spec = build_shell(&mut ctx, ShellKind::Crysanthemum, 1.0);
            assert_eq!(spec.spread, 400.0);
            assert_eq!(spec.star_life, 1100.0);
            assert!(spec.star_density == 1.1 || spec.star_density == 1.25);
            assert!(spec.glitter_color == Color::White || spec.glitter_color == Color::Gold);
            // Pistils only on single-colour shells, never alongside streamers
            if spec.pistil.is_some() {
                assert!(spec.color.single().is_some());
                assert!(!spec.streamers);
            }
            if let ShellColor::Pair(a, b) = spec.color {
                assert_ne!(a, b);
                assert!(spec.second_color.is_none());
            }
            if spec.color == ShellColor::Single(Color::White) {
                assert!(spec.second_color.is_some());
            }
        }
    }

    #[test]
    fn test_crysanthemum_density_by_quality() {
        let mut high = context(Quality::High, 3);
        assert_eq!(
            build_shell(&mut high, ShellKind::Crysanthemum, 2.0).star_density,
            1.2
        );
        let mut low = context(Quality::Low, 3);
        let density = build_shell(&mut low, ShellKind::Crysanthemum, 2.0).star_density;
        assert!((density - 0.88).abs() < 1e-6 || (density - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ghost_is_invisible_with_visible_second_color() {
        let mut ctx = context(Quality::Normal, 4);
        for _ in 0..100 {
            let spec = build_shell(&mut ctx, ShellKind::Ghost, 2.0);
            assert_eq!(spec.color, ShellColor::Single(Color::Invisible));
            let second = spec.second_color.unwrap();
            assert!(second.is_visible());
            assert_ne!(second, Color::White);
            assert!(spec.streamers);
            assert!(spec.glitter.is_none());
            assert_eq!(spec.star_life, (900.0 + 2.0 * 200.0) * 1.5);
        }
    }

    #[test]
    fn test_ring_star_count() {
        let mut ctx = context(Quality::Normal, 5);
        let spec = build_shell(&mut ctx, ShellKind::Ring, 2.0);
        assert!(spec.ring);
        assert!((spec.burst_count() - 2.2 * TAU * 3.0).abs() < 1e-3);
        assert_eq!(spec.glitter.is_some(), spec.pistil.is_none());
    }

    #[test]
    fn test_shaped_recipes() {
        let mut ctx = context(Quality::High, 6);
        let heart = build_shell(&mut ctx, ShellKind::Heart, 1.0);
        let shape = heart.shape.as_ref().unwrap();
        assert_eq!(shape.count, 520);
        assert_eq!(heart.color, ShellColor::Single(Color::Red));

        let text = build_shell(&mut ctx, ShellKind::Text, 1.0);
        let shape = text.shape.as_ref().unwrap();
        assert_eq!(shape.rotation, 0.0);
        assert_eq!(shape.count, 900);
        assert!(!shape.points.is_empty());
    }

    #[test]
    fn test_random_kind_favours_crysanthemum() {
        let mut ctx = context(Quality::Normal, 7);
        let n = 4000;
        let hits = (0..n)
            .filter(|_| random_kind(&mut ctx.rng) == ShellKind::Crysanthemum)
            .count();
        // 1/2 + 1/2 * 1/15
        let expected = n as f32 * (0.5 + 0.5 / 15.0);
        assert!((hits as f32 - expected).abs() < n as f32 * 0.05);
    }

    #[test]
    fn test_fast_kind_skips_slow_recipes() {
        let mut ctx = context(Quality::Normal, 8);
        for _ in 0..500 {
            assert!(!random_fast_kind(&mut ctx).is_slow());
        }
        ctx.settings.shell = ShellChoice::Kind(ShellKind::Willow);
        assert_eq!(random_fast_kind(&mut ctx), ShellKind::Willow);
    }
}
