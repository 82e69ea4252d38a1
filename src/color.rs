//! Star colours and random colour selection

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Every colour a star or spark can carry.
///
/// `Invisible` stars still get full physics (and may emit visible sparks);
/// they are simply skipped when drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
    Blue,
    Purple,
    Gold,
    White,
    Invisible,
}

impl Color {
    /// Number of colour buckets (visible colours plus `Invisible`)
    pub const COUNT: usize = 7;

    /// Colours that are drawn and that contribute to sky lighting
    pub const VISIBLE: [Color; 6] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Gold,
        Color::White,
    ];

    /// All buckets in update order
    pub const ALL: [Color; Self::COUNT] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Gold,
        Color::White,
        Color::Invisible,
    ];

    /// Bucket index
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_visible(self) -> bool {
        !matches!(self, Color::Invisible)
    }

    /// CSS hex code
    pub const fn hex(self) -> &'static str {
        match self {
            Color::Red => "#ff0043",
            Color::Green => "#14fc56",
            Color::Blue => "#1e7fff",
            Color::Purple => "#e60aff",
            Color::Gold => "#ffbf36",
            Color::White => "#ffffff",
            Color::Invisible => "#000000",
        }
    }

    /// 8-bit RGB components
    pub const fn rgb(self) -> [u8; 3] {
        match self {
            Color::Red => [0xff, 0x00, 0x43],
            Color::Green => [0x14, 0xfc, 0x56],
            Color::Blue => [0x1e, 0x7f, 0xff],
            Color::Purple => [0xe6, 0x0a, 0xff],
            Color::Gold => [0xff, 0xbf, 0x36],
            Color::White => [0xff, 0xff, 0xff],
            Color::Invisible => [0, 0, 0],
        }
    }
}

/// Constraints for [`ColorPicker::pick`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorOptions {
    /// Never repeat the previously picked colour
    pub not_same: bool,
    /// Never return this colour (ignored when `not_same` is set)
    pub not_color: Option<Color>,
    /// Re-roll white most of the time so it doesn't dominate
    pub limit_white: bool,
}

/// Random colour source that remembers its last pick
#[derive(Debug, Clone, Default)]
pub struct ColorPicker {
    last: Option<Color>,
}

impl ColorPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any visible colour, uniformly
    pub fn simple<R: Rng + ?Sized>(rng: &mut R) -> Color {
        Color::VISIBLE[rng.random_range(0..Color::VISIBLE.len())]
    }

    /// Gold or white with equal odds
    pub fn white_or_gold<R: Rng + ?Sized>(rng: &mut R) -> Color {
        if rng.random_bool(0.5) {
            Color::Gold
        } else {
            Color::White
        }
    }

    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R, options: ColorOptions) -> Color {
        let mut color = Self::simple(rng);

        if options.limit_white && color == Color::White && rng.random::<f32>() < 0.6 {
            color = Self::simple(rng);
        }

        if options.not_same {
            while Some(color) == self.last {
                color = Self::simple(rng);
            }
        } else if let Some(excluded) = options.not_color {
            while color == excluded {
                color = Self::simple(rng);
            }
        }

        self.last = Some(color);
        color
    }

    /// Unconstrained pick that still updates the "last colour" memory
    pub fn any<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Color {
        self.pick(rng, ColorOptions::default())
    }

    /// Contrasting colour for a pistil inside a shell of `shell_color`
    pub fn pistil_color<R: Rng + ?Sized>(&mut self, rng: &mut R, shell_color: Color) -> Color {
        if shell_color == Color::White || shell_color == Color::Gold {
            self.pick(
                rng,
                ColorOptions {
                    not_color: Some(shell_color),
                    ..Default::default()
                },
            )
        } else {
            Self::white_or_gold(rng)
        }
    }
}
