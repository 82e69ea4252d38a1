//! Shell recipes and the launch/burst controller
//!
//! A [`ShellSpec`] describes one firework: how far it spreads, how long its
//! stars burn and which effects it carries. Recipes in [`recipes`] build
//! randomized specs per [`ShellKind`]; [`shell`] launches the comet and
//! bursts it into stars when the comet burns out.

pub mod recipes;
pub mod shell;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::settings::{Quality, SettingsError};
use crate::shapes::Shape;

pub use recipes::{build_shell, random_fast_kind, random_kind};
pub use shell::{burst, launch};

/// Every shell recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellKind {
    Crackle,
    Crossette,
    Crysanthemum,
    FallingLeaves,
    Floral,
    Ghost,
    HorseTail,
    Palm,
    Ring,
    Strobe,
    Willow,
    Heart,
    Smiley,
    Star,
    Text,
}

impl ShellKind {
    pub const ALL: [ShellKind; 15] = [
        ShellKind::Crackle,
        ShellKind::Crossette,
        ShellKind::Crysanthemum,
        ShellKind::FallingLeaves,
        ShellKind::Floral,
        ShellKind::Ghost,
        ShellKind::HorseTail,
        ShellKind::Palm,
        ShellKind::Ring,
        ShellKind::Strobe,
        ShellKind::Willow,
        ShellKind::Heart,
        ShellKind::Smiley,
        ShellKind::Star,
        ShellKind::Text,
    ];

    /// Display name, as shown in the shell menu
    pub fn name(&self) -> &'static str {
        match self {
            ShellKind::Crackle => "Crackle",
            ShellKind::Crossette => "Crossette",
            ShellKind::Crysanthemum => "Crysanthemum",
            ShellKind::FallingLeaves => "Falling Leaves",
            ShellKind::Floral => "Floral",
            ShellKind::Ghost => "Ghost",
            ShellKind::HorseTail => "Horse Tail",
            ShellKind::Palm => "Palm",
            ShellKind::Ring => "Ring",
            ShellKind::Strobe => "Strobe",
            ShellKind::Willow => "Willow",
            ShellKind::Heart => "Heart",
            ShellKind::Smiley => "Smiley",
            ShellKind::Star => "Star",
            ShellKind::Text => "Text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Recipes too heavy for rapid-fire sequences
    pub fn is_slow(&self) -> bool {
        matches!(
            self,
            ShellKind::FallingLeaves | ShellKind::Floral | ShellKind::Willow | ShellKind::Text
        )
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shell type selected in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShellChoice {
    #[default]
    Random,
    Kind(ShellKind),
}

impl ShellChoice {
    pub fn parse(name: &str) -> Result<Self, SettingsError> {
        if name == "Random" {
            return Ok(ShellChoice::Random);
        }
        ShellKind::from_name(name)
            .map(ShellChoice::Kind)
            .ok_or_else(|| SettingsError::UnknownShell(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShellChoice::Random => "Random",
            ShellChoice::Kind(kind) => kind.name(),
        }
    }
}

impl TryFrom<String> for ShellChoice {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShellChoice> for String {
    fn from(choice: ShellChoice) -> Self {
        choice.name().to_string()
    }
}

/// Star colouring of a shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellColor {
    Single(Color),
    /// Half the stars in each colour
    Pair(Color, Color),
    /// Every star picks its own colour
    Random,
}

impl ShellColor {
    /// The single colour, if there is one
    pub fn single(&self) -> Option<Color> {
        match self {
            ShellColor::Single(color) => Some(*color),
            _ => None,
        }
    }
}

/// Spark trail emitted by burst stars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glitter {
    Light,
    Medium,
    Heavy,
    Thick,
    Streamer,
    Willow,
}

/// Spark emission settings for a star
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparkParams {
    /// Emission interval in ms (before the burn-rate stretch)
    pub freq: f32,
    pub speed: f32,
    pub life: f32,
    pub life_variation: f32,
}

impl Glitter {
    pub fn params(&self, quality: Quality) -> SparkParams {
        let q = quality.factor();
        let (freq, speed, life, life_variation) = match self {
            Glitter::Light => (400.0, 0.3, 300.0, 2.0),
            Glitter::Medium => (200.0, 0.44, 700.0, 2.0),
            Glitter::Heavy => (80.0, 0.8, 1400.0, 2.0),
            Glitter::Thick => (16.0, quality.select(1.5, 1.5, 1.65), 1400.0, 3.0),
            Glitter::Streamer => (32.0, 1.05, 620.0, 2.0),
            Glitter::Willow => (120.0, 0.34, 1400.0, 3.8),
        };
        SparkParams {
            freq: freq / q,
            speed,
            life,
            life_variation,
        }
    }
}

/// Points a shaped burst lays its stars along
#[derive(Debug, Clone)]
pub struct ShapeSpec {
    /// Normalized points in `[-1, 1]`
    pub points: Shape,
    pub rotation: f32,
    /// Stars to place along the shape
    pub count: usize,
}

/// One firework, consumed once by the burst
#[derive(Debug, Clone)]
pub struct ShellSpec {
    pub kind: ShellKind,
    /// Size tier the recipe was built for
    pub size: f32,
    /// Burst diameter in px
    pub spread: f32,
    /// Base star life in ms
    pub star_life: f32,
    /// Extra random life as a fraction of `star_life`
    pub star_life_variation: f32,
    pub star_density: f32,
    /// Overrides the density-derived count
    pub star_count: Option<f32>,
    pub color: ShellColor,
    pub second_color: Option<Color>,
    pub glitter: Option<Glitter>,
    pub glitter_color: Color,
    pub pistil: Option<Color>,
    pub streamers: bool,
    pub strobe: bool,
    pub strobe_color: Option<Color>,
    pub crossette: bool,
    pub crackle: bool,
    pub floral: bool,
    pub falling_leaves: bool,
    pub horsetail: bool,
    pub ring: bool,
    pub shape: Option<ShapeSpec>,
}

impl ShellSpec {
    /// A plain single-colour shell; recipes fill in the rest
    pub fn new(kind: ShellKind, size: f32, spread: f32, star_life: f32, color: ShellColor) -> Self {
        let glitter_color = color.single().unwrap_or(Color::White);
        Self {
            kind,
            size: size.max(0.0),
            spread: spread.max(0.0),
            star_life: star_life.max(0.0),
            star_life_variation: 0.125,
            star_density: 1.0,
            star_count: None,
            color,
            second_color: None,
            glitter: None,
            glitter_color,
            pistil: None,
            streamers: false,
            strobe: false,
            strobe_color: None,
            crossette: false,
            crackle: false,
            floral: false,
            falling_leaves: false,
            horsetail: false,
            ring: false,
            shape: None,
        }
    }

    /// Stars in the main burst, never fewer than six
    pub fn burst_count(&self) -> f32 {
        match self.star_count {
            Some(count) => count.max(1.0),
            None => {
                let per_spread = self.spread / 54.0;
                (per_spread * per_spread * self.star_density).max(6.0)
            }
        }
    }

    /// Initial speed of burst stars
    pub fn burst_speed(&self) -> f32 {
        self.spread / 96.0
    }

    /// Colour of the rising comet
    pub fn comet_color(&self) -> Color {
        self.color.single().unwrap_or(Color::White)
    }
}
