//! Show settings
//!
//! The host owns these (menus, storage); the core only reads them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shells::ShellChoice;

/// Errors raised while reading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown shell type `{0}`")]
    UnknownShell(String),
    #[error("invalid value `{value}` for {name}")]
    InvalidArgument { name: String, value: String },
}

/// Graphics quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Quality {
    Low,
    #[default]
    Normal,
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "Low",
            Quality::Normal => "Normal",
            Quality::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" | "1" => Some(Quality::Low),
            "normal" | "medium" | "2" => Some(Quality::Normal),
            "high" | "3" => Some(Quality::High),
            _ => None,
        }
    }

    /// Numeric tier (1-3); spark emission intervals are divided by this
    pub fn factor(&self) -> f32 {
        match self {
            Quality::Low => 1.0,
            Quality::Normal => 2.0,
            Quality::High => 3.0,
        }
    }

    /// Pick a per-tier value
    pub fn select<T>(&self, low: T, normal: T, high: T) -> T {
        match self {
            Quality::Low => low,
            Quality::Normal => normal,
            Quality::High => high,
        }
    }

    /// Upper bound on live stars before spawns are dropped
    pub fn max_stars(&self) -> usize {
        self.select(8_000, 16_000, 32_000)
    }

    /// Upper bound on live sparks before spawns are dropped
    pub fn max_sparks(&self) -> usize {
        self.select(20_000, 40_000, 80_000)
    }
}

/// How strongly bursts light up the background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SkyLighting {
    None,
    Dim,
    #[default]
    Normal,
}

impl SkyLighting {
    /// Maximum RGB channel value of the sky colour
    pub fn max_saturation(&self) -> f32 {
        match self {
            SkyLighting::None => 0.0,
            SkyLighting::Dim => 15.0,
            SkyLighting::Normal => 30.0,
        }
    }
}

/// Show settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality tier
    pub quality: Quality,
    /// Shell type launched by taps and auto-fire
    pub shell: ShellChoice,
    /// Shell size tier (0 = 3", 5 = 16")
    pub size: f32,
    pub sky_lighting: SkyLighting,
    /// Fire sequences automatically
    pub auto_launch: bool,
    /// Rapid-fire finale mode (only with auto launch)
    pub finale: bool,
    /// Keep trails around much longer, like an open camera shutter
    pub long_exposure: bool,
    /// Zoom applied to the whole stage
    pub scale_factor: f32,
    /// Text for the Text shell and the drone text formation
    pub text_burst: String,
    /// Run the drone formation show
    pub drone_show: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: Quality::Normal,
            shell: ShellChoice::Random,
            size: 3.0,
            sky_lighting: SkyLighting::Normal,
            auto_launch: true,
            finale: false,
            long_exposure: false,
            scale_factor: 1.0,
            text_burst: "WOW 2026".to_string(),
            drone_show: false,
        }
    }
}

impl Settings {
    /// Largest selectable shell size
    pub const MAX_SIZE: f32 = 5.0;

    /// Shell size clamped to the selectable range
    pub fn shell_size(&self) -> f32 {
        self.size.clamp(0.0, Self::MAX_SIZE)
    }

    /// Scale factor, never zero or negative
    pub fn scale(&self) -> f32 {
        self.scale_factor.max(0.1)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file (native only)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shells::ShellKind;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.quality, Quality::Normal);
        assert_eq!(settings.shell, ShellChoice::Random);
        assert!(settings.auto_launch);
        assert!(!settings.finale);
        assert_eq!(settings.text_burst, "WOW 2026");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings =
            Settings::from_json(r#"{ "quality": "High", "shell": "Horse Tail", "size": 9 }"#)
                .unwrap();
        assert_eq!(settings.quality, Quality::High);
        assert_eq!(settings.shell, ShellChoice::Kind(ShellKind::HorseTail));
        assert_eq!(settings.shell_size(), Settings::MAX_SIZE);
        assert!(settings.auto_launch);
    }

    #[test]
    fn test_unknown_shell_is_an_error() {
        let err = Settings::from_json(r#"{ "shell": "Sparkler" }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let mut settings = Settings::default();
        settings.shell = ShellChoice::Kind(ShellKind::Text);
        settings.drone_show = true;
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!(Quality::parse("LOW"), Some(Quality::Low));
        assert_eq!(Quality::parse("3"), Some(Quality::High));
        assert_eq!(Quality::parse("ultra"), None);
        assert_eq!(Quality::High.factor(), 3.0);
    }
}
