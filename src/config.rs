//! Widget configuration.
//!
//! Every fixed constant of the preview pipeline (sizes, colors, error correction level,
//! timeouts and download filenames) lives in [`WidgetConfig`]. The defaults reproduce the
//! stock widget; a TOML file may override any subset of them.
//!
//! ```rust
//! use qirust_preview::config::WidgetConfig;
//!
//! let config = WidgetConfig::from_toml_str("export_size = 512\ncolor_dark = \"#000\"").unwrap();
//! assert_eq!(config.export_size, 512);
//! assert_eq!(config.preview_size, 200);
//! ```

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating a [`WidgetConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("jpeg_quality must be between 1 and 100, got {0}")]
    JpegQuality(u8),
}

/// An RGBA color parsed from CSS-style hex notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);

    pub fn rgba(self) -> [u8; 4] {
        self.0
    }

    pub fn is_opaque(self) -> bool {
        self.0[3] == 255
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and `transparent`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor(s.to_string());
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("transparent") {
            return Ok(Color::TRANSPARENT);
        }
        let hex = trimmed.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize, len: usize| {
            u8::from_str_radix(&hex[i..i + len], 16).map_err(|_| invalid())
        };
        match hex.len() {
            3 => {
                let mut out = [0u8; 4];
                for (i, slot) in out.iter_mut().take(3).enumerate() {
                    *slot = channel(i, 1)? * 17;
                }
                out[3] = 255;
                Ok(Color(out))
            }
            6 => Ok(Color([channel(0, 2)?, channel(2, 2)?, channel(4, 2)?, 255])),
            8 => Ok(Color([channel(0, 2)?, channel(2, 2)?, channel(4, 2)?, channel(6, 2)?])),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Error correction tier handed to the symbol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectLevel {
    Low,
    Medium,
    Quartile,
    /// Highest redundancy, lowest capacity.
    #[default]
    High,
}

/// The kind of output the engine leaves behind in its target container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    /// A raw RGBA pixel surface (canvas).
    Surface,
    /// An already encoded PNG image (img element with a data URL source).
    #[default]
    Element,
}

/// Configuration of the preview widget.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WidgetConfig {
    /// Edge length of the on-screen preview in pixels.
    pub preview_size: u32,
    /// Edge length of exported images in pixels.
    pub export_size: u32,
    /// Module (foreground) color.
    pub color_dark: Color,
    /// Background color. May be translucent.
    pub color_light: Color,
    pub correct_level: CorrectLevel,
    pub primitive: Primitive,
    /// Upper bound on a single render; exceeding it fails the render.
    pub settle_timeout_ms: u64,
    /// How long a feedback tip stays visible.
    pub tip_duration_ms: u64,
    pub png_filename: String,
    pub jpg_filename: String,
    pub jpeg_quality: u8,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            preview_size: 200,
            export_size: 1024,
            color_dark: Color([0x22, 0x22, 0x22, 255]),
            color_light: Color::WHITE,
            correct_level: CorrectLevel::High,
            primitive: Primitive::Element,
            settle_timeout_ms: 5000,
            tip_duration_ms: 1200,
            png_filename: "qrcode.png".to_string(),
            jpg_filename: "qrcode.jpg".to_string(),
            jpeg_quality: 92,
        }
    }
}

impl WidgetConfig {
    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: WidgetConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview_size == 0 {
            return Err(ConfigError::Zero { field: "preview_size" });
        }
        if self.export_size == 0 {
            return Err(ConfigError::Zero { field: "export_size" });
        }
        if self.settle_timeout_ms == 0 {
            return Err(ConfigError::Zero { field: "settle_timeout_ms" });
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::JpegQuality(self.jpeg_quality));
        }
        Ok(())
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn tip_duration(&self) -> Duration {
        Duration::from_millis(self.tip_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!("#222".parse::<Color>().unwrap(), Color([0x22, 0x22, 0x22, 255]));
        assert_eq!("#fFfFfF".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("#ffffff00".parse::<Color>().unwrap(), Color([255, 255, 255, 0]));
        assert_eq!("transparent".parse::<Color>().unwrap(), Color::TRANSPARENT);
        assert!("222222".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_display() {
        assert_eq!(Color([0x22, 0x22, 0x22, 255]).to_string(), "#222222");
        assert_eq!(Color::TRANSPARENT.to_string(), "#00000000");
    }

    #[test]
    fn test_defaults_match_stock_widget() {
        let config = WidgetConfig::default();
        assert_eq!(config.preview_size, 200);
        assert_eq!(config.export_size, 1024);
        assert_eq!(config.correct_level, CorrectLevel::High);
        assert_eq!(config.png_filename, "qrcode.png");
        assert_eq!(config.jpg_filename, "qrcode.jpg");
        assert_eq!(config.tip_duration(), Duration::from_millis(1200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_overrides() {
        let config = WidgetConfig::from_toml_str(
            r#"
            color_light = "transparent"
            primitive = "surface"
            correct_level = "low"
            "#,
        )
        .unwrap();
        assert_eq!(config.color_light, Color::TRANSPARENT);
        assert_eq!(config.primitive, Primitive::Surface);
        assert_eq!(config.correct_level, CorrectLevel::Low);
        assert_eq!(config.export_size, 1024);
    }

    #[test]
    fn test_toml_rejects_invalid_values() {
        assert!(matches!(
            WidgetConfig::from_toml_str("export_size = 0"),
            Err(ConfigError::Zero { field: "export_size" })
        ));
        assert!(matches!(
            WidgetConfig::from_toml_str("jpeg_quality = 0"),
            Err(ConfigError::JpegQuality(0))
        ));
        assert!(WidgetConfig::from_toml_str("color_dark = \"red\"").is_err());
        assert!(WidgetConfig::from_toml_str("unknown_key = 1").is_err());
    }
}
