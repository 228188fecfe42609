//! Output format mode and canvas resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Requested output format for a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormatMode {
    /// 1080x1920 portrait canvas
    #[default]
    Vertical,
    /// 1920x1080 landscape canvas
    Horizontal,
    /// Canvas chosen from the majority aspect ratio of the inputs
    Auto,
}

impl fmt::Display for FormatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FormatMode::Vertical => "vertical",
            FormatMode::Horizontal => "horizontal",
            FormatMode::Auto => "auto",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for FormatMode {
    type Err = FormatModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vertical" => Ok(FormatMode::Vertical),
            "horizontal" => Ok(FormatMode::Horizontal),
            "auto" => Ok(FormatMode::Auto),
            _ => Err(FormatModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown format mode: {0}")]
pub struct FormatModeParseError(String);

/// Aspect-ratio classification of a source clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectClass {
    /// 9:16 range, ready for vertical social platforms
    VerticalSocial,
    /// 16:9 range
    HorizontalStandard,
    /// Roughly 1:1
    Square,
    /// Wider than 1.8:1
    UltraWide,
    /// Anything else
    Custom,
}

impl AspectClass {
    /// Classify a clip by its native dimensions.
    pub fn classify(width: u32, height: u32) -> Self {
        if height == 0 {
            return AspectClass::Custom;
        }
        let ratio = width as f64 / height as f64;
        if (0.5..=0.6).contains(&ratio) {
            AspectClass::VerticalSocial
        } else if (1.7..=1.8).contains(&ratio) {
            AspectClass::HorizontalStandard
        } else if (0.9..=1.1).contains(&ratio) {
            AspectClass::Square
        } else if ratio > 1.8 {
            AspectClass::UltraWide
        } else {
            AspectClass::Custom
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AspectClass::VerticalSocial => "Vertical (Social Media Ready)",
            AspectClass::HorizontalStandard => "Horizontal (Standard)",
            AspectClass::Square => "Square",
            AspectClass::UltraWide => "Ultra-wide",
            AspectClass::Custom => "Custom aspect ratio",
        }
    }
}

/// Resolved output resolution for a compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
}

impl CanvasSpec {
    /// 1080x1920 portrait preset.
    pub const VERTICAL: CanvasSpec = CanvasSpec {
        width: 1080,
        height: 1920,
    };

    /// 1920x1080 landscape preset.
    pub const HORIZONTAL: CanvasSpec = CanvasSpec {
        width: 1920,
        height: 1080,
    };

    /// Canvas aspect ratio (width / height).
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Resolve the session canvas from the format mode and input aspect
    /// classes. Called once, before any clip is normalized.
    ///
    /// In `Auto` mode: if at least half of the inputs are vertical-social the
    /// canvas is vertical; otherwise if at least half are horizontal-standard
    /// it is horizontal; mixed sets fall back to vertical.
    pub fn resolve(mode: FormatMode, inputs: &[AspectClass]) -> CanvasSpec {
        match mode {
            FormatMode::Vertical => CanvasSpec::VERTICAL,
            FormatMode::Horizontal => CanvasSpec::HORIZONTAL,
            FormatMode::Auto => {
                let half = inputs.len() as f64 / 2.0;
                let vertical = inputs
                    .iter()
                    .filter(|c| **c == AspectClass::VerticalSocial)
                    .count() as f64;
                let horizontal = inputs
                    .iter()
                    .filter(|c| **c == AspectClass::HorizontalStandard)
                    .count() as f64;

                if vertical >= half {
                    CanvasSpec::VERTICAL
                } else if horizontal >= half {
                    CanvasSpec::HORIZONTAL
                } else {
                    CanvasSpec::VERTICAL
                }
            }
        }
    }
}

impl fmt::Display for CanvasSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_standard_ratios() {
        assert_eq!(AspectClass::classify(1080, 1920), AspectClass::VerticalSocial);
        assert_eq!(AspectClass::classify(1920, 1080), AspectClass::HorizontalStandard);
        assert_eq!(AspectClass::classify(1000, 1000), AspectClass::Square);
        assert_eq!(AspectClass::classify(2560, 1080), AspectClass::UltraWide);
        assert_eq!(AspectClass::classify(1350, 1080), AspectClass::Custom);
        assert_eq!(AspectClass::classify(100, 0), AspectClass::Custom);
    }

    #[test]
    fn test_fixed_mode_ignores_inputs() {
        let inputs = [AspectClass::HorizontalStandard; 3];
        assert_eq!(
            CanvasSpec::resolve(FormatMode::Vertical, &inputs),
            CanvasSpec::VERTICAL
        );
        assert_eq!(
            CanvasSpec::resolve(FormatMode::Horizontal, &[]),
            CanvasSpec::HORIZONTAL
        );
    }

    #[test]
    fn test_auto_majority_vertical() {
        // Two 9:16 clips against one 16:9 clip resolve vertical
        let inputs = [
            AspectClass::VerticalSocial,
            AspectClass::VerticalSocial,
            AspectClass::HorizontalStandard,
        ];
        assert_eq!(
            CanvasSpec::resolve(FormatMode::Auto, &inputs),
            CanvasSpec::VERTICAL
        );
    }

    #[test]
    fn test_auto_majority_horizontal() {
        let inputs = [
            AspectClass::HorizontalStandard,
            AspectClass::HorizontalStandard,
            AspectClass::VerticalSocial,
        ];
        assert_eq!(
            CanvasSpec::resolve(FormatMode::Auto, &inputs),
            CanvasSpec::HORIZONTAL
        );
    }

    #[test]
    fn test_auto_mixed_defaults_vertical() {
        let inputs = [
            AspectClass::Square,
            AspectClass::UltraWide,
            AspectClass::Custom,
        ];
        assert_eq!(
            CanvasSpec::resolve(FormatMode::Auto, &inputs),
            CanvasSpec::VERTICAL
        );
    }

    #[test]
    fn test_auto_even_split_prefers_vertical() {
        let inputs = [AspectClass::VerticalSocial, AspectClass::HorizontalStandard];
        assert_eq!(
            CanvasSpec::resolve(FormatMode::Auto, &inputs),
            CanvasSpec::VERTICAL
        );
    }

    #[test]
    fn test_format_mode_parsing() {
        assert_eq!("vertical".parse::<FormatMode>().unwrap(), FormatMode::Vertical);
        assert_eq!("AUTO".parse::<FormatMode>().unwrap(), FormatMode::Auto);
        assert!("keep_original".parse::<FormatMode>().is_err());
    }
}
