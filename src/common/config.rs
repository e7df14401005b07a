//! Host configuration: persisted user settings, text measurement and the
//! working-directory seam for media lookups.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Ceiling on the length of a single expression, in characters.
///
/// Oversized expressions are replaced by a warning cell instead of being
/// parsed; `Unlimited` disables the check.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MaxLength {
    Shortest,
    Short,
    #[default]
    Standard,
    Long,
    Unlimited,
}

impl MaxLength {
    /// Character limit for this tier; `None` means no limit.
    pub fn char_limit(self) -> Option<usize> {
        match self {
            MaxLength::Shortest => Some(6_000),
            MaxLength::Short => Some(20_000),
            MaxLength::Standard => Some(50_000),
            MaxLength::Long => Some(250_000),
            MaxLength::Unlimited => None,
        }
    }
}

/// User settings a host application persists between sessions.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Length tier above which an expression is replaced by a warning cell.
    pub max_displayed_length: MaxLength,
    /// In TeX output of a cell that carries both a subscript and a
    /// superscript, place the exponent after the subscript group instead of
    /// stacking both on the base.
    pub tex_exponents_after_subscript: bool,
    /// Ratio between logical pixels and device pixels.
    pub device_scale: f64,
    /// Base font size used when the caller does not pass one.
    pub default_font_size: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_displayed_length: MaxLength::Standard,
            tex_exponents_after_subscript: false,
            device_scale: 1.0,
            default_font_size: 12,
        }
    }
}

/// Measures rendered text. The painting toolkit lives outside this crate, so
/// layout asks the host for extents through this trait.
pub trait FontMetrics {
    /// Width and height of `text` drawn at `font_size`, in logical pixels.
    fn text_extent(&self, text: &str, font_size: i32) -> (i32, i32);
}

/// Deterministic fixed-pitch metrics; the default when the host does not
/// supply real ones, and the measurement source for layout tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceMetrics;

impl FontMetrics for MonospaceMetrics {
    fn text_extent(&self, text: &str, font_size: i32) -> (i32, i32) {
        let advance = (font_size / 2).max(1);
        let chars = text.chars().count() as i32;
        (chars * advance, font_size + 2)
    }
}

/// Everything the parser, layout pass and exporters need from the host:
/// persisted [`Settings`], a [`FontMetrics`] implementation, and the
/// directory media paths resolve against.
pub struct Configuration {
    pub settings: Settings,
    metrics: Box<dyn FontMetrics>,
    working_directory: PathBuf,
}

impl Configuration {
    pub fn new() -> Self {
        Self::with_metrics(Box::new(MonospaceMetrics))
    }

    pub fn with_metrics(metrics: Box<dyn FontMetrics>) -> Self {
        Configuration {
            settings: Settings::default(),
            metrics,
            working_directory: PathBuf::from("."),
        }
    }

    /// Width and height of `text` at `font_size`, per the host's metrics.
    pub fn text_extent(&self, text: &str, font_size: i32) -> (i32, i32) {
        self.metrics.text_extent(text, font_size)
    }

    /// Scales a logical amount to device pixels, never below one pixel.
    pub fn scale_px(&self, amount: f64) -> i32 {
        let scaled = amount * self.settings.device_scale;
        if scaled < 1.0 { 1 } else { scaled.round() as i32 }
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn set_working_directory(&mut self, dir: impl Into<PathBuf>) {
        self.working_directory = dir.into();
    }

    /// Resolves a media file name against the working directory.
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        self.working_directory.join(name)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("settings", &self.settings)
            .field("working_directory", &self.working_directory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_tiers() {
        assert_eq!(MaxLength::Shortest.char_limit(), Some(6_000));
        assert_eq!(MaxLength::Short.char_limit(), Some(20_000));
        assert_eq!(MaxLength::Standard.char_limit(), Some(50_000));
        assert_eq!(MaxLength::Long.char_limit(), Some(250_000));
        assert_eq!(MaxLength::Unlimited.char_limit(), None);
    }

    #[test]
    fn scale_px_floors_at_one() {
        let cfg = Configuration::new();
        assert_eq!(cfg.scale_px(0.1), 1);
        assert_eq!(cfg.scale_px(2.4), 2);
    }

    #[test]
    fn monospace_metrics_scale_with_length_and_size() {
        let m = MonospaceMetrics;
        let (w1, h) = m.text_extent("ab", 12);
        let (w2, _) = m.text_extent("abcd", 12);
        assert_eq!(w2, 2 * w1);
        assert_eq!(h, 14);
    }
}
