//! Watermark configuration types.
//!
//! This module defines the configuration record for a tiled text watermark:
//! - Text content, paint color and font
//! - Tilt angle and spacing between tile repetitions
//! - Tiling mode (single repeating tile or a pre-tiled full canvas)
//!
//! Field names are snake_case; the camelCase spellings (`isAlign`,
//! `fontSize`, ...) are accepted as aliases. The configuration is read-only
//! once a controller has been attached.

use super::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

// Default values
fn default_is_align() -> bool {
    true
}

fn default_color() -> String {
    "rgba(255, 255, 255, 0.2)".to_string()
}

fn default_font_size() -> f64 {
    25.0
}

fn default_font_type() -> String {
    "Arial".to_string()
}

fn default_degree() -> f64 {
    45.0
}

fn default_gap() -> f64 {
    100.0
}

/// Canvas size used for free-mode rendering until the first geometry
/// notification reports the container's real size.
pub const DEFAULT_CANVAS_SIZE: CanvasSize = CanvasSize {
    width: 500.0,
    height: 500.0,
};

/// Horizontal text alignment relative to the drawing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Start,
    Center,
    End,
}

impl TextAlign {
    /// Horizontal offset applied to a run of `width` pixels.
    pub fn offset(&self, width: f64) -> f64 {
        match self {
            Self::Start => 0.0,
            Self::Center => -width / 2.0,
            Self::End => -width,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Center => "center",
            Self::End => "end",
        }
    }
}

/// How the rendered image is laid out on the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    /// One small tile repeated by the background.
    Aligned,
    /// One container-sized image with every repetition baked in.
    Free,
}

impl TileMode {
    pub fn background_repeat(&self) -> BackgroundRepeat {
        match self {
            Self::Aligned => BackgroundRepeat::Repeat,
            Self::Free => BackgroundRepeat::NoRepeat,
        }
    }
}

/// Value written to the `background-repeat` style property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundRepeat {
    Repeat,
    NoRepeat,
}

impl BackgroundRepeat {
    pub fn as_css(&self) -> &'static str {
        match self {
            Self::Repeat => "repeat",
            Self::NoRepeat => "no-repeat",
        }
    }
}

impl fmt::Display for BackgroundRepeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_css())
    }
}

/// Container content-box size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        DEFAULT_CANVAS_SIZE
    }
}

/// Font used for drawing, equivalent to a canvas `"<size>px <family>"`
/// font shorthand.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    /// Font size in pixels (one em).
    pub size: f64,
    /// Comma-separated family list, e.g. `"Arial, sans-serif"`.
    pub family: String,
}

impl FontSpec {
    pub fn new(size: f64, family: impl Into<String>) -> Self {
        Self {
            size,
            family: family.into(),
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new(10.0, "sans-serif")
    }
}

impl fmt::Display for FontSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px {}", self.size, self.family)
    }
}

/// Tiled text watermark configuration.
///
/// ```yaml
/// watermark:
///   text: "CONFIDENTIAL"
///   isAlign: false
///   color: "rgba(0, 0, 0, 0.15)"
///   fontSize: 20
///   degree: -30
///   rowGap: 80
///   columnGap: 120
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Render a single repeating tile (true) or a pre-tiled canvas (false)
    #[serde(default = "default_is_align", alias = "isAlign")]
    pub is_align: bool,

    /// Text to render; an empty string disables the watermark
    #[serde(default)]
    pub text: String,

    /// Alignment of the text relative to its drawing point (default: start)
    #[serde(default, alias = "textAlign")]
    pub text_align: TextAlign,

    /// CSS paint color, normally translucent (default: "rgba(255, 255, 255, 0.2)")
    #[serde(default = "default_color")]
    pub color: String,

    /// Font size in pixels (default: 25)
    #[serde(default = "default_font_size", alias = "fontSize")]
    pub font_size: f64,

    /// Font family list (default: "Arial")
    #[serde(default = "default_font_type", alias = "fontType")]
    pub font_type: String,

    /// Tilt angle in degrees; the sign selects the tile translation (default: 45)
    #[serde(default = "default_degree")]
    pub degree: f64,

    /// Vertical spacing between repetitions in pixels (default: 100)
    #[serde(default = "default_gap", alias = "rowGap")]
    pub row_gap: f64,

    /// Horizontal spacing between repetitions in pixels (default: 100)
    #[serde(default = "default_gap", alias = "columnGap")]
    pub column_gap: f64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            is_align: default_is_align(),
            text: String::new(),
            text_align: TextAlign::default(),
            color: default_color(),
            font_size: default_font_size(),
            font_type: default_font_type(),
            degree: default_degree(),
            row_gap: default_gap(),
            column_gap: default_gap(),
        }
    }
}

impl WatermarkConfig {
    /// Configuration with the given text and default styling.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_align(mut self, is_align: bool) -> Self {
        self.is_align = is_align;
        self
    }

    pub fn with_text_align(mut self, text_align: TextAlign) -> Self {
        self.text_align = text_align;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_font_type(mut self, font_type: impl Into<String>) -> Self {
        self.font_type = font_type.into();
        self
    }

    pub fn with_degree(mut self, degree: f64) -> Self {
        self.degree = degree;
        self
    }

    pub fn with_gaps(mut self, row_gap: f64, column_gap: f64) -> Self {
        self.row_gap = row_gap;
        self.column_gap = column_gap;
        self
    }

    /// True when there is no text to render.
    pub fn is_inert(&self) -> bool {
        self.text.is_empty()
    }

    pub fn tile_mode(&self) -> TileMode {
        if self.is_align {
            TileMode::Aligned
        } else {
            TileMode::Free
        }
    }

    /// Tilt angle in radians.
    pub fn tilt_angle(&self) -> f64 {
        self.degree.to_radians()
    }

    pub fn font(&self) -> FontSpec {
        FontSpec::new(self.font_size, self.font_type.clone())
    }

    pub fn paint_color(&self) -> Result<Color, super::WatermarkError> {
        Color::parse(&self.color)
    }

    /// Validate the watermark configuration.
    pub fn validate(&self) -> Result<(), String> {
        // Check for NaN/Infinity and valid range
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(format!(
                "Watermark font_size must be a finite positive number, got {}",
                self.font_size
            ));
        }

        if !self.degree.is_finite() {
            return Err(format!(
                "Watermark degree must be a finite number, got {}",
                self.degree
            ));
        }

        for (name, gap) in [("row_gap", self.row_gap), ("column_gap", self.column_gap)] {
            if !gap.is_finite() || gap < 0.0 {
                return Err(format!(
                    "Watermark {} must be a finite non-negative number, got {}",
                    name, gap
                ));
            }
        }

        if self.font_type.trim().is_empty() {
            return Err("Watermark font_type cannot be empty".to_string());
        }

        Color::parse(&self.color).map_err(|_| {
            format!(
                "Watermark color must be a CSS color (hex, rgb() or rgba()), got '{}'",
                self.color
            )
        })?;

        Ok(())
    }
}
