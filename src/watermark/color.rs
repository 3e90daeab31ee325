//! CSS paint color parsing.
//!
//! Watermark colors are given the way a canvas `fillStyle` would receive
//! them and are expected to carry alpha for translucency.
//!
//! # Supported syntax
//!
//! - `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`
//! - `rgb(255, 0, 0)`, `rgba(255, 255, 255, 0.2)`
//! - `rgb(255 255 255 / 20%)`
//! - a handful of named colors (`white`, `black`, `transparent`, ...)

use super::{Result, WatermarkError};
use std::fmt;

/// RGBA paint color. Channels are 0-255, alpha is 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Opaque black, the canvas default fill.
    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0.0)
    }

    /// Parse a CSS color string.
    pub fn parse(input: &str) -> Result<Self> {
        let value = input.trim();
        let invalid = || WatermarkError::ColorError(input.to_string());

        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }

        let lower = value.to_ascii_lowercase();
        if let Some(args) = functional_args(&lower, "rgba").or_else(|| functional_args(&lower, "rgb"))
        {
            return parse_rgb_args(args).ok_or_else(invalid);
        }

        named(&lower).ok_or_else(invalid)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color::new(
            nibble(0)?,
            nibble(1)?,
            nibble(2)?,
            nibble(3)? as f32 / 255.0,
        )),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::new(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            byte(6)? as f32 / 255.0,
        )),
        _ => None,
    }
}

fn functional_args<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    value
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    // Either "r, g, b[, a]" or "r g b[ / a]"
    let (channels, alpha): (Vec<&str>, Option<&str>) = if args.contains(',') {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        match parts.len() {
            3 => (parts, None),
            4 => (parts[..3].to_vec(), Some(parts[3])),
            _ => return None,
        }
    } else {
        let (rgb, alpha) = match args.split_once('/') {
            Some((rgb, alpha)) => (rgb, Some(alpha.trim())),
            None => (args, None),
        };
        let parts: Vec<&str> = rgb.split_whitespace().collect();
        if parts.len() != 3 {
            return None;
        }
        (parts, alpha)
    };

    let channel = |s: &str| -> Option<u8> {
        let v = match s.strip_suffix('%') {
            Some(pct) => pct.trim().parse::<f32>().ok()? * 2.55,
            None => s.parse::<f32>().ok()?,
        };
        v.is_finite().then(|| v.round().clamp(0.0, 255.0) as u8)
    };

    let alpha = match alpha {
        Some(a) => {
            let v = match a.strip_suffix('%') {
                Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
                None => a.parse::<f32>().ok()?,
            };
            if !v.is_finite() {
                return None;
            }
            v.clamp(0.0, 1.0)
        }
        None => 1.0,
    };

    Some(Color::new(
        channel(channels[0])?,
        channel(channels[1])?,
        channel(channels[2])?,
        alpha,
    ))
}

fn named(value: &str) -> Option<Color> {
    match value {
        "transparent" => Some(Color::transparent()),
        "black" => Some(Color::black()),
        "white" => Some(Color::white()),
        "red" => Some(Color::rgb(255, 0, 0)),
        "green" => Some(Color::rgb(0, 128, 0)),
        "blue" => Some(Color::rgb(0, 0, 255)),
        "gray" | "grey" => Some(Color::rgb(128, 128, 128)),
        _ => None,
    }
}
