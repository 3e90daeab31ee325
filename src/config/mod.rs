// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::watermark::{CanvasSize, FontBook, WatermarkConfig, WatermarkError};

fn default_container_size() -> f64 {
    500.0
}

fn default_viewport_width() -> f64 {
    crate::host::DEFAULT_VIEWPORT_WIDTH
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub container: ContainerConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub fonts: FontConfig,
}

/// Container size used when rendering a free-mode image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerConfig {
    #[serde(default = "default_container_size")]
    pub width: f64,
    #[serde(default = "default_container_size")]
    pub height: f64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            width: default_container_size(),
            height: default_container_size(),
        }
    }
}

impl ContainerConfig {
    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize::new(self.width, self.height)
    }
}

/// Viewport metrics bounding free-mode tiling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewportConfig {
    #[serde(default = "default_viewport_width")]
    pub width: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_viewport_width(),
        }
    }
}

/// Font lookup options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FontConfig {
    /// Resolve families against installed system fonts (default: false)
    #[serde(default)]
    pub system_fonts: bool,
    /// Font file used when a family cannot be resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<PathBuf>,
}

impl FontConfig {
    /// Build the font book described by this configuration.
    pub fn font_book(&self) -> Result<FontBook, WatermarkError> {
        let mut book = FontBook::new();
        if self.system_fonts {
            book = book.with_system_fonts();
        }
        if let Some(path) = &self.fallback {
            book = book.with_fallback_file(path)?;
        }
        Ok(book)
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.watermark
            .validate()
            .map_err(|e| format!("watermark: {}", e))?;

        for (name, value) in [
            ("container.width", self.container.width),
            ("container.height", self.container.height),
            ("viewport.width", self.viewport.width),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                ));
            }
        }

        if let Some(path) = &self.fonts.fallback {
            if !path.is_file() {
                return Err(format!(
                    "fonts.fallback '{}' does not exist or is not a file",
                    path.display()
                ));
            }
        }

        Ok(())
    }
}
