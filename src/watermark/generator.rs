//! Tile image generation.
//!
//! Two algorithms turn a [`WatermarkConfig`] into an image `data:` URL:
//!
//! - **Aligned** ([`render_aligned_tile`]): one small tile holding a single
//!   tilted copy of the text, meant to be repeated by the background.
//! - **Free** ([`render_free_tile`]): a container-sized image with every
//!   repetition already drawn, applied without repetition.
//!
//! Both only use the [`SurfaceFactory`]/[`Surface`] capability, so the same
//! code runs against the software rasterizer or any host-provided canvas.
//!
//! # Example
//!
//! ```ignore
//! use sukashi::watermark::{render_aligned_tile, RasterSurfaceFactory, WatermarkConfig};
//!
//! let config = WatermarkConfig::new("SECRET").with_font_size(20.0);
//! let tile = render_aligned_tile(&config, &RasterSurfaceFactory::new())?;
//! println!("background-image: {}", tile.css_url());
//! ```

use super::config::{CanvasSize, TileMode, WatermarkConfig};
use super::position::{scan_grid, ScanEnvelope};
use super::surface::{
    canvas_dimension, SurfaceFactory, DEFAULT_SURFACE_HEIGHT, DEFAULT_SURFACE_WIDTH,
};
use super::{Result, WatermarkError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// A rendered watermark image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    /// Self-contained image URL (`data:image/png;base64,...`).
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

impl TileImage {
    /// Value for the `background-image` style property.
    pub fn css_url(&self) -> String {
        format!("url({})", self.data_url)
    }

    /// Decoded PNG bytes of a base64 PNG data URL.
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let payload = self
            .data_url
            .strip_prefix("data:image/png;base64,")
            .ok_or_else(|| {
                WatermarkError::EncodeError(format!(
                    "{}x{} image has no PNG payload",
                    self.width, self.height
                ))
            })?;
        STANDARD
            .decode(payload)
            .map_err(|e| WatermarkError::EncodeError(e.to_string()))
    }
}

/// Render a single repeating tile.
///
/// The tile is `(text_width + column_gap) x (text_width + row_gap)`; both
/// sides grow from the measured text width. A positive tilt shifts the
/// origin right by the text height, any other tilt shifts it down by the
/// text width, before rotating and drawing at `(text_height, text_height)`.
pub fn render_aligned_tile(
    config: &WatermarkConfig,
    surfaces: &dyn SurfaceFactory,
) -> Result<TileImage> {
    let font = config.font();
    let color = config.paint_color()?;

    let mut surface = surfaces.create_surface(DEFAULT_SURFACE_WIDTH, DEFAULT_SURFACE_HEIGHT)?;
    surface.set_font(font.clone());
    let text_width = surface.measure_text(&config.text)?;
    let text_height = config.font_size;
    let tilt_angle = config.tilt_angle();

    // Resizing resets the drawing state, so paint settings come after it
    surface.resize(
        canvas_dimension(text_width + config.column_gap),
        canvas_dimension(text_width + config.row_gap),
    )?;
    surface.set_fill_color(color);
    surface.set_font(font);

    if tilt_angle > 0.0 {
        surface.translate(text_height, 0.0);
    } else {
        surface.translate(0.0, text_width);
    }
    surface.rotate(tilt_angle);
    surface.set_text_align(config.text_align);
    surface.fill_text(&config.text, text_height, text_height)?;

    let tile = TileImage {
        data_url: surface.to_data_url()?,
        width: surface.width(),
        height: surface.height(),
    };

    tracing::debug!(
        width = tile.width,
        height = tile.height,
        text_width = text_width,
        "Rendered aligned watermark tile"
    );

    Ok(tile)
}

/// Render a container-sized image with every tile repetition drawn in.
///
/// # Arguments
///
/// * `config` - Watermark configuration
/// * `canvas` - Current container content size
/// * `viewport_width` - Viewport width, bounding the scan on both axes
/// * `surfaces` - Surface factory
pub fn render_free_tile(
    config: &WatermarkConfig,
    canvas: CanvasSize,
    viewport_width: f64,
    surfaces: &dyn SurfaceFactory,
) -> Result<TileImage> {
    let color = config.paint_color()?;

    let mut surface =
        surfaces.create_surface(canvas_dimension(canvas.width), canvas_dimension(canvas.height))?;
    surface.set_fill_color(color);
    surface.set_font(config.font());

    let text_width = surface.measure_text(&config.text)?;
    let text_height = config.font_size;
    let tilt_angle = config.tilt_angle();

    let envelope = ScanEnvelope::from_viewport_width(viewport_width);
    let grid = scan_grid(
        &envelope,
        text_width + config.column_gap,
        text_height + config.row_gap,
    )?;

    let positions = grid.len();
    for position in grid {
        if !position.is_origin() {
            surface.restore();
        }
        surface.save();
        surface.rotate(tilt_angle);
        surface.set_text_align(config.text_align);
        let (x, y) = position.draw_point();
        surface.fill_text(&config.text, x, y)?;
    }

    let tile = TileImage {
        data_url: surface.to_data_url()?,
        width: surface.width(),
        height: surface.height(),
    };

    tracing::debug!(
        width = tile.width,
        height = tile.height,
        positions = positions,
        "Rendered free watermark image"
    );

    Ok(tile)
}

/// Render the image for the configured tiling mode.
pub fn render_tile(
    config: &WatermarkConfig,
    canvas: CanvasSize,
    viewport_width: f64,
    surfaces: &dyn SurfaceFactory,
) -> Result<TileImage> {
    match config.tile_mode() {
        TileMode::Aligned => render_aligned_tile(config, surfaces),
        TileMode::Free => render_free_tile(config, canvas, viewport_width, surfaces),
    }
}
