//! Offscreen 2D drawing capability used by the tile generators.
//!
//! The operations mirror a canvas 2D context: state save/restore, an affine
//! current transform, a fill color, a font and a text alignment. The
//! generators only talk to these traits, so a host can plug in any backend.

use super::color::Color;
use super::config::{FontSpec, TextAlign};
use super::Result;

/// Size of a freshly created canvas before anything resizes it.
pub const DEFAULT_SURFACE_WIDTH: u32 = 300;
pub const DEFAULT_SURFACE_HEIGHT: u32 = 150;

/// Creates offscreen drawing surfaces.
pub trait SurfaceFactory {
    /// Create a surface of `width` x `height` pixels.
    ///
    /// Fails with `SurfaceUnavailable` when no drawing context can be
    /// acquired for that size.
    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>>;
}

/// A 2D raster drawing surface.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Change the surface size. Clears all pixels and resets the drawing
    /// state (transform, fill, font, alignment, state stack).
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    fn set_fill_color(&mut self, color: Color);
    fn set_font(&mut self, font: FontSpec);
    fn set_text_align(&mut self, align: TextAlign);

    /// Advance width of `text` in the current font, in pixels.
    fn measure_text(&mut self, text: &str) -> Result<f64>;

    fn translate(&mut self, dx: f64, dy: f64);
    fn rotate(&mut self, radians: f64);

    /// Draw `text` with its alphabetic baseline at `(x, y)` in the current
    /// transform.
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()>;

    fn save(&mut self);
    /// Pop the last saved state. Does nothing when the stack is empty.
    fn restore(&mut self);

    /// Export as a `data:` URL.
    fn to_data_url(&self) -> Result<String>;
}

/// Integer surface dimension for a CSS pixel length, truncating the way a
/// canvas size assignment does. Negative and NaN lengths become 0.
pub fn canvas_dimension(length: f64) -> u32 {
    if length.is_nan() || length <= 0.0 {
        0
    } else if length >= u32::MAX as f64 {
        u32::MAX
    } else {
        length.trunc() as u32
    }
}
