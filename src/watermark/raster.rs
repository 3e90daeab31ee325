//! Software raster surface.
//!
//! [`RasterSurface`] implements [`Surface`] on top of an `image::RgbaImage`:
//!
//! - Text is measured and outlined with `ab_glyph`, the font size being the
//!   em size in pixels
//! - Each text run is rasterized once into a coverage mask at the origin,
//!   then mapped through the current transform with bilinear sampling
//! - Pixels are combined with source-over alpha blending
//! - Export is a base64 PNG `data:` URL
//!
//! Output depends only on the drawing calls and the resolved font, so two
//! identical call sequences produce byte-identical URLs.

use super::color::Color;
use super::config::{FontSpec, TextAlign};
use super::font::{em_scale, FontBook};
use super::surface::{Surface, SurfaceFactory};
use super::transform::Transform2D;
use super::{Result, WatermarkError};
use ab_glyph::{point, Font, FontArc, Glyph, GlyphId, PxScaleFont, ScaleFont};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use std::collections::HashMap;
use std::rc::Rc;

/// Largest width or height of a surface.
pub const MAX_SURFACE_SIDE: u32 = 32_767;

/// Largest pixel count of a surface.
pub const MAX_SURFACE_AREA: u64 = 268_435_456;

/// Data URL of a surface with no pixels.
pub const EMPTY_DATA_URL: &str = "data:,";

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width > MAX_SURFACE_SIDE
        || height > MAX_SURFACE_SIDE
        || width as u64 * height as u64 > MAX_SURFACE_AREA
    {
        return Err(WatermarkError::SurfaceUnavailable(format!(
            "{}x{} exceeds the maximum surface size",
            width, height
        )));
    }
    Ok(())
}

/// Creates [`RasterSurface`]s sharing one [`FontBook`].
#[derive(Debug, Clone)]
pub struct RasterSurfaceFactory {
    fonts: Rc<FontBook>,
}

impl Default for RasterSurfaceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterSurfaceFactory {
    /// Factory that renders with the embedded font only.
    pub fn new() -> Self {
        Self::with_font_book(FontBook::new())
    }

    pub fn with_font_book(fonts: FontBook) -> Self {
        Self {
            fonts: Rc::new(fonts),
        }
    }

    pub fn font_book(&self) -> &FontBook {
        &self.fonts
    }
}

impl SurfaceFactory for RasterSurfaceFactory {
    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>> {
        Ok(Box::new(RasterSurface::new(
            width,
            height,
            Rc::clone(&self.fonts),
        )?))
    }
}

#[derive(Debug, Clone)]
struct DrawState {
    transform: Transform2D,
    fill: Color,
    font: FontSpec,
    align: TextAlign,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Transform2D::identity(),
            fill: Color::black(),
            font: FontSpec::default(),
            align: TextAlign::Start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RunKey {
    text: String,
    family: String,
    size_bits: u64,
}

impl RunKey {
    fn new(text: &str, font: &FontSpec) -> Self {
        Self {
            text: text.to_string(),
            family: font.family.clone(),
            size_bits: font.size.to_bits(),
        }
    }

    fn matches(&self, text: &str, font: &FontSpec) -> bool {
        self.text == text && self.family == font.family && self.size_bits == font.size.to_bits()
    }
}

/// A text run rasterized at the origin with an untransformed pen.
#[derive(Debug)]
struct GlyphRun {
    advance: f64,
    /// Offset of mask pixel (0, 0) from the pen origin on the baseline.
    left: f64,
    top: f64,
    width: usize,
    height: usize,
    coverage: Vec<f32>,
}

impl GlyphRun {
    fn sample(&self, x: f64, y: f64) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = (x - x0) as f32;
        let fy = (y - y0) as f32;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let at = |x: i64, y: i64| -> f32 {
            if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
                0.0
            } else {
                self.coverage[y as usize * self.width + x as usize]
            }
        };

        at(x0, y0) * (1.0 - fx) * (1.0 - fy)
            + at(x0 + 1, y0) * fx * (1.0 - fy)
            + at(x0, y0 + 1) * (1.0 - fx) * fy
            + at(x0 + 1, y0 + 1) * fx * fy
    }
}

/// RGBA surface drawn in software.
pub struct RasterSurface {
    pixels: RgbaImage,
    state: DrawState,
    stack: Vec<DrawState>,
    fonts: Rc<FontBook>,
    runs: HashMap<RunKey, Rc<GlyphRun>>,
    /// Most recent run, looked up without allocating a key.
    last_run: Option<(RunKey, Rc<GlyphRun>)>,
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.pixels.width())
            .field("height", &self.pixels.height())
            .field("state", &self.state)
            .field("depth", &self.stack.len())
            .finish()
    }
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, fonts: Rc<FontBook>) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            pixels: RgbaImage::new(width, height),
            state: DrawState::default(),
            stack: Vec::new(),
            fonts,
            runs: HashMap::new(),
            last_run: None,
        })
    }

    /// Rendered pixels, not premultiplied.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// PNG encoding of the current pixels.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(
                self.pixels.as_raw(),
                self.pixels.width(),
                self.pixels.height(),
                ColorType::Rgba8,
            )
            .map_err(|e| WatermarkError::EncodeError(e.to_string()))?;
        Ok(buf)
    }

    fn glyph_run(&mut self, text: &str) -> Result<Rc<GlyphRun>> {
        if let Some((key, run)) = &self.last_run {
            if key.matches(text, &self.state.font) {
                return Ok(Rc::clone(run));
            }
        }

        let key = RunKey::new(text, &self.state.font);
        let run = match self.runs.get(&key) {
            Some(run) => Rc::clone(run),
            None => {
                let run = Rc::new(self.rasterize_run(text)?);
                self.runs.insert(key.clone(), Rc::clone(&run));
                run
            }
        };
        self.last_run = Some((key, Rc::clone(&run)));
        Ok(run)
    }

    /// Pen advance of `text` in the current font, without outlining it.
    fn text_advance(&self, text: &str) -> Result<f64> {
        let font = self.fonts.resolve(&self.state.font.family)?;
        let scale = em_scale(&font, self.state.font.size as f32);
        let (_, advance) = lay_out(&font.as_scaled(scale), text);
        Ok(advance as f64)
    }

    fn rasterize_run(&self, text: &str) -> Result<GlyphRun> {
        let font = self.fonts.resolve(&self.state.font.family)?;
        let scale = em_scale(&font, self.state.font.size as f32);
        let (glyphs, cursor_x) = lay_out(&font.as_scaled(scale), text);
        let outlines: Vec<_> = glyphs
            .into_iter()
            .filter_map(|glyph| font.outline_glyph(glyph))
            .collect();

        let advance = cursor_x as f64;
        if outlines.is_empty() {
            return Ok(GlyphRun {
                advance,
                left: 0.0,
                top: 0.0,
                width: 0,
                height: 0,
                coverage: Vec::new(),
            });
        }

        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for outlined in &outlines {
            let bounds = outlined.px_bounds();
            min_x = min_x.min(bounds.min.x);
            min_y = min_y.min(bounds.min.y);
            max_x = max_x.max(bounds.max.x);
            max_y = max_y.max(bounds.max.y);
        }

        // Glyph rasterizers allocate their own bounds, checked here as a union
        // before any of them draws
        let width = (max_x - min_x).ceil().max(0.0) as usize;
        let height = (max_y - min_y).ceil().max(0.0) as usize;
        let area = width.checked_mul(height).filter(|&area| {
            width <= MAX_SURFACE_SIDE as usize
                && height <= MAX_SURFACE_SIDE as usize
                && area as u64 <= MAX_SURFACE_AREA
        });
        let Some(area) = area else {
            return Err(WatermarkError::SurfaceUnavailable(format!(
                "{}x{} text mask exceeds the maximum surface size",
                width, height
            )));
        };
        let mut coverage = vec![0.0f32; area];

        for outlined in &outlines {
            let bounds = outlined.px_bounds();
            let off_x = (bounds.min.x - min_x) as usize;
            let off_y = (bounds.min.y - min_y) as usize;

            outlined.draw(|px, py, c| {
                let x = off_x + px as usize;
                let y = off_y + py as usize;
                if x < width && y < height {
                    let cell = &mut coverage[y * width + x];
                    *cell = (*cell + c).min(1.0);
                }
            });
        }

        Ok(GlyphRun {
            advance,
            left: min_x as f64,
            top: min_y as f64,
            width,
            height,
            coverage,
        })
    }

    fn composite(&mut self, run: &GlyphRun, to_device: &Transform2D) {
        if run.width == 0 || run.height == 0 || self.state.fill.a <= 0.0 {
            return;
        }
        let Some(to_mask) = to_device.invert() else {
            return;
        };

        let (w, h) = (run.width as f64, run.height as f64);
        let corners = [
            to_device.apply(0.0, 0.0),
            to_device.apply(w, 0.0),
            to_device.apply(0.0, h),
            to_device.apply(w, h),
        ];

        let min_x = corners.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|(x, _)| *x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max);

        // Clip to the surface, with one pixel of slack for bilinear spread
        let surface_w = self.pixels.width() as f64;
        let surface_h = self.pixels.height() as f64;
        let x_start = (min_x.floor() - 1.0).max(0.0);
        let y_start = (min_y.floor() - 1.0).max(0.0);
        let x_end = (max_x.ceil() + 1.0).min(surface_w);
        let y_end = (max_y.ceil() + 1.0).min(surface_h);
        if !(x_start < x_end && y_start < y_end) {
            return;
        }

        let fill = self.state.fill;
        for dy in y_start as u32..y_end as u32 {
            for dx in x_start as u32..x_end as u32 {
                let (u, v) = to_mask.apply(dx as f64 + 0.5, dy as f64 + 0.5);
                let coverage = run.sample(u - 0.5, v - 0.5);
                if coverage > 0.0 {
                    blend_pixel(self.pixels.get_pixel_mut(dx, dy), fill, fill.a * coverage);
                }
            }
        }
    }
}

/// Positions the glyphs of `text` along the baseline from the origin,
/// returning them with the final pen position.
fn lay_out(scaled_font: &PxScaleFont<&FontArc>, text: &str) -> (Vec<Glyph>, f32) {
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        // Add kerning
        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        glyphs.push(glyph_id.with_scale_and_position(scaled_font.scale(), point(cursor_x, 0.0)));
        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Source-over blend of `color` at `alpha` onto a non-premultiplied pixel.
fn blend_pixel(bottom: &mut Rgba<u8>, color: Color, alpha: f32) {
    let top_alpha = alpha.clamp(0.0, 1.0);
    if top_alpha <= 0.0 {
        return;
    }
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);

    if out_alpha < 0.001 {
        *bottom = Rgba([0, 0, 0, 0]);
        return;
    }

    let blend = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let result = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    *bottom = Rgba([
        blend(color.r, bottom[0]),
        blend(color.g, bottom[1]),
        blend(color.b, bottom[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ]);
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        check_dimensions(width, height)?;
        self.pixels = RgbaImage::new(width, height);
        self.state = DrawState::default();
        self.stack.clear();
        Ok(())
    }

    fn set_fill_color(&mut self, color: Color) {
        self.state.fill = color;
    }

    fn set_font(&mut self, font: FontSpec) {
        self.state.font = font;
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.state.align = align;
    }

    fn measure_text(&mut self, text: &str) -> Result<f64> {
        self.text_advance(text)
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.state.transform = self
            .state
            .transform
            .then(&Transform2D::translation(dx, dy));
    }

    fn rotate(&mut self, radians: f64) {
        self.state.transform = self.state.transform.then(&Transform2D::rotation(radians));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        if !(x.is_finite() && y.is_finite()) {
            return Ok(());
        }
        let run = self.glyph_run(text)?;
        let origin_x = x + self.state.align.offset(run.advance) + run.left;
        let origin_y = y + run.top;
        let to_device = self
            .state
            .transform
            .then(&Transform2D::translation(origin_x, origin_y));
        self.composite(&run, &to_device);
        Ok(())
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn to_data_url(&self) -> Result<String> {
        if self.pixels.width() == 0 || self.pixels.height() == 0 {
            return Ok(EMPTY_DATA_URL.to_string());
        }
        let png = self.to_png()?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}
