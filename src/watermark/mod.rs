//! Watermark module for rendering tiled text watermarks.
//!
//! This module turns a text watermark configuration into an image `data:`
//! URL suitable for a container's `background-image`.
//!
//! # Features
//!
//! - **Aligned mode**: one tilted tile repeated by the background
//! - **Free mode**: a container-sized image with all repetitions drawn in
//! - **CSS colors** with alpha (`#rrggbbaa`, `rgba()`, named colors)
//! - **Embedded default font**, optional system font lookup
//! - **Pluggable surfaces**: generators draw through the [`Surface`] trait
//!
//! # Configuration Example
//!
//! ```yaml
//! watermark:
//!   text: "CONFIDENTIAL"
//!   isAlign: true
//!   textAlign: start
//!   color: "rgba(255, 255, 255, 0.2)"
//!   fontSize: 25
//!   fontType: "Arial"
//!   degree: 45
//!   rowGap: 100
//!   columnGap: 100
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod font;
pub mod generator;
pub mod position;
pub mod raster;
pub mod surface;
pub mod transform;

// Re-export main types for convenience
pub use color::Color;
pub use config::{
    BackgroundRepeat, CanvasSize, FontSpec, TextAlign, TileMode, WatermarkConfig,
    DEFAULT_CANVAS_SIZE,
};
pub use error::{Result, WatermarkError};
pub use font::FontBook;
pub use generator::{render_aligned_tile, render_free_tile, render_tile, TileImage};
pub use position::{scan_grid, ScanEnvelope, ScanGrid, ScanPosition, MAX_SCAN_POSITIONS};
pub use raster::{RasterSurface, RasterSurfaceFactory, EMPTY_DATA_URL};
pub use surface::{canvas_dimension, Surface, SurfaceFactory};
pub use transform::Transform2D;
