//! Scan grid for free-mode tiling.
//!
//! A free-mode image bakes every tile repetition into one container-sized
//! surface. The repetitions are laid out on a grid that starts one page
//! before the origin and ends two pages after it, so tiles rotated about
//! the surface origin still cover the whole container:
//!
//! ```text
//! x: -page_width  ..< 2 * page_width   step = text_width + column_gap
//! y: -page_height ..< 2 * page_height  step = text_height + row_gap
//! ```
//!
//! Positions are produced column by column (outer x, inner y) and
//! accumulate in floating point, the way the stepping loop would.

use super::{Result, WatermarkError};

/// Upper bound on grid size before a scan is refused, one position per
/// pixel of the largest surface.
pub const MAX_SCAN_POSITIONS: usize = 268_435_456;

/// Extent that the scan grid covers around the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanEnvelope {
    pub page_width: f64,
    pub page_height: f64,
}

impl ScanEnvelope {
    pub fn new(page_width: f64, page_height: f64) -> Self {
        Self {
            page_width,
            page_height,
        }
    }

    /// Envelope whose horizontal and vertical bounds both come from the
    /// viewport width.
    pub fn from_viewport_width(viewport_width: f64) -> Self {
        Self::new(viewport_width, viewport_width)
    }
}

/// One drawing position of the scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPosition {
    /// Accumulated loop coordinates.
    pub x: f64,
    pub y: f64,
}

impl ScanPosition {
    /// Whether this is the exact origin pair, the only position drawn
    /// without first restoring the previous paint state.
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Drawing point, truncated toward zero to whole pixels.
    pub fn draw_point(&self) -> (f64, f64) {
        // Adding +0.0 folds -0.0 into 0.0
        (self.x.trunc() + 0.0, self.y.trunc() + 0.0)
    }
}

fn check_step(name: &str, step: f64) -> Result<()> {
    if !step.is_finite() || step <= 0.0 {
        return Err(WatermarkError::ScanError(format!(
            "{} must be a finite positive number, got {}",
            name, step
        )));
    }
    Ok(())
}

/// One axis of the scan: accumulated coordinates from `start` while
/// below `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Axis {
    start: f64,
    end: f64,
    step: f64,
    count: usize,
}

impl Axis {
    fn new(start: f64, end: f64, step: f64) -> Result<Self> {
        let too_many = || {
            WatermarkError::ScanError(format!(
                "step {} yields more than {} positions",
                step, MAX_SCAN_POSITIONS
            ))
        };

        // Reject before stepping through a range that cannot fit
        let estimate = (end - start) / step;
        if estimate.is_nan() || estimate > MAX_SCAN_POSITIONS as f64 {
            return Err(too_many());
        }

        let mut count = 0;
        let mut value = start;
        while value < end {
            count += 1;
            if count > MAX_SCAN_POSITIONS {
                return Err(too_many());
            }
            let next = value + step;
            if next <= value {
                return Err(WatermarkError::ScanError(format!(
                    "step {} does not advance past {}",
                    step, value
                )));
            }
            value = next;
        }

        Ok(Self {
            start,
            end,
            step,
            count,
        })
    }
}

/// Lazily produced positions of a free-mode scan, column by column.
#[derive(Debug, Clone)]
pub struct ScanGrid {
    xs: Axis,
    ys: Axis,
    x: f64,
    y: f64,
    remaining: usize,
}

impl ScanGrid {
    /// Number of columns and rows in the grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.xs.count, self.ys.count)
    }
}

impl Iterator for ScanGrid {
    type Item = ScanPosition;

    fn next(&mut self) -> Option<ScanPosition> {
        if self.remaining == 0 {
            return None;
        }
        if self.y >= self.ys.end {
            self.x += self.xs.step;
            self.y = self.ys.start;
        }

        let position = ScanPosition {
            x: self.x,
            y: self.y,
        };
        self.y += self.ys.step;
        self.remaining -= 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ScanGrid {}

/// Lay out every drawing position of a free-mode scan.
///
/// Axes are validated up front; positions are produced on iteration.
///
/// # Arguments
///
/// * `envelope` - Extent of the scan around the origin
/// * `step_x` - Horizontal period (`text_width + column_gap`)
/// * `step_y` - Vertical period (`text_height + row_gap`)
pub fn scan_grid(envelope: &ScanEnvelope, step_x: f64, step_y: f64) -> Result<ScanGrid> {
    check_step("horizontal step", step_x)?;
    check_step("vertical step", step_y)?;

    let xs = Axis::new(-envelope.page_width, envelope.page_width * 2.0, step_x)?;
    let ys = Axis::new(-envelope.page_height, envelope.page_height * 2.0, step_y)?;

    let total = xs
        .count
        .checked_mul(ys.count)
        .filter(|&total| total <= MAX_SCAN_POSITIONS)
        .ok_or_else(|| {
            WatermarkError::ScanError(format!(
                "{}x{} grid exceeds {} positions",
                xs.count, ys.count, MAX_SCAN_POSITIONS
            ))
        })?;

    Ok(ScanGrid {
        xs,
        ys,
        x: xs.start,
        y: ys.start,
        remaining: total,
    })
}
