//! Extent and bounds arithmetic in document pixel space.
//!
//! Pure geometry, no pixel operations. Selections come in as [`Bounds`],
//! get grown by [`Bounds::pad`] to the alignment the downstream encoder
//! wants, then clipped back into the document with [`Bounds::clamp`].
//!
//! # Example
//!
//! ```
//! use docbridge::{Bounds, Extent};
//!
//! let doc = Extent::new(100, 80);
//! let bounds = Bounds::pad(Bounds::new(10, 10, 30, 20), 4, 8);
//! assert_eq!(bounds, Bounds::new(6, 6, 40, 32));
//!
//! let clamped = Bounds::clamp(Bounds::new(90, -5, 40, 40), doc);
//! assert_eq!(clamped, Bounds::new(90, 0, 10, 35));
//! ```

use num_traits::Float;

/// Width × height dimensions in pixels, no position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// Create a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of the diagonal, `sqrt(w² + h²)`.
    ///
    /// Used to turn relative grow/feather amounts into pixel counts that
    /// scale with the size of the selection.
    pub fn diagonal(&self) -> f64 {
        let w = self.width as f64;
        let h = self.height as f64;
        Float::sqrt(w * w + h * h)
    }

    /// Number of pixels covered, `w * h`.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether either dimension is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle in document pixel coordinates, origin top-left.
///
/// The origin may be negative: [`pad`](Self::pad) does not clip, only
/// [`clamp`](Self::clamp) does.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    /// Create new bounds.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounds at the origin covering the whole `extent`.
    pub const fn from_extent(extent: Extent) -> Self {
        Self::new(0, 0, extent.width, extent.height)
    }

    /// Size of the rectangle without its position.
    pub const fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Whether the rectangle covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Grow by `margin` on every side, then round width and height up to a
    /// multiple of `multiple`.
    ///
    /// Rounding adds pixels on the right and bottom edges only. A `multiple`
    /// of 0 is treated as 1. No clamping happens here; sizes that would
    /// overflow `u32` stop at the largest multiple that fits.
    pub fn pad(bounds: Self, margin: u32, multiple: u32) -> Self {
        let multiple = multiple.max(1) as i64;
        let margin = margin as i64;
        let largest = u32::MAX as i64 / multiple * multiple;
        let grow = |size: u32| -> u32 {
            let padded = size as i64 + 2 * margin;
            let aligned = (padded + multiple - 1) / multiple * multiple;
            saturate_u32(aligned.min(largest))
        };
        Self {
            x: saturate_i32(bounds.x as i64 - margin),
            y: saturate_i32(bounds.y as i64 - margin),
            width: grow(bounds.width),
            height: grow(bounds.height),
        }
    }

    /// Intersect with `[0, extent.width) × [0, extent.height)`.
    ///
    /// Bounds that lie entirely outside produce a zero-area rectangle
    /// positioned on the nearest edge.
    pub fn clamp(bounds: Self, extent: Extent) -> Self {
        let (x0, x1) = clamp_span(bounds.x, bounds.width, extent.width);
        let (y0, y1) = clamp_span(bounds.y, bounds.height, extent.height);
        Self {
            x: saturate_i32(x0),
            y: saturate_i32(y0),
            width: saturate_u32(x1 - x0),
            height: saturate_u32(y1 - y0),
        }
    }

    /// Whether this rectangle starts at the origin and reaches at least the
    /// full `extent` on both axes.
    pub fn covers(&self, extent: Extent) -> bool {
        if self.x > 0 || self.y > 0 {
            return false;
        }
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        right >= extent.width as i64 && bottom >= extent.height as i64
    }
}

impl From<(i32, i32, u32, u32)> for Bounds {
    fn from((x, y, width, height): (i32, i32, u32, u32)) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<Bounds> for (i32, i32, u32, u32) {
    fn from(b: Bounds) -> Self {
        (b.x, b.y, b.width, b.height)
    }
}

/// Clip the span `[start, start + len)` to `[0, max)`. Returns `(lo, hi)`
/// with `lo <= hi`.
fn clamp_span(start: i32, len: u32, max: u32) -> (i64, i64) {
    let max = max as i64;
    let lo = (start as i64).clamp(0, max);
    let hi = (start as i64 + len as i64).clamp(lo, max);
    (lo, hi)
}

fn saturate_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn saturate_u32(v: i64) -> u32 {
    v.clamp(0, u32::MAX as i64) as u32
}
