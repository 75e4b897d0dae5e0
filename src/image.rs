//! Pixel buffers exchanged with the host: 4-channel images and
//! single-channel selection masks.

use alloc::vec;
use alloc::vec::Vec;

use whereat::{At, ErrorAtExt};

use crate::geometry::{Bounds, Extent};

/// Bytes per pixel of an [`Image`] (ARGB, 8 bits per channel).
pub const BYTES_PER_PIXEL: usize = 4;

/// Pixel buffer construction error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// Buffer length does not match the pixel count of its extent.
    #[error("buffer holds {actual} bytes, {expected} expected for its extent")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Raw 32-bit ARGB image, 4 bytes per pixel, rows packed without stride.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    extent: Extent,
    data: Vec<u8>,
}

impl Image {
    /// Wrap an existing buffer. Fails if `data` is not exactly
    /// `extent.pixel_count() * 4` bytes.
    pub fn new(extent: Extent, data: Vec<u8>) -> Result<Self, At<ImageError>> {
        let expected = extent.pixel_count() * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(ImageError::SizeMismatch {
                expected,
                actual: data.len(),
            }
            .start_at());
        }
        Ok(Self { extent, data })
    }

    /// Image with every byte set to `fill`.
    pub fn create(extent: Extent, fill: u8) -> Self {
        Self {
            extent,
            data: vec![fill; extent.pixel_count() * BYTES_PER_PIXEL],
        }
    }

    /// Wrap a buffer read back from the host.
    ///
    /// The host may hand back more bytes than asked for; anything past the
    /// expected length is dropped.
    ///
    /// # Panics
    ///
    /// If the host returned fewer bytes than `extent` requires. That is a
    /// broken host, not a recoverable condition.
    pub(crate) fn from_host(extent: Extent, mut data: Vec<u8>) -> Self {
        let expected = extent.pixel_count() * BYTES_PER_PIXEL;
        assert!(
            data.len() >= expected,
            "host returned {} bytes for a {}x{} image, expected {expected}",
            data.len(),
            extent.width,
            extent.height
        );
        data.truncate(expected);
        Self { extent, data }
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    /// Raw ARGB bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Selection coverage for a rectangular region, one byte per pixel.
///
/// Produced by
/// [`Document::create_mask_from_selection`](crate::Document::create_mask_from_selection).
/// Zero-area bounds are valid and carry an empty buffer: there is nothing
/// to inpaint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    bounds: Bounds,
    data: Vec<u8>,
}

impl Mask {
    /// # Panics
    ///
    /// If `data` is shorter than `bounds` requires.
    pub(crate) fn from_host(bounds: Bounds, mut data: Vec<u8>) -> Self {
        let expected = bounds.extent().pixel_count();
        assert!(
            data.len() >= expected,
            "host returned {} selection bytes for {bounds:?}, expected {expected}",
            data.len()
        );
        data.truncate(expected);
        Self { bounds, data }
    }

    /// Region of the document the mask covers.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Coverage bytes, row-major over `bounds`. 0 = unselected, 255 = fully selected.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether there is nothing to inpaint.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_parts(self) -> (Bounds, Vec<u8>) {
        (self.bounds, self.data)
    }
}
