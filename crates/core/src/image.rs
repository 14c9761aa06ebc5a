//! Image handles passed into vision tasks
//!
//! An [`Image`] is either CPU-resident pixel data or an opaque reference to
//! a GPU texture. Vision tasks only run on CPU images; GPU images are
//! rejected before they reach the runner.

use crate::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Pixel layout of CPU image data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ImageFormat {
    /// Unknown/unspecified format
    Unknown = 0,

    /// Packed 24-bit sRGB (RGBRGB...)
    Srgb = 1,

    /// Packed 32-bit sRGB with alpha (RGBARGBA...)
    Srgba = 2,

    /// Packed 32-bit BGRA
    Sbgra = 3,

    /// Single channel 8-bit grayscale
    Gray8 = 4,

    /// Single channel 32-bit float
    Vec32F1 = 5,
}

impl ImageFormat {
    /// Bytes per pixel, or 0 when unknown
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ImageFormat::Srgb => 3,
            ImageFormat::Srgba | ImageFormat::Sbgra | ImageFormat::Vec32F1 => 4,
            ImageFormat::Gray8 => 1,
            ImageFormat::Unknown => 0,
        }
    }

    /// Expected buffer size in bytes for tightly packed rows
    pub fn buffer_size(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }
}

#[derive(Debug, Clone)]
enum ImageStorage {
    Cpu { format: ImageFormat, pixels: Bytes },
    Gpu { texture_id: u32 },
}

/// Image handle
///
/// Clones share the underlying storage, so handing an image to a task and
/// receiving it back on the result path does not copy pixels.
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    storage: ImageStorage,
}

impl Image {
    /// Create a CPU image from packed pixel data
    ///
    /// # Errors
    ///
    /// * `Error::InvalidArgument` - zero dimension or buffer too small for
    ///   the declared format
    pub fn from_pixels(
        format: ImageFormat,
        width: u32,
        height: u32,
        pixels: impl Into<Bytes>,
    ) -> Result<Self> {
        let pixels = pixels.into();
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument(format!(
                "Image dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = format.buffer_size(width, height);
        if pixels.len() < expected {
            return Err(Error::InvalidArgument(format!(
                "{:?} image {}x{} needs {} bytes, got {}",
                format,
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            storage: ImageStorage::Cpu { format, pixels },
        })
    }

    /// Reference an image living in GPU memory
    pub fn from_gpu_texture(texture_id: u32, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            storage: ImageStorage::Gpu { texture_id },
        }
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the image resides in accelerator memory
    pub fn uses_gpu(&self) -> bool {
        matches!(self.storage, ImageStorage::Gpu { .. })
    }

    /// Pixel format of CPU images
    pub fn format(&self) -> Option<ImageFormat> {
        match &self.storage {
            ImageStorage::Cpu { format, .. } => Some(*format),
            ImageStorage::Gpu { .. } => None,
        }
    }

    /// Pixel bytes of CPU images
    pub fn pixels(&self) -> Option<&[u8]> {
        match &self.storage {
            ImageStorage::Cpu { pixels, .. } => Some(pixels),
            ImageStorage::Gpu { .. } => None,
        }
    }

    /// GPU texture id of GPU images
    pub fn texture_id(&self) -> Option<u32> {
        match &self.storage {
            ImageStorage::Cpu { .. } => None,
            ImageStorage::Gpu { texture_id } => Some(*texture_id),
        }
    }

    /// Whether two handles point at the same pixel storage
    pub fn shares_storage_with(&self, other: &Image) -> bool {
        match (&self.storage, &other.storage) {
            (ImageStorage::Cpu { pixels: a, .. }, ImageStorage::Cpu { pixels: b, .. }) => {
                a.as_ptr() == b.as_ptr() && a.len() == b.len()
            }
            (ImageStorage::Gpu { texture_id: a }, ImageStorage::Gpu { texture_id: b }) => a == b,
            _ => false,
        }
    }
}
