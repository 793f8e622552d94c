//! Pixel packing: the 3-bytes-per-pixel mapping between a container byte
//! stream and an RGB raster.
//!
//! Bytes are consumed in groups of three as (R, G, B), pixels are laid out
//! row-major, and the tail of the canvas is zero-filled.  The canvas shape
//! carries no information: the reader flattens pixels back into a byte
//! sequence without looking at width or height, and the container's
//! sentinel makes the trailing zeros inert.

use std::path::Path;

use image::io::Reader as ImageReader;
use image::{ImageFormat, RgbImage};

use crate::error::{Error, FormatError};

/// Bytes carried by one pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// How the encoder shapes the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Near-square: `width = ceil(sqrt(pixels))`.
    #[default]
    Square,
    /// Fixed width; as many rows as needed.
    Width(u32),
}

impl Layout {
    /// Canvas dimensions for `pixels` pixels.  Never smaller than 1×1.
    pub fn dimensions(self, pixels: usize) -> Option<(u32, u32)> {
        let pixels = pixels.max(1) as u64;
        let width = match self {
            Layout::Square   => ceil_sqrt(pixels),
            Layout::Width(w) => u64::from(w.max(1)),
        };
        let height = pixels.div_ceil(width);
        Some((u32::try_from(width).ok()?, u32::try_from(height).ok()?))
    }
}

fn ceil_sqrt(n: u64) -> u64 {
    let mut r = (n as f64).sqrt() as u64;
    while r * r > n {
        r -= 1;
    }
    while r * r < n {
        r += 1;
    }
    r
}

/// Pixels needed to carry `bytes` bytes.
pub fn pixels_for(bytes: usize) -> usize {
    bytes.div_ceil(BYTES_PER_PIXEL)
}

/// Lossless format to write for `path`.
pub fn output_format(path: &Path) -> Result<ImageFormat, FormatError> {
    let Some(ext) = path.extension() else {
        return Ok(ImageFormat::Png);
    };
    match ImageFormat::from_extension(ext) {
        Some(format @ (ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tiff)) => Ok(format),
        _ => Err(FormatError::UnsupportedOutput(ext.to_string_lossy().into_owned())),
    }
}

// ── PixelGrid ────────────────────────────────────────────────────────────────

/// A row-major RGB canvas, three bytes per pixel, no alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width:  u32,
    height: u32,
    data:   Vec<u8>,
}

impl PixelGrid {
    /// Lay `stream` out on a canvas shaped by `layout`, zero-padding the
    /// final pixel and any unused pixels.
    pub fn pack(mut stream: Vec<u8>, layout: Layout) -> Result<Self, FormatError> {
        let too_large = FormatError::CanvasTooLarge(stream.len());
        let (width, height) = layout.dimensions(pixels_for(stream.len())).ok_or(too_large)?;
        let total = (width as usize)
            .checked_mul(height as usize)
            .and_then(|p| p.checked_mul(BYTES_PER_PIXEL))
            .ok_or(FormatError::CanvasTooLarge(stream.len()))?;
        stream.resize(total, 0);
        Ok(Self { width, height, data: stream })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Channel bytes of pixel `i` (row-major index) as `(R, G, B)`.
    pub fn pixel(&self, i: usize) -> Option<[u8; 3]> {
        let start = i.checked_mul(BYTES_PER_PIXEL)?;
        let px = self.data.get(start..start + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2]])
    }

    /// Flatten back into the byte stream: R, G, B of every pixel in order.
    pub fn unpack(self) -> Vec<u8> {
        self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Persist as an 8-bit RGB image in the lossless format the path's
    /// extension names.  A path without an extension is written as PNG.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let format = output_format(path)?;
        let image = RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or(FormatError::CanvasTooLarge(self.data.len()))?;
        image
            .save_with_format(path, format)
            .map_err(|source| Error::ImageWrite { path: path.to_path_buf(), source })
    }

    /// Load any supported raster and normalize it to 8-bit RGB.  The format
    /// is taken from the file's signature, not its extension.  Palette,
    /// grayscale, 16-bit and alpha-bearing sources are converted so that
    /// channel extraction lines up with what the encoder wrote.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let image = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| Error::read(path, e))?
            .decode()
            .map_err(|source| Error::ImageRead { path: path.to_path_buf(), source })?;
        Ok(Self::from_rgb(image.to_rgb8()))
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height, data: image.into_raw() }
    }
}
