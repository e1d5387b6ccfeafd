//! The IHDR record: image geometry, pixel format, and what we accept.

use crate::PngError;

/// The five PNG color types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PngColorType {
  /// Greyscale.
  Y = 0,
  /// Red, green, blue.
  RGB = 2,
  /// Indexes into a `PLTE` palette.
  Index = 3,
  /// Greyscale plus alpha.
  YA = 4,
  /// Red, green, blue, alpha.
  RGBA = 6,
}
impl PngColorType {
  /// Samples per pixel for this color type.
  #[inline]
  #[must_use]
  pub const fn channels(self) -> usize {
    match self {
      Self::Y | Self::Index => 1,
      Self::YA => 2,
      Self::RGB => 3,
      Self::RGBA => 4,
    }
  }
}

/// A parsed and validated image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngHeader {
  /// Width in pixels, 1 or more.
  pub width: u32,
  /// Height in pixels, 1 or more.
  pub height: u32,
  /// Bits per sample. Which depths are legal depends on the color type.
  pub bit_depth: u8,
  /// The color type.
  pub color_type: PngColorType,
  /// If the image data is Adam7 interlaced.
  pub is_interlaced: bool,
}
impl PngHeader {
  /// Parses the 13-byte IHDR payload.
  ///
  /// * Structural problems (wrong payload size, a dimension of zero or with
  ///   the sign bit set) are [`PngError::CorruptData`].
  /// * Combinations this decoder doesn't handle (color type and bit depth
  ///   outside the supported matrix, nonzero compression or filter method, an
  ///   interlace method other than 0 or 1) are [`PngError::UnsupportedFormat`].
  /// * Dimensions past `max_width`/`max_height` are [`PngError::ImageTooLarge`].
  pub fn from_ihdr_payload(
    data: &[u8], max_width: u32, max_height: u32,
  ) -> Result<Self, PngError> {
    if data.len() != 13 {
      return Err(PngError::CorruptData);
    }
    let width = u32::from_be_bytes(data[0..4].try_into().unwrap());
    let height = u32::from_be_bytes(data[4..8].try_into().unwrap());
    // dimensions are 31-bit and at least 1
    if width == 0 || height == 0 || (width | height) & 0x8000_0000 != 0 {
      return Err(PngError::CorruptData);
    }
    let bit_depth = data[8];
    let color_type = match data[9] {
      0 => PngColorType::Y,
      2 => PngColorType::RGB,
      3 => PngColorType::Index,
      4 => PngColorType::YA,
      6 => PngColorType::RGBA,
      _ => return Err(PngError::UnsupportedFormat),
    };
    let depth_ok = match color_type {
      PngColorType::Y | PngColorType::Index => [1, 2, 4, 8].contains(&bit_depth),
      PngColorType::RGB | PngColorType::YA | PngColorType::RGBA => bit_depth == 8,
    };
    if !depth_ok {
      return Err(PngError::UnsupportedFormat);
    }
    let [compression_method, filter_method, interlace_method] = [data[10], data[11], data[12]];
    if compression_method != 0 || filter_method != 0 || interlace_method > 1 {
      return Err(PngError::UnsupportedFormat);
    }
    if width > max_width || height > max_height {
      return Err(PngError::ImageTooLarge);
    }
    Ok(Self { width, height, bit_depth, color_type, is_interlaced: interlace_method == 1 })
  }

  /// Byte distance between a byte and the matching byte of the pixel to its
  /// left, as the line filters use. Never less than 1, because filtering is
  /// byte-wise even when pixels are packed smaller than a byte.
  #[inline]
  #[must_use]
  pub const fn filter_bpp(self) -> usize {
    let bytes = self.color_type.channels() * self.bit_depth as usize / 8;
    if bytes == 0 {
      1
    } else {
      bytes
    }
  }

  /// Content bytes in one scanline of a sub-image `sub_width` pixels wide,
  /// not counting the leading filter-type byte.
  #[inline]
  #[must_use]
  pub const fn bytes_per_scanline(self, sub_width: u32) -> usize {
    let raw_bits = sub_width as usize * self.bit_depth as usize * self.color_type.channels();
    (raw_bits + 7) / 8
  }

  /// One scanline as transmitted: the filter-type byte plus the content.
  #[inline]
  #[must_use]
  pub const fn bytes_per_filterline(self, sub_width: u32) -> usize {
    self.bytes_per_scanline(sub_width) + 1
  }
}
