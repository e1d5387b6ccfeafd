//! Where decoded pixels go: the [`PixelSink`] trait and a basic [`Bitmap`].

use pixel_formats::r8g8b8a8_Srgb;

/// Receives decoded pixels, one RGBA8 value at a time or a packed row at a
/// time.
///
/// The decoder never interprets the destination pixel format; implement this
/// for whatever your pixel grid stores. Positions are relative to the top
/// left, and every position in `0..width` × `0..height` is written exactly
/// once per decode (interlaced images just write them in a stranger order).
pub trait PixelSink {
  /// Called once, after the header parses, before any pixel is written.
  fn begin_image(&mut self, width: u32, height: u32) {
    let _ = (width, height);
  }

  /// Writes one pixel.
  fn write_rgba8(&mut self, x: u32, y: u32, rgba: [u8; 4]);

  /// Packs a full row of RGB bytes (3 per pixel, alpha implied 255) starting
  /// at column 0. The decoder uses this on the non-interlaced RGB fast path.
  fn pack_rgb_row(&mut self, y: u32, rgb: &[u8]) {
    for (x, px) in rgb.chunks_exact(3).enumerate() {
      self.write_rgba8(x as u32, y, [px[0], px[1], px[2], 255]);
    }
  }

  /// Packs a full row of RGBA bytes (4 per pixel) starting at column 0.
  fn pack_rgba_row(&mut self, y: u32, rgba: &[u8]) {
    for (x, px) in rgba.chunks_exact(4).enumerate() {
      self.write_rgba8(x as u32, y, [px[0], px[1], px[2], px[3]]);
    }
  }
}

/// A basic container for decoded [`r8g8b8a8_Srgb`] data.
///
/// * The `pixels` vec holds `width * height` pixels, row by row. If you make
///   your own instance of this type with incorrect `width` and `height`
///   fields the accessor functions will give weird results and possibly
///   panic unexpectedly, so please don't.
/// * The struct takes no opinion on if the first row is the top or bottom of
///   the image, because different image formats and GPU libraries disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bitmap<P = r8g8b8a8_Srgb> {
  /// Image width (in pixels).
  pub width: u32,
  /// Image height (in pixels).
  pub height: u32,
  /// Image pixel data.
  pub pixels: Vec<P>,
}
impl<P> Bitmap<P> {
  /// Converts an `x` and `y` to an index into the `pixels` vec.
  ///
  /// ```txt
  /// index = y * width + x
  /// ```
  ///
  /// Does not perform bounds checks.
  #[inline]
  #[must_use]
  pub const fn xy_to_index(&self, x: u32, y: u32) -> usize {
    y as usize * self.width as usize + x as usize
  }
  /// Gets a shared reference to the specified pixel.
  ///
  /// ## Failure
  /// * If `x` or `y` are out of bounds you get `None`.
  #[inline]
  #[must_use]
  pub fn get(&self, x: u32, y: u32) -> Option<&P> {
    if x >= self.width || y >= self.height {
      return None;
    }
    self.pixels.get(self.xy_to_index(x, y))
  }
  /// Gets a unique reference to the specified pixel.
  ///
  /// ## Failure
  /// * If `x` or `y` are out of bounds you get `None`.
  #[inline]
  #[must_use]
  pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut P> {
    if x >= self.width || y >= self.height {
      return None;
    }
    let i = self.xy_to_index(x, y);
    self.pixels.get_mut(i)
  }
}

impl PixelSink for Bitmap<r8g8b8a8_Srgb> {
  fn begin_image(&mut self, width: u32, height: u32) {
    self.width = width;
    self.height = height;
    self.pixels.clear();
    self.pixels.resize(width as usize * height as usize, r8g8b8a8_Srgb::default());
  }
  #[inline]
  fn write_rgba8(&mut self, x: u32, y: u32, [r, g, b, a]: [u8; 4]) {
    let i = self.xy_to_index(x, y);
    self.pixels[i] = r8g8b8a8_Srgb { r, g, b, a };
  }
}
