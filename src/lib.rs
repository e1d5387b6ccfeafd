#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

//! A streaming PNG decoder.
//!
//! * [Portable Network Graphics (PNG) Specification (Third Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/png/
//!
//! ## Library Design Assumptions
//!
//! This library reads PNG data from any [`std::io::Read`] source, front to
//! back, exactly once. It never holds the whole compressed stream or the
//! whole filtered image in memory: the live image data at any moment is two
//! scanlines (the row being decoded and the row above it). That makes it
//! suited to decoding out of sockets, archives, or anything else you'd
//! rather not buffer.
//!
//! Reads are assumed blocking. A non-blocking source can wrap this decoder,
//! but has to drive the call to completion before the image exists.
//!
//! ## Usage
//!
//! For the common case, [`decode_png_to_rgba8`] gives a [`Bitmap`] of
//! [`pixel_formats::r8g8b8a8_Srgb`] pixels:
//!
//! ```no_run
//! let file = std::fs::File::open("my_image.png").unwrap();
//! let (bitmap, meta) = streampng::decode_png_to_rgba8(std::io::BufReader::new(file)).unwrap();
//! assert_eq!(bitmap.pixels.len(), (bitmap.width * bitmap.height) as usize);
//! ```
//!
//! For control over limits, metadata, and where pixels go, configure a
//! [`PngDecoder`] and pass your own [`PixelSink`]. The decoder calls
//! [`PixelSink::write_rgba8`] for every pixel (plus bulk row variants on the
//! fast paths), so the destination pixel format is entirely the sink's
//! business.
//!
//! ## What's supported
//!
//! The chunk subset is IHDR, IDAT, PLTE, tRNS (palette alpha), pHYs, tEXt,
//! and IEND. Other ancillary chunks are skipped (their CRCs are still
//! checked); unknown critical chunks are an error. Bit depths: 1, 2, 4, and
//! 8 for greyscale and indexed color, 8 for RGB, greyscale+alpha, and RGBA.
//! Both interlace methods (none and Adam7) work.

mod bitmap;
mod chunk;
mod crc32;
mod decoder;
mod expand;
mod ihdr;
mod inflater;
mod meta;
mod scanlines;
mod unfilter;

pub use bitmap::*;
pub use chunk::{is_png_signature, ChunkHead, ChunkReader, PngChunkTy, PNG_SIGNATURE};
pub use decoder::*;
pub use ihdr::*;
pub use meta::*;

/// Things that can go wrong while decoding.
///
/// Every error is terminal: the decoder doesn't attempt recovery, and a
/// partially written pixel grid should be discarded.
#[derive(Debug)]
#[non_exhaustive]
pub enum PngError {
  /// The input ended in the middle of something: a chunk field, a chunk
  /// payload, or a scanline with no image data left to finish it.
  TruncatedStream,
  /// The data doesn't hold together: a CRC mismatch, an unknown filter type,
  /// a zlib stream that won't inflate, a chunk out of order, or a palette
  /// index past the palette's end.
  CorruptData,
  /// Valid PNG, but outside what this decoder handles: a color type and bit
  /// depth combination off the supported matrix, a nonzero filter or
  /// compression method, an unknown interlace method, or an unknown critical
  /// chunk.
  UnsupportedFormat,
  /// The declared dimensions exceed the configured maximum.
  ImageTooLarge,
  /// The stream ended (cleanly) before an IEND chunk was seen.
  MissingEnd,
  /// The source failed with something other than end-of-input.
  Io(std::io::Error),
}
impl core::fmt::Display for PngError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::TruncatedStream => f.write_str("input ended mid-structure"),
      Self::CorruptData => f.write_str("corrupt png data"),
      Self::UnsupportedFormat => f.write_str("unsupported png format"),
      Self::ImageTooLarge => f.write_str("image dimensions exceed the configured maximum"),
      Self::MissingEnd => f.write_str("input ended before the IEND chunk"),
      Self::Io(e) => write!(f, "io error: {e}"),
    }
  }
}
impl std::error::Error for PngError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      _ => None,
    }
  }
}
impl From<std::io::Error> for PngError {
  /// An unexpected end of input is [`PngError::TruncatedStream`]; any other
  /// io failure is carried through as [`PngError::Io`].
  #[inline]
  fn from(e: std::io::Error) -> Self {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
      Self::TruncatedStream
    } else {
      Self::Io(e)
    }
  }
}
