//! The chunk dispatch loop that ties the pieces together.

use crate::{
  bitmap::{Bitmap, PixelSink},
  chunk::{ChunkReader, PngChunkTy},
  ihdr::{PngColorType, PngHeader},
  meta::{PngMetadata, TextEncoding},
  scanlines::decode_image_data,
  PngError,
};
use std::io::Read;

/// Knobs the decoder recognizes. Start from `default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngDecoderOptions {
  /// Largest accepted image width; anything wider is
  /// [`PngError::ImageTooLarge`] before any pixel memory is touched.
  pub max_width: u32,
  /// Largest accepted image height.
  pub max_height: u32,
  /// When set, tEXt chunks are skipped in their entirety (their CRCs are
  /// still checked, since the bytes stream past anyway).
  pub ignore_metadata: bool,
  /// When set, a wrong PNG signature is [`PngError::CorruptData`]. Off by
  /// default on the assumption that the caller pre-sniffed the stream.
  pub strict_signature: bool,
  /// How tEXt keywords and values become strings.
  pub text_encoding: TextEncoding,
}
impl Default for PngDecoderOptions {
  #[inline]
  fn default() -> Self {
    Self {
      max_width: 17_000,
      max_height: 17_000,
      ignore_metadata: false,
      strict_signature: false,
      text_encoding: TextEncoding::Latin1,
    }
  }
}

/// A configured PNG decoder.
///
/// The decoder holds no per-image state: one value can decode any number of
/// streams, one at a time.
#[derive(Debug, Clone, Default)]
pub struct PngDecoder {
  /// The decoder's configuration.
  pub options: PngDecoderOptions,
}
impl PngDecoder {
  /// Makes a decoder with the given options.
  #[inline]
  #[must_use]
  pub fn new(options: PngDecoderOptions) -> Self {
    Self { options }
  }

  /// Decodes one PNG stream, writing every pixel into `sink`.
  ///
  /// This is a single synchronous call: it returns once the IEND chunk has
  /// been seen (or with the error that stopped it). Chunk ordering is
  /// enforced: IHDR must come first, PLTE/tRNS/pHYs must precede the image
  /// data, IDAT chunks must be consecutive, and the stream must end with
  /// IEND ([`PngError::MissingEnd`] otherwise).
  pub fn decode_into<R: Read, S: PixelSink>(
    &self, src: R, sink: &mut S,
  ) -> Result<(PngHeader, PngMetadata), PngError> {
    let mut reader = ChunkReader::new(src);
    reader.read_signature(self.options.strict_signature)?;

    let head = match reader.next_head()? {
      Some(head) => head,
      None => return Err(PngError::MissingEnd),
    };
    if head.ty != PngChunkTy::IHDR {
      return Err(PngError::CorruptData);
    }
    let payload = reader.read_payload(head)?;
    let parsed =
      PngHeader::from_ihdr_payload(&payload, self.options.max_width, self.options.max_height);
    reader.recycle(payload);
    let header = parsed?;
    log::debug!(
      "IHDR: {}x{}, depth {}, {:?}, interlaced: {}",
      header.width,
      header.height,
      header.bit_depth,
      header.color_type,
      header.is_interlaced
    );
    sink.begin_image(header.width, header.height);

    let mut meta = PngMetadata::default();
    let mut image_done = false;
    let mut saw_iend = false;
    let mut pending = reader.next_head()?;
    while let Some(head) = pending.take() {
      match head.ty {
        PngChunkTy::IHDR => return Err(PngError::CorruptData),
        PngChunkTy::PLTE => {
          // a second palette, a palette after the image data, or a palette
          // in a greyscale image are all ordering violations
          if image_done
            || !meta.palette.is_empty()
            || matches!(header.color_type, PngColorType::Y | PngColorType::YA)
          {
            return Err(PngError::CorruptData);
          }
          let data = reader.read_payload(head)?;
          let outcome = meta.set_palette(&data);
          reader.recycle(data);
          outcome?;
        }
        PngChunkTy::tRNS => {
          if image_done {
            return Err(PngError::CorruptData);
          }
          let data = reader.read_payload(head)?;
          let outcome = if header.color_type == PngColorType::Index {
            if meta.palette.is_empty() {
              // palette alpha with no palette to pair it with
              Err(PngError::CorruptData)
            } else {
              meta.set_palette_alpha(&data)
            }
          } else {
            // color-key transparency is outside this decoder's subset
            Ok(())
          };
          reader.recycle(data);
          outcome?;
        }
        PngChunkTy::pHYs => {
          if image_done {
            return Err(PngError::CorruptData);
          }
          let data = reader.read_payload(head)?;
          let outcome = meta.set_phys(&data);
          reader.recycle(data);
          outcome?;
        }
        PngChunkTy::tEXt => {
          // tEXt may appear anywhere between IHDR and IEND
          let data = reader.read_payload(head)?;
          let outcome = if self.options.ignore_metadata {
            Ok(())
          } else {
            meta.push_text(&data, self.options.text_encoding)
          };
          reader.recycle(data);
          outcome?;
        }
        PngChunkTy::IDAT => {
          if image_done {
            // IDAT chunks must be one unbroken run
            return Err(PngError::CorruptData);
          }
          if header.color_type == PngColorType::Index && meta.palette.is_empty() {
            return Err(PngError::CorruptData);
          }
          pending = decode_image_data(&mut reader, &header, &meta, sink, head.length)?;
          image_done = true;
          continue;
        }
        PngChunkTy::IEND => {
          if head.length != 0 || !image_done {
            return Err(PngError::CorruptData);
          }
          let data = reader.read_payload(head)?;
          reader.recycle(data);
          saw_iend = true;
          break;
        }
        other if other.is_ancillary() => {
          log::trace!("skipping unrecognized ancillary chunk {other:?}");
          let data = reader.read_payload(head)?;
          reader.recycle(data);
        }
        _ => return Err(PngError::UnsupportedFormat),
      }
      pending = reader.next_head()?;
    }
    if !saw_iend {
      return Err(PngError::MissingEnd);
    }
    Ok((header, meta))
  }
}

/// Decodes a PNG stream into a fresh [`Bitmap`] with default options.
pub fn decode_png_to_rgba8<R: Read>(src: R) -> Result<(Bitmap, PngMetadata), PngError> {
  let mut bitmap = Bitmap::default();
  let (_header, meta) = PngDecoder::default().decode_into(src, &mut bitmap)?;
  Ok((bitmap, meta))
}
