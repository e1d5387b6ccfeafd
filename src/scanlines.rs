//! The row loop: pull a filtered scanline, reverse its filter, expand it,
//! repeat — seven times over for Adam7.

use crate::{
  bitmap::PixelSink,
  chunk::{ChunkHead, ChunkReader, PngChunkTy},
  expand::{expand_row, ColPlacement},
  ihdr::PngHeader,
  inflater::IdatInflater,
  meta::PngMetadata,
  unfilter::unfilter_line,
  PngError,
};
use std::io::Read;

/// Geometry of one interlace pass: which rows and columns of the full image
/// it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InterlacePass {
  pub first_row: u32,
  pub row_stride: u32,
  pub first_col: u32,
  pub col_stride: u32,
}
impl InterlacePass {
  /// The pixel dimensions of this pass's sub-image. Either can be zero, in
  /// which case the pass transmits no scanlines at all.
  #[must_use]
  pub const fn sub_dimensions(self, width: u32, height: u32) -> (u32, u32) {
    let sub_w = if width > self.first_col {
      (width - self.first_col + self.col_stride - 1) / self.col_stride
    } else {
      0
    };
    let sub_h = if height > self.first_row {
      (height - self.first_row + self.row_stride - 1) / self.row_stride
    } else {
      0
    };
    (sub_w, sub_h)
  }
}

/// The Adam7 pattern:
///
/// ```txt
/// 1 6 4 6 2 6 4 6
/// 7 7 7 7 7 7 7 7
/// 5 6 5 6 5 6 5 6
/// 7 7 7 7 7 7 7 7
/// 3 6 4 6 3 6 4 6
/// 7 7 7 7 7 7 7 7
/// 5 6 5 6 5 6 5 6
/// 7 7 7 7 7 7 7 7
/// ```
pub(crate) const ADAM7_PASSES: [InterlacePass; 7] = [
  InterlacePass { first_row: 0, row_stride: 8, first_col: 0, col_stride: 8 },
  InterlacePass { first_row: 0, row_stride: 8, first_col: 4, col_stride: 8 },
  InterlacePass { first_row: 4, row_stride: 8, first_col: 0, col_stride: 4 },
  InterlacePass { first_row: 0, row_stride: 4, first_col: 2, col_stride: 4 },
  InterlacePass { first_row: 2, row_stride: 4, first_col: 0, col_stride: 2 },
  InterlacePass { first_row: 0, row_stride: 2, first_col: 1, col_stride: 2 },
  InterlacePass { first_row: 1, row_stride: 2, first_col: 0, col_stride: 1 },
];

/// A non-interlaced image is one pass covering everything, which lets the row
/// loop stop thinking about the difference.
const FULL_IMAGE_PASS: InterlacePass =
  InterlacePass { first_row: 0, row_stride: 1, first_col: 0, col_stride: 1 };

/// The concatenated-IDAT byte stream: inflater plus the chunk hopping needed
/// to feed it.
struct IdatStream<'r, R: Read> {
  reader: &'r mut ChunkReader<R>,
  inflater: IdatInflater,
  pending: Option<ChunkHead>,
  input_finished: bool,
}
impl<'r, R: Read> IdatStream<'r, R> {
  /// Fills all of `dst` with inflated bytes, hopping IDAT chunks as needed.
  ///
  /// Running out of image data with `dst` partly filled is
  /// [`PngError::TruncatedStream`] — a scanline split across IDAT boundaries
  /// is fine, a scanline the file simply doesn't contain is not.
  fn fill_exact(&mut self, dst: &mut [u8]) -> Result<(), PngError> {
    let mut filled = 0_usize;
    while filled < dst.len() {
      let n = self.inflater.read_inflated(self.reader, &mut dst[filled..])?;
      if n > 0 {
        filled += n;
        continue;
      }
      if self.input_finished || self.inflater.is_ended() {
        return Err(PngError::TruncatedStream);
      }
      self.advance_idat()?;
    }
    Ok(())
  }

  /// The current IDAT is exhausted: check its CRC and attach the next one,
  /// or note that image data is over.
  fn advance_idat(&mut self) -> Result<(), PngError> {
    debug_assert_eq!(self.inflater.remaining(), 0);
    self.reader.finish_idat()?;
    match self.reader.next_head()? {
      Some(head) if head.ty == PngChunkTy::IDAT => {
        self.reader.begin_idat();
        self.inflater.allocate(head.length);
      }
      other => {
        self.pending = other;
        self.input_finished = true;
        self.inflater.finish_input();
      }
    }
    Ok(())
  }

  /// All pixels are decoded; skip whatever image-data bytes remain (their
  /// CRCs still get checked) and hand back the first non-IDAT chunk head.
  fn finish(mut self) -> Result<Option<ChunkHead>, PngError> {
    while !self.input_finished {
      let leftover = self.inflater.drain_budget();
      self.reader.skip_idat(leftover as usize)?;
      self.reader.finish_idat()?;
      match self.reader.next_head()? {
        Some(head) if head.ty == PngChunkTy::IDAT => {
          self.reader.begin_idat();
          self.inflater.allocate(head.length);
        }
        other => {
          self.pending = other;
          self.input_finished = true;
        }
      }
    }
    Ok(self.pending)
  }
}

/// Decodes the whole image-data phase, starting from the first IDAT chunk
/// (whose head the caller has already read).
///
/// Consecutive IDAT chunks are consumed, every pixel of the image is written
/// to `sink`, and the head of the first chunk after the image data (`None`
/// at end of input) is returned for the caller to keep dispatching.
pub(crate) fn decode_image_data<R: Read, S: PixelSink>(
  reader: &mut ChunkReader<R>, header: &PngHeader, meta: &PngMetadata, sink: &mut S,
  first_idat_length: u32,
) -> Result<Option<ChunkHead>, PngError> {
  reader.begin_idat();
  let mut stream =
    IdatStream { reader, inflater: IdatInflater::new(), pending: None, input_finished: false };
  stream.inflater.allocate(first_idat_length);

  // both row buffers are sized for the widest pass and reused across passes
  let max_filterline = header.bytes_per_filterline(header.width);
  let mut current = stream.reader.rent(max_filterline);
  let mut previous = stream.reader.rent(max_filterline);

  let result = run_passes(&mut stream, header, meta, sink, &mut current, &mut previous);

  stream.reader.recycle(current);
  stream.reader.recycle(previous);
  result?;
  stream.finish()
}

fn run_passes<'a, R: Read, S: PixelSink>(
  stream: &mut IdatStream<'_, R>, header: &PngHeader, meta: &PngMetadata, sink: &mut S,
  mut current: &'a mut [u8], mut previous: &'a mut [u8],
) -> Result<(), PngError> {
  let passes: &[InterlacePass] =
    if header.is_interlaced { &ADAM7_PASSES } else { core::slice::from_ref(&FULL_IMAGE_PASS) };
  let bpp = header.filter_bpp();
  for (pass_index, pass) in passes.iter().enumerate() {
    let (sub_w, sub_h) = pass.sub_dimensions(header.width, header.height);
    if sub_w == 0 || sub_h == 0 {
      log::debug!("pass {pass_index}: empty, skipped");
      continue;
    }
    let line_len = header.bytes_per_filterline(sub_w);
    log::debug!("pass {pass_index}: {sub_w}x{sub_h}, {line_len} bytes per filterline");
    // each pass starts over with an implied all-zero previous row
    previous[..line_len].fill(0);
    let cols = ColPlacement { first_col: pass.first_col, col_stride: pass.col_stride };
    for row in 0..sub_h {
      let y = pass.first_row + row * pass.row_stride;
      stream.fill_exact(&mut current[..line_len])?;
      let filter_ty = current[0];
      unfilter_line(filter_ty, &mut current[1..line_len], &previous[1..line_len], bpp)?;
      expand_row(header, meta, cols, y, &current[1..line_len], sub_w, sink)?;
      core::mem::swap(&mut current, &mut previous);
    }
  }
  Ok(())
}
