//! Presents the concatenated IDAT payloads as one inflatable byte stream.

use crate::{chunk::ChunkReader, PngError};
use miniz_oxide::{
  inflate::stream::{inflate, InflateState},
  DataFormat, MZError, MZFlush, MZStatus,
};
use std::io::Read;

const COMPRESSED_WINDOW: usize = 4 * 1024;

/// Streaming inflate over IDAT payloads, budgeted one chunk at a time.
///
/// The scanline engine only ever sees a single zlib stream; IDAT boundaries
/// are this adapter's business. [`allocate`](Self::allocate) arms the budget
/// for one chunk's payload, and [`read_inflated`](Self::read_inflated)
/// returning 0 means either "attach the next IDAT" or, once
/// [`finish_input`](Self::finish_input) has been called, "there is no more".
pub(crate) struct IdatInflater {
  state: Box<InflateState>,
  comp: Vec<u8>,
  comp_pos: usize,
  comp_len: usize,
  remaining_in_idat: u32,
  input_finished: bool,
  stream_ended: bool,
}
impl std::fmt::Debug for IdatInflater {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("IdatInflater")
      .field("comp_pos", &self.comp_pos)
      .field("comp_len", &self.comp_len)
      .field("remaining_in_idat", &self.remaining_in_idat)
      .field("input_finished", &self.input_finished)
      .field("stream_ended", &self.stream_ended)
      .finish()
  }
}
impl IdatInflater {
  #[must_use]
  pub fn new() -> Self {
    Self {
      state: InflateState::new_boxed(DataFormat::Zlib),
      comp: vec![0; COMPRESSED_WINDOW],
      comp_pos: 0,
      comp_len: 0,
      remaining_in_idat: 0,
      input_finished: false,
      stream_ended: false,
    }
  }

  /// Arms the budget for a new IDAT chunk of `length` payload bytes.
  pub fn allocate(&mut self, length: u32) {
    debug_assert_eq!(self.remaining_in_idat, 0);
    self.remaining_in_idat = length;
  }

  /// Payload bytes of the current IDAT not yet pulled from the source.
  #[inline]
  #[must_use]
  pub fn remaining(&self) -> u32 {
    self.remaining_in_idat
  }

  /// Gives up the unconsumed budget of the current IDAT, for when the image
  /// is complete but the chunk still has payload bytes to skip past.
  #[inline]
  #[must_use]
  pub fn drain_budget(&mut self) -> u32 {
    core::mem::take(&mut self.remaining_in_idat)
  }

  /// Declares that no further IDAT chunk will be allocated, so the next
  /// `read_inflated` calls may drain the inflater's residual output.
  pub fn finish_input(&mut self) {
    self.input_finished = true;
  }

  /// True once the zlib stream proper (including its trailer) has ended.
  #[inline]
  #[must_use]
  pub fn is_ended(&self) -> bool {
    self.stream_ended
  }

  /// Inflates into `dst`, pulling compressed bytes from `reader` only within
  /// the current IDAT budget.
  ///
  /// Returns the number of bytes produced; 0 means no output is possible
  /// until more input arrives (or ever, if the input is finished or the
  /// stream has ended). Inflate failures are [`PngError::CorruptData`].
  pub fn read_inflated<R: Read>(
    &mut self, reader: &mut ChunkReader<R>, dst: &mut [u8],
  ) -> Result<usize, PngError> {
    if dst.is_empty() || self.stream_ended {
      return Ok(0);
    }
    loop {
      if self.comp_pos == self.comp_len && self.remaining_in_idat > 0 {
        let want = (self.remaining_in_idat as usize).min(self.comp.len());
        let got = reader.read_idat(&mut self.comp[..want])?;
        self.comp_pos = 0;
        self.comp_len = got;
        self.remaining_in_idat -= got as u32;
      }
      let input = &self.comp[self.comp_pos..self.comp_len];
      let no_input = input.is_empty();
      // even with no input there may be output pending inside the inflater
      // (a match that ran past the end of a previous `dst`), so always give
      // it the chance to produce before reporting a dry spell
      let flush = if self.input_finished { MZFlush::Finish } else { MZFlush::None };
      let result = inflate(&mut self.state, input, dst, flush);
      self.comp_pos += result.bytes_consumed;
      match result.status {
        Ok(MZStatus::StreamEnd) => self.stream_ended = true,
        Ok(MZStatus::Ok) => (),
        // "can't make progress" is how it says it wants more input
        Err(MZError::Buf) => (),
        Ok(MZStatus::NeedDict) | Err(_) => return Err(PngError::CorruptData),
      }
      if result.bytes_written > 0 {
        return Ok(result.bytes_written);
      }
      if self.stream_ended || no_input {
        // out of budget (the caller attaches the next IDAT), out of stream,
        // or out of everything
        return Ok(0);
      }
      if result.bytes_consumed == 0 {
        // input available, output space available, and it did nothing
        return Err(PngError::CorruptData);
      }
    }
  }
}
