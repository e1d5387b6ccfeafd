//! Pulls length/type/data/CRC chunk records out of a sequential byte source.

use crate::{
  crc32::{png_crc, Crc32},
  PngError,
};
use core::fmt::{Debug, Write};
use std::io::Read;

/// Magic bytes at the start of every PNG datastream.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks a signature a caller has already pre-sniffed.
#[inline]
#[must_use]
pub const fn is_png_signature(bytes: &[u8; 8]) -> bool {
  let mut i = 0;
  while i < 8 {
    if bytes[i] != PNG_SIGNATURE[i] {
      return false;
    }
    i += 1;
  }
  true
}

/// A chunk's 4-byte type code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PngChunkTy(pub [u8; 4]);
#[allow(nonstandard_style)]
#[allow(missing_docs)]
impl PngChunkTy {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");
  pub const pHYs: Self = Self(*b"pHYs");
  pub const tEXt: Self = Self(*b"tEXt");

  /// Ancillary chunks (bit 5 of the first type byte set) may be skipped by a
  /// decoder that doesn't recognize them; critical chunks may not.
  #[inline]
  #[must_use]
  pub const fn is_ancillary(self) -> bool {
    (self.0[0] & 0b0010_0000) != 0
  }
}
impl Debug for PngChunkTy {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_char(self.0[0] as char)?;
    f.write_char(self.0[1] as char)?;
    f.write_char(self.0[2] as char)?;
    f.write_char(self.0[3] as char)?;
    Ok(())
  }
}

/// The leading 8 bytes of a chunk record: data length and type.
///
/// For most chunks the reader follows up with [`ChunkReader::read_payload`].
/// IDAT payloads instead stream through [`ChunkReader::read_idat`] so that
/// multi-megabyte image data never sits in one buffer.
#[derive(Debug, Clone, Copy)]
pub struct ChunkHead {
  /// The chunk's type code.
  pub ty: PngChunkTy,
  /// Payload length in bytes (the trailing CRC is not counted).
  pub length: u32,
}

/// Spare payload buffers, reused across chunks to avoid per-chunk allocation.
#[derive(Debug, Default)]
pub(crate) struct BufferPool {
  spares: Vec<Vec<u8>>,
}
impl BufferPool {
  #[must_use]
  fn rent(&mut self, len: usize) -> Vec<u8> {
    let mut buf = self.spares.pop().unwrap_or_default();
    buf.clear();
    buf.resize(len, 0);
    buf
  }
  fn give_back(&mut self, buf: Vec<u8>) {
    self.spares.push(buf);
  }
}

/// Reads successive chunk records from a blocking byte source.
#[derive(Debug)]
pub struct ChunkReader<R: Read> {
  src: R,
  pool: BufferPool,
  idat_crc: Option<Crc32>,
}
impl<R: Read> ChunkReader<R> {
  /// Wraps a byte source. Nothing is read until the first call.
  #[inline]
  #[must_use]
  pub fn new(src: R) -> Self {
    Self { src, pool: BufferPool::default(), idat_crc: None }
  }

  /// Consumes the 8-byte PNG signature.
  ///
  /// When `strict` is set a wrong signature is [`PngError::CorruptData`];
  /// otherwise the bytes are skipped unchecked, for callers that already
  /// sniffed the stream.
  pub fn read_signature(&mut self, strict: bool) -> Result<(), PngError> {
    let mut buf = [0_u8; 8];
    self.read_exact(&mut buf)?;
    if strict && !is_png_signature(&buf) {
      return Err(PngError::CorruptData);
    }
    Ok(())
  }

  /// Reads the next chunk's length and type.
  ///
  /// A clean end of input at the length field gives `Ok(None)`: whether that
  /// is acceptable (IEND already seen) is the caller's call. Reading only 1-3
  /// of the field's bytes is [`PngError::TruncatedStream`], as is any short
  /// read within the type field. A length with the high bit set is
  /// [`PngError::CorruptData`]: PNG lengths are 31-bit, and a "negative"
  /// length is never end-of-stream.
  pub fn next_head(&mut self) -> Result<Option<ChunkHead>, PngError> {
    let len_bytes = match self.read_field()? {
      Some(bytes) => bytes,
      None => return Ok(None),
    };
    let length = u32::from_be_bytes(len_bytes);
    if (length & 0x8000_0000) != 0 {
      return Err(PngError::CorruptData);
    }
    let mut ty_bytes = [0_u8; 4];
    self.read_exact(&mut ty_bytes)?;
    let head = ChunkHead { ty: PngChunkTy(ty_bytes), length };
    log::trace!("chunk head: {:?}, {} bytes", head.ty, head.length);
    Ok(Some(head))
  }

  /// Reads a non-IDAT chunk's payload and trailing CRC, validating the CRC.
  ///
  /// The returned buffer comes from the reader's pool; hand it back with
  /// [`recycle`](Self::recycle) once the payload has been consumed.
  pub fn read_payload(&mut self, head: ChunkHead) -> Result<Vec<u8>, PngError> {
    let mut data = self.pool.rent(head.length as usize);
    if let Err(e) = self.read_exact(&mut data) {
      self.pool.give_back(data);
      return Err(e);
    }
    let mut crc_bytes = [0_u8; 4];
    if let Err(e) = self.read_exact(&mut crc_bytes) {
      self.pool.give_back(data);
      return Err(e);
    }
    let declared_crc = u32::from_be_bytes(crc_bytes);
    let actual_crc = png_crc(head.ty.0.iter().copied().chain(data.iter().copied()));
    if declared_crc != actual_crc {
      log::debug!(
        "chunk {:?} crc mismatch: {declared_crc:08X} declared, {actual_crc:08X} actual",
        head.ty
      );
      self.pool.give_back(data);
      return Err(PngError::CorruptData);
    }
    Ok(data)
  }

  /// Rents a zeroed buffer from the pool (the scanline engine's row buffers
  /// come from the same place chunk payloads do).
  #[inline]
  #[must_use]
  pub(crate) fn rent(&mut self, len: usize) -> Vec<u8> {
    self.pool.rent(len)
  }

  /// Returns a payload buffer to the pool.
  #[inline]
  pub fn recycle(&mut self, buf: Vec<u8>) {
    self.pool.give_back(buf);
  }

  /// Starts streaming an IDAT payload: subsequent [`read_idat`] bytes are
  /// hashed so that [`finish_idat`] can check the chunk's trailing CRC.
  ///
  /// [`read_idat`]: Self::read_idat
  /// [`finish_idat`]: Self::finish_idat
  pub(crate) fn begin_idat(&mut self) {
    let mut crc = Crc32::new();
    crc.update(&PngChunkTy::IDAT.0);
    self.idat_crc = Some(crc);
  }

  /// Reads some IDAT payload bytes. The caller is responsible for staying
  /// within the chunk's declared length.
  pub(crate) fn read_idat(&mut self, dst: &mut [u8]) -> Result<usize, PngError> {
    let n = loop {
      match self.src.read(dst) {
        Ok(n) => break n,
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
        Err(e) => return Err(PngError::from(e)),
      }
    };
    if n == 0 {
      return Err(PngError::TruncatedStream);
    }
    if let Some(crc) = self.idat_crc.as_mut() {
      crc.update(&dst[..n]);
    }
    Ok(n)
  }

  /// Skips `count` IDAT payload bytes (still hashing them).
  pub(crate) fn skip_idat(&mut self, mut count: usize) -> Result<(), PngError> {
    let mut scratch = [0_u8; 512];
    while count > 0 {
      let want = count.min(scratch.len());
      let got = self.read_idat(&mut scratch[..want])?;
      count -= got;
    }
    Ok(())
  }

  /// Reads an IDAT chunk's trailing CRC and checks it against the streamed
  /// payload bytes.
  pub(crate) fn finish_idat(&mut self) -> Result<(), PngError> {
    let crc = match self.idat_crc.take() {
      Some(crc) => crc,
      None => return Err(PngError::CorruptData),
    };
    let mut crc_bytes = [0_u8; 4];
    self.read_exact(&mut crc_bytes)?;
    let declared_crc = u32::from_be_bytes(crc_bytes);
    if declared_crc != crc.finish() {
      log::debug!("IDAT crc mismatch: {declared_crc:08X} declared");
      return Err(PngError::CorruptData);
    }
    Ok(())
  }

  /// Reads a 4-byte field that may legitimately start at end of input.
  fn read_field(&mut self) -> Result<Option<[u8; 4]>, PngError> {
    let mut buf = [0_u8; 4];
    let mut got = 0_usize;
    while got < 4 {
      let n = loop {
        match self.src.read(&mut buf[got..]) {
          Ok(n) => break n,
          Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
          Err(e) => return Err(PngError::from(e)),
        }
      };
      if n == 0 {
        return if got == 0 { Ok(None) } else { Err(PngError::TruncatedStream) };
      }
      got += n;
    }
    Ok(Some(buf))
  }

  fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), PngError> {
    self.src.read_exact(buf).map_err(PngError::from)
  }
}
