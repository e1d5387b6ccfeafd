//! Non-pixel data gathered along the way: palette, transparency, physical
//! size, text.

use crate::PngError;

/// How many inches fit in a metre, for pHYs conversion.
const INCHES_PER_METER: f32 = 39.370_079;

/// How tEXt keyword and value bytes become strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
  /// Latin-1, as the PNG spec says tEXt contains. Each byte maps to the
  /// Unicode code point of the same value.
  #[default]
  Latin1,
  /// UTF-8, lossy. For streams from encoders that ignored the spec.
  Utf8,
}
impl TextEncoding {
  fn decode(self, bytes: &[u8]) -> String {
    match self {
      Self::Latin1 => bytes.iter().map(|&b| b as char).collect(),
      Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
    }
  }
}

/// Everything a decode produces besides the pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PngMetadata {
  /// RGB palette entries from PLTE, at most 256.
  pub palette: Vec<[u8; 3]>,
  /// Per-palette-index alpha from tRNS. May be shorter than the palette;
  /// missing entries are fully opaque.
  pub palette_alpha: Vec<u8>,
  /// Horizontal and vertical resolution in dots per inch, from pHYs.
  pub dpi: Option<(f32, f32)>,
  /// Keyword/value pairs from tEXt chunks, in file order.
  pub texts: Vec<(String, String)>,
}
impl PngMetadata {
  /// Alpha for palette index `i`: the tRNS entry, or opaque past its end.
  #[inline]
  #[must_use]
  pub fn alpha_for_index(&self, i: usize) -> u8 {
    self.palette_alpha.get(i).copied().unwrap_or(255)
  }

  pub(crate) fn set_palette(&mut self, data: &[u8]) -> Result<(), PngError> {
    let entries: &[[u8; 3]] =
      bytemuck::try_cast_slice(data).map_err(|_| PngError::CorruptData)?;
    if entries.is_empty() || entries.len() > 256 {
      return Err(PngError::CorruptData);
    }
    self.palette = entries.to_vec();
    Ok(())
  }

  pub(crate) fn set_palette_alpha(&mut self, data: &[u8]) -> Result<(), PngError> {
    if data.len() > self.palette.len() {
      return Err(PngError::CorruptData);
    }
    self.palette_alpha = data.to_vec();
    Ok(())
  }

  pub(crate) fn set_phys(&mut self, data: &[u8]) -> Result<(), PngError> {
    if data.len() != 9 {
      return Err(PngError::CorruptData);
    }
    let ppu_x = u32::from_be_bytes(data[0..4].try_into().unwrap());
    let ppu_y = u32::from_be_bytes(data[4..8].try_into().unwrap());
    // the unit byte is noted and ignored: without it the values still give
    // the aspect ratio, with it they're pixels per metre
    self.dpi = Some((ppu_x as f32 / INCHES_PER_METER, ppu_y as f32 / INCHES_PER_METER));
    Ok(())
  }

  pub(crate) fn push_text(&mut self, data: &[u8], encoding: TextEncoding) -> Result<(), PngError> {
    let mut it = data.splitn(2, |&b| b == 0);
    let keyword = it.next().ok_or(PngError::CorruptData)?;
    let text = it.next().ok_or(PngError::CorruptData)?;
    self.texts.push((encoding.decode(keyword), encoding.decode(text)));
    Ok(())
  }
}
