//! Classic TIFF container parsing: header, IFD walking, tag access and
//! band decoding.
//!
//! Only the first IFD is read; BigTIFF is rejected up front. All value
//! access is bounds-checked so damaged files surface as
//! [`RasterError::Corrupt`] instead of panics.

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;

use crate::error::RasterError;
use crate::summary::PixelType;

// Baseline tags.
pub(crate) const TAG_IMAGE_WIDTH: u16 = 256;
pub(crate) const TAG_IMAGE_LENGTH: u16 = 257;
pub(crate) const TAG_BITS_PER_SAMPLE: u16 = 258;
pub(crate) const TAG_COMPRESSION: u16 = 259;
pub(crate) const TAG_PHOTOMETRIC: u16 = 262;
pub(crate) const TAG_STRIP_OFFSETS: u16 = 273;
pub(crate) const TAG_SAMPLES_PER_PIXEL: u16 = 277;
pub(crate) const TAG_ROWS_PER_STRIP: u16 = 278;
pub(crate) const TAG_STRIP_BYTE_COUNTS: u16 = 279;
pub(crate) const TAG_PLANAR_CONFIG: u16 = 284;
pub(crate) const TAG_TILE_WIDTH: u16 = 322;
pub(crate) const TAG_TILE_LENGTH: u16 = 323;
pub(crate) const TAG_TILE_OFFSETS: u16 = 324;
pub(crate) const TAG_TILE_BYTE_COUNTS: u16 = 325;
pub(crate) const TAG_SAMPLE_FORMAT: u16 = 339;

// GeoTIFF tags.
pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
pub(crate) const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const TAG_GDAL_NODATA: u16 = 42113;

// GeoKey ids.
pub(crate) const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
pub(crate) const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// A TIFF file loaded into memory with its byte order resolved.
#[derive(Debug)]
pub(crate) struct TiffBuffer {
    pub data: Vec<u8>,
    pub big_endian: bool,
    pub first_ifd: usize,
}

impl TiffBuffer {
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let data = fs::read(path).map_err(|e| RasterError::io(path, e))?;
        Self::from_bytes(data).map_err(|e| match e {
            RasterError::NotATiff { reason, .. } => RasterError::NotATiff {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RasterError> {
        let not_a_tiff = |reason: &str| RasterError::NotATiff {
            path: Default::default(),
            reason: reason.to_string(),
        };

        if data.len() < 8 {
            return Err(not_a_tiff("shorter than a TIFF header"));
        }
        let big_endian = match &data[0..2] {
            b"II" => false,
            b"MM" => true,
            _ => return Err(not_a_tiff("unknown byte-order mark")),
        };
        let buf = Self {
            data,
            big_endian,
            first_ifd: 0,
        };
        match buf.u16_at(2)? {
            42 => {},
            43 => return Err(not_a_tiff("BigTIFF is not supported")),
            other => return Err(not_a_tiff(&format!("bad magic number {other}"))),
        }
        let first_ifd = buf.u32_at(4)? as usize;
        Ok(Self { first_ifd, ..buf })
    }

    fn bytes_at(&self, offset: usize, len: usize) -> Result<&[u8], RasterError> {
        self.data
            .get(offset..offset + len)
            .ok_or_else(|| RasterError::corrupt(format!("read past end of file at offset {offset}")))
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16, RasterError> {
        let b = self.bytes_at(offset, 2)?;
        let b: [u8; 2] = [b[0], b[1]];
        Ok(if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32, RasterError> {
        let b = self.bytes_at(offset, 4)?;
        let b: [u8; 4] = [b[0], b[1], b[2], b[3]];
        Ok(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    pub fn f64_at(&self, offset: usize) -> Result<f64, RasterError> {
        let b = self.bytes_at(offset, 8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(if self.big_endian {
            f64::from_be_bytes(arr)
        } else {
            f64::from_le_bytes(arr)
        })
    }

    pub fn f32_at(&self, offset: usize) -> Result<f32, RasterError> {
        let b = self.bytes_at(offset, 4)?;
        let arr: [u8; 4] = [b[0], b[1], b[2], b[3]];
        Ok(if self.big_endian {
            f32::from_be_bytes(arr)
        } else {
            f32::from_le_bytes(arr)
        })
    }
}

/// One parsed IFD entry with its payload location resolved.
pub(crate) struct RawEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    /// Absolute offset of the payload (inline or out-of-line).
    pub payload: usize,
}

fn type_size(field_type: u16) -> Option<usize> {
    match field_type {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

/// The first image file directory of a TIFF.
pub(crate) struct Ifd {
    pub entries: Vec<RawEntry>,
}

impl Ifd {
    pub fn parse(buf: &TiffBuffer) -> Result<Self, RasterError> {
        let base = buf.first_ifd;
        let count = buf.u16_at(base)? as usize;
        let mut entries = Vec::with_capacity(count);

        for i in 0..count {
            let entry_off = base + 2 + i * 12;
            let tag = buf.u16_at(entry_off)?;
            let field_type = buf.u16_at(entry_off + 2)?;
            let value_count = buf.u32_at(entry_off + 4)?;

            let Some(size) = type_size(field_type) else {
                // Unknown field type; skip the entry rather than fail the file.
                continue;
            };
            let payload_len = size
                .checked_mul(value_count as usize)
                .ok_or_else(|| RasterError::corrupt("tag payload size overflow"))?;
            let payload = if payload_len <= 4 {
                entry_off + 8
            } else {
                buf.u32_at(entry_off + 8)? as usize
            };

            entries.push(RawEntry {
                tag,
                field_type,
                count: value_count,
                payload,
            });
        }

        Ok(Self { entries })
    }

    pub fn find(&self, tag: u16) -> Option<&RawEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Reads an integer-typed tag (BYTE/SHORT/LONG and signed variants).
    pub fn uints(&self, buf: &TiffBuffer, tag: u16) -> Result<Option<Vec<u64>>, RasterError> {
        let Some(entry) = self.find(tag) else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(entry.count as usize);
        for i in 0..entry.count as usize {
            let value = match entry.field_type {
                1 | 6 | 7 => u64::from(*buf.bytes_at(entry.payload + i, 1)?.first().ok_or_else(
                    || RasterError::corrupt("empty tag payload"),
                )?),
                3 | 8 => u64::from(buf.u16_at(entry.payload + i * 2)?),
                4 | 9 => u64::from(buf.u32_at(entry.payload + i * 4)?),
                other => {
                    return Err(RasterError::corrupt(format!(
                        "tag {tag} has non-integer type {other}"
                    )));
                },
            };
            values.push(value);
        }
        Ok(Some(values))
    }

    /// Reads the first value of an integer-typed tag.
    pub fn uint(&self, buf: &TiffBuffer, tag: u16) -> Result<Option<u64>, RasterError> {
        Ok(self.uints(buf, tag)?.and_then(|v| v.first().copied()))
    }

    /// Reads a DOUBLE/FLOAT/RATIONAL-typed tag as f64 values.
    pub fn doubles(&self, buf: &TiffBuffer, tag: u16) -> Result<Option<Vec<f64>>, RasterError> {
        let Some(entry) = self.find(tag) else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(entry.count as usize);
        for i in 0..entry.count as usize {
            let value = match entry.field_type {
                11 => f64::from(buf.f32_at(entry.payload + i * 4)?),
                12 => buf.f64_at(entry.payload + i * 8)?,
                5 => {
                    let num = buf.u32_at(entry.payload + i * 8)?;
                    let den = buf.u32_at(entry.payload + i * 8 + 4)?;
                    if den == 0 {
                        f64::NAN
                    } else {
                        f64::from(num) / f64::from(den)
                    }
                },
                other => {
                    return Err(RasterError::corrupt(format!(
                        "tag {tag} has non-floating type {other}"
                    )));
                },
            };
            values.push(value);
        }
        Ok(Some(values))
    }

    /// Reads an ASCII-typed tag, trimming the trailing NUL.
    pub fn ascii(&self, buf: &TiffBuffer, tag: u16) -> Result<Option<String>, RasterError> {
        let Some(entry) = self.find(tag) else {
            return Ok(None);
        };
        let bytes = buf.bytes_at(entry.payload, entry.count as usize)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(Some(String::from_utf8_lossy(&bytes[..end]).into_owned()))
    }
}

fn decompress(compression: u16, raw: &[u8]) -> Result<Vec<u8>, RasterError> {
    match compression {
        1 => Ok(raw.to_vec()),
        8 | 32946 => {
            let mut out = Vec::new();
            ZlibDecoder::new(raw)
                .read_to_end(&mut out)
                .map_err(|e| RasterError::corrupt(format!("DEFLATE chunk failed: {e}")))?;
            Ok(out)
        },
        5 => Err(RasterError::unsupported("LZW compression")),
        7 => Err(RasterError::unsupported("JPEG compression")),
        other => Err(RasterError::unsupported(format!("compression {other}"))),
    }
}

/// Chunk geometry common to the strip and tile paths.
struct BandLayout {
    width: usize,
    height: usize,
    samples: usize,
    planar: u64,
    pixel: PixelType,
    compression: u16,
}

/// Decodes band 1 of the image into `f64` samples, row-major.
pub(crate) fn decode_band(
    buf: &TiffBuffer,
    ifd: &Ifd,
    pixel: PixelType,
    compression: u16,
) -> Result<Vec<f64>, RasterError> {
    let width = ifd
        .uint(buf, TAG_IMAGE_WIDTH)?
        .ok_or(RasterError::MissingTag { tag: "ImageWidth" })? as usize;
    let height = ifd
        .uint(buf, TAG_IMAGE_LENGTH)?
        .ok_or(RasterError::MissingTag { tag: "ImageLength" })? as usize;
    let samples = ifd.uint(buf, TAG_SAMPLES_PER_PIXEL)?.unwrap_or(1) as usize;
    let planar = ifd.uint(buf, TAG_PLANAR_CONFIG)?.unwrap_or(1);
    if planar != 1 && planar != 2 {
        return Err(RasterError::unsupported(format!("planar configuration {planar}")));
    }

    let layout = BandLayout {
        width,
        height,
        samples,
        planar,
        pixel,
        compression,
    };

    let mut band = vec![0f64; width * height];
    if ifd.find(TAG_TILE_OFFSETS).is_some() {
        decode_tiles(buf, ifd, &layout, &mut band)?;
    } else {
        decode_strips(buf, ifd, &layout, &mut band)?;
    }
    Ok(band)
}

fn decode_strips(
    buf: &TiffBuffer,
    ifd: &Ifd,
    layout: &BandLayout,
    band: &mut [f64],
) -> Result<(), RasterError> {
    let offsets = ifd
        .uints(buf, TAG_STRIP_OFFSETS)?
        .ok_or(RasterError::MissingTag { tag: "StripOffsets" })?;
    let counts = ifd
        .uints(buf, TAG_STRIP_BYTE_COUNTS)?
        .ok_or(RasterError::MissingTag { tag: "StripByteCounts" })?;
    if offsets.len() != counts.len() {
        return Err(RasterError::corrupt("strip offset/count mismatch"));
    }
    let rows_per_strip = ifd
        .uint(buf, TAG_ROWS_PER_STRIP)?
        .unwrap_or(layout.height as u64) as usize;
    if rows_per_strip == 0 {
        return Err(RasterError::corrupt("RowsPerStrip is zero"));
    }

    // With a planar layout the first ceil(h / rps) strips hold band 1.
    let strips_per_band = layout.height.div_ceil(rows_per_strip);
    let (step, strip_range) = if layout.planar == 2 {
        (1, 0..strips_per_band.min(offsets.len()))
    } else {
        (layout.samples, 0..offsets.len())
    };

    let sample_size = layout.pixel.byte_len();
    for strip_idx in strip_range {
        let row0 = strip_idx * rows_per_strip;
        if row0 >= layout.height {
            break;
        }
        let rows = rows_per_strip.min(layout.height - row0);
        let raw = buf.bytes_at(offsets[strip_idx] as usize, counts[strip_idx] as usize)?;
        let chunk = decompress(layout.compression, raw)?;

        for r in 0..rows {
            for x in 0..layout.width {
                let sample_idx = (r * layout.width + x) * step;
                let byte_off = sample_idx * sample_size;
                let value = layout
                    .pixel
                    .sample_at(&chunk, byte_off, buf.big_endian)
                    .ok_or_else(|| RasterError::corrupt("strip shorter than expected"))?;
                band[(row0 + r) * layout.width + x] = value;
            }
        }
    }
    Ok(())
}

fn decode_tiles(
    buf: &TiffBuffer,
    ifd: &Ifd,
    layout: &BandLayout,
    band: &mut [f64],
) -> Result<(), RasterError> {
    let tile_width = ifd
        .uint(buf, TAG_TILE_WIDTH)?
        .ok_or(RasterError::MissingTag { tag: "TileWidth" })? as usize;
    let tile_length = ifd
        .uint(buf, TAG_TILE_LENGTH)?
        .ok_or(RasterError::MissingTag { tag: "TileLength" })? as usize;
    if tile_width == 0 || tile_length == 0 {
        return Err(RasterError::corrupt("zero tile dimensions"));
    }
    let offsets = ifd
        .uints(buf, TAG_TILE_OFFSETS)?
        .ok_or(RasterError::MissingTag { tag: "TileOffsets" })?;
    let counts = ifd
        .uints(buf, TAG_TILE_BYTE_COUNTS)?
        .ok_or(RasterError::MissingTag { tag: "TileByteCounts" })?;
    if offsets.len() != counts.len() {
        return Err(RasterError::corrupt("tile offset/count mismatch"));
    }

    let tiles_across = layout.width.div_ceil(tile_width);
    let tiles_down = layout.height.div_ceil(tile_length);
    let tiles_per_band = tiles_across * tiles_down;
    if offsets.len() < tiles_per_band {
        return Err(RasterError::corrupt("fewer tiles than the image needs"));
    }

    let step = if layout.planar == 2 { 1 } else { layout.samples };
    let sample_size = layout.pixel.byte_len();

    // Band 1 is the first tile plane in both planar configurations.
    for tile_idx in 0..tiles_per_band {
        let tile_row = tile_idx / tiles_across;
        let tile_col = tile_idx % tiles_across;
        let raw = buf.bytes_at(offsets[tile_idx] as usize, counts[tile_idx] as usize)?;
        let chunk = decompress(layout.compression, raw)?;

        let y0 = tile_row * tile_length;
        let x0 = tile_col * tile_width;
        let rows = tile_length.min(layout.height.saturating_sub(y0));
        let cols = tile_width.min(layout.width.saturating_sub(x0));

        for r in 0..rows {
            for c in 0..cols {
                let sample_idx = (r * tile_width + c) * step;
                let byte_off = sample_idx * sample_size;
                let value = layout
                    .pixel
                    .sample_at(&chunk, byte_off, buf.big_endian)
                    .ok_or_else(|| RasterError::corrupt("tile shorter than expected"))?;
                band[(y0 + r) * layout.width + (x0 + c)] = value;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::PixelType;

    /// Hand-assembles a 2x2 big-endian u16 TIFF with one strip.
    fn big_endian_fixture() -> Vec<u8> {
        let mut out = Vec::new();
        let push_u16 = |out: &mut Vec<u8>, v: u16| out.extend_from_slice(&v.to_be_bytes());
        let push_u32 = |out: &mut Vec<u8>, v: u32| out.extend_from_slice(&v.to_be_bytes());

        out.extend_from_slice(b"MM");
        push_u16(&mut out, 42);
        push_u32(&mut out, 16); // IFD offset: header + 8 data bytes

        // Pixel data: 100, 200, 300, 400 as BE u16.
        for v in [100u16, 200, 300, 400] {
            push_u16(&mut out, v);
        }

        // IFD with 8 entries.
        push_u16(&mut out, 8);
        let entry = |out: &mut Vec<u8>, tag: u16, type_: u16, count: u32, value: u32| {
            push_u16(out, tag);
            push_u16(out, type_);
            push_u32(out, count);
            match type_ {
                3 => {
                    push_u16(out, value as u16);
                    push_u16(out, 0);
                },
                _ => push_u32(out, value),
            }
        };
        entry(&mut out, TAG_IMAGE_WIDTH, 3, 1, 2);
        entry(&mut out, TAG_IMAGE_LENGTH, 3, 1, 2);
        entry(&mut out, TAG_BITS_PER_SAMPLE, 3, 1, 16);
        entry(&mut out, TAG_COMPRESSION, 3, 1, 1);
        entry(&mut out, TAG_STRIP_OFFSETS, 4, 1, 8);
        entry(&mut out, TAG_ROWS_PER_STRIP, 3, 1, 2);
        entry(&mut out, TAG_STRIP_BYTE_COUNTS, 4, 1, 8);
        entry(&mut out, TAG_SAMPLE_FORMAT, 3, 1, 1);
        push_u32(&mut out, 0); // next IFD

        out
    }

    #[test]
    fn test_rejects_non_tiff() {
        assert!(matches!(
            TiffBuffer::from_bytes(b"PNG".to_vec()),
            Err(RasterError::NotATiff { .. })
        ));
        assert!(matches!(
            TiffBuffer::from_bytes(b"XX\x00\x2a\x00\x00\x00\x08".to_vec()),
            Err(RasterError::NotATiff { .. })
        ));
    }

    #[test]
    fn test_rejects_bigtiff() {
        let mut data = b"II".to_vec();
        data.extend_from_slice(&43u16.to_le_bytes());
        data.extend_from_slice(&[0u8; 12]);
        let err = TiffBuffer::from_bytes(data).unwrap_err();
        assert!(err.to_string().contains("BigTIFF"));
    }

    #[test]
    fn test_big_endian_u16_decode() {
        let buf = TiffBuffer::from_bytes(big_endian_fixture()).unwrap();
        assert!(buf.big_endian);
        let ifd = Ifd::parse(&buf).unwrap();
        assert_eq!(ifd.uint(&buf, TAG_IMAGE_WIDTH).unwrap(), Some(2));

        let band = decode_band(&buf, &ifd, PixelType::U16, 1).unwrap();
        assert_eq!(band, vec![100.0, 200.0, 300.0, 400.0]);
    }

    #[test]
    fn test_truncated_strip_is_corrupt() {
        let buf = TiffBuffer::from_bytes(big_endian_fixture()).unwrap();
        let ifd = Ifd::parse(&buf).unwrap();
        // Lie about the pixel type: F32 needs 16 bytes but the strip has 8.
        let err = decode_band(&buf, &ifd, PixelType::F32, 1).unwrap_err();
        assert!(matches!(err, RasterError::Corrupt { .. }));
    }
}
