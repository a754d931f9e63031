//! Raster metadata extraction.

use std::path::Path;

use log::debug;

use crate::error::RasterError;
use crate::tiff::{
    Ifd, KEY_GEOGRAPHIC_TYPE, KEY_PROJECTED_CS_TYPE, TAG_BITS_PER_SAMPLE, TAG_COMPRESSION,
    TAG_GDAL_NODATA, TAG_GEO_KEY_DIRECTORY, TAG_IMAGE_LENGTH, TAG_IMAGE_WIDTH,
    TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT, TAG_MODEL_TRANSFORMATION, TAG_SAMPLES_PER_PIXEL,
    TAG_SAMPLE_FORMAT, TAG_TILE_OFFSETS, TiffBuffer, decode_band,
};

/// Sample type of a raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    /// Unsigned 8-bit.
    U8,
    /// Unsigned 16-bit.
    U16,
    /// Signed 16-bit.
    I16,
    /// IEEE 32-bit float.
    F32,
}

impl PixelType {
    /// Derives the pixel type from the TIFF `BitsPerSample` and
    /// `SampleFormat` values.
    pub(crate) fn from_tags(bits: u64, format: u64) -> Result<Self, RasterError> {
        match (bits, format) {
            (8, 1) => Ok(Self::U8),
            (16, 1) => Ok(Self::U16),
            (16, 2) => Ok(Self::I16),
            (32, 3) => Ok(Self::F32),
            (bits, format) => Err(RasterError::Unsupported {
                feature: format!("sample layout ({bits} bits, format {format})"),
            }),
        }
    }

    /// Bytes per sample.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::F32 => 4,
        }
    }

    /// Display label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::U8 => "UInt8",
            Self::U16 => "UInt16",
            Self::I16 => "Int16",
            Self::F32 => "Float32",
        }
    }

    /// Reads the sample at `byte_off` from a decoded chunk, honoring the
    /// container byte order. Returns `None` past the end of the chunk.
    pub(crate) fn sample_at(&self, chunk: &[u8], byte_off: usize, big_endian: bool) -> Option<f64> {
        let bytes = chunk.get(byte_off..byte_off + self.byte_len())?;
        Some(match self {
            Self::U8 => f64::from(bytes[0]),
            Self::U16 => {
                let arr = [bytes[0], bytes[1]];
                f64::from(if big_endian {
                    u16::from_be_bytes(arr)
                } else {
                    u16::from_le_bytes(arr)
                })
            },
            Self::I16 => {
                let arr = [bytes[0], bytes[1]];
                f64::from(if big_endian {
                    i16::from_be_bytes(arr)
                } else {
                    i16::from_le_bytes(arr)
                })
            },
            Self::F32 => {
                let arr = [bytes[0], bytes[1], bytes[2], bytes[3]];
                f64::from(if big_endian {
                    f32::from_be_bytes(arr)
                } else {
                    f32::from_le_bytes(arr)
                })
            },
        })
    }
}

/// Compression scheme of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression.
    None,
    /// DEFLATE (both the Adobe and legacy code points).
    Deflate,
    /// Any other scheme, carrying the raw TIFF code.
    Other(u16),
}

impl Compression {
    pub(crate) fn from_code(code: u16) -> Self {
        match code {
            1 => Self::None,
            8 | 32946 => Self::Deflate,
            other => Self::Other(other),
        }
    }

    pub(crate) fn code(self) -> u16 {
        match self {
            Self::None => 1,
            Self::Deflate => 8,
            Self::Other(code) => code,
        }
    }

    /// Display label.
    #[must_use]
    pub fn as_str(&self) -> String {
        match self {
            Self::None => "None".to_string(),
            Self::Deflate => "Deflate".to_string(),
            Self::Other(code) => format!("Other({code})"),
        }
    }
}

/// Metadata extracted from a GeoTIFF header.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSummary {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Number of bands.
    pub bands: u16,
    /// Sample type of band 1.
    pub pixel_type: PixelType,
    /// Container compression.
    pub compression: Compression,
    /// EPSG code from the GeoKey directory, when present.
    pub epsg: Option<u32>,
    /// GDAL-ordered affine geotransform, when derivable.
    pub geotransform: Option<[f64; 6]>,
    /// Nodata value from the GDAL tag, when present.
    pub nodata: Option<f64>,
    /// Whether the layout is tiled (as opposed to striped).
    pub tiled: bool,
}

impl RasterSummary {
    /// Returns `true` when the raster carries an affine georeference.
    #[must_use]
    pub fn is_georeferenced(&self) -> bool {
        self.geotransform.is_some()
    }
}

/// Parses the first IFD of a GeoTIFF and extracts a [`RasterSummary`].
///
/// # Errors
///
/// Returns a [`RasterError`] when the file is missing, not a classic TIFF,
/// structurally damaged, or uses an unsupported sample layout.
pub fn inspect(path: &Path) -> Result<RasterSummary, RasterError> {
    let buf = TiffBuffer::open(path)?;
    let ifd = Ifd::parse(&buf)?;
    summarize(&buf, &ifd)
}

fn summarize(buf: &TiffBuffer, ifd: &Ifd) -> Result<RasterSummary, RasterError> {
    let width = ifd
        .uint(buf, TAG_IMAGE_WIDTH)?
        .ok_or(RasterError::MissingTag { tag: "ImageWidth" })? as u32;
    let height = ifd
        .uint(buf, TAG_IMAGE_LENGTH)?
        .ok_or(RasterError::MissingTag { tag: "ImageLength" })? as u32;
    let bands = ifd.uint(buf, TAG_SAMPLES_PER_PIXEL)?.unwrap_or(1) as u16;

    let bits = ifd
        .uints(buf, TAG_BITS_PER_SAMPLE)?
        .and_then(|v| v.first().copied())
        .unwrap_or(8);
    let format = ifd
        .uints(buf, TAG_SAMPLE_FORMAT)?
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    let pixel_type = PixelType::from_tags(bits, format)?;

    let compression =
        Compression::from_code(ifd.uint(buf, TAG_COMPRESSION)?.unwrap_or(1) as u16);
    let tiled = ifd.find(TAG_TILE_OFFSETS).is_some();

    let geotransform = derive_geotransform(buf, ifd)?;
    let epsg = derive_epsg(buf, ifd)?;
    let nodata = ifd
        .ascii(buf, TAG_GDAL_NODATA)?
        .and_then(|s| s.trim().parse::<f64>().ok());

    Ok(RasterSummary {
        width,
        height,
        bands,
        pixel_type,
        compression,
        epsg,
        geotransform,
        nodata,
        tiled,
    })
}

/// Derives the GDAL-ordered geotransform from pixel-scale/tiepoint tags, or
/// the model transformation matrix when present.
fn derive_geotransform(buf: &TiffBuffer, ifd: &Ifd) -> Result<Option<[f64; 6]>, RasterError> {
    if let Some(matrix) = ifd.doubles(buf, TAG_MODEL_TRANSFORMATION)? {
        if matrix.len() >= 8 {
            return Ok(Some([
                matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
            ]));
        }
        return Err(RasterError::corrupt("short ModelTransformation tag"));
    }

    let scale = ifd.doubles(buf, TAG_MODEL_PIXEL_SCALE)?;
    let tiepoint = ifd.doubles(buf, TAG_MODEL_TIEPOINT)?;
    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            let (sx, sy) = (scale[0], scale[1]);
            let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
            Ok(Some([x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy]))
        },
        _ => Ok(None),
    }
}

/// Walks the GeoKey directory for a CRS code, preferring the projected key.
fn derive_epsg(buf: &TiffBuffer, ifd: &Ifd) -> Result<Option<u32>, RasterError> {
    let Some(directory) = ifd.uints(buf, TAG_GEO_KEY_DIRECTORY)? else {
        return Ok(None);
    };
    if directory.len() < 4 {
        return Ok(None);
    }

    let key_count = directory[3] as usize;
    let mut geographic = None;
    let mut projected = None;
    for k in 0..key_count {
        let base = 4 + k * 4;
        if base + 3 >= directory.len() {
            break;
        }
        let key_id = directory[base] as u16;
        let location = directory[base + 1];
        let value = directory[base + 3];
        // Only inline SHORT values carry a code directly.
        if location != 0 {
            continue;
        }
        match key_id {
            KEY_PROJECTED_CS_TYPE => projected = Some(value as u32),
            KEY_GEOGRAPHIC_TYPE => geographic = Some(value as u32),
            _ => {},
        }
    }

    let code = projected.or(geographic).filter(|&c| c != 0 && c != 32767);
    debug!("GeoKey CRS code: {code:?}");
    Ok(code)
}

/// Returns `true` when the file is a readable GeoTIFF carrying an affine
/// georeference. Unreadable or non-TIFF input yields `false`, never an
/// error.
#[must_use]
pub fn has_georeference(path: &Path) -> bool {
    match inspect(path) {
        Ok(summary) => summary.is_georeferenced(),
        Err(e) => {
            debug!("not georeferenced: {}: {e}", path.display());
            false
        },
    }
}

/// Opens a raster and decodes band 1 alongside its summary.
pub(crate) fn open_band(path: &Path) -> Result<(RasterSummary, Vec<f64>), RasterError> {
    let buf = TiffBuffer::open(path)?;
    let ifd = Ifd::parse(&buf)?;
    let summary = summarize(&buf, &ifd)?;
    let band = decode_band(&buf, &ifd, summary.pixel_type, summary.compression.code())?;
    Ok((summary, band))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_type_from_tags() {
        assert_eq!(PixelType::from_tags(8, 1).unwrap(), PixelType::U8);
        assert_eq!(PixelType::from_tags(16, 2).unwrap(), PixelType::I16);
        assert_eq!(PixelType::from_tags(32, 3).unwrap(), PixelType::F32);
        assert!(PixelType::from_tags(64, 3).is_err());
        assert!(PixelType::from_tags(1, 1).is_err());
    }

    #[test]
    fn test_compression_codes() {
        assert_eq!(Compression::from_code(1), Compression::None);
        assert_eq!(Compression::from_code(8), Compression::Deflate);
        assert_eq!(Compression::from_code(32946), Compression::Deflate);
        assert_eq!(Compression::from_code(5), Compression::Other(5));
    }

    #[test]
    fn test_has_georeference_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-tiff.bin");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(!has_georeference(&path));
        assert!(!has_georeference(&dir.path().join("missing.tif")));
    }
}
