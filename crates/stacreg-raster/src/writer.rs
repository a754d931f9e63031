//! Minimal GeoTIFF writer.
//!
//! Writes little-endian, single-strip, uncompressed 8-bit rasters (gray or
//! RGB) with optional GeoTIFF georeferencing tags. This is the output side
//! of quicklook rendering and doubles as the fixture writer for tests.

use std::fs;
use std::path::Path;

use crate::error::RasterError;
use crate::tiff::{
    TAG_BITS_PER_SAMPLE, TAG_COMPRESSION, TAG_GDAL_NODATA, TAG_GEO_KEY_DIRECTORY,
    TAG_IMAGE_LENGTH, TAG_IMAGE_WIDTH, TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT,
    TAG_PHOTOMETRIC, TAG_PLANAR_CONFIG, TAG_ROWS_PER_STRIP, TAG_SAMPLES_PER_PIXEL,
    TAG_STRIP_BYTE_COUNTS, TAG_STRIP_OFFSETS,
};

/// 8-bit pixel payload, row-major.
#[derive(Debug, Clone)]
pub enum Pixels {
    /// One sample per pixel.
    Gray(Vec<u8>),
    /// Interleaved RGB triplets.
    Rgb(Vec<u8>),
}

impl Pixels {
    fn samples(&self) -> u16 {
        match self {
            Pixels::Gray(_) => 1,
            Pixels::Rgb(_) => 3,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Pixels::Gray(b) | Pixels::Rgb(b) => b,
        }
    }
}

/// An 8-bit image plus the georeferencing carried into the output file.
#[derive(Debug, Clone)]
pub struct GeoTiffImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel payload; length must be `width * height * samples`.
    pub pixels: Pixels,
    /// North-up affine geotransform (GDAL order). Rotated transforms are
    /// rejected.
    pub geotransform: Option<[f64; 6]>,
    /// EPSG code for the GeoKey directory.
    pub epsg: Option<u32>,
    /// Nodata value for the GDAL tag.
    pub nodata: Option<f64>,
}

enum Value {
    Short(u16),
    Long(u32),
    /// Out-of-line payload: (field type, count, bytes).
    External(u16, u32, Vec<u8>),
    /// Inline ASCII (four bytes or fewer including the NUL).
    InlineAscii(Vec<u8>),
}

/// Serializes the image to `path`.
///
/// # Errors
///
/// Returns a [`RasterError`] when the payload length does not match the
/// dimensions, the geotransform is rotated, or the file cannot be written.
pub fn write_geotiff(path: &Path, image: &GeoTiffImage) -> Result<(), RasterError> {
    let samples = image.pixels.samples();
    let expected = image.width as usize * image.height as usize * samples as usize;
    if image.pixels.bytes().len() != expected {
        return Err(RasterError::corrupt(format!(
            "pixel payload is {} bytes, expected {expected}",
            image.pixels.bytes().len()
        )));
    }
    if let Some(gt) = image.geotransform {
        if gt[2] != 0.0 || gt[4] != 0.0 {
            return Err(RasterError::unsupported(
                "rotated geotransform in GeoTIFF output",
            ));
        }
    }

    let data = image.pixels.bytes();
    let mut entries: Vec<(u16, Value)> = vec![
        (TAG_IMAGE_WIDTH, Value::Long(image.width)),
        (TAG_IMAGE_LENGTH, Value::Long(image.height)),
        (TAG_COMPRESSION, Value::Short(1)),
        (
            TAG_PHOTOMETRIC,
            Value::Short(if samples == 3 { 2 } else { 1 }),
        ),
        (TAG_STRIP_OFFSETS, Value::Long(8)),
        (TAG_SAMPLES_PER_PIXEL, Value::Short(samples)),
        (TAG_ROWS_PER_STRIP, Value::Long(image.height)),
        (TAG_STRIP_BYTE_COUNTS, Value::Long(data.len() as u32)),
        (TAG_PLANAR_CONFIG, Value::Short(1)),
    ];

    if samples == 1 {
        entries.push((TAG_BITS_PER_SAMPLE, Value::Short(8)));
    } else {
        let mut bits = Vec::new();
        for _ in 0..samples {
            bits.extend_from_slice(&8u16.to_le_bytes());
        }
        entries.push((TAG_BITS_PER_SAMPLE, Value::External(3, u32::from(samples), bits)));
    }

    if let Some(gt) = image.geotransform {
        let mut scale = Vec::new();
        for v in [gt[1], -gt[5], 0.0] {
            scale.extend_from_slice(&v.to_le_bytes());
        }
        entries.push((TAG_MODEL_PIXEL_SCALE, Value::External(12, 3, scale)));

        let mut tiepoint = Vec::new();
        for v in [0.0, 0.0, 0.0, gt[0], gt[3], 0.0] {
            tiepoint.extend_from_slice(&v.to_le_bytes());
        }
        entries.push((TAG_MODEL_TIEPOINT, Value::External(12, 6, tiepoint)));
    }

    if let Some(epsg) = image.epsg {
        // Geographic codes sit in the 4xxx block; everything else is
        // treated as projected.
        let geographic = (4000..5000).contains(&epsg);
        let crs_key: u16 = if geographic { 2048 } else { 3072 };
        let model: u16 = if geographic { 2 } else { 1 };

        let keys: [u16; 16] = [
            1, 1, 0, 3, // directory header: version, revision, minor, key count
            1024, 0, 1, model, // GTModelTypeGeoKey
            1025, 0, 1, 1, // GTRasterTypeGeoKey: PixelIsArea
            crs_key, 0, 1, epsg as u16,
        ];
        let mut bytes = Vec::new();
        for k in keys {
            bytes.extend_from_slice(&k.to_le_bytes());
        }
        entries.push((TAG_GEO_KEY_DIRECTORY, Value::External(3, 16, bytes)));
    }

    if let Some(nodata) = image.nodata {
        let mut text = nodata.to_string().into_bytes();
        text.push(0);
        if text.len() <= 4 {
            entries.push((TAG_GDAL_NODATA, Value::InlineAscii(text)));
        } else {
            let count = text.len() as u32;
            entries.push((TAG_GDAL_NODATA, Value::External(2, count, text)));
        }
    }

    entries.sort_by_key(|(tag, _)| *tag);

    // Layout: header, strip data, word-aligned external payloads, IFD.
    let mut out = Vec::with_capacity(8 + data.len() + entries.len() * 12 + 128);
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // IFD offset patched below
    out.extend_from_slice(data);
    if out.len() % 2 == 1 {
        out.push(0);
    }

    let mut external_offsets = Vec::with_capacity(entries.len());
    for (_, value) in &entries {
        if let Value::External(_, _, bytes) = value {
            external_offsets.push(out.len() as u32);
            out.extend_from_slice(bytes);
            if out.len() % 2 == 1 {
                out.push(0);
            }
        } else {
            external_offsets.push(0);
        }
    }

    let ifd_offset = out.len() as u32;
    out[4..8].copy_from_slice(&ifd_offset.to_le_bytes());

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (idx, (tag, value)) in entries.iter().enumerate() {
        out.extend_from_slice(&tag.to_le_bytes());
        match value {
            Value::Short(v) => {
                out.extend_from_slice(&3u16.to_le_bytes());
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&v.to_le_bytes());
                out.extend_from_slice(&[0, 0]);
            },
            Value::Long(v) => {
                out.extend_from_slice(&4u16.to_le_bytes());
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&v.to_le_bytes());
            },
            Value::External(field_type, count, _) => {
                out.extend_from_slice(&field_type.to_le_bytes());
                out.extend_from_slice(&count.to_le_bytes());
                out.extend_from_slice(&external_offsets[idx].to_le_bytes());
            },
            Value::InlineAscii(bytes) => {
                out.extend_from_slice(&2u16.to_le_bytes());
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                let mut padded = bytes.clone();
                padded.resize(4, 0);
                out.extend_from_slice(&padded);
            },
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes()); // no further IFDs

    fs::write(path, &out).map_err(|e| RasterError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{Compression, PixelType, has_georeference, inspect};

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        (0..width * height).map(|i| (i % 256) as u8).collect()
    }

    #[test]
    fn test_written_file_reinspects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");

        let image = GeoTiffImage {
            width: 16,
            height: 9,
            pixels: Pixels::Gray(gradient(16, 9)),
            geotransform: Some([500_000.0, 10.0, 0.0, 5_200_000.0, 0.0, -10.0]),
            epsg: Some(32632),
            nodata: Some(0.0),
        };
        write_geotiff(&path, &image).unwrap();

        let summary = inspect(&path).unwrap();
        assert_eq!(summary.width, 16);
        assert_eq!(summary.height, 9);
        assert_eq!(summary.bands, 1);
        assert_eq!(summary.pixel_type, PixelType::U8);
        assert_eq!(summary.compression, Compression::None);
        assert_eq!(summary.epsg, Some(32632));
        assert_eq!(
            summary.geotransform,
            Some([500_000.0, 10.0, 0.0, 5_200_000.0, 0.0, -10.0])
        );
        assert_eq!(summary.nodata, Some(0.0));
        assert!(has_georeference(&path));
    }

    #[test]
    fn test_plain_tiff_has_no_georeference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.tif");

        let image = GeoTiffImage {
            width: 4,
            height: 4,
            pixels: Pixels::Gray(gradient(4, 4)),
            geotransform: None,
            epsg: None,
            nodata: None,
        };
        write_geotiff(&path, &image).unwrap();
        assert!(!has_georeference(&path));
        assert!(inspect(&path).unwrap().epsg.is_none());
    }

    #[test]
    fn test_rgb_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.tif");

        let image = GeoTiffImage {
            width: 3,
            height: 2,
            pixels: Pixels::Rgb(vec![0; 18]),
            geotransform: Some([0.0, 1.0, 0.0, 2.0, 0.0, -1.0]),
            epsg: Some(4326),
            nodata: None,
        };
        write_geotiff(&path, &image).unwrap();

        let summary = inspect(&path).unwrap();
        assert_eq!(summary.bands, 3);
        assert_eq!(summary.epsg, Some(4326));
    }

    #[test]
    fn test_payload_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeoTiffImage {
            width: 4,
            height: 4,
            pixels: Pixels::Gray(vec![0; 3]),
            geotransform: None,
            epsg: None,
            nodata: None,
        };
        let err = write_geotiff(&dir.path().join("bad.tif"), &image).unwrap_err();
        assert!(matches!(err, RasterError::Corrupt { .. }));
    }

    #[test]
    fn test_rotated_geotransform_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeoTiffImage {
            width: 1,
            height: 1,
            pixels: Pixels::Gray(vec![0]),
            geotransform: Some([0.0, 1.0, 0.5, 0.0, 0.5, -1.0]),
            epsg: None,
            nodata: None,
        };
        let err = write_geotiff(&dir.path().join("rot.tif"), &image).unwrap_err();
        assert!(matches!(err, RasterError::Unsupported { .. }));
    }
}
