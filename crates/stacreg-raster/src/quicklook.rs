//! Quicklook rendering: byte scaling, downsampling and color relief.

use std::path::Path;

use log::info;

use stacreg_core::colormap::ColorMap;

use crate::error::RasterError;
use crate::summary::{RasterSummary, open_band};
use crate::writer::{GeoTiffImage, Pixels, write_geotiff};

/// Options controlling quicklook rendering.
#[derive(Debug, Clone)]
pub struct QuicklookOptions {
    /// Maximum edge length of the output in pixels. The source is never
    /// upsampled.
    pub max_size: u32,
    /// Explicit `(min, max)` scaling range. When absent the band min/max is
    /// computed, ignoring nodata and non-finite samples.
    pub scale: Option<(f64, f64)>,
    /// Color relief map. When present the output is RGB and source values
    /// are mapped through the color table; otherwise the output is
    /// byte-scaled grayscale.
    pub color_map: Option<ColorMap>,
}

impl Default for QuicklookOptions {
    fn default() -> Self {
        Self {
            max_size: 1024,
            scale: None,
            color_map: None,
        }
    }
}

/// What a rendering pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct QuicklookReport {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// The scaling range that was applied.
    pub scale: (f64, f64),
    /// Whether color relief was applied.
    pub colored: bool,
}

/// Renders a quicklook of band 1 of `input` into `output`.
///
/// # Errors
///
/// Returns a [`RasterError`] when the source cannot be decoded, the color
/// map is empty, or the output cannot be written.
pub fn render(
    input: &Path,
    output: &Path,
    options: &QuicklookOptions,
) -> Result<QuicklookReport, RasterError> {
    let (summary, band) = open_band(input)?;
    info!(
        "quicklook: {} ({}x{} {}) -> {}",
        input.display(),
        summary.width,
        summary.height,
        summary.pixel_type.as_str(),
        output.display()
    );

    let (min, max) = match options.scale {
        Some(range) => range,
        None => band_range(&band, summary.nodata),
    };

    let (out_w, out_h) = target_dimensions(summary.width, summary.height, options.max_size);
    let pixels = match &options.color_map {
        Some(map) => Pixels::Rgb(colorize(&band, &summary, map, (out_w, out_h))?),
        None => Pixels::Gray(grayscale(&band, &summary, (min, max), (out_w, out_h))),
    };

    let image = GeoTiffImage {
        width: out_w,
        height: out_h,
        pixels,
        geotransform: summary.geotransform.map(|gt| scale_geotransform(gt, &summary, out_w, out_h)),
        epsg: summary.epsg,
        nodata: None,
    };
    write_geotiff(output, &image)?;

    Ok(QuicklookReport {
        width: out_w,
        height: out_h,
        scale: (min, max),
        colored: options.color_map.is_some(),
    })
}

/// Band min/max ignoring nodata and non-finite samples. Falls back to
/// `(0, 0)` for an all-nodata band.
fn band_range(band: &[f64], nodata: Option<f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in band {
        if !v.is_finite() {
            continue;
        }
        if let Some(nd) = nodata {
            if v == nd {
                continue;
            }
        }
        min = min.min(v);
        max = max.max(v);
    }
    if min > max { (0.0, 0.0) } else { (min, max) }
}

/// Output dimensions: shrink so the longer edge equals `max_size`,
/// preserving aspect; never upsample.
fn target_dimensions(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    let longest = width.max(height);
    if max_size == 0 || longest <= max_size {
        return (width, height);
    }
    let ratio = f64::from(longest) / f64::from(max_size);
    let w = ((f64::from(width) / ratio) as u32).max(1);
    let h = ((f64::from(height) / ratio) as u32).max(1);
    (w, h)
}

/// Nearest-neighbor source index for an output pixel.
fn source_index(x: u32, y: u32, summary: &RasterSummary, out_w: u32, out_h: u32) -> usize {
    let sx = (u64::from(x) * u64::from(summary.width) / u64::from(out_w)) as usize;
    let sy = (u64::from(y) * u64::from(summary.height) / u64::from(out_h)) as usize;
    sy * summary.width as usize + sx
}

fn grayscale(
    band: &[f64],
    summary: &RasterSummary,
    (min, max): (f64, f64),
    (out_w, out_h): (u32, u32),
) -> Vec<u8> {
    let span = max - min;
    let mut out = Vec::with_capacity(out_w as usize * out_h as usize);
    for y in 0..out_h {
        for x in 0..out_w {
            let v = band[source_index(x, y, summary, out_w, out_h)];
            let is_nodata = summary.nodata.is_some_and(|nd| v == nd) || !v.is_finite();
            let byte = if is_nodata || span <= 0.0 {
                0
            } else {
                (((v - min) / span) * 255.0).round().clamp(0.0, 255.0) as u8
            };
            out.push(byte);
        }
    }
    out
}

fn colorize(
    band: &[f64],
    summary: &RasterSummary,
    map: &ColorMap,
    (out_w, out_h): (u32, u32),
) -> Result<Vec<u8>, RasterError> {
    let nodata_color = map.nodata.as_ref().map(|e| e.as_rgb()).unwrap_or([0, 0, 0]);

    let mut out = Vec::with_capacity(out_w as usize * out_h as usize * 3);
    for y in 0..out_h {
        for x in 0..out_w {
            let v = band[source_index(x, y, summary, out_w, out_h)];
            let is_nodata = summary.nodata.is_some_and(|nd| v == nd) || !v.is_finite();
            let rgb = if is_nodata {
                nodata_color
            } else {
                map.interpolate(v)?
            };
            out.extend_from_slice(&rgb);
        }
    }
    Ok(out)
}

/// Stretches the pixel size so the output covers the same extent as the
/// source.
fn scale_geotransform(gt: [f64; 6], summary: &RasterSummary, out_w: u32, out_h: u32) -> [f64; 6] {
    let x_ratio = f64::from(summary.width) / f64::from(out_w);
    let y_ratio = f64::from(summary.height) / f64::from(out_h);
    [
        gt[0],
        gt[1] * x_ratio,
        gt[2],
        gt[3],
        gt[4],
        gt[5] * y_ratio,
    ]
}
