//! GeoTIFF inspection and quicklook rendering for `stacreg`.
//!
//! This crate reads classic (non-Big) TIFF containers directly — no C
//! library bindings — and provides:
//!
//! - [`inspect`]: raster metadata extraction ([`RasterSummary`]: size, pixel
//!   type, EPSG code, geotransform, nodata),
//! - [`has_georeference`]: a cheap georeference check used before
//!   registration,
//! - [`quicklook::render`]: byte-scaled, downsampled quicklooks with
//!   optional color relief driven by a [`stacreg_core::colormap::ColorMap`],
//! - [`enrich_item`]: projection-extension properties for STAC records,
//! - [`writer`]: a minimal striped GeoTIFF writer used for quicklook output
//!   and test fixtures.
//!
//! Strip and tile layouts are supported with no compression or DEFLATE;
//! anything else is reported as an explicit [`RasterError::Unsupported`].

mod enrich;
mod error;
pub mod quicklook;
mod summary;
mod tiff;
pub mod writer;

pub use enrich::enrich_item;
pub use error::RasterError;
pub use summary::{Compression, PixelType, RasterSummary, has_georeference, inspect};

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, RasterError>;
