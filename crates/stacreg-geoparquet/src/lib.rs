//! GeoParquet export of STAC item collections.
//!
//! Items become one row each: scalar catalog columns, a bbox struct, WKB
//! geometry and JSON-encoded properties/assets. The written file carries
//! GeoParquet 1.1.0 `geo` metadata so downstream dataframe tooling picks up
//! the geometry column without hints.

mod schema;

pub use schema::item_schema;

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use log::info;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use thiserror::Error;

use stacreg_core::stac::Item;

/// Errors raised while exporting items.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to assemble the record batch.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Failed to write the Parquet file.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// An item geometry could not be encoded as WKB.
    #[error("Failed to encode geometry of item '{id}': {source}")]
    Geometry {
        /// The item id.
        id: String,
        /// The underlying geozero error.
        #[source]
        source: geozero::error::GeozeroError,
    },

    /// An item field could not be JSON-encoded.
    #[error("Failed to serialize item '{id}': {source}")]
    Serialize {
        /// The item id.
        id: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The output file could not be created.
    #[error("Failed to create '{path}': {source}")]
    Io {
        /// The output path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Outcome of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportReport {
    /// Rows written.
    pub rows: usize,
}

/// Writes items to a GeoParquet file.
///
/// An empty input still produces a valid file carrying the schema and `geo`
/// metadata.
///
/// # Errors
///
/// Returns an [`ExportError`] when encoding or writing fails.
pub fn write_items(path: &Path, items: &[Item]) -> Result<ExportReport> {
    let batch = schema::items_to_batch(items)?;

    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let properties = WriterProperties::builder()
        .set_key_value_metadata(Some(vec![KeyValue {
            key: "geo".to_string(),
            value: Some(geo_metadata(items)),
        }]))
        .build();

    let mut writer = ArrowWriter::try_new(file, Arc::new(item_schema()), Some(properties))?;
    writer.write(&batch)?;
    writer.close()?;

    info!("wrote {} item(s) to {}", items.len(), path.display());
    Ok(ExportReport { rows: items.len() })
}

/// An [`ItemSink`] that lands items in a GeoParquet file.
pub struct GeoParquetSink {
    path: std::path::PathBuf,
}

impl GeoParquetSink {
    /// Creates a sink writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl stacreg_core::sink::ItemSink for GeoParquetSink {
    async fn register(&mut self, items: &[Item]) -> anyhow::Result<usize> {
        let report = write_items(&self.path, items)?;
        Ok(report.rows)
    }

    fn name(&self) -> &'static str {
        "geoparquet"
    }
}

/// GeoParquet 1.1.0 file metadata for the geometry column.
fn geo_metadata(items: &[Item]) -> String {
    let geometry_types = collect_geometry_types(items);
    let mut column = serde_json::json!({
        "encoding": "WKB",
        "geometry_types": geometry_types,
    });
    if let Some(bbox) = union_bbox(items) {
        column["bbox"] = serde_json::json!(bbox);
    }

    serde_json::json!({
        "version": "1.1.0",
        "primary_column": "geometry",
        "columns": { "geometry": column },
    })
    .to_string()
}

fn collect_geometry_types(items: &[Item]) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for item in items {
        if let Some(geometry) = &item.geometry {
            let name = geometry.value.type_name().to_string();
            if !types.contains(&name) {
                types.push(name);
            }
        }
    }
    types.sort();
    types
}

fn union_bbox(items: &[Item]) -> Option<[f64; 4]> {
    let mut out: Option<[f64; 4]> = None;
    for bbox in items.iter().filter_map(|i| i.bbox) {
        out = Some(match out {
            None => bbox,
            Some(acc) => [
                acc[0].min(bbox[0]),
                acc[1].min(bbox[1]),
                acc[2].max(bbox[2]),
                acc[3].max(bbox[3]),
            ],
        });
    }
    out
}
