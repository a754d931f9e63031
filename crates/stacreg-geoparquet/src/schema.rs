//! Arrow schema and batch construction for item export.

use std::sync::Arc;

use arrow_array::{
    ArrayRef, BinaryArray, Float64Array, RecordBatch, StringArray, StructArray,
    TimestampMillisecondArray,
};
use arrow_schema::{DataType, Field, Fields, Schema, TimeUnit};
use geozero::{CoordDimensions, ToWkb, geojson::GeoJson};

use stacreg_core::stac::Item;

use crate::ExportError;

/// Fields of the `bbox` struct column.
fn bbox_fields() -> Fields {
    Fields::from(vec![
        Field::new("xmin", DataType::Float64, true),
        Field::new("ymin", DataType::Float64, true),
        Field::new("xmax", DataType::Float64, true),
        Field::new("ymax", DataType::Float64, true),
    ])
}

/// The item export schema: scalar catalog columns, a bbox struct, WKB
/// geometry, and JSON-encoded properties and assets.
#[must_use]
pub fn item_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("collection", DataType::Utf8, true),
        Field::new(
            "datetime",
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            true,
        ),
        Field::new("bbox", DataType::Struct(bbox_fields()), true),
        Field::new("geometry", DataType::Binary, true),
        Field::new("properties", DataType::Utf8, true),
        Field::new("assets", DataType::Utf8, true),
    ])
}

/// Encodes an item geometry as WKB.
pub(crate) fn geometry_wkb(item: &Item) -> Result<Option<Vec<u8>>, ExportError> {
    let Some(geometry) = &item.geometry else {
        return Ok(None);
    };
    let geojson = serde_json::to_string(geometry).map_err(|source| ExportError::Serialize {
        id: item.id.clone(),
        source,
    })?;
    let wkb = GeoJson(&geojson)
        .to_wkb(CoordDimensions::xy())
        .map_err(|source| ExportError::Geometry {
            id: item.id.clone(),
            source,
        })?;
    Ok(Some(wkb))
}

/// Builds one record batch covering all items.
pub(crate) fn items_to_batch(items: &[Item]) -> Result<RecordBatch, ExportError> {
    let schema = Arc::new(item_schema());

    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    let collections: Vec<Option<&str>> = items.iter().map(|i| i.collection.as_deref()).collect();
    let datetimes: Vec<Option<i64>> = items
        .iter()
        .map(|i| i.datetime().map(|dt| dt.timestamp_millis()))
        .collect();

    let mut wkbs: Vec<Option<Vec<u8>>> = Vec::with_capacity(items.len());
    for item in items {
        wkbs.push(geometry_wkb(item)?);
    }

    let mut properties = Vec::with_capacity(items.len());
    let mut assets = Vec::with_capacity(items.len());
    for item in items {
        properties.push(
            serde_json::to_string(&item.properties).map_err(|source| ExportError::Serialize {
                id: item.id.clone(),
                source,
            })?,
        );
        assets.push(
            serde_json::to_string(&item.assets).map_err(|source| ExportError::Serialize {
                id: item.id.clone(),
                source,
            })?,
        );
    }

    let bbox_component = |idx: usize| -> ArrayRef {
        Arc::new(Float64Array::from(
            items
                .iter()
                .map(|i| i.bbox.map(|b| b[idx]))
                .collect::<Vec<_>>(),
        ))
    };
    let bbox_array = StructArray::new(
        bbox_fields(),
        vec![
            bbox_component(0),
            bbox_component(1),
            bbox_component(2),
            bbox_component(3),
        ],
        None,
    );

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(StringArray::from(collections)),
        Arc::new(TimestampMillisecondArray::from(datetimes).with_timezone("UTC")),
        Arc::new(bbox_array),
        Arc::new(BinaryArray::from_opt_vec(
            wkbs.iter().map(|w| w.as_deref()).collect(),
        )),
        Arc::new(StringArray::from(properties)),
        Arc::new(StringArray::from(assets)),
    ];

    RecordBatch::try_new(schema, columns).map_err(ExportError::Arrow)
}
