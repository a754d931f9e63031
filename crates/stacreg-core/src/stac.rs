//! STAC data structures and record construction.
//!
//! The subset of STAC 1.0.0 needed for registration, modeled as plain serde
//! data structures. [`ItemBuilder`] assembles valid [`Item`]s from harvested
//! resource metadata; backends serialize the records to JSON for pgstac or
//! column-encode them for GeoParquet.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StacError;

/// The STAC version written into produced records.
pub const STAC_VERSION: &str = "1.0.0";

/// A STAC Item: a GeoJSON feature with catalog metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Always `"Feature"`.
    #[serde(rename = "type")]
    pub type_: String,
    /// STAC specification version.
    pub stac_version: String,
    /// Unique identifier within the collection.
    pub id: String,
    /// Footprint geometry.
    pub geometry: Option<geojson::Geometry>,
    /// `[xmin, ymin, xmax, ymax]` in WGS84.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    /// Item properties; always contains `datetime`.
    pub properties: Map<String, Value>,
    /// Related links.
    #[serde(default)]
    pub links: Vec<Link>,
    /// Assets by key.
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,
    /// Parent collection id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Item {
    /// The item's `datetime` property parsed back to a timestamp, when
    /// present and valid.
    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.properties
            .get("datetime")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A STAC Asset: a file or service reachable from an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Asset location.
    pub href: String,
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Media type of the asset.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Asset roles (`data`, `thumbnail`, `metadata`, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl Asset {
    /// Creates an asset for an href, inferring the media type from its
    /// extension.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        let href = href.into();
        let media_type = media_type_for_href(&href).map(str::to_string);
        Self {
            href,
            title: None,
            media_type,
            roles: Vec::new(),
        }
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A STAC Link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Link target.
    pub href: String,
    /// Link relation (`self`, `parent`, `collection`, ...).
    pub rel: String,
    /// Media type of the target.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A STAC Collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Always `"Collection"`.
    #[serde(rename = "type")]
    pub type_: String,
    /// STAC specification version.
    pub stac_version: String,
    /// Collection identifier.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Data license (SPDX identifier or `proprietary`).
    pub license: String,
    /// Spatial and temporal extent.
    pub extent: Extent,
    /// Related links.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Collection {
    /// Creates a collection with a global spatial extent and an open
    /// temporal interval.
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_: "Collection".to_string(),
            stac_version: STAC_VERSION.to_string(),
            id: id.into(),
            description: description.into(),
            license: "proprietary".to_string(),
            extent: Extent::default(),
            links: Vec::new(),
        }
    }
}

/// Collection extent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extent {
    /// Spatial extent.
    pub spatial: SpatialExtent,
    /// Temporal extent.
    pub temporal: TemporalExtent,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            spatial: SpatialExtent {
                bbox: vec![[-180.0, -90.0, 180.0, 90.0]],
            },
            temporal: TemporalExtent {
                interval: vec![[None, None]],
            },
        }
    }
}

/// Spatial extent: one or more bounding boxes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialExtent {
    /// Bounding boxes; the first encloses all others.
    pub bbox: Vec<[f64; 4]>,
}

/// Temporal extent: one or more RFC 3339 intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalExtent {
    /// Intervals; open ends are `null`.
    pub interval: Vec<[Option<String>; 2]>,
}

/// Infers a media type from an href's extension.
#[must_use]
pub fn media_type_for_href(href: &str) -> Option<&'static str> {
    let ext = href.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "tif" | "tiff" => Some("image/tiff; application=geotiff"),
        "jp2" => Some("image/jp2"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "xml" => Some("application/xml"),
        "json" | "geojson" => Some("application/geo+json"),
        "zip" => Some("application/zip"),
        "nc" => Some("application/x-netcdf"),
        "parquet" => Some("application/vnd.apache.parquet"),
        _ => None,
    }
}

/// Builds a polygon geometry covering a bbox.
#[must_use]
pub fn bbox_polygon(bbox: [f64; 4]) -> geojson::Geometry {
    let [xmin, ymin, xmax, ymax] = bbox;
    let ring = vec![
        vec![xmin, ymin],
        vec![xmax, ymin],
        vec![xmax, ymax],
        vec![xmin, ymax],
        vec![xmin, ymin],
    ];
    geojson::Geometry::new(geojson::Value::Polygon(vec![ring]))
}

/// Assembles and validates STAC Items.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use stacreg_core::stac::{Asset, ItemBuilder};
///
/// let item = ItemBuilder::new("S2A_MSIL2A_20230501")
///     .collection("sentinel-2-l2a")
///     .datetime(Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap())
///     .bbox([8.2, 46.1, 9.9, 47.3])
///     .asset("data", Asset::new("https://example.com/granule.zip").with_role("data"))
///     .build()
///     .unwrap();
/// assert_eq!(item.collection.as_deref(), Some("sentinel-2-l2a"));
/// assert!(item.geometry.is_some());
/// ```
#[derive(Debug, Default)]
pub struct ItemBuilder {
    id: String,
    collection: Option<String>,
    datetime: Option<DateTime<Utc>>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    bbox: Option<[f64; 4]>,
    geometry: Option<geojson::Geometry>,
    properties: Map<String, Value>,
    assets: BTreeMap<String, Asset>,
    links: Vec<Link>,
}

impl ItemBuilder {
    /// Starts a builder for the given item id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the parent collection id.
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets the nominal acquisition datetime.
    #[must_use]
    pub fn datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = Some(datetime);
        self
    }

    /// Sets the acquisition interval (`start_datetime` / `end_datetime`).
    #[must_use]
    pub fn interval(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Sets the WGS84 bounding box.
    #[must_use]
    pub fn bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Sets an explicit footprint geometry (otherwise derived from the bbox).
    #[must_use]
    pub fn geometry(mut self, geometry: geojson::Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Sets an arbitrary property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Adds an asset under the given key.
    #[must_use]
    pub fn asset(mut self, key: impl Into<String>, asset: Asset) -> Self {
        self.assets.insert(key.into(), asset);
        self
    }

    /// Adds a link.
    #[must_use]
    pub fn link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// Validates the accumulated state and produces the item.
    ///
    /// # Errors
    ///
    /// Returns a [`StacError`] when the id is empty, no datetime (or
    /// interval) was provided, or the bbox is not min/max ordered.
    pub fn build(self) -> Result<Item, StacError> {
        if self.id.is_empty() {
            return Err(StacError::MissingField {
                id: None,
                field: "id".to_string(),
            });
        }

        let datetime = self.datetime.or(self.start).ok_or_else(|| {
            StacError::MissingField {
                id: Some(self.id.clone()),
                field: "datetime".to_string(),
            }
        })?;

        if let Some(bbox) = self.bbox {
            if bbox[0] > bbox[2] || bbox[1] > bbox[3] {
                return Err(StacError::InvalidBbox {
                    bbox,
                    reason: "min corner exceeds max corner".to_string(),
                });
            }
        }

        let mut properties = self.properties;
        properties.insert(
            "datetime".to_string(),
            Value::String(datetime.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        if let Some(start) = self.start {
            properties.insert(
                "start_datetime".to_string(),
                Value::String(start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            );
        }
        if let Some(end) = self.end {
            properties.insert(
                "end_datetime".to_string(),
                Value::String(end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            );
        }

        let geometry = self.geometry.or_else(|| self.bbox.map(bbox_polygon));

        Ok(Item {
            type_: "Feature".to_string(),
            stac_version: STAC_VERSION.to_string(),
            id: self.id,
            geometry,
            bbox: self.bbox,
            properties,
            links: self.links,
            assets: self.assets,
            collection: self.collection,
        })
    }
}
