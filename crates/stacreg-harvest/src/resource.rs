//! Harvested resource model and STAC item conversion.

use chrono::{DateTime, Utc};
use serde_json::Value;

use stacreg_core::error::StacError;
use stacreg_core::stac::{Asset, Item, ItemBuilder, Link};

/// Link relation of a feed entry link, mapped onto asset roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRel {
    /// The product itself (`enclosure`).
    Data,
    /// A browse image (`icon`).
    Quicklook,
    /// A metadata document (`alternate` / `via`).
    Metadata,
    /// Anything else; kept as a plain link.
    Other,
}

impl LinkRel {
    /// Maps an Atom `rel` attribute onto a link relation.
    #[must_use]
    pub fn from_atom(rel: &str) -> Self {
        match rel {
            "enclosure" => Self::Data,
            "icon" => Self::Quicklook,
            "alternate" | "via" => Self::Metadata,
            _ => Self::Other,
        }
    }

    fn asset_key(self) -> Option<&'static str> {
        match self {
            Self::Data => Some("data"),
            Self::Quicklook => Some("quicklook"),
            Self::Metadata => Some("metadata"),
            Self::Other => None,
        }
    }

    fn role(self) -> Option<&'static str> {
        match self {
            Self::Data => Some("data"),
            Self::Quicklook => Some("thumbnail"),
            Self::Metadata => Some("metadata"),
            Self::Other => None,
        }
    }
}

/// A link attached to a harvested resource.
#[derive(Debug, Clone)]
pub struct ResourceLink {
    /// Link target.
    pub href: String,
    /// Relation of the link to the resource.
    pub rel: LinkRel,
    /// Media type, when the feed carried one.
    pub media_type: Option<String>,
    /// Title, when the feed carried one.
    pub title: Option<String>,
}

/// One result entry from an OSEO feed.
#[derive(Debug, Clone, Default)]
pub struct HarvestedResource {
    /// Entry identifier.
    pub id: String,
    /// Entry title.
    pub title: Option<String>,
    /// Nominal acquisition time.
    pub datetime: Option<DateTime<Utc>>,
    /// Acquisition interval start, when the feed carried an interval.
    pub start: Option<DateTime<Utc>>,
    /// Acquisition interval end.
    pub end: Option<DateTime<Utc>>,
    /// `[xmin, ymin, xmax, ymax]` in WGS84.
    pub bbox: Option<[f64; 4]>,
    /// Entry links.
    pub links: Vec<ResourceLink>,
    /// Entry summary text.
    pub summary: Option<String>,
}

impl HarvestedResource {
    /// Returns `true` when the entry carries enough metadata to become a
    /// STAC item.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && (self.datetime.is_some() || self.start.is_some())
    }

    /// Converts the resource into a STAC item for the given collection.
    ///
    /// Links with an asset-bearing relation become assets (`data`,
    /// `quicklook`, `metadata`, suffixed on collision); the rest are kept as
    /// item links.
    ///
    /// # Errors
    ///
    /// Returns a [`StacError`] when the resource is missing required fields
    /// or its bbox is malformed.
    pub fn to_item(&self, collection: Option<&str>) -> Result<Item, StacError> {
        let mut builder = ItemBuilder::new(sanitize_id(&self.id));
        if let Some(collection) = collection {
            builder = builder.collection(collection);
        }
        if let Some(datetime) = self.datetime {
            builder = builder.datetime(datetime);
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            builder = builder.interval(start, end);
        }
        if let Some(bbox) = self.bbox {
            builder = builder.bbox(bbox);
        }
        if let Some(title) = &self.title {
            builder = builder.property("title", Value::String(title.clone()));
        }
        if let Some(summary) = &self.summary {
            builder = builder.property("description", Value::String(summary.clone()));
        }

        let mut used_keys: Vec<String> = Vec::new();
        for link in &self.links {
            match (link.rel.asset_key(), link.rel.role()) {
                (Some(key), Some(role)) => {
                    let key = unique_key(key, &mut used_keys);
                    let mut asset = Asset::new(link.href.clone()).with_role(role);
                    if let Some(media_type) = &link.media_type {
                        asset.media_type = Some(media_type.clone());
                    }
                    if let Some(title) = &link.title {
                        asset = asset.with_title(title.clone());
                    }
                    builder = builder.asset(key, asset);
                },
                _ => {
                    builder = builder.link(Link {
                        href: link.href.clone(),
                        rel: "related".to_string(),
                        media_type: link.media_type.clone(),
                        title: link.title.clone(),
                    });
                },
            }
        }

        builder.build()
    }
}

/// Item ids come from URN-style entry ids; keep the last path-ish segment.
fn sanitize_id(id: &str) -> String {
    id.rsplit(['/', ':'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(id)
        .to_string()
}

fn unique_key(base: &str, used: &mut Vec<String>) -> String {
    let mut key = base.to_string();
    let mut n = 1;
    while used.contains(&key) {
        n += 1;
        key = format!("{base}-{n}");
    }
    used.push(key.clone());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn resource() -> HarvestedResource {
        HarvestedResource {
            id: "urn:ogc:def:EOP:ESA:S2A_MSIL2A_20230501".to_string(),
            title: Some("S2A L2A granule".to_string()),
            datetime: Some(Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap()),
            bbox: Some([8.2, 46.1, 9.9, 47.3]),
            links: vec![
                ResourceLink {
                    href: "https://dl.example.com/granule.zip".to_string(),
                    rel: LinkRel::Data,
                    media_type: Some("application/zip".to_string()),
                    title: None,
                },
                ResourceLink {
                    href: "https://dl.example.com/ql.jpg".to_string(),
                    rel: LinkRel::Quicklook,
                    media_type: None,
                    title: Some("browse".to_string()),
                },
                ResourceLink {
                    href: "https://dl.example.com/search".to_string(),
                    rel: LinkRel::Other,
                    media_type: None,
                    title: None,
                },
            ],
            ..HarvestedResource::default()
        }
    }

    #[test]
    fn test_to_item_maps_assets_and_links() {
        let item = resource().to_item(Some("sentinel-2-l2a")).unwrap();
        assert_eq!(item.id, "S2A_MSIL2A_20230501");
        assert_eq!(item.collection.as_deref(), Some("sentinel-2-l2a"));

        let data = item.assets.get("data").unwrap();
        assert_eq!(data.media_type.as_deref(), Some("application/zip"));
        assert_eq!(data.roles, vec!["data"]);

        let quicklook = item.assets.get("quicklook").unwrap();
        assert_eq!(quicklook.roles, vec!["thumbnail"]);
        // Media type inferred from the extension when the feed has none.
        assert_eq!(quicklook.media_type.as_deref(), Some("image/jpeg"));

        assert_eq!(item.links.len(), 1);
        assert_eq!(item.links[0].rel, "related");
    }

    #[test]
    fn test_to_item_requires_datetime() {
        let mut resource = resource();
        resource.datetime = None;
        assert!(resource.to_item(None).is_err());
        assert!(!resource.is_complete());
    }

    #[test]
    fn test_duplicate_asset_keys_are_suffixed() {
        let mut resource = resource();
        resource.links.push(ResourceLink {
            href: "https://dl.example.com/granule2.zip".to_string(),
            rel: LinkRel::Data,
            media_type: None,
            title: None,
        });
        let item = resource.to_item(None).unwrap();
        assert!(item.assets.contains_key("data"));
        assert!(item.assets.contains_key("data-2"));
    }

    #[test]
    fn test_link_rel_mapping() {
        assert_eq!(LinkRel::from_atom("enclosure"), LinkRel::Data);
        assert_eq!(LinkRel::from_atom("icon"), LinkRel::Quicklook);
        assert_eq!(LinkRel::from_atom("alternate"), LinkRel::Metadata);
        assert_eq!(LinkRel::from_atom("self"), LinkRel::Other);
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("urn:x:y:PRODUCT_1"), "PRODUCT_1");
        assert_eq!(sanitize_id("https://x/items/PRODUCT_1"), "PRODUCT_1");
        assert_eq!(sanitize_id("PRODUCT_1"), "PRODUCT_1");
    }
}
