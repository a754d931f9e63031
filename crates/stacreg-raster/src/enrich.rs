//! STAC projection-extension enrichment from raster metadata.

use serde_json::json;

use stacreg_core::stac::Item;

use crate::summary::RasterSummary;

/// Attaches projection properties from a raster summary to an item:
/// `proj:code`, `proj:shape`, `proj:transform` and `nodata`, where the
/// source carries them. Existing values are overwritten.
pub fn enrich_item(item: &mut Item, summary: &RasterSummary) {
    if let Some(epsg) = summary.epsg {
        item.properties
            .insert("proj:code".to_string(), json!(format!("EPSG:{epsg}")));
    }
    item.properties.insert(
        "proj:shape".to_string(),
        json!([summary.height, summary.width]),
    );
    if let Some(gt) = summary.geotransform {
        // Projection extension ordering: row-major affine coefficients.
        item.properties.insert(
            "proj:transform".to_string(),
            json!([gt[1], gt[2], gt[0], gt[4], gt[5], gt[3]]),
        );
    }
    if let Some(nodata) = summary.nodata {
        item.properties.insert("nodata".to_string(), json!(nodata));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{Compression, PixelType};
    use chrono::{TimeZone, Utc};
    use stacreg_core::stac::ItemBuilder;

    fn summary() -> RasterSummary {
        RasterSummary {
            width: 100,
            height: 80,
            bands: 1,
            pixel_type: PixelType::U16,
            compression: Compression::None,
            epsg: Some(32632),
            geotransform: Some([500_000.0, 10.0, 0.0, 5_200_000.0, 0.0, -10.0]),
            nodata: Some(0.0),
            tiled: false,
        }
    }

    fn item() -> Item {
        ItemBuilder::new("scene-1")
            .datetime(Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_enrich_sets_projection_properties() {
        let mut item = item();
        enrich_item(&mut item, &summary());

        assert_eq!(item.properties["proj:code"], json!("EPSG:32632"));
        assert_eq!(item.properties["proj:shape"], json!([80, 100]));
        assert_eq!(
            item.properties["proj:transform"],
            json!([10.0, 0.0, 500_000.0, 0.0, -10.0, 5_200_000.0])
        );
        assert_eq!(item.properties["nodata"], json!(0.0));
    }

    #[test]
    fn test_enrich_without_georeference() {
        let mut bare = summary();
        bare.epsg = None;
        bare.geotransform = None;
        bare.nodata = None;

        let mut item = item();
        enrich_item(&mut item, &bare);

        assert!(!item.properties.contains_key("proj:code"));
        assert!(!item.properties.contains_key("proj:transform"));
        assert!(!item.properties.contains_key("nodata"));
        assert_eq!(item.properties["proj:shape"], json!([80, 100]));
    }
}
