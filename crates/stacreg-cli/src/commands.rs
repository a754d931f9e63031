//! Command handlers for the `stacreg` binary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use stacreg_core::colormap::{ColorMap, GeoCssOptions, SldOptions};
use stacreg_core::error::IoErrorExt;
use stacreg_core::formats::{Format, colormap_format_for_path, find_format};
use stacreg_core::{StacRegError, ndjson};
use stacreg_raster::quicklook::{QuicklookOptions, render};

/// Style options shared by the colormap writers.
#[derive(Debug, Clone, Default)]
pub struct StyleArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub with_labels: bool,
    pub with_opacity: bool,
}

/// Parses `xmin,ymin,xmax,ymax`.
pub fn parse_bbox(text: &str) -> Result<[f64; 4]> {
    let parts: Vec<f64> = text
        .split(',')
        .map(|t| t.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("bbox '{text}' has a non-numeric component"))?;
    let [xmin, ymin, xmax, ymax]: [f64; 4] = parts
        .try_into()
        .map_err(|_| anyhow!("bbox '{text}' must have four components"))?;
    if xmin > xmax || ymin > ymax {
        return Err(anyhow!("bbox '{text}' min corner exceeds max corner"));
    }
    Ok([xmin, ymin, xmax, ymax])
}

/// Parses an RFC 3339 timestamp or a plain date (midnight UTC).
pub fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| anyhow!("'{text}' is neither RFC 3339 nor YYYY-MM-DD"))
}

/// Resolves a colormap format from an explicit name or the file extension.
fn resolve_colormap_format(path: &Path, explicit: Option<&str>) -> Result<Format> {
    let format = match explicit {
        Some(name) => find_format(name)
            .ok_or_else(|| StacRegError::Format(stacreg_core::error::format_not_found(name)))?,
        None => colormap_format_for_path(path).ok_or_else(|| {
            StacRegError::Format(stacreg_core::error::FormatError::UnknownExtension {
                path: path.to_path_buf(),
            })
        })?,
    };
    Ok(format)
}

/// Reads a color map in any supported style format.
pub fn read_colormap(path: &Path, explicit: Option<&str>) -> Result<ColorMap> {
    let format = resolve_colormap_format(path, explicit)?;
    if !format.capabilities.read.is_supported() {
        return Err(StacRegError::Format(
            stacreg_core::error::FormatError::OperationNotSupported {
                format: format.short_name.to_string(),
                operation: "reading".to_string(),
            },
        )
        .into());
    }
    let text = fs::read_to_string(path).with_read_context(format.short_name, path)?;
    let map = match format.short_name {
        "CPT" => ColorMap::from_cpt(&text),
        "SLD" => ColorMap::from_sld(&text),
        "GeoCSS" => ColorMap::from_geocss(&text),
        other => return Err(anyhow!("no reader for format '{other}'")),
    }
    .map_err(StacRegError::ColorMap)?;
    Ok(map)
}

/// Writes a color map in any supported style format.
pub fn write_colormap(
    map: &ColorMap,
    path: &Path,
    explicit: Option<&str>,
    style: &StyleArgs,
) -> Result<()> {
    let format = resolve_colormap_format(path, explicit)?;
    if !format.capabilities.write.is_supported() {
        return Err(StacRegError::Format(
            stacreg_core::error::FormatError::OperationNotSupported {
                format: format.short_name.to_string(),
                operation: "writing".to_string(),
            },
        )
        .into());
    }

    let text = match format.short_name {
        "CPT" => map.to_cpt(style.title.as_deref(), style.description.as_deref()),
        "SLD" => {
            let mut options = SldOptions {
                with_labels: style.with_labels,
                with_opacity: style.with_opacity,
                ..SldOptions::default()
            };
            if let Some(title) = &style.title {
                options.title = title.clone();
            }
            if let Some(description) = &style.description {
                options.description = description.clone();
            }
            map.to_sld(&options)
        },
        "GeoCSS" => {
            let mut options = GeoCssOptions {
                with_labels: style.with_labels,
                with_opacity: style.with_opacity,
                ..GeoCssOptions::default()
            };
            if let Some(title) = &style.title {
                options.title = title.clone();
            }
            if let Some(description) = &style.description {
                options.description = description.clone();
            }
            map.to_geocss(&options)
        },
        other => return Err(anyhow!("no writer for format '{other}'")),
    };
    fs::write(path, text).with_write_context(format.short_name, path)?;
    Ok(())
}

/// `colormap` command: convert between style formats.
pub fn handle_colormap(
    input: &Path,
    output: &Path,
    input_format: Option<&str>,
    output_format: Option<&str>,
    style: &StyleArgs,
) -> Result<()> {
    let map = read_colormap(input, input_format)?;
    info!(
        entries = map.entries.len(),
        "read color map from {}",
        input.display()
    );
    write_colormap(&map, output, output_format, style)?;
    println!(
        "Converted {} entries: {} -> {}",
        map.entries.len(),
        input.display(),
        output.display()
    );
    Ok(())
}

/// `inspect` command: show raster metadata.
pub fn handle_inspect(input: &Path) -> Result<()> {
    let summary = stacreg_raster::inspect(input)?;
    crate::display::print_raster_summary(&input.display().to_string(), &summary);
    Ok(())
}

/// `quicklook` command: render a browse image for a GeoTIFF.
pub fn handle_quicklook(
    input: &Path,
    output: &Path,
    max_size: u32,
    color_table: Option<&Path>,
    scale: Option<(f64, f64)>,
) -> Result<()> {
    let color_map = match color_table {
        Some(path) => Some(read_colormap(path, None)?),
        None => None,
    };

    let options = QuicklookOptions {
        max_size,
        scale,
        color_map,
    };
    let report = render(input, output, &options)?;
    println!(
        "Quicklook {}x{} ({}) written to {}",
        report.width,
        report.height,
        if report.colored { "color relief" } else { "grayscale" },
        output.display()
    );
    Ok(())
}

/// `harvest` command: query an OSEO endpoint and write item NDJSON.
#[cfg(feature = "oseo")]
pub async fn handle_harvest(
    endpoint: &str,
    params: stacreg_harvest::SearchParams,
    collection: Option<&str>,
    page_size: Option<u32>,
    output: &Path,
) -> Result<()> {
    use stacreg_harvest::OseoClient;

    let endpoint = url::Url::parse(endpoint)
        .with_context(|| format!("invalid endpoint URL '{endpoint}'"))?;
    let mut client = OseoClient::new(endpoint)?;
    if let Some(page_size) = page_size {
        client = client.with_page_size(page_size);
    }

    let resources = client.harvest(&params).await?;
    info!(count = resources.len(), "building STAC items");

    let mut items = Vec::with_capacity(resources.len());
    for resource in &resources {
        items.push(
            resource
                .to_item(collection)
                .map_err(StacRegError::Stac)?,
        );
    }
    ndjson::write_items_to_path(output, &items)?;
    println!("Harvested {} item(s) into {}", items.len(), output.display());
    Ok(())
}

/// `register` command: load item NDJSON into pgstac.
#[cfg(feature = "db")]
pub async fn handle_register(
    input: &Path,
    dsn: &str,
    collection_file: Option<&Path>,
    chunk_size: usize,
) -> Result<()> {
    use stacreg_core::stac::Collection;
    use stacreg_pgstac::PgstacClient;

    let items = ndjson::read_items_from_path(input)?;

    let mut client = PgstacClient::connect(dsn)
        .await?
        .with_chunk_size(chunk_size);
    let version = client.version().await?;
    info!(%version, "connected to pgstac");

    if let Some(path) = collection_file {
        let text = fs::read_to_string(path).with_read_context("collection", path)?;
        let collection: Collection = serde_json::from_str(&text)
            .with_context(|| format!("'{}' is not a collection document", path.display()))?;
        client.upsert_collection(&collection).await?;
    }

    let report = client.upsert_items(&items).await?;
    println!(
        "Registered {} item(s) in {} transaction(s) (pgstac {version})",
        report.items_loaded, report.chunks
    );
    Ok(())
}

/// `export` command: write item NDJSON to GeoParquet.
#[cfg(feature = "geoparquet")]
pub fn handle_export(input: &Path, output: &Path) -> Result<()> {
    let items = ndjson::read_items_from_path(input)?;
    let report = stacreg_geoparquet::write_items(output, &items)?;
    println!("Exported {} row(s) to {}", report.rows, output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_bbox() {
        assert_eq!(parse_bbox("8,46, 9, 47").unwrap(), [8.0, 46.0, 9.0, 47.0]);
        assert!(parse_bbox("8,46,9").is_err());
        assert!(parse_bbox("9,46,8,47").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time("2023-05-01T10:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time("2023-05-01").unwrap(),
            Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_time("May 1st").is_err());
    }

    #[test]
    fn test_colormap_conversion_cpt_to_sld() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ramp.cpt");
        let output = dir.path().join("ramp.sld");
        std::fs::write(&input, "0 black 100 white\n").unwrap();

        handle_colormap(&input, &output, None, None, &StyleArgs::default()).unwrap();

        let sld = std::fs::read_to_string(&output).unwrap();
        assert!(sld.contains("StyledLayerDescriptor"));
        assert!(sld.contains(r##"color="#000000""##));
        assert!(sld.contains(r##"color="#ffffff""##));
    }

    #[test]
    fn test_colormap_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ramp.xyz");
        std::fs::write(&input, "0 black 100 white\n").unwrap();
        let err = read_colormap(&input, None).unwrap_err();
        assert!(err.to_string().contains("Cannot infer a format"));
    }

    #[test]
    fn test_colormap_explicit_format_overrides_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ramp.txt");
        std::fs::write(&input, "0 black 100 white\n").unwrap();
        let map = read_colormap(&input, Some("cpt")).unwrap();
        assert_eq!(map.entries.len(), 2);
    }

    #[test]
    fn test_colormap_planned_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let map = ColorMap::default();
        let err = write_colormap(
            &map,
            &dir.path().join("style.qml"),
            Some("QML"),
            &StyleArgs::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not support writing"));
    }
}
