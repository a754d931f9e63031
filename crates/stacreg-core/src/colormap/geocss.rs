//! GeoServer GeoCSS raster style reader and writer.

use regex::Regex;

use super::sld::entry_label;
use super::{ColorMap, ColorMapEntry};
use crate::error::ColorMapError;

/// Options controlling GeoCSS output.
#[derive(Debug, Clone)]
pub struct GeoCssOptions {
    /// `@title` header comment.
    pub title: String,
    /// `@abstract` header comment.
    pub description: String,
    /// `raster-color-map-type` property (`ramp`, `intervals`, `values`).
    pub color_map_type: String,
    /// `raster-channels` property.
    pub raster_channels: String,
    /// Template for entry labels; `$value` is substituted with the stop value.
    pub label_template: Option<String>,
    /// Emit opacity arguments, defaulting to `1.0` where entries carry none.
    pub with_opacity: bool,
    /// Emit label arguments.
    pub with_labels: bool,
    /// Add a `raster-label-fi` feature-info label.
    pub info_label: Option<String>,
}

impl Default for GeoCssOptions {
    fn default() -> Self {
        Self {
            title: "Default Title".to_string(),
            description: "Default Description".to_string(),
            color_map_type: "ramp".to_string(),
            raster_channels: "auto".to_string(),
            label_template: Some("$value".to_string()),
            with_opacity: false,
            with_labels: false,
            info_label: None,
        }
    }
}

pub(super) fn parse(input: &str) -> Result<ColorMap, ColorMapError> {
    // color-map-entry(#hex [, value [, opacity [, label]]])
    let entry_re = Regex::new(r"color-map-entry\(([^)]*)\)").expect("static regex");

    let mut entries = Vec::new();
    for capture in entry_re.captures_iter(input) {
        let args: Vec<String> = capture[1]
            .split(',')
            .map(|a| a.trim().trim_matches('"').to_string())
            .collect();
        if args.is_empty() || args[0].is_empty() {
            return Err(ColorMapError::Parse {
                format: "GeoCSS".to_string(),
                line: None,
                message: "color-map-entry without arguments".to_string(),
            });
        }

        let value = args.get(1).and_then(|v| v.parse::<f64>().ok());
        let mut entry = ColorMapEntry::from_hex(value, &args[0])?;
        entry.opacity = args.get(2).and_then(|v| v.parse::<f64>().ok());
        entry.label = args.get(3).filter(|l| !l.is_empty()).cloned();
        entries.push(entry);
    }

    log::debug!("parsed {} GeoCSS entries", entries.len());
    Ok(ColorMap::new(entries))
}

pub(super) fn write(map: &ColorMap, options: &GeoCssOptions) -> String {
    let mut css = String::from("/*\n");
    css.push_str(&format!("* @title {}\n", options.title));
    css.push_str(&format!("* @abstract {}\n", options.description));
    css.push_str("*/\n\n");

    css.push_str("* {\n");
    css.push_str(&format!("  raster-channels: {};\n", options.raster_channels));
    if let Some(info_label) = &options.info_label {
        css.push_str("  raster-label-fi: add;\n");
        css.push_str(&format!("  raster-label-name: \"{info_label}\";\n"));
    }
    css.push_str(&format!(
        "  raster-color-map-type: {};\n",
        options.color_map_type
    ));
    css.push_str("  raster-color-map:\n");

    for entry in &map.entries {
        if !entry.has_value() {
            continue;
        }
        css.push_str(&format!(
            "    color-map-entry({}, {}",
            entry.as_hex(),
            entry.value.unwrap_or_default()
        ));
        if entry.opacity.is_some() || options.with_opacity {
            css.push_str(&format!(", {}", entry.opacity.unwrap_or(1.0)));
        }
        if options.with_labels {
            let label = entry_label(entry, options.label_template.as_deref());
            css.push_str(&format!(", \"{label}\""));
        }
        css.push_str(")\n");
    }

    css.push_str("}\n");
    css
}
