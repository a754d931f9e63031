//! OGC SLD 1.0.0 raster style reader and writer.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{ColorMap, ColorMapEntry, parse_hex};
use crate::error::ColorMapError;

/// Labels that mark an entry as the nodata color.
const NODATA_LABELS: &[&str] = &["No Data", "NaN", "nan", "nodata"];

/// Options controlling SLD output.
#[derive(Debug, Clone)]
pub struct SldOptions {
    /// `<Title>` of the user style.
    pub title: String,
    /// `<Abstract>` of the user style.
    pub description: String,
    /// `type` attribute of the `<ColorMap>` element (`ramp`, `intervals`,
    /// `values`).
    pub color_map_type: String,
    /// Template for entry labels; `$value` is substituted with the stop value.
    pub label_template: Option<String>,
    /// Emit `opacity` attributes, defaulting to `1.0` where entries carry
    /// none.
    pub with_opacity: bool,
    /// Emit `label` attributes.
    pub with_labels: bool,
}

impl Default for SldOptions {
    fn default() -> Self {
        Self {
            title: "Default Title".to_string(),
            description: "Default Description".to_string(),
            color_map_type: "ramp".to_string(),
            label_template: Some("$value".to_string()),
            with_opacity: false,
            with_labels: false,
        }
    }
}

pub(super) fn parse(input: &str) -> Result<ColorMap, ColorMapError> {
    let mut reader = Reader::from_str(input);
    let mut buf = Vec::new();

    let mut entries = Vec::new();
    let mut background = None;
    let mut foreground = None;
    let mut nodata = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                // Match both `ColorMapEntry` and namespaced `sld:ColorMapEntry`.
                if name.rsplit(':').next() == Some("ColorMapEntry") {
                    let mut color = None;
                    let mut quantity = None;
                    let mut opacity = None;
                    let mut label = None;

                    for attr in e.attributes().flatten() {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        match key.as_str() {
                            "color" => color = Some(value),
                            "quantity" => quantity = value.parse::<f64>().ok(),
                            "opacity" => opacity = value.parse::<f64>().ok(),
                            "label" => label = Some(value),
                            _ => {},
                        }
                    }

                    let color = color.ok_or_else(|| ColorMapError::Parse {
                        format: "SLD".to_string(),
                        line: None,
                        message: "ColorMapEntry without a color attribute".to_string(),
                    })?;
                    let (red, green, blue) = parse_hex(&color)?;
                    let mut entry = ColorMapEntry::from_rgb(quantity, red, green, blue);
                    entry.opacity = opacity;
                    entry.label = label.clone();

                    match label.as_deref() {
                        Some(l) if NODATA_LABELS.contains(&l) => nodata = Some(entry),
                        Some("Background") => background = Some(entry),
                        Some("Foreground") => foreground = Some(entry),
                        _ => entries.push(entry),
                    }
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => {
                return Err(ColorMapError::Parse {
                    format: "SLD".to_string(),
                    line: None,
                    message: e.to_string(),
                });
            },
        }
        buf.clear();
    }

    log::debug!("parsed {} SLD entries", entries.len());
    Ok(ColorMap {
        entries,
        background,
        foreground,
        nodata,
    })
}

pub(super) fn write(map: &ColorMap, options: &SldOptions) -> String {
    let extended = if map.entries.len() > 255 { "true" } else { "false" };

    let mut sld = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<StyledLayerDescriptor version="1.0.0"
    xmlns="http://www.opengis.net/sld"
    xmlns:ogc="http://www.opengis.net/ogc"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xsi:schemaLocation="http://www.opengis.net/sld http://schemas.opengis.net/sld/1.0.0/StyledLayerDescriptor.xsd">
"#,
    );
    sld.push_str("  <NamedLayer>\n");
    sld.push_str("    <Name></Name>\n");
    sld.push_str("    <UserStyle>\n");
    sld.push_str(&format!("      <Title>{}</Title>\n", options.title));
    sld.push_str(&format!("      <Abstract>{}</Abstract>\n", options.description));
    sld.push_str("      <FeatureTypeStyle>\n");
    sld.push_str("         <Rule>\n");
    sld.push_str("             <RasterSymbolizer>\n");
    sld.push_str("                 <Opacity>1.0</Opacity>\n");
    sld.push_str(&format!(
        "                 <ColorMap type=\"{}\" extended=\"{}\">\n",
        options.color_map_type, extended
    ));

    for entry in &map.entries {
        sld.push_str(&format!(
            "                     <ColorMapEntry color=\"{}\" quantity=\"{}\"",
            entry.as_hex(),
            entry.value.unwrap_or_default()
        ));
        if entry.opacity.is_some() || options.with_opacity {
            sld.push_str(&format!(" opacity=\"{}\"", entry.opacity.unwrap_or(1.0)));
        }
        if options.with_labels {
            let label = entry_label(entry, options.label_template.as_deref());
            sld.push_str(&format!(" label=\"{label}\""));
        }
        sld.push_str("/>\n");
    }

    sld.push_str("                 </ColorMap>\n");
    sld.push_str("             </RasterSymbolizer>\n");
    sld.push_str("         </Rule>\n");
    sld.push_str("      </FeatureTypeStyle>\n");
    sld.push_str("    </UserStyle>\n");
    sld.push_str("  </NamedLayer>\n");
    sld.push_str("</StyledLayerDescriptor>\n");

    sld
}

/// Renders an entry label from the template (`$value` substituted) or the
/// entry's own label.
pub(super) fn entry_label(entry: &ColorMapEntry, template: Option<&str>) -> String {
    match template {
        Some(template) => {
            let value = entry
                .value
                .map(|v| v.to_string())
                .unwrap_or_default();
            template.replace("$value", &value)
        },
        None => entry.label.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SLD: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<StyledLayerDescriptor version="1.0.0" xmlns="http://www.opengis.net/sld" xmlns:sld="http://www.opengis.net/sld">
  <NamedLayer>
    <UserStyle>
      <FeatureTypeStyle>
        <Rule>
          <RasterSymbolizer>
            <ColorMap type="ramp">
              <ColorMapEntry color="#000000" quantity="-1" label="No Data" opacity="0.0"/>
              <sld:ColorMapEntry color="#1f284f" quantity="0"/>
              <ColorMapEntry color="#ffffff" quantity="100" label="high"/>
            </ColorMap>
          </RasterSymbolizer>
        </Rule>
      </FeatureTypeStyle>
    </UserStyle>
  </NamedLayer>
</StyledLayerDescriptor>
"##;

    #[test]
    fn test_parse_entries_and_nodata() {
        let map = ColorMap::from_sld(SAMPLE_SLD).unwrap();
        assert_eq!(map.entries.len(), 2);
        assert_eq!(map.entries[0].value, Some(0.0));
        assert_eq!(map.entries[0].as_rgb(), [31, 40, 79]);
        assert_eq!(map.entries[1].label.as_deref(), Some("high"));

        let nodata = map.nodata.as_ref().unwrap();
        assert_eq!(nodata.value, Some(-1.0));
        assert_eq!(nodata.opacity, Some(0.0));
    }

    #[test]
    fn test_parse_missing_color_is_error() {
        let sld = r#"<ColorMap><ColorMapEntry quantity="1"/></ColorMap>"#;
        assert!(ColorMap::from_sld(sld).is_err());
    }

    #[test]
    fn test_write_contains_entries() {
        let map = ColorMap::new(vec![
            ColorMapEntry::from_rgb(Some(0.0), 0, 0, 0),
            ColorMapEntry::from_rgb(Some(1.0), 255, 255, 255),
        ]);
        let sld = map.to_sld(&SldOptions::default());
        assert!(sld.contains(r#"<ColorMap type="ramp" extended="false">"#));
        assert!(sld.contains(r##"<ColorMapEntry color="#000000" quantity="0"/>"##));
        assert!(sld.contains(r##"<ColorMapEntry color="#ffffff" quantity="1"/>"##));
    }

    #[test]
    fn test_write_labels_and_opacity() {
        let map = ColorMap::new(vec![
            ColorMapEntry::from_rgb(Some(5.0), 10, 20, 30).with_opacity(0.5),
        ]);
        let options = SldOptions {
            with_labels: true,
            with_opacity: true,
            label_template: Some("$value m".to_string()),
            ..SldOptions::default()
        };
        let sld = map.to_sld(&options);
        assert!(sld.contains(r#"opacity="0.5""#));
        assert!(sld.contains(r#"label="5 m""#));
    }

    #[test]
    fn test_roundtrip() {
        let map = ColorMap::from_sld(SAMPLE_SLD).unwrap();
        let sld = map.to_sld(&SldOptions::default());
        let reparsed = ColorMap::from_sld(&sld).unwrap();
        assert_eq!(map.entries.len(), reparsed.entries.len());
        assert_eq!(map.entries[0].as_rgb(), reparsed.entries[0].as_rgb());
    }
}
