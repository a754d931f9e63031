//! Raster color map model and style format codecs.
//!
//! A [`ColorMap`] is an ordered list of value/color stops plus optional
//! background, foreground and nodata colors. It can be read from and written
//! to GMT CPT palettes, OGC SLD documents and GeoServer GeoCSS stylesheets,
//! and drives color-relief rendering of quicklooks.

mod cpt;
mod geocss;
mod named;
mod sld;

pub use geocss::GeoCssOptions;
pub use named::named_color;
pub use sld::SldOptions;

use crate::error::ColorMapError;

/// A single value/color stop in a color map.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapEntry {
    /// The raster value this stop applies to. `None` for colors that are not
    /// tied to a value (background/foreground/nodata blocks, or GeoCSS
    /// entries without a quantity).
    pub value: Option<f64>,
    /// Red component.
    pub red: u8,
    /// Green component.
    pub green: u8,
    /// Blue component.
    pub blue: u8,
    /// Opacity in `0.0..=1.0`, when the source format carried one.
    pub opacity: Option<f64>,
    /// Human-readable label, when the source format carried one.
    pub label: Option<String>,
}

impl ColorMapEntry {
    /// Creates an entry from RGB components.
    #[must_use]
    pub fn from_rgb(value: Option<f64>, red: u8, green: u8, blue: u8) -> Self {
        Self {
            value,
            red,
            green,
            blue,
            opacity: None,
            label: None,
        }
    }

    /// Creates an entry from a hex color string, with or without a leading `#`.
    ///
    /// # Errors
    ///
    /// Returns [`ColorMapError::InvalidColor`] if the string is not six hex
    /// digits after the optional `#`.
    pub fn from_hex(value: Option<f64>, hex: &str) -> Result<Self, ColorMapError> {
        let (red, green, blue) = parse_hex(hex)?;
        Ok(Self::from_rgb(value, red, green, blue))
    }

    /// Returns `true` if this stop is tied to a raster value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// The color as a `#rrggbb` hex string.
    #[must_use]
    pub fn as_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }

    /// The color as an `[r, g, b]` array.
    #[must_use]
    pub fn as_rgb(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Attaches an opacity to the entry.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    /// Attaches a label to the entry.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// An ordered color map with optional background, foreground and nodata
/// colors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorMap {
    /// The value/color stops, in source order.
    pub entries: Vec<ColorMapEntry>,
    /// Background color (`B` line in CPT, `Background` label in SLD).
    pub background: Option<ColorMapEntry>,
    /// Foreground color (`F` line in CPT, `Foreground` label in SLD).
    pub foreground: Option<ColorMapEntry>,
    /// Nodata color (`N` line in CPT, `No Data`/`NaN` labels in SLD).
    pub nodata: Option<ColorMapEntry>,
}

impl ColorMap {
    /// Creates a color map from entries alone.
    #[must_use]
    pub fn new(entries: Vec<ColorMapEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Reads a color map from GMT CPT text.
    ///
    /// # Errors
    ///
    /// Returns a [`ColorMapError`] when a line cannot be parsed or the file
    /// holds no value stops.
    pub fn from_cpt(input: &str) -> Result<Self, ColorMapError> {
        cpt::parse(input)
    }

    /// Renders the color map as GMT CPT text.
    ///
    /// Entries without values are skipped; consecutive value stops become
    /// interval lines.
    #[must_use]
    pub fn to_cpt(&self, title: Option<&str>, description: Option<&str>) -> String {
        cpt::write(self, title, description)
    }

    /// Reads a color map from an SLD document.
    ///
    /// # Errors
    ///
    /// Returns a [`ColorMapError`] when the XML is malformed or a color
    /// attribute cannot be parsed.
    pub fn from_sld(input: &str) -> Result<Self, ColorMapError> {
        sld::parse(input)
    }

    /// Renders the color map as an SLD 1.0.0 document.
    #[must_use]
    pub fn to_sld(&self, options: &SldOptions) -> String {
        sld::write(self, options)
    }

    /// Reads a color map from a GeoCSS stylesheet.
    ///
    /// # Errors
    ///
    /// Returns a [`ColorMapError`] when a `color-map-entry` call cannot be
    /// parsed.
    pub fn from_geocss(input: &str) -> Result<Self, ColorMapError> {
        geocss::parse(input)
    }

    /// Renders the color map as a GeoCSS stylesheet.
    #[must_use]
    pub fn to_geocss(&self, options: &GeoCssOptions) -> String {
        geocss::write(self, options)
    }

    /// The value stops sorted by value, ignoring entries without values.
    fn value_stops(&self) -> Vec<&ColorMapEntry> {
        let mut stops: Vec<_> = self.entries.iter().filter(|e| e.has_value()).collect();
        stops.sort_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        stops
    }

    /// Maps a raster value to a color with color-relief semantics: linear
    /// interpolation between the bracketing stops, clamped to the first and
    /// last stop outside the covered range.
    ///
    /// # Errors
    ///
    /// Returns [`ColorMapError::Empty`] if the map has no value stops.
    pub fn interpolate(&self, value: f64) -> Result<[u8; 3], ColorMapError> {
        let stops = self.value_stops();
        let (first, last) = match (stops.first(), stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ColorMapError::Empty),
        };

        if value <= first.value.unwrap_or(f64::NEG_INFINITY) {
            return Ok(first.as_rgb());
        }
        if value >= last.value.unwrap_or(f64::INFINITY) {
            return Ok(last.as_rgb());
        }

        for pair in stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            let (v0, v1) = (lo.value.unwrap_or(0.0), hi.value.unwrap_or(0.0));
            if value >= v0 && value <= v1 {
                if (v1 - v0).abs() < f64::EPSILON {
                    return Ok(hi.as_rgb());
                }
                let t = (value - v0) / (v1 - v0);
                return Ok([
                    lerp(lo.red, hi.red, t),
                    lerp(lo.green, hi.green, t),
                    lerp(lo.blue, hi.blue, t),
                ]);
            }
        }

        // Unreachable with sorted stops, but stay total.
        Ok(last.as_rgb())
    }
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
    v.round().clamp(0.0, 255.0) as u8
}

/// Parses a `rrggbb` hex string, with or without a leading `#`.
pub(crate) fn parse_hex(hex: &str) -> Result<(u8, u8, u8), ColorMapError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorMapError::InvalidColor {
            value: hex.to_string(),
            reason: "expected six hex digits".to_string(),
        });
    }
    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|e| ColorMapError::InvalidColor {
            value: hex.to_string(),
            reason: e.to_string(),
        })
    };
    Ok((component(0..2)?, component(2..4)?, component(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ColorMap {
        ColorMap::new(vec![
            ColorMapEntry::from_rgb(Some(0.0), 0, 0, 0),
            ColorMapEntry::from_rgb(Some(100.0), 200, 100, 0),
            ColorMapEntry::from_rgb(Some(200.0), 255, 255, 255),
        ])
    }

    #[test]
    fn test_hex_roundtrip() {
        let entry = ColorMapEntry::from_hex(Some(1.0), "#1f2850").unwrap();
        assert_eq!(entry.as_rgb(), [31, 40, 80]);
        assert_eq!(entry.as_hex(), "#1f2850");

        let bare = ColorMapEntry::from_hex(None, "ffcc00").unwrap();
        assert_eq!(bare.as_rgb(), [255, 204, 0]);
    }

    #[test]
    fn test_hex_rejects_malformed() {
        assert!(ColorMapEntry::from_hex(None, "#12345").is_err());
        assert!(ColorMapEntry::from_hex(None, "zzzzzz").is_err());
    }

    #[test]
    fn test_interpolate_exact_stops() {
        let map = ramp();
        assert_eq!(map.interpolate(0.0).unwrap(), [0, 0, 0]);
        assert_eq!(map.interpolate(100.0).unwrap(), [200, 100, 0]);
        assert_eq!(map.interpolate(200.0).unwrap(), [255, 255, 255]);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let map = ramp();
        assert_eq!(map.interpolate(50.0).unwrap(), [100, 50, 0]);
    }

    #[test]
    fn test_interpolate_clamps_outside_range() {
        let map = ramp();
        assert_eq!(map.interpolate(-10.0).unwrap(), [0, 0, 0]);
        assert_eq!(map.interpolate(1e6).unwrap(), [255, 255, 255]);
    }

    #[test]
    fn test_interpolate_unsorted_entries() {
        let map = ColorMap::new(vec![
            ColorMapEntry::from_rgb(Some(200.0), 255, 255, 255),
            ColorMapEntry::from_rgb(Some(0.0), 0, 0, 0),
        ]);
        assert_eq!(map.interpolate(0.0).unwrap(), [0, 0, 0]);
    }

    #[test]
    fn test_interpolate_empty_is_error() {
        let map = ColorMap::default();
        assert!(matches!(
            map.interpolate(1.0),
            Err(ColorMapError::Empty)
        ));
    }
}
