//! Format registry for style formats, quicklook outputs and registration
//! targets.
//!
//! This module provides a static registry of the formats `stacreg` can read
//! and write, including their current support status (supported, planned, or
//! not supported). The registry is consumed by the CLI for dispatch and for
//! the `formats` listing.
//!
//! # Examples
//!
//! ```
//! use stacreg_core::formats::{find_format, FormatKind};
//!
//! let cpt = find_format("CPT").expect("CPT format should exist");
//! assert_eq!(cpt.kind, FormatKind::ColorMap);
//! assert!(cpt.capabilities.read.is_supported());
//! ```

use std::path::Path;

/// Support status for a specific format operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    /// The feature is fully supported and implemented.
    Supported,
    /// The feature is not supported for this format.
    NotSupported,
    /// The feature is planned for future implementation.
    Planned,
}

impl SupportStatus {
    /// Returns `true` if the operation is fully supported and implemented.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, SupportStatus::Supported)
    }

    /// Returns `true` if the operation is supported or planned (i.e., not
    /// explicitly unsupported).
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, SupportStatus::NotSupported)
    }

    /// Returns the string representation of this support status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            SupportStatus::Supported => "Supported",
            SupportStatus::NotSupported => "Not Supported",
            SupportStatus::Planned => "Planned",
        }
    }
}

/// The registry groups formats by what they are used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Raster style / color table formats (CPT, SLD, GeoCSS, ...)
    ColorMap,
    /// Quicklook raster outputs (GeoTIFF, PNG, ...)
    Quicklook,
    /// Registration targets for STAC records (pgstac, GeoParquet, ...)
    Registration,
}

impl FormatKind {
    /// Returns the display label for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            FormatKind::ColorMap => "Color Map",
            FormatKind::Quicklook => "Quicklook",
            FormatKind::Registration => "Registration",
        }
    }
}

/// Operations supported by a format.
///
/// Each format can support reading and writing, each with an associated
/// [`SupportStatus`] indicating its current implementation status.
#[derive(Debug, Clone, Copy)]
pub struct FormatCapabilities {
    /// Support status for reading this format.
    pub read: SupportStatus,
    /// Support status for writing this format.
    pub write: SupportStatus,
}

impl FormatCapabilities {
    /// Returns `true` if at least one operation is fully supported.
    #[must_use]
    pub fn has_supported_operation(&self) -> bool {
        self.read.is_supported() || self.write.is_supported()
    }
}

/// A format definition in the registry.
///
/// Each format has a short name (used in the CLI), a descriptive long name,
/// a [`FormatKind`], and a set of capabilities.
#[derive(Debug, Clone)]
pub struct Format {
    /// Short name used in the CLI and for format identification (e.g. `"CPT"`).
    pub short_name: &'static str,
    /// Long descriptive name for display purposes.
    pub long_name: &'static str,
    /// What the format is used for.
    pub kind: FormatKind,
    /// Operations supported by this format.
    pub capabilities: FormatCapabilities,
}

impl Format {
    /// Creates a new format definition with specified capabilities.
    #[must_use]
    pub const fn new(
        short_name: &'static str,
        long_name: &'static str,
        kind: FormatKind,
        read: SupportStatus,
        write: SupportStatus,
    ) -> Self {
        Self {
            short_name,
            long_name,
            kind,
            capabilities: FormatCapabilities { read, write },
        }
    }
}

/// Returns the complete registry of all known formats.
///
/// This function returns every format in the registry, regardless of support
/// status.
#[must_use]
pub fn get_formats() -> Vec<Format> {
    use FormatKind::{ColorMap, Quicklook, Registration};
    use SupportStatus::{NotSupported, Planned, Supported};

    vec![
        // Color table formats
        Format::new("CPT", "GMT Color Palette Table", ColorMap, Supported, Supported),
        Format::new(
            "SLD",
            "OGC Styled Layer Descriptor 1.0.0",
            ColorMap,
            Supported,
            Supported,
        ),
        Format::new("GeoCSS", "GeoServer CSS raster styling", ColorMap, Supported, Supported),
        Format::new("QML", "QGIS Layer Style", ColorMap, Planned, Planned),
        // Quicklook outputs
        Format::new("GTiff", "GeoTIFF quicklook", Quicklook, NotSupported, Supported),
        Format::new("PNG", "Portable Network Graphics", Quicklook, NotSupported, Planned),
        Format::new(
            "COG",
            "Cloud-Optimized GeoTIFF",
            Quicklook,
            NotSupported,
            Planned,
        ),
        // Registration targets
        Format::new(
            "pgstac",
            "PostgreSQL pgstac catalog",
            Registration,
            NotSupported,
            Supported,
        ),
        Format::new("GeoParquet", "GeoParquet item export", Registration, NotSupported, Supported),
        Format::new(
            "NDJSON",
            "Newline-delimited STAC item JSON",
            Registration,
            Supported,
            Supported,
        ),
        Format::new(
            "Static",
            "Static STAC catalog tree",
            Registration,
            NotSupported,
            Planned,
        ),
    ]
}

/// Returns all formats that have at least one fully supported operation.
#[must_use]
pub fn get_available_formats() -> Vec<Format> {
    get_formats()
        .into_iter()
        .filter(|f| f.capabilities.has_supported_operation())
        .collect()
}

/// Finds a format by its short name (case-insensitive).
///
/// Returns `None` if no format with the given name exists in the registry.
///
/// # Examples
///
/// ```
/// use stacreg_core::formats::find_format;
///
/// let format = find_format("sld").expect("SLD should exist");
/// assert_eq!(format.short_name, "SLD");
///
/// assert!(find_format("Mapnik").is_none());
/// ```
#[must_use]
pub fn find_format(name: &str) -> Option<Format> {
    get_formats()
        .into_iter()
        .find(|f| f.short_name.eq_ignore_ascii_case(name))
}

/// Lists all formats of a given kind.
#[must_use]
pub fn formats_for(kind: FormatKind) -> Vec<Format> {
    get_formats().into_iter().filter(|f| f.kind == kind).collect()
}

/// Returns all format short names in alphabetically sorted order.
#[must_use]
pub fn format_names() -> Vec<&'static str> {
    let mut names: Vec<_> = get_formats().iter().map(|f| f.short_name).collect();
    names.sort_unstable();
    names
}

/// Infers a color map format from a file extension.
///
/// Recognizes `.cpt`, `.sld` and `.css`/`.geocss`. Returns `None` for
/// anything else.
#[must_use]
pub fn colormap_format_for_path(path: &Path) -> Option<Format> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let name = match ext.as_str() {
        "cpt" => "CPT",
        "sld" => "SLD",
        "css" | "geocss" => "GeoCSS",
        _ => return None,
    };
    find_format(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_find_format() {
        let format = find_format("CPT");
        assert!(format.is_some());
        assert_eq!(format.unwrap().short_name, "CPT");
    }

    #[test]
    fn test_find_format_case_insensitive() {
        let format = find_format("geocss");
        assert!(format.is_some());
        assert_eq!(format.unwrap().short_name, "GeoCSS");
    }

    #[test]
    fn test_colormap_formats_read_write() {
        for name in ["CPT", "SLD", "GeoCSS"] {
            let format = find_format(name).unwrap();
            assert!(format.capabilities.read.is_supported(), "{name} read");
            assert!(format.capabilities.write.is_supported(), "{name} write");
        }
    }

    #[test]
    fn test_available_formats_exclude_planned_only() {
        let available = get_available_formats();
        assert!(available.iter().all(|f| f.capabilities.has_supported_operation()));
        assert!(!available.iter().any(|f| f.short_name == "QML"));
        assert!(!available.iter().any(|f| f.short_name == "PNG"));
    }

    #[test]
    fn test_formats_for_kind() {
        let registration = formats_for(FormatKind::Registration);
        assert!(registration.iter().any(|f| f.short_name == "pgstac"));
        assert!(registration.iter().all(|f| f.kind == FormatKind::Registration));
    }

    #[test]
    fn test_format_names_sorted() {
        let names = format_names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_extension_inference() {
        let cpt = colormap_format_for_path(&PathBuf::from("ramp.cpt")).unwrap();
        assert_eq!(cpt.short_name, "CPT");
        let geocss = colormap_format_for_path(&PathBuf::from("style.geocss")).unwrap();
        assert_eq!(geocss.short_name, "GeoCSS");
        assert!(colormap_format_for_path(&PathBuf::from("style.qml")).is_none());
        assert!(colormap_format_for_path(&PathBuf::from("noext")).is_none());
    }

    #[test]
    fn test_support_status() {
        assert!(SupportStatus::Supported.is_supported());
        assert!(!SupportStatus::NotSupported.is_supported());
        assert!(!SupportStatus::Planned.is_supported());

        assert!(SupportStatus::Supported.is_available());
        assert!(!SupportStatus::NotSupported.is_available());
        assert!(SupportStatus::Planned.is_available());
    }
}
