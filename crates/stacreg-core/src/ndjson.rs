//! Newline-delimited JSON streams of STAC items.
//!
//! NDJSON is the interchange format between the harvest, register and export
//! commands: one item object per line.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{IoErrorExt, Result, StacError};
use crate::stac::Item;

/// Reads items from an NDJSON stream, one JSON object per line.
///
/// Blank lines are ignored. The failing line number is reported on parse
/// errors.
///
/// # Errors
///
/// Returns a [`StacError::Json`] wrapped error when a line is not a valid
/// item.
pub fn read_items<R: BufRead>(reader: R) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            crate::error::StacRegError::Other(anyhow::anyhow!(
                "failed to read NDJSON line {}: {e}",
                idx + 1
            ))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let item: Item = serde_json::from_str(&line).map_err(|source| {
            crate::error::StacRegError::Stac(StacError::Json {
                operation: format!("deserialize (line {})", idx + 1),
                source,
            })
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Writes items to an NDJSON stream, one JSON object per line.
///
/// # Errors
///
/// Returns an error when serialization or the underlying write fails.
pub fn write_items<W: Write>(mut writer: W, items: &[Item]) -> Result<()> {
    for item in items {
        let json = serde_json::to_string(item).map_err(|source| {
            crate::error::StacRegError::Stac(StacError::Json {
                operation: "serialize".to_string(),
                source,
            })
        })?;
        writeln!(writer, "{json}")
            .map_err(|e| crate::error::StacRegError::Other(anyhow::anyhow!(e)))?;
    }
    Ok(())
}

/// Reads items from an NDJSON file.
///
/// # Errors
///
/// Returns an error when the file cannot be opened or a line fails to parse.
pub fn read_items_from_path(path: &Path) -> Result<Vec<Item>> {
    let file = File::open(path).with_read_context("item NDJSON", path)?;
    read_items(BufReader::new(file))
}

/// Writes items to an NDJSON file.
///
/// # Errors
///
/// Returns an error when the file cannot be created or written.
pub fn write_items_to_path(path: &Path, items: &[Item]) -> Result<()> {
    let file = File::create(path).with_write_context("item NDJSON", path)?;
    let mut writer = BufWriter::new(file);
    write_items(&mut writer, items)?;
    writer
        .flush()
        .with_write_context("item NDJSON", path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stac::ItemBuilder;
    use chrono::{TimeZone, Utc};

    fn sample_items() -> Vec<Item> {
        (1..=3)
            .map(|i| {
                ItemBuilder::new(format!("item-{i}"))
                    .collection("c1")
                    .datetime(Utc.with_ymd_and_hms(2023, 5, i, 0, 0, 0).unwrap())
                    .bbox([0.0, 0.0, 1.0, 1.0])
                    .build()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_in_memory() {
        let items = sample_items();
        let mut buf = Vec::new();
        write_items(&mut buf, &items).unwrap();

        let read = read_items(std::io::Cursor::new(buf)).unwrap();
        assert_eq!(read.len(), 3);
        assert_eq!(read[0].id, "item-1");
        assert_eq!(read[2].datetime(), items[2].datetime());
    }

    #[test]
    fn test_blank_lines_ignored() {
        let items = sample_items();
        let mut buf = Vec::new();
        write_items(&mut buf, &items).unwrap();
        buf.extend_from_slice(b"\n\n");

        let read = read_items(std::io::Cursor::new(buf)).unwrap();
        assert_eq!(read.len(), 3);
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = read_items(std::io::Cursor::new(b"not json\n".to_vec())).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.ndjson");

        let items = sample_items();
        write_items_to_path(&path, &items).unwrap();
        let read = read_items_from_path(&path).unwrap();
        assert_eq!(read.len(), items.len());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_items_from_path(Path::new("/nonexistent/items.ndjson")).unwrap_err();
        assert!(matches!(err, crate::StacRegError::Io(_)));
    }
}
