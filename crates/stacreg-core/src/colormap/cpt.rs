//! GMT CPT palette reader and writer.
//!
//! CPT value lines carry two stops per line (`v1 <color> v2 <color>`) where a
//! color block is an `R/G/B` triplet, three whitespace-separated components,
//! or a named color. `B`, `F` and `N` lines set the background, foreground
//! and nodata colors; `#` starts a comment.

use super::named::named_color;
use super::{ColorMap, ColorMapEntry};
use crate::error::ColorMapError;

/// One side of a CPT value line.
struct Stop {
    value: Option<f64>,
    rgb: [u8; 3],
}

pub(super) fn parse(input: &str) -> Result<ColorMap, ColorMapError> {
    let mut entries = Vec::new();
    let mut background = None;
    let mut foreground = None;
    let mut nodata = None;
    let mut last_value_line: Option<(usize, Vec<&str>)> = None;

    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens[0] {
            "B" | "F" | "N" => {
                let stop = parse_color_block(&tokens[1..], idx + 1)?;
                let entry = ColorMapEntry::from_rgb(None, stop[0], stop[1], stop[2]);
                match tokens[0] {
                    "B" => background = Some(entry),
                    "F" => foreground = Some(entry),
                    _ => nodata = Some(entry),
                }
            },
            _ => {
                let first = parse_stop(&tokens, true, idx + 1)?;
                entries.push(ColorMapEntry::from_rgb(
                    first.value,
                    first.rgb[0],
                    first.rgb[1],
                    first.rgb[2],
                ));
                last_value_line = Some((idx + 1, tokens));
            },
        }
    }

    // The second stop of the final value line is the terminal entry.
    if let Some((line_no, tokens)) = last_value_line {
        let last = parse_stop(&tokens, false, line_no)?;
        entries.push(ColorMapEntry::from_rgb(
            last.value,
            last.rgb[0],
            last.rgb[1],
            last.rgb[2],
        ));
    } else {
        return Err(ColorMapError::Empty);
    }

    log::debug!("parsed {} CPT entries", entries.len());
    Ok(ColorMap {
        entries,
        background,
        foreground,
        nodata,
    })
}

/// Parses the first or second stop of a value line.
///
/// Token layouts (value and color indices depend on the total count):
/// - 4 tokens: `v1 R/G/B v2 R/G/B` or `v1 name v2 name`
/// - 6 tokens: `v1 name v2 R G B`
/// - 8 tokens: `v1 R G B v2 R G B`
fn parse_stop(tokens: &[&str], first: bool, line: usize) -> Result<Stop, ColorMapError> {
    let second_value_idx = match tokens.len() {
        4 | 6 => 2,
        8 => 4,
        n => {
            return Err(ColorMapError::Parse {
                format: "CPT".to_string(),
                line: Some(line),
                message: format!("unexpected token count {n} in value line"),
            });
        },
    };
    let value_idx = if first { 0 } else { second_value_idx };

    let value = tokens[value_idx]
        .parse::<f64>()
        .map_err(|_| ColorMapError::Parse {
            format: "CPT".to_string(),
            line: Some(line),
            message: format!("'{}' is not a numeric stop value", tokens[value_idx]),
        })?;
    let rgb = parse_color(&tokens[value_idx + 1..], line)?;

    Ok(Stop {
        value: Some(value),
        rgb,
    })
}

/// Parses the single color block of a `B`/`F`/`N` line.
fn parse_color_block(tokens: &[&str], line: usize) -> Result<[u8; 3], ColorMapError> {
    if tokens.is_empty() {
        return Err(ColorMapError::Parse {
            format: "CPT".to_string(),
            line: Some(line),
            message: "color block is empty".to_string(),
        });
    }
    parse_color(tokens, line)
}

/// Parses a color block starting at the head of `tokens`: `R/G/B`, three
/// separate components, or a named color.
fn parse_color(tokens: &[&str], line: usize) -> Result<[u8; 3], ColorMapError> {
    let head = tokens.first().ok_or_else(|| ColorMapError::Parse {
        format: "CPT".to_string(),
        line: Some(line),
        message: "missing color block".to_string(),
    })?;

    if head.contains('/') {
        let parts: Vec<&str> = head.split('/').collect();
        if parts.len() != 3 {
            return Err(ColorMapError::InvalidColor {
                value: (*head).to_string(),
                reason: "expected R/G/B".to_string(),
            });
        }
        return Ok([
            component(parts[0])?,
            component(parts[1])?,
            component(parts[2])?,
        ]);
    }

    if head.chars().all(|c| c.is_ascii_digit()) {
        if tokens.len() < 3 {
            return Err(ColorMapError::Parse {
                format: "CPT".to_string(),
                line: Some(line),
                message: "expected three color components".to_string(),
            });
        }
        return Ok([
            component(tokens[0])?,
            component(tokens[1])?,
            component(tokens[2])?,
        ]);
    }

    named_color(head)
}

fn component(token: &str) -> Result<u8, ColorMapError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .ok_or_else(|| ColorMapError::InvalidColor {
            value: token.to_string(),
            reason: "not a color component".to_string(),
        })
}

pub(super) fn write(map: &ColorMap, title: Option<&str>, description: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(title) = title {
        out.push_str(&format!("# Title: {title}\n"));
    }
    if let Some(description) = description {
        out.push_str(&format!("# Description: {description}\n"));
    }

    let stops: Vec<&ColorMapEntry> = map.entries.iter().filter(|e| e.has_value()).collect();
    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            lo.value.unwrap_or_default(),
            lo.red,
            lo.green,
            lo.blue,
            hi.value.unwrap_or_default(),
            hi.red,
            hi.green,
            hi.blue,
        ));
    }

    if let Some(b) = &map.background {
        out.push_str(&format!("B\t{}\t{}\t{}\n", b.red, b.green, b.blue));
    }
    if let Some(f) = &map.foreground {
        out.push_str(&format!("F\t{}\t{}\t{}\n", f.red, f.green, f.blue));
    }
    if let Some(n) = &map.nodata {
        out.push_str(&format!("N\t{}\t{}\t{}\n", n.red, n.green, n.blue));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLASH_CPT: &str = "\
# A comment line
0.125 31/40/79 0.25 38/60/106
0.25 38/60/106 0.375 49/80/133
B 0 0 0
F 255 255 255
N 128/128/128
";

    #[test]
    fn test_parse_slash_colors() {
        let map = ColorMap::from_cpt(SLASH_CPT).unwrap();
        // Two value lines plus the terminal entry from the last line.
        assert_eq!(map.entries.len(), 3);
        assert_eq!(map.entries[0].value, Some(0.125));
        assert_eq!(map.entries[0].as_rgb(), [31, 40, 79]);
        assert_eq!(map.entries[2].value, Some(0.375));
        assert_eq!(map.entries[2].as_rgb(), [49, 80, 133]);

        assert_eq!(map.background.as_ref().unwrap().as_rgb(), [0, 0, 0]);
        assert_eq!(map.foreground.as_ref().unwrap().as_rgb(), [255, 255, 255]);
        assert_eq!(map.nodata.as_ref().unwrap().as_rgb(), [128, 128, 128]);
    }

    #[test]
    fn test_parse_named_colors() {
        let map = ColorMap::from_cpt("0 black 0.125 red\n").unwrap();
        assert_eq!(map.entries.len(), 2);
        assert_eq!(map.entries[0].as_rgb(), [0, 0, 0]);
        assert_eq!(map.entries[1].value, Some(0.125));
        assert_eq!(map.entries[1].as_rgb(), [255, 0, 0]);
    }

    #[test]
    fn test_parse_mixed_named_and_components() {
        let map = ColorMap::from_cpt("0 black 0.125 31 40 79\n").unwrap();
        assert_eq!(map.entries.len(), 2);
        assert_eq!(map.entries[1].as_rgb(), [31, 40, 79]);
    }

    #[test]
    fn test_parse_eight_token_lines() {
        let map = ColorMap::from_cpt("0 31 40 79 0.125 49 80 133\n").unwrap();
        assert_eq!(map.entries.len(), 2);
        assert_eq!(map.entries[0].as_rgb(), [31, 40, 79]);
        assert_eq!(map.entries[1].as_rgb(), [49, 80, 133]);
    }

    #[test]
    fn test_parse_unknown_name_is_error() {
        let err = ColorMap::from_cpt("0 blurple 1 red\n").unwrap_err();
        assert!(matches!(err, ColorMapError::UnknownColorName { .. }));
    }

    #[test]
    fn test_parse_empty_is_error() {
        assert!(matches!(
            ColorMap::from_cpt("# only a comment\n"),
            Err(ColorMapError::Empty)
        ));
        assert!(matches!(
            ColorMap::from_cpt("B 0 0 0\n"),
            Err(ColorMapError::Empty)
        ));
    }

    #[test]
    fn test_write_pairs_and_specials() {
        let mut map = ColorMap::new(vec![
            ColorMapEntry::from_rgb(Some(0.0), 0, 0, 0),
            ColorMapEntry::from_rgb(Some(0.5), 100, 100, 100),
            ColorMapEntry::from_rgb(Some(1.0), 255, 255, 255),
        ]);
        map.nodata = Some(ColorMapEntry::from_rgb(None, 1, 2, 3));

        let cpt = map.to_cpt(Some("Ramp"), None);
        let lines: Vec<&str> = cpt.lines().collect();
        assert_eq!(lines[0], "# Title: Ramp");
        assert_eq!(lines[1], "0\t0\t0\t0\t0.5\t100\t100\t100");
        assert_eq!(lines[2], "0.5\t100\t100\t100\t1\t255\t255\t255");
        assert_eq!(lines[3], "N\t1\t2\t3");
    }

    #[test]
    fn test_roundtrip() {
        let map = ColorMap::from_cpt(SLASH_CPT).unwrap();
        let rewritten = map.to_cpt(None, None);
        let reparsed = ColorMap::from_cpt(&rewritten).unwrap();
        assert_eq!(map.entries, reparsed.entries);
        assert_eq!(map.nodata, reparsed.nodata);
    }
}
