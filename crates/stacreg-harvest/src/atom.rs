//! Atom feed parsing for OpenSearch EO responses.
//!
//! The parser is namespace-tolerant: elements are matched on their local
//! name, so `os:totalResults`, `georss:box` and friends resolve regardless
//! of the prefix a server chose.

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

use crate::resource::{HarvestedResource, LinkRel, ResourceLink};
use crate::{HarvestError, Result};

/// One page of an OpenSearch EO result feed.
#[derive(Debug, Clone, Default)]
pub struct AtomFeed {
    /// `os:totalResults`, when reported.
    pub total_results: Option<u64>,
    /// `os:startIndex`, when reported.
    pub start_index: Option<u64>,
    /// `os:itemsPerPage`, when reported.
    pub items_per_page: Option<u64>,
    /// The entries of this page that were complete enough to keep.
    pub resources: Vec<HarvestedResource>,
    /// Number of entries that were dropped as incomplete.
    pub skipped: usize,
}

/// Parses one Atom response page.
///
/// Entries missing an id or timestamp are dropped with a warning and counted
/// in [`AtomFeed::skipped`].
///
/// # Errors
///
/// Returns [`HarvestError::Feed`] when the XML itself is malformed.
pub fn parse_feed(xml: &str) -> Result<AtomFeed> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut feed = AtomFeed::default();
    let mut entry: Option<HarvestedResource> = None;
    let mut lower_corner: Option<(f64, f64)> = None;
    let mut upper_corner: Option<(f64, f64)> = None;
    let mut current_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = local_name(e.name().as_ref());
                match name.as_str() {
                    "entry" => {
                        entry = Some(HarvestedResource::default());
                        lower_corner = None;
                        upper_corner = None;
                    },
                    "link" => {
                        if let Some(entry) = entry.as_mut() {
                            let mut href = None;
                            let mut rel = None;
                            let mut media_type = None;
                            let mut title = None;
                            for attr in e.attributes().flatten() {
                                let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                                let value = String::from_utf8_lossy(&attr.value).to_string();
                                match key.as_str() {
                                    "href" => href = Some(value),
                                    "rel" => rel = Some(value),
                                    "type" => media_type = Some(value),
                                    "title" => title = Some(value),
                                    _ => {},
                                }
                            }
                            if let Some(href) = href {
                                entry.links.push(ResourceLink {
                                    href,
                                    rel: LinkRel::from_atom(rel.as_deref().unwrap_or("alternate")),
                                    media_type,
                                    title,
                                });
                            }
                        }
                    },
                    _ => current_text.clear(),
                }
            },
            Ok(Event::Text(e)) => {
                current_text = reader
                    .decoder()
                    .decode(e.as_ref())
                    .unwrap_or_default()
                    .to_string();
            },
            Ok(Event::End(e)) => {
                let name = local_name(e.name().as_ref());
                let text = current_text.trim().to_string();
                if name == "entry" {
                    if let Some(mut finished) = entry.take() {
                        if finished.bbox.is_none() {
                            if let (Some((miny, minx)), Some((maxy, maxx))) =
                                (lower_corner, upper_corner)
                            {
                                finished.bbox = Some([minx, miny, maxx, maxy]);
                            }
                        }
                        if finished.is_complete() {
                            feed.resources.push(finished);
                        } else {
                            warn!(id = %finished.id, "skipping incomplete feed entry");
                            feed.skipped += 1;
                        }
                    }
                } else if let Some(entry) = entry.as_mut() {
                    match name.as_str() {
                        "id" => entry.id = text,
                        "title" => entry.title = Some(text),
                        "summary" => entry.summary = Some(text),
                        "updated" => {
                            if entry.datetime.is_none() {
                                entry.datetime = parse_datetime(&text);
                            }
                        },
                        // dc:date is either an instant or a start/end interval.
                        "date" => {
                            if let Some((start, end)) = text.split_once('/') {
                                entry.start = parse_datetime(start);
                                entry.end = parse_datetime(end);
                                if let Some(start) = entry.start {
                                    entry.datetime = Some(start);
                                }
                            } else if let Some(dt) = parse_datetime(&text) {
                                entry.datetime = Some(dt);
                            }
                        },
                        "box" => entry.bbox = parse_georss_box(&text),
                        "lowerCorner" => lower_corner = parse_corner(&text),
                        "upperCorner" => upper_corner = parse_corner(&text),
                        _ => {},
                    }
                } else {
                    match name.as_str() {
                        "totalResults" => feed.total_results = text.parse().ok(),
                        "startIndex" => feed.start_index = text.parse().ok(),
                        "itemsPerPage" => feed.items_per_page = text.parse().ok(),
                        _ => {},
                    }
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => {
                return Err(HarvestError::Feed {
                    message: e.to_string(),
                });
            },
        }
        buf.clear();
    }

    Ok(feed)
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    name.rsplit(':').next().unwrap_or(&name).to_string()
}

/// Parses an RFC 3339 timestamp, tolerating a missing offset (assumed UTC).
pub(crate) fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// `georss:box` is `miny minx maxy maxx` (latitude first).
fn parse_georss_box(text: &str) -> Option<[f64; 4]> {
    let parts: Vec<f64> = text
        .split_whitespace()
        .filter_map(|t| t.parse().ok())
        .collect();
    match parts.as_slice() {
        [miny, minx, maxy, maxx] => Some([*minx, *miny, *maxx, *maxy]),
        _ => None,
    }
}

/// GML corners are `lat lon`.
fn parse_corner(text: &str) -> Option<(f64, f64)> {
    let parts: Vec<f64> = text
        .split_whitespace()
        .filter_map(|t| t.parse().ok())
        .collect();
    match parts.as_slice() {
        [lat, lon] => Some((*lat, *lon)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:os="http://a9.com/-/spec/opensearch/1.1/"
      xmlns:georss="http://www.georss.org/georss"
      xmlns:dc="http://purl.org/dc/elements/1.1/">
  <title>Search results</title>
  <os:totalResults>3</os:totalResults>
  <os:startIndex>1</os:startIndex>
  <os:itemsPerPage>2</os:itemsPerPage>
  <entry>
    <id>urn:eop:S2A_T32TNS_20230501</id>
    <title>S2A granule</title>
    <updated>2023-05-01T10:00:00Z</updated>
    <dc:date>2023-05-01T10:00:00Z/2023-05-01T10:00:10Z</dc:date>
    <georss:box>46.1 8.2 47.3 9.9</georss:box>
    <link rel="enclosure" type="application/zip" href="https://dl.example.com/1.zip"/>
    <link rel="icon" href="https://dl.example.com/1.jpg"/>
    <summary>First granule</summary>
  </entry>
  <entry>
    <id>urn:eop:S2A_T32TNT_20230501</id>
    <updated>2023-05-01T10:00:05</updated>
    <georss:where>
      <Envelope>
        <lowerCorner>46.0 8.0</lowerCorner>
        <upperCorner>47.0 9.0</upperCorner>
      </Envelope>
    </georss:where>
  </entry>
  <entry>
    <title>No id, no date</title>
  </entry>
</feed>
"#;

    #[test]
    fn test_parse_feed_header() {
        let feed = parse_feed(FEED).unwrap();
        assert_eq!(feed.total_results, Some(3));
        assert_eq!(feed.start_index, Some(1));
        assert_eq!(feed.items_per_page, Some(2));
    }

    #[test]
    fn test_parse_entries() {
        let feed = parse_feed(FEED).unwrap();
        assert_eq!(feed.resources.len(), 2);
        assert_eq!(feed.skipped, 1);

        let first = &feed.resources[0];
        assert_eq!(first.id, "urn:eop:S2A_T32TNS_20230501");
        assert_eq!(first.bbox, Some([8.2, 46.1, 9.9, 47.3]));
        assert_eq!(
            first.start,
            Some(Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            first.end,
            Some(Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 10).unwrap())
        );
        assert_eq!(first.links.len(), 2);
        assert_eq!(first.summary.as_deref(), Some("First granule"));
    }

    #[test]
    fn test_gml_envelope_bbox() {
        let feed = parse_feed(FEED).unwrap();
        let second = &feed.resources[1];
        assert_eq!(second.bbox, Some([8.0, 46.0, 9.0, 47.0]));
        // `updated` without an offset is assumed UTC.
        assert_eq!(
            second.datetime,
            Some(Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 5).unwrap())
        );
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let err = parse_feed("<feed><unclosed").unwrap_err();
        assert!(matches!(err, HarvestError::Feed { .. }));
    }

    #[test]
    fn test_georss_box_ordering() {
        assert_eq!(parse_georss_box("1 2 3 4"), Some([2.0, 1.0, 4.0, 3.0]));
        assert_eq!(parse_georss_box("1 2 3"), None);
    }
}
