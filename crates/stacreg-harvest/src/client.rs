//! OpenSearch EO client with paging and bounded retry.

use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::atom::{AtomFeed, parse_feed};
use crate::resource::HarvestedResource;
use crate::{HarvestError, Result};

/// Search parameters rendered onto the OpenSearch EO query string.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// `parentIdentifier`: the remote collection to search.
    pub collection: Option<String>,
    /// `startDate`: RFC 3339 lower time bound.
    pub start: Option<String>,
    /// `completionDate`: RFC 3339 upper time bound.
    pub end: Option<String>,
    /// `bbox`: `xmin,ymin,xmax,ymax` in WGS84.
    pub bbox: Option<[f64; 4]>,
    /// `productType` filter.
    pub product_type: Option<String>,
    /// Stop after this many resources across all pages.
    pub limit: Option<usize>,
}

impl SearchParams {
    /// Renders the query pairs for one page request.
    #[must_use]
    pub fn query_pairs(&self, start_record: u64, page_size: u32) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("maximumRecords".to_string(), page_size.to_string()),
            ("startRecord".to_string(), start_record.to_string()),
            ("httpAccept".to_string(), "application/atom+xml".to_string()),
        ];
        if let Some(collection) = &self.collection {
            pairs.push(("parentIdentifier".to_string(), collection.clone()));
        }
        if let Some(start) = &self.start {
            pairs.push(("startDate".to_string(), start.clone()));
        }
        if let Some(end) = &self.end {
            pairs.push(("completionDate".to_string(), end.clone()));
        }
        if let Some(bbox) = &self.bbox {
            pairs.push((
                "bbox".to_string(),
                format!("{},{},{},{}", bbox[0], bbox[1], bbox[2], bbox[3]),
            ));
        }
        if let Some(product_type) = &self.product_type {
            pairs.push(("productType".to_string(), product_type.clone()));
        }
        pairs
    }
}

/// An OSEO endpoint client.
///
/// Wraps a [`reqwest::Client`] with the endpoint URL, the page size used for
/// `maximumRecords`, and a bounded retry count for transport failures.
#[derive(Debug, Clone)]
pub struct OseoClient {
    endpoint: Url,
    http: reqwest::Client,
    page_size: u32,
    retries: u32,
}

impl OseoClient {
    /// Creates a client for an endpoint with default paging (50 records) and
    /// retry (2) settings.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Http`] when the HTTP client cannot be built.
    pub fn new(endpoint: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            endpoint,
            http,
            page_size: 50,
            retries: 2,
        })
    }

    /// Overrides the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Overrides the retry count.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// The configured page size.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetches and parses one result page.
    ///
    /// # Errors
    ///
    /// Returns a [`HarvestError`] when the request fails after retries or
    /// the response feed is malformed.
    pub async fn fetch_page(&self, params: &SearchParams, start_record: u64) -> Result<AtomFeed> {
        let pairs = params.query_pairs(start_record, self.page_size);
        let mut attempt = 0;
        loop {
            debug!(endpoint = %self.endpoint, start_record, attempt, "fetching OSEO page");
            let result = self
                .http
                .get(self.endpoint.clone())
                .query(&pairs)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status);

            match result {
                Ok(response) => {
                    let body = response.text().await?;
                    let feed = parse_feed(&body)?;
                    if feed.total_results.is_none()
                        && feed.resources.is_empty()
                        && !body.contains("<feed")
                    {
                        return Err(HarvestError::Protocol {
                            message: "response is not an Atom feed".to_string(),
                        });
                    }
                    return Ok(feed);
                },
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "OSEO request failed, retrying");
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                },
                Err(e) => return Err(HarvestError::Http(e)),
            }
        }
    }

    /// Pages through the endpoint until it is exhausted or the limit is
    /// reached.
    ///
    /// # Errors
    ///
    /// Returns a [`HarvestError`] when any page fails to fetch or parse.
    pub async fn harvest(&self, params: &SearchParams) -> Result<Vec<HarvestedResource>> {
        let mut resources = Vec::new();
        let mut start_record: u64 = 1;
        let mut skipped = 0usize;

        loop {
            let feed = self.fetch_page(params, start_record).await?;
            skipped += feed.skipped;
            let page_len = feed.resources.len() + feed.skipped;
            if page_len == 0 {
                break;
            }
            resources.extend(feed.resources);

            if let Some(limit) = params.limit {
                if resources.len() >= limit {
                    resources.truncate(limit);
                    break;
                }
            }

            start_record += page_len as u64;
            if let Some(total) = feed.total_results {
                if start_record > total {
                    break;
                }
            }
        }

        info!(
            count = resources.len(),
            skipped, "harvest finished"
        );
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_minimal() {
        let params = SearchParams::default();
        let pairs = params.query_pairs(1, 50);
        assert!(pairs.contains(&("maximumRecords".to_string(), "50".to_string())));
        assert!(pairs.contains(&("startRecord".to_string(), "1".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "parentIdentifier"));
    }

    #[test]
    fn test_query_pairs_full() {
        let params = SearchParams {
            collection: Some("SENTINEL-2".to_string()),
            start: Some("2023-05-01T00:00:00Z".to_string()),
            end: Some("2023-05-02T00:00:00Z".to_string()),
            bbox: Some([8.0, 46.0, 9.0, 47.0]),
            product_type: Some("S2MSI2A".to_string()),
            limit: Some(10),
        };
        let pairs = params.query_pairs(51, 25);
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("parentIdentifier"), Some("SENTINEL-2"));
        assert_eq!(get("startDate"), Some("2023-05-01T00:00:00Z"));
        assert_eq!(get("completionDate"), Some("2023-05-02T00:00:00Z"));
        assert_eq!(get("bbox"), Some("8,46,9,47"));
        assert_eq!(get("productType"), Some("S2MSI2A"));
        assert_eq!(get("startRecord"), Some("51"));
        assert_eq!(get("maximumRecords"), Some("25"));
    }

    #[test]
    fn test_client_builders() {
        let client = OseoClient::new(Url::parse("https://catalog.example.com/search").unwrap())
            .unwrap()
            .with_page_size(0)
            .with_retries(5);
        // Page size is clamped to at least one record.
        assert_eq!(client.page_size(), 1);
    }
}
