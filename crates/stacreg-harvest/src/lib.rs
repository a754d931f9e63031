//! OSEO (OGC OpenSearch for Earth Observation) harvesting for `stacreg`.
//!
//! [`OseoClient`] queries an OpenSearch EO endpoint, pages through the Atom
//! result feed, and yields [`HarvestedResource`]s ready to be turned into
//! STAC items.
//!
//! Malformed feed entries are skipped with a warning rather than aborting a
//! harvest; transport failures are retried a bounded number of times.

mod atom;
mod client;
mod resource;

pub use atom::AtomFeed;
pub use client::{OseoClient, SearchParams};
pub use resource::{HarvestedResource, LinkRel, ResourceLink};

use thiserror::Error;

/// Errors raised while harvesting.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The endpoint URL or a derived request URL is invalid.
    #[error("Invalid harvest URL: {0}")]
    Url(#[from] url::ParseError),

    /// An HTTP transport or status failure, after retries were exhausted.
    #[error("Harvest request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The Atom feed could not be parsed.
    #[error("Failed to parse Atom feed: {message}")]
    Feed {
        /// Description of the parse failure.
        message: String,
    },

    /// The server response violated the OpenSearch protocol.
    #[error("OpenSearch protocol error: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, HarvestError>;
