//! pgstac registration backend for `stacreg`.
//!
//! [`PgstacClient`] loads STAC collections and items into a PostgreSQL
//! database running the pgstac schema. Records travel as JSON through the
//! pgstac SQL functions (`upsert_collection`, `upsert_item`), so the schema
//! version owns all indexing and partitioning concerns.

use async_trait::async_trait;
use thiserror::Error;
use tokio_postgres::NoTls;
use tracing::{debug, error, info};

use stacreg_core::sink::ItemSink;
use stacreg_core::stac::{Collection, Item};

/// Items per transaction when bulk-loading.
const DEFAULT_CHUNK_SIZE: usize = 100;

const SEARCH_PATH_SQL: &str = "SET search_path TO pgstac, public";
const VERSION_SQL: &str = "SELECT pgstac.get_version()";
const UPSERT_COLLECTION_SQL: &str = "SELECT pgstac.upsert_collection($1::text::jsonb)";
const UPSERT_ITEM_SQL: &str = "SELECT pgstac.upsert_item($1::text::jsonb)";

/// Errors raised while registering records.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Connection or query failure.
    #[error("pgstac database error: {0}")]
    Db(#[from] tokio_postgres::Error),

    /// A record could not be serialized for loading.
    #[error("Failed to serialize {what} '{id}': {source}")]
    Serialize {
        /// "item" or "collection".
        what: &'static str,
        /// The record id.
        id: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A specific item failed to load.
    #[error("Failed to load item '{id}': {source}")]
    ItemLoad {
        /// The failing item id.
        id: String,
        /// The underlying database error.
        #[source]
        source: tokio_postgres::Error,
    },
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, RegistrationError>;

/// Outcome of a bulk item registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterReport {
    /// Items loaded.
    pub items_loaded: usize,
    /// Transactions used.
    pub chunks: usize,
}

/// A connected pgstac client.
pub struct PgstacClient {
    client: tokio_postgres::Client,
    chunk_size: usize,
}

impl PgstacClient {
    /// Connects to the database and pins the search path to the pgstac
    /// schema. The connection task is spawned onto the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Db`] when the connection or the
    /// search-path statement fails.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(dsn, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "pgstac connection closed");
            }
        });

        client.batch_execute(SEARCH_PATH_SQL).await?;

        Ok(Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Overrides the bulk-load chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the pgstac schema version, as a connectivity probe.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Db`] when the query fails.
    pub async fn version(&self) -> Result<String> {
        let row = self.client.query_one(VERSION_SQL, &[]).await?;
        Ok(row.get(0))
    }

    /// Creates or updates a collection document.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] when serialization or the upsert
    /// fails.
    pub async fn upsert_collection(&self, collection: &Collection) -> Result<()> {
        let json = serde_json::to_string(collection).map_err(|source| {
            RegistrationError::Serialize {
                what: "collection",
                id: collection.id.clone(),
                source,
            }
        })?;
        self.client
            .execute(UPSERT_COLLECTION_SQL, &[&json])
            .await?;
        info!(collection = %collection.id, "collection upserted");
        Ok(())
    }

    /// Loads items in chunked transactions.
    ///
    /// Each chunk is one transaction; a failing item aborts its chunk and
    /// the error names the item.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] when serialization, a transaction, or
    /// an individual upsert fails.
    pub async fn upsert_items(&mut self, items: &[Item]) -> Result<RegisterReport> {
        let mut report = RegisterReport {
            items_loaded: 0,
            chunks: 0,
        };

        for chunk in items.chunks(self.chunk_size) {
            let tx = self.client.transaction().await?;
            let statement = tx.prepare(UPSERT_ITEM_SQL).await?;
            for item in chunk {
                let json =
                    serde_json::to_string(item).map_err(|source| RegistrationError::Serialize {
                        what: "item",
                        id: item.id.clone(),
                        source,
                    })?;
                tx.execute(&statement, &[&json]).await.map_err(|source| {
                    RegistrationError::ItemLoad {
                        id: item.id.clone(),
                        source,
                    }
                })?;
            }
            tx.commit().await?;
            report.chunks += 1;
            report.items_loaded += chunk.len();
            debug!(
                loaded = report.items_loaded,
                total = items.len(),
                "item chunk committed"
            );
        }

        info!(
            items = report.items_loaded,
            chunks = report.chunks,
            "registration finished"
        );
        Ok(report)
    }

    /// Number of items per transaction.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[async_trait]
impl ItemSink for PgstacClient {
    async fn register(&mut self, items: &[Item]) -> anyhow::Result<usize> {
        let report = self.upsert_items(items).await?;
        Ok(report.items_loaded)
    }

    fn name(&self) -> &'static str {
        "pgstac"
    }
}

/// Chunk accounting for a planned load, used for reporting before any
/// connection exists.
#[must_use]
pub fn planned_chunks(item_count: usize, chunk_size: usize) -> usize {
    item_count.div_ceil(chunk_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacreg_core::stac::ItemBuilder;

    #[test]
    fn test_sql_targets_pgstac_schema() {
        for sql in [VERSION_SQL, UPSERT_COLLECTION_SQL, UPSERT_ITEM_SQL] {
            assert!(sql.contains("pgstac."), "{sql}");
        }
        // Records travel as text and are cast server-side.
        assert!(UPSERT_ITEM_SQL.contains("$1::text::jsonb"));
        assert!(SEARCH_PATH_SQL.contains("pgstac, public"));
    }

    #[test]
    fn test_planned_chunks() {
        assert_eq!(planned_chunks(0, 100), 0);
        assert_eq!(planned_chunks(1, 100), 1);
        assert_eq!(planned_chunks(100, 100), 1);
        assert_eq!(planned_chunks(101, 100), 2);
        assert_eq!(planned_chunks(10, 0), 10);
    }

    #[test]
    fn test_item_json_is_loadable_shape() {
        // pgstac accepts any valid STAC item JSON; make sure ours carries
        // the fields its triggers key on.
        let item = ItemBuilder::new("item-1")
            .collection("c1")
            .datetime(chrono_now())
            .bbox([0.0, 0.0, 1.0, 1.0])
            .build()
            .unwrap();
        let json = serde_json::to_value(&item).unwrap();
        assert!(json["id"].is_string());
        assert!(json["collection"].is_string());
        assert!(json["properties"]["datetime"].is_string());
        assert!(json["geometry"].is_object());
    }

    fn chrono_now() -> chrono::DateTime<chrono::Utc> {
        use chrono::TimeZone;
        chrono::Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap()
    }
}
