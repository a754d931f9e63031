//! Registration sink trait implemented by the catalog backends.
//!
//! This is the seam between record construction and the backends
//! (pgstac, GeoParquet, NDJSON), letting the pipeline register items
//! without knowing where they land.

use anyhow::Result;
use async_trait::async_trait;

use crate::stac::Item;

/// A destination that STAC items can be registered into.
///
/// Implementations must be `Send` so registration can run on a runtime
/// worker.
#[async_trait]
pub trait ItemSink: Send {
    /// Registers a batch of items, returning how many were accepted.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the backend rejects the batch. Implementations
    /// should name the failing item where they can.
    async fn register(&mut self, items: &[Item]) -> Result<usize>;

    /// A short backend name for logging (`"pgstac"`, `"geoparquet"`, ...).
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSink;

    #[async_trait]
    impl ItemSink for NullSink {
        async fn register(&mut self, items: &[Item]) -> Result<usize> {
            Ok(items.len())
        }

        fn name(&self) -> &'static str {
            "null"
        }
    }

    #[test]
    fn test_sink_is_object_safe() {
        let boxed: Box<dyn ItemSink> = Box::new(NullSink);
        assert_eq!(boxed.name(), "null");
    }
}
