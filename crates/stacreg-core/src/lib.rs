//! `stacreg-core` is the core library for the `stacreg` project: harvesting
//! Earth-observation resources and registering them as STAC records.
//!
//! This crate includes:
//! - **Format Registry**: a static registry of style formats, quicklook
//!   outputs and registration targets with their capabilities.
//! - **STAC Model**: serde data structures for Items, Collections and Assets,
//!   plus an [`stac::ItemBuilder`] that turns harvested resources into records.
//! - **Color Maps**: an in-memory color map model with readers and writers for
//!   the CPT, SLD and GeoCSS style formats.
//!
//! The `formats` module exposes the static registry consumed by the CLI and
//! other parts of the system.

pub mod colormap;
pub mod error;
pub mod formats;
pub mod ndjson;
pub mod sink;
pub mod stac;

pub use error::{Result, StacRegError};
pub use sink::ItemSink;
