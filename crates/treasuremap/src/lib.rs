//! `treasuremap` - Place, keep, and share treasure map flags
//!
//! This library provides the marker store behind a map view: an ordered list
//! of flags persisted as a JSON array in a key-value slot, an observable
//! snapshot for the map surface, and export to the logbook application.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod handoff;
pub mod logging;
pub mod marker;
pub mod repository;
pub mod state;
pub mod storage;
pub mod surface;
pub mod view_model;

pub use config::Config;
pub use error::{Error, Result};
pub use export::ExportFormat;
pub use handoff::{CommandTarget, Delivery, ExportTarget};
pub use logging::init_logging;
pub use marker::Marker;
pub use repository::{CorruptionPolicy, MarkerRepository, RepositoryOptions};
pub use state::{MarkerState, Snapshot, Subscription};
pub use storage::{KeyValueStore, SqliteStore};
pub use surface::{MapSurface, RenderedMarker, SurfaceEvent};
pub use view_model::{EventOutcome, MapViewModel};
