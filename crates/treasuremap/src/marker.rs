//! Core marker types for treasuremap.
//!
//! A marker ("flag") is a user-placed point of interest. Markers are
//! immutable values: the store replaces its whole list on every change.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to markers created without an explicit label.
pub const DEFAULT_TITLE: &str = "Flag Post";

/// A single flagged location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Unique identifier, assigned at creation and never reassigned.
    pub id: String,

    /// Latitude in signed degrees.
    pub latitude: f64,

    /// Longitude in signed degrees.
    pub longitude: f64,

    /// Display label.
    #[serde(default = "default_title")]
    pub title: String,

    /// Free text shown as the marker's detail.
    #[serde(default)]
    pub description: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Marker {
    /// Create a marker at the given coordinates with a fresh id and the
    /// default title and description.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self::with_title(latitude, longitude, DEFAULT_TITLE)
    }

    /// Create a marker with a fresh id and a custom title.
    #[must_use]
    pub fn with_title(latitude: f64, longitude: f64, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            latitude,
            longitude,
            title: title.into(),
            description: String::new(),
        }
    }

    /// Check whether this marker sits at exactly the given coordinates.
    ///
    /// No tolerance is applied; removal relies on bit-for-bit equal inputs.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, latitude: f64, longitude: f64) -> bool {
        self.latitude == latitude && self.longitude == longitude
    }
}
