//! The contract between the marker store and a map rendering surface.
//!
//! The surface renders markers and reports two gestures: a long-press at a
//! coordinate (add) and a tap on a rendered marker (remove). Tile sources,
//! projection, and gesture recognition belong to the surface.

use crate::marker::Marker;

/// A marker as handed to a surface for drawing.
///
/// Coordinates are copied verbatim so a tap reports back exactly the values
/// the store uses for removal.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMarker {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Label shown on the marker.
    pub title: String,
    /// Detail text shown under the label.
    pub snippet: String,
}

impl From<&Marker> for RenderedMarker {
    fn from(marker: &Marker) -> Self {
        Self {
            latitude: marker.latitude,
            longitude: marker.longitude,
            title: marker.title.clone(),
            snippet: marker.description.clone(),
        }
    }
}

impl RenderedMarker {
    /// The event a tap on this marker produces.
    #[must_use]
    pub fn tap(&self) -> SurfaceEvent {
        SurfaceEvent::MarkerTap {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Convert a marker list into render input, keeping order.
#[must_use]
pub fn render_list(markers: &[Marker]) -> Vec<RenderedMarker> {
    markers.iter().map(RenderedMarker::from).collect()
}

/// A user gesture reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    /// Long-press on the map; requests a new marker here.
    LongPress {
        /// Latitude of the press.
        latitude: f64,
        /// Longitude of the press.
        longitude: f64,
    },
    /// Tap on a rendered marker; requests its removal.
    MarkerTap {
        /// Rendered latitude of the tapped marker.
        latitude: f64,
        /// Rendered longitude of the tapped marker.
        longitude: f64,
    },
}

/// Something that draws markers.
pub trait MapSurface {
    /// Replace everything drawn with `markers`.
    fn render(&mut self, markers: &[RenderedMarker]);
}
