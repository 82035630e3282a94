//! View-state adapter between the marker store and the presentation layer.
//!
//! [`MapViewModel`] keeps no state of its own. It forwards commands to a
//! shared [`MarkerRepository`] and republishes the repository's observable
//! state unchanged. Dropping the view model leaves the repository untouched.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::error::Result;
use crate::export::{self, ExportFormat};
use crate::handoff::{Delivery, ExportTarget};
use crate::marker::Marker;
use crate::repository::MarkerRepository;
use crate::state::{MarkerState, Subscription};
use crate::storage::KeyValueStore;
use crate::surface::{render_list, MapSurface, SurfaceEvent};

/// What a surface event did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// A long-press created this marker.
    Added(Marker),
    /// A tap removed one or more markers.
    Removed,
    /// A tap matched no marker.
    NotFound,
}

/// Presentation-facing handle on a marker repository.
#[derive(Debug)]
pub struct MapViewModel<S: KeyValueStore> {
    repository: Rc<MarkerRepository<S>>,
}

impl<S: KeyValueStore> Clone for MapViewModel<S> {
    fn clone(&self) -> Self {
        Self {
            repository: Rc::clone(&self.repository),
        }
    }
}

impl<S: KeyValueStore> MapViewModel<S> {
    /// Wrap a shared repository.
    #[must_use]
    pub fn new(repository: Rc<MarkerRepository<S>>) -> Self {
        Self { repository }
    }

    /// The repository's observable marker state.
    #[must_use]
    pub fn markers(&self) -> MarkerState {
        self.repository.state().clone()
    }

    /// Add a marker at the given coordinates.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub fn add_marker(&self, latitude: f64, longitude: f64) -> Result<Marker> {
        self.repository.add(latitude, longitude)
    }

    /// Remove every marker at exactly the given coordinates.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub fn remove_marker(&self, latitude: f64, longitude: f64) -> Result<bool> {
        self.repository.remove(latitude, longitude)
    }

    /// Remove all markers.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub fn clear_all_markers(&self) -> Result<()> {
        self.repository.clear()
    }

    /// The plain-text listing of the current markers.
    #[must_use]
    pub fn export_text(&self) -> String {
        self.repository.export_text()
    }

    /// The current markers as a payload in `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if the structured payload cannot be serialized.
    pub fn export_payload(&self, format: ExportFormat, task: &str) -> Result<String> {
        export::render(&self.repository.markers(), format, task)
    }

    /// Hand `payload` to the logbook receiver.
    ///
    /// A missing receiver is returned as [`Delivery::NoReceiver`], which the
    /// caller should show as an informational notice.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver exists but rejects the payload.
    pub fn send_to_logbook(&self, target: &dyn ExportTarget, payload: &str) -> Result<Delivery> {
        let delivery = target.deliver(payload)?;
        info!(
            "Export of {} markers to '{}': {:?}",
            self.repository.len(),
            target.name(),
            delivery
        );
        Ok(delivery)
    }

    /// Apply a gesture reported by the map surface.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub fn handle_event(&self, event: SurfaceEvent) -> Result<EventOutcome> {
        match event {
            SurfaceEvent::LongPress {
                latitude,
                longitude,
            } => self.add_marker(latitude, longitude).map(EventOutcome::Added),
            SurfaceEvent::MarkerTap {
                latitude,
                longitude,
            } => Ok(if self.remove_marker(latitude, longitude)? {
                EventOutcome::Removed
            } else {
                EventOutcome::NotFound
            }),
        }
    }

    /// Render the current markers into `surface` and re-render on every
    /// change while the returned subscription lives.
    ///
    /// The surface must not mutate the store from inside `render`.
    #[must_use = "dropping the subscription detaches the surface"]
    pub fn attach<M: MapSurface + 'static>(&self, surface: Rc<RefCell<M>>) -> Subscription {
        let state = self.repository.state();
        surface.borrow_mut().render(&render_list(&state.get()));
        state.subscribe(move |markers| surface.borrow_mut().render(&render_list(markers)))
    }
}
