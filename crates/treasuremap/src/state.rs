//! Observable marker state.
//!
//! [`MarkerState`] holds the current marker list as an immutable snapshot and
//! notifies subscribers whenever the list is replaced.
//!
//! # Invariants
//!
//! 1. Subscribers only ever see full snapshots, never a partially built list.
//! 2. The version increments exactly once per published snapshot.
//! 3. Subscribers are notified in registration order.
//! 4. Dropping a [`Subscription`] removes its callback before the next
//!    notification.
//! 5. A subscriber may publish again from inside its callback. The nested
//!    publish notifies everyone with the newer snapshot and the outer delivery
//!    stops, so no subscriber sees an older list after a newer one.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::marker::Marker;

/// An immutable, cheaply cloneable view of the marker list.
pub type Snapshot = Rc<[Marker]>;

type Callback = dyn Fn(&[Marker]);

struct Inner {
    snapshot: Snapshot,
    version: u64,
    subscribers: Vec<Weak<Callback>>,
}

/// Shared, single-threaded observable holding the current markers.
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct MarkerState {
    inner: Rc<RefCell<Inner>>,
}

impl MarkerState {
    /// Create a state holding `markers` at version 0.
    #[must_use]
    pub fn new(markers: Vec<Marker>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                snapshot: markers.into(),
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn get(&self) -> Snapshot {
        Rc::clone(&self.inner.borrow().snapshot)
    }

    /// Number of snapshots published since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of markers in the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().snapshot.len()
    }

    /// Whether the current snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register `callback` to run with every newly published snapshot.
    ///
    /// The callback stays registered for as long as the returned
    /// [`Subscription`] is alive.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&[Marker]) + 'static) -> Subscription {
        let callback: Rc<Callback> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription {
            _callback: callback,
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Replace the snapshot and notify subscribers.
    pub(crate) fn publish(&self, markers: Vec<Marker>) {
        let (snapshot, version, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            inner.snapshot = markers.into();
            inner.version += 1;
            inner.subscribers.retain(|weak| weak.strong_count() > 0);
            let live: Vec<Rc<Callback>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (Rc::clone(&inner.snapshot), inner.version, live)
        };

        for callback in subscribers {
            if self.version() != version {
                break;
            }
            callback(&snapshot);
        }
    }
}

impl Default for MarkerState {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for MarkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MarkerState")
            .field("markers", &inner.snapshot.len())
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Keeps a subscriber registered; dropping it unsubscribes.
pub struct Subscription {
    _callback: Rc<Callback>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
