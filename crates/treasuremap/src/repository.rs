//! The marker store.
//!
//! [`MarkerRepository`] is the single authority over the current markers.
//! It loads the list from a durable slot when opened and writes the whole
//! list back after every mutation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::export;
use crate::marker::{Marker, DEFAULT_TITLE};
use crate::state::{MarkerState, Snapshot, Subscription};
use crate::storage::KeyValueStore;

/// Slot key the marker list is stored under by default.
pub const DEFAULT_SLOT_KEY: &str = "markers";

/// What to do when the stored marker list cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionPolicy {
    /// Start with an empty list and log a warning.
    #[default]
    Reset,
    /// Keep every record that parses, dropping the rest.
    Skip,
    /// Refuse to open the store.
    Fail,
}

/// Settings for a [`MarkerRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// Slot key holding the serialized list.
    pub slot_key: String,
    /// Title given to newly added markers.
    pub default_title: String,
    /// Handling of unreadable stored data.
    pub corruption_policy: CorruptionPolicy,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            default_title: DEFAULT_TITLE.to_string(),
            corruption_policy: CorruptionPolicy::default(),
        }
    }
}

/// Owns the canonical marker list and its durable copy.
///
/// Every mutation replaces the in-memory list, publishes the new snapshot to
/// subscribers, then rewrites the durable slot. A failed write is returned to
/// the caller; the published list stays in place.
#[derive(Debug)]
pub struct MarkerRepository<S: KeyValueStore> {
    store: S,
    options: RepositoryOptions,
    state: MarkerState,
}

impl<S: KeyValueStore> MarkerRepository<S> {
    /// Open the repository and load the stored markers.
    ///
    /// An absent slot loads as an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read, or if the stored data is
    /// corrupt and the policy is [`CorruptionPolicy::Fail`].
    pub fn open(store: S, options: RepositoryOptions) -> Result<Self> {
        let markers = load_markers(&store, &options)?;
        info!(
            "Loaded {} markers from slot '{}'",
            markers.len(),
            options.slot_key
        );
        Ok(Self {
            store,
            options,
            state: MarkerState::new(markers),
        })
    }

    /// Add a marker at the given coordinates and return it.
    ///
    /// The marker gets a fresh id and the configured default title, and is
    /// appended after all existing markers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinate`] for non-finite input, or an error
    /// if the list cannot be persisted.
    pub fn add(&self, latitude: f64, longitude: f64) -> Result<Marker> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(Error::InvalidCoordinate {
                latitude,
                longitude,
            });
        }

        let marker = Marker::with_title(latitude, longitude, self.options.default_title.as_str());
        let mut markers = self.state.get().to_vec();
        markers.push(marker.clone());

        debug!(
            "Adding marker {} at ({}, {})",
            marker.id, latitude, longitude
        );
        self.commit(markers)?;
        Ok(marker)
    }

    /// Remove every marker at exactly the given coordinates.
    ///
    /// Returns whether anything was removed. Nothing is published or
    /// persisted when no marker matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be persisted.
    pub fn remove(&self, latitude: f64, longitude: f64) -> Result<bool> {
        let current = self.state.get();
        let kept: Vec<Marker> = current
            .iter()
            .filter(|marker| !marker.matches(latitude, longitude))
            .cloned()
            .collect();

        let removed = current.len() - kept.len();
        if removed == 0 {
            debug!("No marker at ({}, {})", latitude, longitude);
            return Ok(false);
        }

        info!(
            "Removing {} marker(s) at ({}, {})",
            removed, latitude, longitude
        );
        self.commit(kept)?;
        Ok(true)
    }

    /// Remove all markers.
    ///
    /// Always publishes and persists, even when the list is already empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be persisted.
    pub fn clear(&self) -> Result<()> {
        info!("Clearing {} markers", self.state.len());
        self.commit(Vec::new())
    }

    /// Describe the current markers as `Flag` lines.
    #[must_use]
    pub fn export_text(&self) -> String {
        export::plain_text(&self.state.get())
    }

    /// The current markers.
    #[must_use]
    pub fn markers(&self) -> Snapshot {
        self.state.get()
    }

    /// Number of markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Whether there are no markers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Handle to the observable state.
    #[must_use]
    pub fn state(&self) -> &MarkerState {
        &self.state
    }

    /// Run `callback` with every newly published marker list.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&[Marker]) + 'static) -> Subscription {
        self.state.subscribe(callback)
    }

    /// The options this repository was opened with.
    #[must_use]
    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    fn commit(&self, markers: Vec<Marker>) -> Result<()> {
        self.state.publish(markers);
        self.persist(&self.state.get())
    }

    fn persist(&self, markers: &[Marker]) -> Result<()> {
        let blob = serde_json::to_string(markers)?;
        if let Err(err) = self.store.put(&self.options.slot_key, &blob) {
            warn!(
                "Failed to persist {} markers to slot '{}': {}",
                markers.len(),
                self.options.slot_key,
                err
            );
            return Err(err);
        }
        Ok(())
    }
}

fn load_markers<S: KeyValueStore>(store: &S, options: &RepositoryOptions) -> Result<Vec<Marker>> {
    let key = options.slot_key.as_str();
    let Some(blob) = store.get(key)? else {
        debug!("Slot '{}' is empty, starting with no markers", key);
        return Ok(Vec::new());
    };

    match options.corruption_policy {
        CorruptionPolicy::Fail => serde_json::from_str::<Vec<Marker>>(&blob)
            .map_err(|err| Error::corrupt_markers(key, err.to_string())),
        CorruptionPolicy::Reset => match serde_json::from_str::<Vec<Marker>>(&blob) {
            Ok(markers) => Ok(markers),
            Err(err) => {
                warn!("Discarding corrupt markers in slot '{}': {}", key, err);
                Ok(Vec::new())
            }
        },
        CorruptionPolicy::Skip => match serde_json::from_str::<Vec<serde_json::Value>>(&blob) {
            Ok(records) => Ok(records
                .into_iter()
                .enumerate()
                .filter_map(|(index, record)| match serde_json::from_value::<Marker>(record) {
                    Ok(marker) => Some(marker),
                    Err(err) => {
                        warn!("Skipping unreadable marker #{} in slot '{}': {}", index, key, err);
                        None
                    }
                })
                .collect()),
            Err(err) => {
                warn!("Discarding corrupt markers in slot '{}': {}", key, err);
                Ok(Vec::new())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    fn open(store: &SqliteStore) -> MarkerRepository<&SqliteStore> {
        MarkerRepository::open(store, RepositoryOptions::default()).unwrap()
    }

    fn open_with_policy(
        store: &SqliteStore,
        policy: CorruptionPolicy,
    ) -> Result<MarkerRepository<&SqliteStore>> {
        let options = RepositoryOptions {
            corruption_policy: policy,
            ..RepositoryOptions::default()
        };
        MarkerRepository::open(store, options)
    }

    /// Wraps a store and fails writes on demand.
    struct FlakyStore {
        inner: SqliteStore,
        fail_writes: Cell<bool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes.get() {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            self.inner.put(key, value)
        }
    }

    #[test]
    fn test_open_empty_slot() {
        let store = create_test_store();
        let repo = open(&store);

        assert!(repo.is_empty());
        assert_eq!(repo.export_text(), "");
        assert_eq!(store.get(DEFAULT_SLOT_KEY).unwrap(), None);
    }

    #[test]
    fn test_round_trip_through_fresh_instance() {
        let store = create_test_store();
        let written: Vec<Marker> = {
            let repo = open(&store);
            repo.add(46.947_99, 7.447_44).unwrap();
            repo.add(-33.868_82, 151.209_296).unwrap();
            repo.add(0.0, 0.0).unwrap();
            repo.markers().to_vec()
        };

        let fresh = open(&store);
        assert_eq!(fresh.markers().to_vec(), written);
    }

    /// Deterministic pseudo-random coordinates spread over the globe.
    #[allow(clippy::cast_precision_loss)]
    fn scattered_coordinates(count: usize) -> Vec<(f64, f64)> {
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next_unit = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed >> 11) as f64 / (1_u64 << 53) as f64
        };
        (0..count)
            .map(|_| (next_unit() * 180.0 - 90.0, next_unit() * 360.0 - 180.0))
            .collect()
    }

    #[test]
    fn test_high_precision_coordinates_survive_reopen() {
        let store = create_test_store();
        let mut coords = scattered_coordinates(500);
        coords.push((22.264_283_906_583_856, 127.034_651_485_029_43));
        coords.push((-0.000_000_123_456_789_012_3, 179.999_999_999_999_97));

        {
            let repo = open(&store);
            for &(lat, lng) in &coords {
                repo.add(lat, lng).unwrap();
            }
        }

        let fresh = open(&store);
        let reloaded = fresh.markers();
        assert_eq!(reloaded.len(), coords.len());
        for (marker, &(lat, lng)) in reloaded.iter().zip(&coords) {
            assert_eq!(marker.latitude.to_bits(), lat.to_bits());
            assert_eq!(marker.longitude.to_bits(), lng.to_bits());
        }
    }

    #[test]
    fn test_remove_exact_coordinates_after_reopen() {
        let store = create_test_store();
        let (lat, lng) = (22.264_283_906_583_856, 127.034_651_485_029_43);
        open(&store).add(lat, lng).unwrap();

        let fresh = open(&store);
        assert!(fresh.remove(lat, lng).unwrap());
        assert!(fresh.is_empty());
        assert!(open(&store).is_empty());
    }

    #[test]
    fn test_add_appends_and_returns_exact_coordinates() {
        let store = create_test_store();
        let repo = open(&store);

        for (i, &(lat, lng)) in [(1.5, -2.25), (1.5, -2.25), (89.999_999, 179.999_999)]
            .iter()
            .enumerate()
        {
            let before = repo.len();
            let marker = repo.add(lat, lng).unwrap();

            assert_eq!(repo.len(), before + 1);
            assert!(marker.matches(lat, lng));
            assert_eq!(marker.title, DEFAULT_TITLE);
            assert_eq!(repo.markers()[i], marker);
        }
    }

    #[test]
    fn test_add_uses_configured_title() {
        let store = create_test_store();
        let options = RepositoryOptions {
            default_title: "Treasure".to_string(),
            ..RepositoryOptions::default()
        };
        let repo = MarkerRepository::open(&store, options).unwrap();

        assert_eq!(repo.add(1.0, 1.0).unwrap().title, "Treasure");
    }

    #[test]
    fn test_add_rejects_non_finite() {
        let store = create_test_store();
        let repo = open(&store);

        let err = repo.add(f64::NAN, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidCoordinate { .. }));
        assert!(repo.add(1.0, f64::INFINITY).is_err());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_remove_by_coordinate_removes_duplicates() {
        let store = create_test_store();
        let repo = open(&store);
        repo.add(1.0, 2.0).unwrap();
        repo.add(1.0, 2.0).unwrap();
        let survivor = repo.add(3.0, 4.0).unwrap();
        assert_eq!(repo.len(), 3);

        assert!(repo.remove(1.0, 2.0).unwrap());
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.markers()[0], survivor);

        assert!(!repo.remove(1.0, 2.0).unwrap());
        assert_eq!(open(&store).len(), 1);
    }

    #[test]
    fn test_remove_miss_does_not_publish_or_persist() {
        let store = create_test_store();
        let repo = open(&store);
        repo.add(1.0, 2.0).unwrap();
        let version = repo.state().version();
        store.put(DEFAULT_SLOT_KEY, "sentinel").unwrap();

        assert!(!repo.remove(1.000_001, 2.0).unwrap());
        assert_eq!(repo.state().version(), version);
        assert_eq!(
            store.get(DEFAULT_SLOT_KEY).unwrap().as_deref(),
            Some("sentinel")
        );
    }

    #[test]
    fn test_clear_is_idempotent_and_persists_empty_array() {
        let store = create_test_store();
        let repo = open(&store);

        repo.clear().unwrap();
        assert!(repo.is_empty());
        assert_eq!(store.get(DEFAULT_SLOT_KEY).unwrap().as_deref(), Some("[]"));

        repo.add(1.0, 2.0).unwrap();
        repo.clear().unwrap();
        repo.clear().unwrap();
        assert!(repo.is_empty());
        assert_eq!(store.get(DEFAULT_SLOT_KEY).unwrap().as_deref(), Some("[]"));
        assert!(open(&store).is_empty());
    }

    #[test]
    fn test_export_text_in_list_order() {
        let store = create_test_store();
        let repo = open(&store);
        repo.add(46.947_990, 7.447_440).unwrap();
        repo.add(47.0, 8.0).unwrap();

        assert_eq!(
            repo.export_text(),
            "Flag 1: 46.947990, 7.447440\nFlag 2: 47.000000, 8.000000"
        );
    }

    #[test]
    fn test_persisted_layout() {
        let store = create_test_store();
        let repo = open(&store);
        let marker = repo.add(1.25, -2.5).unwrap();

        let blob = store.get(DEFAULT_SLOT_KEY).unwrap().unwrap();
        let records: Vec<serde_json::Value> = serde_json::from_str(&blob).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], marker.id.as_str());
        assert_eq!(records[0]["latitude"], 1.25);
        assert_eq!(records[0]["longitude"], -2.5);
        assert_eq!(records[0]["title"], "Flag Post");
        assert_eq!(records[0]["description"], "");
    }

    #[test]
    fn test_subscribers_see_each_mutation() {
        let store = create_test_store();
        let repo = open(&store);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let _sub = repo.subscribe(move |markers| sink.borrow_mut().push(markers.len()));

        repo.add(1.0, 1.0).unwrap();
        repo.add(2.0, 2.0).unwrap();
        repo.remove(1.0, 1.0).unwrap();
        repo.remove(9.0, 9.0).unwrap();
        repo.clear().unwrap();

        assert_eq!(*seen.borrow(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn test_write_failure_propagates_and_keeps_memory_state() {
        let flaky = FlakyStore {
            inner: create_test_store(),
            fail_writes: Cell::new(false),
        };
        let repo = MarkerRepository::open(&flaky, RepositoryOptions::default()).unwrap();
        repo.add(1.0, 1.0).unwrap();

        flaky.fail_writes.set(true);
        let err = repo.add(2.0, 2.0).unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(repo.len(), 2);

        let stored: Vec<Marker> =
            serde_json::from_str(&flaky.inner.get(DEFAULT_SLOT_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn test_corrupt_blob_resets_by_default() {
        let store = create_test_store();
        store.put(DEFAULT_SLOT_KEY, "{not json").unwrap();

        let repo = open(&store);
        assert!(repo.is_empty());
        // The slot is only rewritten on the next mutation.
        assert_eq!(
            store.get(DEFAULT_SLOT_KEY).unwrap().as_deref(),
            Some("{not json")
        );

        repo.add(1.0, 2.0).unwrap();
        assert_eq!(open(&store).len(), 1);
    }

    #[test]
    fn test_corrupt_blob_fails_when_configured() {
        let store = create_test_store();
        store.put(DEFAULT_SLOT_KEY, r#"{"id": 1}"#).unwrap();

        let err = open_with_policy(&store, CorruptionPolicy::Fail).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_skip_policy_keeps_valid_records() {
        let store = create_test_store();
        store
            .put(
                DEFAULT_SLOT_KEY,
                r#"[
                    {"id":"a","latitude":1.0,"longitude":2.0,"title":"A","description":""},
                    {"id":"b","latitude":"north","longitude":2.0},
                    {"id":"c","latitude":3.0,"longitude":4.0,"title":"C","description":"dig"}
                ]"#,
            )
            .unwrap();

        let repo = open_with_policy(&store, CorruptionPolicy::Skip).unwrap();
        let ids: Vec<String> = repo.markers().iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(repo.markers()[1].description, "dig");
    }

    #[test]
    fn test_skip_policy_resets_non_array() {
        let store = create_test_store();
        store.put(DEFAULT_SLOT_KEY, "42").unwrap();

        let repo = open_with_policy(&store, CorruptionPolicy::Skip).unwrap();
        assert!(repo.is_empty());
    }

    #[test]
    fn test_custom_slot_key() {
        let store = create_test_store();
        let options = RepositoryOptions {
            slot_key: "flags".to_string(),
            ..RepositoryOptions::default()
        };
        let repo = MarkerRepository::open(&store, options).unwrap();
        repo.add(1.0, 1.0).unwrap();

        assert!(store.get("flags").unwrap().is_some());
        assert!(store.get(DEFAULT_SLOT_KEY).unwrap().is_none());
        assert_eq!(repo.options().slot_key, "flags");
    }

    #[test]
    fn test_corruption_policy_serde_names() {
        assert_eq!(
            serde_json::to_string(&CorruptionPolicy::Reset).unwrap(),
            "\"reset\""
        );
        let policy: CorruptionPolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, CorruptionPolicy::Skip);
    }
}
