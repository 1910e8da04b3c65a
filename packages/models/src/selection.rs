//! The persisted city selection.
//!
//! Storage itself belongs to the host application; the core only reads and
//! writes two string keys through [`KeyValueStore`].

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::City;

/// Key holding the selected city's identifier.
pub const SELECTED_CITY: &str = "selectedCity";
/// Key holding the selected city's display name.
pub const SELECTED_CITY_NAME: &str = "selectedCityName";

/// Opaque string key-value store provided by the host application.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);
}

/// The city the user is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub city_id: String,
    pub city_name: String,
}

impl Selection {
    /// Reads the selection, falling back to the identifier when no display
    /// name was stored. Returns `None` when no city has been selected yet.
    #[must_use]
    pub fn load(store: &dyn KeyValueStore) -> Option<Self> {
        let city_id = store.get(SELECTED_CITY)?;
        let city_name = store
            .get(SELECTED_CITY_NAME)
            .unwrap_or_else(|| city_id.clone());
        Some(Self { city_id, city_name })
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        store.set(SELECTED_CITY, &self.city_id);
        store.set(SELECTED_CITY_NAME, &self.city_name);
    }
}

impl From<&City> for Selection {
    fn from(city: &City) -> Self {
        Self {
            city_id: city.id.clone(),
            city_name: city.name.clone(),
        }
    }
}

/// In-process [`KeyValueStore`], used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}
