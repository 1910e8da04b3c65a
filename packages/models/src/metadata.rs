//! Service metadata: API version and the supported-city catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{City, Coordinate};

/// Response of the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// API version reported by the server. Numeric versions are kept in
    /// their textual form (`1.0` becomes `"1.0"`).
    #[serde(deserialize_with = "version_string")]
    pub api_version: String,
    /// City identifier -> city details.
    pub cities: BTreeMap<String, CityInfo>,
}

/// Details about one supported city.
///
/// Older servers send only the display name as a plain string; newer ones
/// send an object. Both deserialize into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CityEntry")]
pub struct CityInfo {
    pub name: String,
    #[serde(rename = "coords")]
    pub coordinate: Option<Coordinate>,
    /// Upstream data source URL.
    pub source: Option<String>,
    /// Public website of the city's parking data.
    pub url: Option<String>,
    /// Whether the service actively maintains this city's scraper.
    pub active_support: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CityEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        coords: Option<Coordinate>,
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default = "default_active_support")]
        active_support: bool,
    },
}

const fn default_active_support() -> bool {
    true
}

impl From<CityEntry> for CityInfo {
    fn from(entry: CityEntry) -> Self {
        match entry {
            CityEntry::Name(name) => Self {
                name,
                coordinate: None,
                source: None,
                url: None,
                active_support: true,
            },
            CityEntry::Detailed {
                name,
                coords,
                source,
                url,
                active_support,
            } => Self {
                name,
                coordinate: coords,
                source,
                url,
                active_support,
            },
        }
    }
}

fn version_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Text(String),
        Integer(u64),
        Float(f64),
    }

    Ok(match Version::deserialize(deserializer)? {
        Version::Text(text) => text,
        Version::Integer(value) => value.to_string(),
        Version::Float(value) if value.fract().abs() < f64::EPSILON => format!("{value:.1}"),
        Version::Float(value) => value.to_string(),
    })
}

impl Metadata {
    /// Cities that can take part in nearest-city selection, in identifier
    /// order. Entries without a coordinate are skipped.
    #[must_use]
    pub fn catalog(&self) -> Vec<City> {
        self.cities
            .iter()
            .filter_map(|(id, info)| {
                info.coordinate.map(|coordinate| City {
                    id: id.clone(),
                    name: info.name.clone(),
                    coordinate,
                })
            })
            .collect()
    }

    /// Display names of all supported cities, sorted.
    #[must_use]
    pub fn city_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.cities.values().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn display_name(&self, city_id: &str) -> Option<&str> {
        self.cities.get(city_id).map(|c| c.name.as_str())
    }
}
