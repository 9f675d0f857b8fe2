use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Coordinates;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Display name used as the record's location label.
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl City {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self { name: name.into(), latitude, longitude }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates { latitude: self.latitude, longitude: self.longitude }
    }
}

/// Immutable lookup table from city key to coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CityTable {
    cities: BTreeMap<String, City>,
}

impl Default for CityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CityTable {
    pub fn builtin() -> Self {
        Self::from_entries([
            ("naokothi", City::new("Naokothi", 25.4539, 86.1208)),
            ("northcarolina", City::new("North Carolina", 35.7796, -78.6382)),
        ])
    }

    pub fn from_entries<K: AsRef<str>>(entries: impl IntoIterator<Item = (K, City)>) -> Self {
        let cities = entries
            .into_iter()
            .map(|(key, city)| (normalize_key(key.as_ref()), city))
            .collect();
        Self { cities }
    }

    /// Built-in table with `extra` entries added, replacing built-ins on key collision.
    pub fn with_overrides<K: AsRef<str>>(extra: impl IntoIterator<Item = (K, City)>) -> Self {
        let mut table = Self::builtin();
        for (key, city) in extra {
            table.cities.insert(normalize_key(key.as_ref()), city);
        }
        table
    }

    /// Case, whitespace, `-` and `_` insensitive lookup: `North-Carolina`
    /// finds `northcarolina`.
    pub fn get(&self, key: &str) -> Option<&City> {
        self.cities.get(&normalize_key(key))
    }

    /// City whose coordinates equal `coords` exactly.
    pub fn find_by_coordinates(&self, coords: Coordinates) -> Option<&City> {
        self.cities.values().find(|city| city.coordinates() == coords)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cities.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &City)> {
        self.cities.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_cities_are_present() {
        let table = CityTable::builtin();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["naokothi", "northcarolina"]);

        let nc = table.get("northcarolina").unwrap();
        assert_eq!(nc.coordinates(), Coordinates { latitude: 35.7796, longitude: -78.6382 });
    }

    #[test]
    fn lookup_ignores_case_and_separators() {
        let table = CityTable::builtin();
        assert!(table.get("North Carolina").is_some());
        assert!(table.get("north-carolina").is_some());
        assert!(table.get("NAOKOTHI").is_some());
        assert!(table.get("atlantis").is_none());
    }

    #[test]
    fn overrides_replace_and_extend() {
        let table = CityTable::with_overrides([
            ("naokothi", City::new("Naokothi Village", 25.45, 86.12)),
            ("Oslo", City::new("Oslo", 59.9139, 10.7522)),
        ]);

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("naokothi").unwrap().name, "Naokothi Village");
        assert_eq!(table.get("oslo").unwrap().latitude, 59.9139);
    }

    #[test]
    fn reverse_lookup_by_coordinates() {
        let table = CityTable::builtin();
        let coords = Coordinates { latitude: 25.4539, longitude: 86.1208 };

        assert_eq!(table.find_by_coordinates(coords).unwrap().name, "Naokothi");
        assert!(table
            .find_by_coordinates(Coordinates { latitude: 0.0, longitude: 0.0 })
            .is_none());
    }
}
