use crate::error::PersistenceError;
use crate::identity::content_id;
use crate::models::ListingRecord;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

#[derive(Deserialize)]
struct StoredIndex {
    #[serde(default)]
    ads: Vec<ListingRecord>,
}

/// Every listing exported so far, across all searches, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct ListingStore {
    records: Vec<ListingRecord>,
    by_url: HashMap<String, usize>,
}

impl ListingStore {
    pub fn from_records(records: Vec<ListingRecord>) -> Self {
        let mut store = Self::default();
        for record in records {
            store.upsert(record);
        }
        store
    }

    /// Loads the exported index; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No listing index at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let index: StoredIndex = serde_json::from_str(&text).map_err(|source| PersistenceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let records = index.ads.into_iter().map(repair_record).collect();
        let store = Self::from_records(records);
        info!("Loaded {} existing listings from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn get(&self, url: &str) -> Option<&ListingRecord> {
        self.by_url.get(url).map(|&i| &self.records[i])
    }

    pub fn contains(&self, url: &str) -> bool {
        self.by_url.contains_key(url)
    }

    /// Inserts a record, or replaces the one with the same URL in place.
    pub fn upsert(&mut self, record: ListingRecord) {
        match self.by_url.get(&record.url) {
            Some(&i) => self.records[i] = record,
            None => {
                self.by_url.insert(record.url.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Older crawlers stored paths relative to their working directory.
const LEGACY_OUTPUT_PREFIX: &str = "data/found_items/";

fn strip_legacy_prefix(path: &mut String) {
    if let Some(rest) = path.strip_prefix(LEGACY_OUTPUT_PREFIX) {
        *path = rest.to_string();
    }
}

/// Restores the record invariants for documents written by older versions.
fn repair_record(mut record: ListingRecord) -> ListingRecord {
    let id = content_id(&record.url);
    if record.id != id {
        debug!("Re-deriving identifier for {}", record.url);
        record.id = id;
    }
    if record.last_updated < record.found_at {
        record.last_updated = record.found_at;
    }
    strip_legacy_prefix(&mut record.html_path);
    for image in &mut record.images {
        strip_legacy_prefix(image);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::write_index;
    use chrono::{Local, NaiveDate, TimeZone};
    use tempfile::tempdir;

    fn record(url: &str, price: &str) -> ListingRecord {
        let at = Local.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).single().expect("time");
        ListingRecord {
            id: content_id(url),
            title: "Oscilloscope".into(),
            price: price.into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            found_at: at,
            last_updated: at,
            query: "osciloskop".into(),
            url: url.into(),
            images: vec![],
            html_path: String::new(),
            description: String::new(),
            contact: String::new(),
            location: String::new(),
            view_count: String::new(),
            category: "elektro".into(),
            is_available: true,
            extra: Default::default(),
        }
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempdir().expect("tempdir");
        let store = ListingStore::load(&dir.path().join("index.json")).expect("load");
        assert!(store.is_empty());
    }

    #[test]
    fn upsert_replaces_by_url_and_keeps_order() {
        let mut store = ListingStore::default();
        store.upsert(record("https://bazos.sk/a", "10 €"));
        store.upsert(record("https://bazos.sk/b", "20 €"));
        store.upsert(record("https://bazos.sk/a", "15 €"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0].price, "15 €");
        assert_eq!(store.get("https://bazos.sk/b").map(|r| r.price.as_str()), Some("20 €"));
    }

    #[test]
    fn export_then_load_preserves_records() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("index.json");
        let store = ListingStore::from_records(vec![record("https://bazos.sk/a", "10 €")]);

        write_index(&store, &path).expect("export");
        let loaded = ListingStore::load(&path).expect("load");

        assert_eq!(loaded.records(), store.records());
    }

    #[test]
    fn load_repairs_identifier_and_timestamps() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("index.json");
        fs::write(
            &path,
            r#"{"ads":[{"id":"d41d8cd98f00b204e9800998ecf8427e","title":"t","price":"1 €",
                "date":"2024-01-01","found_at":"2024-02-01T10:00:00+01:00","query":"q",
                "url":"https://bazos.sk/x"}]}"#,
        )
        .expect("write");

        let store = ListingStore::load(&path).expect("load");
        let loaded = store.get("https://bazos.sk/x").expect("record");
        assert_eq!(loaded.id, content_id("https://bazos.sk/x"));
        assert!(loaded.found_at <= loaded.last_updated);
    }

    #[test]
    fn load_makes_legacy_paths_relative_to_the_output_directory() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("index.json");
        fs::write(
            &path,
            r#"{"ads":[{"id":"x","title":"t","price":"1 €","date":"2024-01-01","query":"yaesu",
                "url":"https://bazos.sk/y","htmlPath":"data/found_items/yaesu/2024-01-01/x.html",
                "images":["data/found_items/yaesu/2024-01-01/01.jpg","yaesu/2024-01-01/02.jpg"]}]}"#,
        )
        .expect("write");

        let store = ListingStore::load(&path).expect("load");
        let loaded = store.get("https://bazos.sk/y").expect("record");
        assert_eq!(loaded.html_path, "yaesu/2024-01-01/x.html");
        assert_eq!(loaded.images, vec!["yaesu/2024-01-01/01.jpg", "yaesu/2024-01-01/02.jpg"]);
    }

    #[test]
    fn corrupt_index_is_a_parse_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("index.json");
        fs::write(&path, "{not json").expect("write");

        let err = ListingStore::load(&path).expect_err("corrupt index");
        assert!(matches!(err, PersistenceError::Parse { .. }));
    }
}
