use crate::error::PersistenceError;
use crate::export::write_atomically;
use crate::identity::content_id;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// URLs one search has already fully processed.
///
/// Stored as `{history_dir}/{hash(search_url)}`, a JSON array of sorted URLs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySet {
    urls: BTreeSet<String>,
}

impl HistorySet {
    pub fn path_for(history_dir: &Path, search_url: &str) -> PathBuf {
        history_dir.join(content_id(search_url))
    }

    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let urls: Vec<String> = serde_json::from_str(&text).map_err(|source| PersistenceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(urls.into_iter().collect())
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let sorted: Vec<&String> = self.urls.iter().collect();
        let json = serde_json::to_string(&sorted).map_err(|source| PersistenceError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomically(path, json.as_bytes())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns `true` if the URL was not present before.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl FromIterator<String> for HistorySet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}
