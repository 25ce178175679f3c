use crate::error::PersistenceError;
use crate::store::ListingStore;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

pub const INDEX_FILE: &str = "index.json";

#[derive(Serialize)]
struct IndexDocument<'a> {
    ads: &'a [crate::models::ListingRecord],
}

/// Writes the whole store as `{"ads": [...]}`, replacing the previous file.
pub fn write_index(store: &ListingStore, path: &Path) -> Result<(), PersistenceError> {
    let document = IndexDocument { ads: store.records() };
    let json = serde_json::to_string_pretty(&document).map_err(|source| PersistenceError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomically(path, json.as_bytes())
}

/// Writes into a sibling temp file, syncs it, then renames it over `path`.
///
/// A crash leaves either the old file or the new one, never a truncated one.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(write_err)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if let Err(err) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(write_err(err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_replaces_previous_content() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("index.json");

        write_atomically(&path, b"first").expect("first write");
        write_atomically(&path, b"second").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn empty_store_exports_empty_ads_array() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(INDEX_FILE);

        write_index(&ListingStore::default(), &path).expect("export");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(value["ads"], serde_json::json!([]));
    }
}
