//! Directory-backed [`StateStorage`]: one `<key>.json` file per key.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use harvest_game::StateStorage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl StateStorage for FileStorage {
    type Error = StoreError;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(document) => Ok(Some(document)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    fn write(&self, key: &str, document: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            path: self.root.clone(),
            source,
        })?;
        // Stage then rename; readers never observe a partial document.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, document).map_err(|source| StoreError::Write {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &path).map_err(|source| StoreError::Write { path, source })
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "harvest-storage-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    #[test]
    fn documents_round_trip_through_files() {
        let storage = FileStorage::new(temp_root("roundtrip"));
        assert!(storage.read("harvestFestival_state").unwrap().is_none());
        storage.write("harvestFestival_state", "{\"seeds\":1}").unwrap();
        assert!(storage.root().join("harvestFestival_state.json").exists());
        assert_eq!(
            storage.read("harvestFestival_state").unwrap().as_deref(),
            Some("{\"seeds\":1}")
        );
        storage.write("harvestFestival_state", "{}").unwrap();
        assert_eq!(
            storage.read("harvestFestival_state").unwrap().as_deref(),
            Some("{}")
        );
        storage.remove("harvestFestival_state").unwrap();
        storage.remove("harvestFestival_state").unwrap();
        assert!(storage.read("harvestFestival_state").unwrap().is_none());
    }

    #[test]
    fn rejects_path_like_keys() {
        let storage = FileStorage::new(temp_root("keys"));
        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(
                storage.read(key),
                Err(StoreError::InvalidKey(_))
            ));
        }
    }
}
