//! Persisted key-value state
//!
//! Countdown keeps three string values between runs: the configured
//! duration, the moment the current period began, and the task label.
//! [`FileStore`] writes them to a TOML file in the user's state directory;
//! [`MemoryStore`] keeps them in memory.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};

/// The keys Countdown persists
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Key {
    /// Configured duration, in minutes
    Minutes,
    /// Unix timestamp of when the current countdown period began
    StartTime,
    /// Label shown as the session title
    Task,
}

impl Key {
    pub const ALL: [Key; 3] = [Key::Minutes, Key::StartTime, Key::Task];

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Minutes => "minutes",
            Self::StartTime => "startTime",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String key-value storage that survives between runs
pub trait Store {
    fn get(&self, key: Key) -> Option<String>;

    fn set(&mut self, key: Key, value: &str) -> Result<()>;

    fn remove(&mut self, key: Key) -> Result<()>;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn get(&self, key: Key) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: Key, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: Key) -> Result<()> {
        (**self).remove(key)
    }
}

/// A store that lives only as long as the process
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<Key, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: Key) -> Option<String> {
        self.values.get(&key).cloned()
    }

    fn set(&mut self, key: Key, value: &str) -> Result<()> {
        self.values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: Key) -> Result<()> {
        self.values.remove(&key);
        Ok(())
    }
}

/// A store backed by a TOML file of string values
///
/// Every write is flushed to disk immediately.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at the given path
    ///
    /// A missing file is an empty store. A file that cannot be parsed is
    /// logged and also treated as empty; it is overwritten on the next write.
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.try_exists()? {
            let state_str = read_to_string(path)
                .with_context(|| format!("Failed to read state file {}", path.display()))?;

            match toml::from_str(&state_str) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let toml = toml::to_string(&self.values)
            .with_context(|| "Unable to format state as TOML")?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create state directory {}", parent.display())
            })?;
        }

        debug!("Writing state file {}", self.path.display());

        std::fs::write(&self.path, toml)
            .with_context(|| format!("Unable to write state to path {}", self.path.display()))
    }
}

impl Store for FileStore {
    fn get(&self, key: Key) -> Option<String> {
        self.values.get(key.as_str()).cloned()
    }

    fn set(&mut self, key: Key, value: &str) -> Result<()> {
        self.values.insert(key.as_str().to_string(), value.to_string());
        self.save()
    }

    fn remove(&mut self, key: Key) -> Result<()> {
        if self.values.remove(key.as_str()).is_some() {
            self.save()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{FileStore, Key, MemoryStore, Store};

    #[test]
    fn memory_store_get_set_remove() {
        let mut store = MemoryStore::new();

        assert_eq!(store.get(Key::Minutes), None);

        store.set(Key::Minutes, "10").unwrap();
        assert_eq!(store.get(Key::Minutes).as_deref(), Some("10"));

        store.remove(Key::Minutes).unwrap();
        assert_eq!(store.get(Key::Minutes), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let mut store = FileStore::open(&path).unwrap();
        store.set(Key::Minutes, "10").unwrap();
        store.set(Key::StartTime, "1711562400").unwrap();
        store.set(Key::Task, "Write docs").unwrap();
        store.remove(Key::StartTime).unwrap();

        let reopened = FileStore::open(&path).unwrap();

        assert_eq!(reopened.get(Key::Minutes).as_deref(), Some("10"));
        assert_eq!(reopened.get(Key::StartTime), None);
        assert_eq!(reopened.get(Key::Task).as_deref(), Some("Write docs"));
    }

    #[test]
    fn file_store_uses_original_key_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");

        let mut store = FileStore::open(&path).unwrap();
        store.set(Key::StartTime, "42").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();

        assert_eq!(contents.trim(), "startTime = \"42\"");
    }

    #[test]
    fn corrupt_file_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "this is [not toml").unwrap();

        let store = FileStore::open(&path).unwrap();

        for key in Key::ALL {
            assert_eq!(store.get(key), None);
        }
    }
}
