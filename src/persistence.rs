/**
 * Key-value storage for everything the selection engine remembers between sessions:
 * outcome histories, the registries of questions already served and the session log.
 *
 * Every value is a JSON string stored under a string key. Readers treat an absent or
 * malformed value as an empty collection, and writers never fail the caller: a backend
 * that cannot write logs a warning and carries on.
 */
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::common::Result;


/// A durable, string-keyed store of string values.
pub trait Store {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}


/// Load the JSON value stored under `key`, falling back to `T::default()` if the key is
/// missing or its value does not parse.
pub fn load_json_or_default<T>(store: &dyn Store, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key) {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                debug!(key, error = %e, "discarding malformed stored value");
                T::default()
            }
        },
        None => T::default(),
    }
}


/// Serialize `value` and store it under `key`.
pub fn save_json<T: Serialize + ?Sized>(store: &mut dyn Store, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(e) => warn!(key, error = %e, "could not serialize value"),
    }
}


/// An in-memory store. Nothing survives the process; used in tests and as a fallback
/// when no durable store can be opened.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}


impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}


impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}


/// A store kept as a single JSON object on disk. The whole file is read once when the
/// store is opened and rewritten after every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}


impl JsonFileStore {
    /// Open the store at `path`. A missing or unreadable file opens as an empty store. A
    /// malformed file is moved aside to `<path>.bak` first, so that the next write does
    /// not destroy it.
    pub fn open(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(values) => values,
                Err(e) => {
                    let backup = with_suffix(path, ".bak");
                    warn!(
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %e,
                        "malformed store file, starting empty"
                    );
                    if let Err(e) = fs::rename(path, &backup) {
                        warn!(path = %backup.display(), error = %e, "could not back up store file");
                    }
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path: path.to_path_buf(), values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!(path = %parent.display(), error = %e, "could not create directory");
                    return;
                }
            }
        }

        let serialized = match serde_json::to_string_pretty(&self.values) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(error = %e, "could not serialize store");
                return;
            }
        };
        // Replace the file in one step so that an interrupted write leaves the old copy.
        let tmp = with_suffix(&self.path, ".tmp");
        if let Err(e) = fs::write(&tmp, serialized).and_then(|_| fs::rename(&tmp, &self.path)) {
            warn!(path = %self.path.display(), error = %e, "could not write store file");
        }
    }
}


fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}


impl Store for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.flush();
        }
    }
}


/// A store backed by a single SQLite table.
pub struct SqliteStore {
    connection: Connection,
}


impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let connection = Connection::open(path)?;
        Self::initialize(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize(connection)
    }

    fn initialize(connection: Connection) -> Result<Self> {
        connection.execute(
            "
            CREATE TABLE IF NOT EXISTS kv(
              key TEXT NOT NULL PRIMARY KEY,
              value TEXT NOT NULL
            )
            ",
            [],
        )?;
        Ok(Self { connection })
    }
}


impl Store for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        let result = self
            .connection
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional();
        match result {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "could not read from database");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        let result = self.connection.execute(
            "INSERT INTO kv(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        );
        if let Err(e) = result {
            warn!(key, error = %e, "could not write to database");
        }
    }

    fn remove(&mut self, key: &str) {
        if let Err(e) = self.connection.execute("DELETE FROM kv WHERE key = ?1", params![key]) {
            warn!(key, error = %e, "could not delete from database");
        }
    }
}
