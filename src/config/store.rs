use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde_yaml_ng::Value;
use std::fs;
use thiserror::Error;

/// Errors from reading or writing stored preferences
#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("Failed to access preference file {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse preference file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),
}

/// Key-value storage that survives across sessions on one screen.
///
/// Values are untyped YAML so stores written by older viewers (which kept
/// everything as strings) still load; typing happens in
/// [`PreferencesManager`](crate::state::PreferencesManager).
#[cfg_attr(test, mockall::automock)]
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), PreferencesError>;
}

/// In-memory store for tests and ephemeral screens
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferenceStore {
    values: IndexMap<String, Value>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), PreferencesError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// File-backed store: a flat YAML mapping rewritten on every change.
///
/// Keys keep their insertion order so the file stays stable across writes.
#[derive(Debug)]
pub struct YamlPreferenceStore {
    path: Utf8PathBuf,
    values: IndexMap<String, Value>,
}

impl YamlPreferenceStore {
    /// Open the store at `path`. A missing or empty file is an empty store.
    pub fn open<P: AsRef<Utf8Path>>(path: P) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| PreferencesError::Io {
                path: path.clone(),
                source,
            })?;

            if contents.trim().is_empty() {
                IndexMap::new()
            } else {
                serde_yaml_ng::from_str(&contents).map_err(|source| PreferencesError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            IndexMap::new()
        };

        tracing::debug!("Opened preference store {} ({} keys)", path, values.len());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn persist(&self) -> Result<(), PreferencesError> {
        let yaml = serde_yaml_ng::to_string(&self.values)?;
        fs::write(&self.path, yaml).map_err(|source| PreferencesError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for YamlPreferenceStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), PreferencesError> {
        self.values.insert(key.to_string(), value);
        self.persist()
    }
}
