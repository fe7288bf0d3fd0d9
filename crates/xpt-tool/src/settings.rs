//! User settings
//!
//! The host owns the settings store; the tool reads and writes typed
//! settings through [`SettingsProvider`]. Values travel as
//! `serde_json::Value` so any store can hold them.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::SettingsError;

/// A named setting with its default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingDefinition<T> {
    name: &'static str,
    default: T,
}

impl<T> SettingDefinition<T> {
    /// Create new definition
    #[must_use]
    pub const fn new(name: &'static str, default: T) -> Self {
        Self { name, default }
    }

    /// Stable storage key
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }
}

/// Whether result rows are trimmed
pub const TRIM_STYLE: SettingDefinition<bool> =
    SettingDefinition::new("XPathTesterGui.TrimStyle", false);

/// Key/value settings store supplied by the host
pub trait SettingsProvider: Send + Sync {
    /// Stored value for `key`, if any
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the store cannot be read.
    fn get_value(&self, key: &str) -> Result<Option<Value>, SettingsError>;

    /// Store `value` under `key`
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the store cannot be written.
    fn set_value(&self, key: &str, value: Value) -> Result<(), SettingsError>;
}

/// Typed access on top of [`SettingsProvider`]
pub trait SettingsExt: SettingsProvider {
    /// Read a setting, falling back to its default when unset
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the store fails or holds a value of the
    /// wrong type.
    fn get<T>(&self, setting: &SettingDefinition<T>) -> Result<T, SettingsError>
    where
        T: DeserializeOwned + Clone,
    {
        match self.get_value(setting.name())? {
            Some(value) => {
                serde_json::from_value(value).map_err(|source| SettingsError::InvalidValue {
                    key: setting.name().to_string(),
                    source,
                })
            }
            None => Ok(setting.default_value().clone()),
        }
    }

    /// Write a setting
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the value cannot be stored.
    fn set<T>(&self, setting: &SettingDefinition<T>, value: &T) -> Result<(), SettingsError>
    where
        T: Serialize,
    {
        let value = serde_json::to_value(value).map_err(|source| SettingsError::InvalidValue {
            key: setting.name().to_string(),
            source,
        })?;
        self.set_value(setting.name(), value)
    }
}

impl<S: SettingsProvider + ?Sized> SettingsExt for S {}

/// Settings held in memory
#[derive(Debug, Default)]
pub struct InMemorySettings {
    values: RwLock<IndexMap<String, Value>>,
}

impl InMemorySettings {
    /// Create new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl SettingsProvider for InMemorySettings {
    fn get_value(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set_value(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Settings persisted as a flat TOML table
///
/// The whole file is rewritten on every change.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: RwLock<IndexMap<String, Value>>,
}

impl FileSettings {
    /// Open `path`, starting empty if the file does not exist yet
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the file exists but cannot be read or
    /// parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            let table: toml::Table = toml::from_str(&text)?;
            table
                .into_iter()
                .map(|(key, value)| {
                    serde_json::to_value(value)
                        .map(|json| (key.clone(), json))
                        .map_err(|source| SettingsError::InvalidValue { key, source })
                })
                .collect::<Result<IndexMap<_, _>, _>>()?
        } else {
            IndexMap::new()
        };
        tracing::debug!("loaded {} settings from {}", values.len(), path.display());
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, values: &IndexMap<String, Value>) -> Result<(), SettingsError> {
        let mut table = toml::Table::new();
        for (key, value) in values {
            table.insert(key.clone(), toml::Value::try_from(value)?);
        }
        std::fs::write(&self.path, toml::to_string(&table)?)?;
        Ok(())
    }
}

impl SettingsProvider for FileSettings {
    fn get_value(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.values.read().get(key).cloned())
    }

    /// The cached value only changes once the file write succeeds
    fn set_value(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut values = self.values.write();
        let mut updated = values.clone();
        updated.insert(key.to_string(), value);
        self.save(&updated)?;
        *values = updated;
        Ok(())
    }
}
