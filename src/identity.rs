use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use uuid::Uuid;

use crate::models::DeviceIdentity;

/// Key under which the device id lives in the local state file.
pub const DEVICE_KEY: &str = "focusai_device";
pub const STATE_FILE_NAME: &str = "state.json";

/// Persists the device identifier in a small JSON object file.
///
/// The file may carry other keys; they are left untouched on write.
pub struct DeviceIdentityStore {
    path: PathBuf,
    cached: Mutex<Option<DeviceIdentity>>,
}

impl DeviceIdentityStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the persisted id, minting one on first use.
    ///
    /// Never fails: when the state file cannot be read or written, a
    /// process-local id is used instead and will not survive a restart.
    pub fn get_or_create_device_id(&self) -> DeviceIdentity {
        let mut guard = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(identity) = *guard {
            return identity;
        }

        let identity = match self.load_or_mint() {
            Ok(identity) => identity,
            Err(err) => {
                warn!(
                    "Device id storage at {} unavailable ({err:#}); using a process-local id",
                    self.path.display()
                );
                DeviceIdentity { id: Uuid::new_v4() }
            }
        };

        *guard = Some(identity);
        identity
    }

    fn load_or_mint(&self) -> Result<DeviceIdentity> {
        let mut entries = self.read_entries()?;

        if let Some(raw) = entries.get(DEVICE_KEY).and_then(Value::as_str) {
            match Uuid::parse_str(raw) {
                Ok(id) => return Ok(DeviceIdentity { id }),
                Err(err) => warn!("Stored device id '{raw}' is not a UUID ({err}); replacing it"),
            }
        }

        let identity = DeviceIdentity { id: Uuid::new_v4() };
        entries.insert(DEVICE_KEY.to_string(), Value::String(identity.id.to_string()));
        self.persist(&entries)?;
        info!("Minted device id {}", identity.id);
        Ok(identity)
    }

    fn read_entries(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("State file {} is not a JSON object", self.path.display()))
    }

    fn persist(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory {}", parent.display())
            })?;
        }

        let serialized = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write state to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_calls_return_the_same_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = DeviceIdentityStore::in_dir(dir.path());

        let first = store.get_or_create_device_id();
        let second = store.get_or_create_device_id();
        assert_eq!(first, second);
    }

    #[test]
    fn id_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let first = DeviceIdentityStore::in_dir(dir.path()).get_or_create_device_id();
        let after_restart = DeviceIdentityStore::in_dir(dir.path()).get_or_create_device_id();
        assert_eq!(first, after_restart);

        let raw = fs::read_to_string(dir.path().join(STATE_FILE_NAME)).unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[DEVICE_KEY], first.id.to_string());
    }

    #[test]
    fn unrelated_keys_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE_NAME);
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let identity = DeviceIdentityStore::new(path.clone()).get_or_create_device_id();

        let json: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["theme"], "dark");
        assert_eq!(json[DEVICE_KEY], identity.id.to_string());
    }

    #[test]
    fn garbage_id_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE_NAME);
        fs::write(&path, r#"{"focusai_device":"not-a-uuid"}"#).unwrap();

        let identity = DeviceIdentityStore::new(path.clone()).get_or_create_device_id();
        let reloaded = DeviceIdentityStore::new(path).get_or_create_device_id();
        assert_eq!(identity, reloaded);
    }

    #[test]
    fn unwritable_storage_falls_back_to_process_local_id() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "plain file").unwrap();

        // Parent "directory" is a regular file, so persisting must fail.
        let store = DeviceIdentityStore::new(blocker.join(STATE_FILE_NAME));
        let first = store.get_or_create_device_id();
        assert_eq!(first, store.get_or_create_device_id());
        assert!(!store.path().exists());
    }
}
