use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable per-installation identifier, minted once and persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub id: Uuid,
}

/// Backend user resolved from the device id at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub user_id: String,
}
