// Device ID management for upload attribution
// Format: "vitalsync-<uuid>"

use uuid::Uuid;

use crate::error::StoreError;
use crate::storage::keys;
use crate::storage::KeyValueStore;

const DEVICE_ID_PREFIX: &str = "vitalsync-";

/// Error type for device ID operations
#[derive(Debug, thiserror::Error)]
pub enum DeviceIdError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid device ID format: {0}")]
    InvalidFormat(String),
}

/// Get or create the device ID persisted in `store`.
///
/// # Returns
/// Device ID string in format "vitalsync-<uuid>"
pub fn get_or_create_device_id(store: &dyn KeyValueStore) -> Result<String, DeviceIdError> {
    if let Some(existing) = store.get(keys::DEVICE_ID)? {
        let device_id = existing.trim().to_string();
        return if is_valid(&device_id) {
            Ok(device_id)
        } else {
            Err(DeviceIdError::InvalidFormat(device_id))
        };
    }

    let device_id = format!("{}{}", DEVICE_ID_PREFIX, Uuid::new_v4());
    store.set(keys::DEVICE_ID, &device_id)?;
    tracing::info!(%device_id, "generated device id");
    Ok(device_id)
}

fn is_valid(device_id: &str) -> bool {
    device_id
        .strip_prefix(DEVICE_ID_PREFIX)
        .is_some_and(|rest| Uuid::parse_str(rest).is_ok())
}
