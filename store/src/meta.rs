//! Metadata storage trait.

use crate::StoreError;

const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Small key-value side table for bookkeeping that is not governance state,
/// chiefly the on-disk schema version.
pub trait MetaStore: Send + Sync {
    /// The value stored under `key`, if any.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or overwrite `key`.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Schema version of the stored data; 0 for a store never stamped.
    fn schema_version(&self) -> Result<u32, StoreError> {
        match self.get_meta(SCHEMA_VERSION_KEY)? {
            None => Ok(0),
            Some(bytes) => {
                let raw: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Serialization(format!(
                        "schema version is {} bytes, expected 4",
                        bytes.len()
                    ))
                })?;
                Ok(u32::from_be_bytes(raw))
            }
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta(SCHEMA_VERSION_KEY, &version.to_be_bytes())
    }
}
