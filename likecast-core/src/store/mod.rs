//! Credential persistence.
//!
//! One record per subscriber, keyed by subject id, all records in a single
//! flat mapping. The snapshot read is one store call so the fan-out sees a
//! consistent view of who is subscribed.

mod memory;
mod redis;

pub use self::memory::InMemoryCredentialStore;
pub use self::redis::{DEFAULT_HASH_KEY, RedisCredentialStore, connect_redis};

use crate::entities::{Credential, RecordError};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Snapshot of every subscriber, keyed by subject id.
pub type SubscriberSet = HashMap<String, Credential>;

/// Errors that can occur during store access.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis error
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Credential could not be encoded
    #[error("record error: {0}")]
    Record(#[from] RecordError),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read every subscriber in one call.
    ///
    /// Records that do not decode are logged and left out of the snapshot;
    /// they stay in the store untouched.
    async fn get_all(&self) -> Result<SubscriberSet, StoreError>;

    /// Insert or fully replace the record for `credential.subject_id`.
    async fn put(&self, credential: &Credential) -> Result<(), StoreError>;
}

/// Decode a raw `subject id -> record` mapping into a [`SubscriberSet`].
pub(crate) fn decode_snapshot(raw: HashMap<String, String>) -> SubscriberSet {
    raw.into_iter()
        .filter_map(|(subject_id, record)| {
            match Credential::decode_record(&subject_id, &record) {
                Ok(credential) => Some((subject_id, credential)),
                Err(e) => {
                    warn!(subject_id = %subject_id, error = %e, "Skipping undecodable credential record");
                    None
                }
            }
        })
        .collect()
}
