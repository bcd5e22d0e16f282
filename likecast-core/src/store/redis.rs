//! Redis hash backed credential store.
//!
//! All records live in one hash (`HGETALL` for the snapshot, `HSET` for an
//! upsert), so both operations are single atomic commands.

use super::{CredentialStore, StoreError, SubscriberSet, decode_snapshot};
use crate::entities::Credential;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::collections::HashMap;
use std::time::Duration;

/// Hash holding every credential record.
pub const DEFAULT_HASH_KEY: &str = "token";

/// Open a reconnecting connection to `redis_url`.
pub async fn connect_redis(redis_url: &str) -> Result<ConnectionManager, redis::RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(3)
        .set_connection_timeout(Duration::from_secs(5));

    let client = redis::Client::open(redis_url)?;
    client.get_connection_manager_with_config(config).await
}

#[derive(Clone)]
pub struct RedisCredentialStore {
    conn: ConnectionManager,
    hash_key: String,
}

impl RedisCredentialStore {
    pub fn new(conn: ConnectionManager, hash_key: impl Into<String>) -> Self {
        Self {
            conn,
            hash_key: hash_key.into(),
        }
    }
}

#[async_trait]
impl CredentialStore for RedisCredentialStore {
    #[tracing::instrument(skip_all, err, name = "Redis:HGETALL")]
    async fn get_all(&self) -> Result<SubscriberSet, StoreError> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(&self.hash_key).await?;
        Ok(decode_snapshot(raw))
    }

    #[tracing::instrument(skip_all, err, fields(subject_id = %credential.subject_id), name = "Redis:HSET")]
    async fn put(&self, credential: &Credential) -> Result<(), StoreError> {
        let record = credential.encode_record()?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(&self.hash_key, &credential.subject_id, record)
            .await?;
        Ok(())
    }
}
