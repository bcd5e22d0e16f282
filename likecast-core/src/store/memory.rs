//! In-process credential store.
//!
//! Holds encoded records exactly as the Redis store does, so everything
//! that goes through it also goes through the record codec.

use super::{CredentialStore, StoreError, SubscriberSet, decode_snapshot};
use crate::entities::Credential;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw record as another writer would have.
    pub async fn insert_raw(&self, subject_id: impl Into<String>, record: impl Into<String>) {
        self.records
            .write()
            .await
            .insert(subject_id.into(), record.into());
    }

    /// The raw record currently stored for `subject_id`.
    pub async fn raw(&self, subject_id: &str) -> Option<String> {
        self.records.read().await.get(subject_id).cloned()
    }

    /// The decoded credential currently stored for `subject_id`.
    pub async fn get(&self, subject_id: &str) -> Option<Credential> {
        let raw = self.raw(subject_id).await?;
        Credential::decode_record(subject_id, &raw).ok()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_all(&self) -> Result<SubscriberSet, StoreError> {
        let raw = self.records.read().await.clone();
        Ok(decode_snapshot(raw))
    }

    async fn put(&self, credential: &Credential) -> Result<(), StoreError> {
        let record = credential.encode_record()?;
        self.records
            .write()
            .await
            .insert(credential.subject_id.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn credential(subject_id: &str, access_token: &str) -> Credential {
        Credential {
            subject_id: subject_id.into(),
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_put_replaces_prior_record() {
        let store = InMemoryCredentialStore::new();
        store.put(&credential("U1", "A1")).await.unwrap();
        store.put(&credential("U1", "A2")).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["U1"].access_token, "A2");
    }

    #[tokio::test]
    async fn test_snapshot_skips_bad_records_and_keeps_them() {
        let store = InMemoryCredentialStore::new();
        store.put(&credential("U1", "A1")).await.unwrap();
        store.insert_raw("U2", "{not json").await;
        store
            .insert_raw("U3", r#"{"version":9,"accessToken":"A","expiresAt":0}"#)
            .await;
        store
            .insert_raw("U4", r#"{"accessToken":"A4","refreshToken":"R4","expiresAt":1700000000000}"#)
            .await;

        let all = store.get_all().await.unwrap();
        let mut subjects: Vec<_> = all.keys().cloned().collect();
        subjects.sort();
        assert_eq!(subjects, vec!["U1", "U4"]);
        assert_eq!(store.raw("U2").await.as_deref(), Some("{not json"));
    }
}
