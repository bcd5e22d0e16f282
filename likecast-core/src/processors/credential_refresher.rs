//! CredentialRefresher processor.
//!
//! Decides per subscriber whether the stored credential can be used as is:
//! - Not yet expired: returned unchanged, no upstream or store calls
//! - Expired without a refresh token: returned unchanged, the action is
//!   attempted anyway and allowed to fail
//! - Expired with a refresh token: exchanged at the token endpoint, the new
//!   pair is persisted, then returned
//!
//! A failed exchange leaves the stored record untouched so a later event
//! can try again.

use crate::entities::{Credential, RecordError};
use crate::store::{CredentialStore, StoreError};
use crate::upstream::{AuthApi, UpstreamError};
use kanau::processor::Processor;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Errors that can occur while refreshing a credential.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The token endpoint rejected the refresh token or was unreachable
    #[error("token refresh failed: {0}")]
    Exchange(#[source] UpstreamError),

    /// The token endpoint answered with a token that cannot be stored
    #[error("unusable refresh response: {0}")]
    Invalid(#[source] RecordError),

    /// The refreshed credential could not be persisted
    #[error("failed to persist refreshed credential: {0}")]
    Persist(#[source] StoreError),
}

/// A credential ready for the downstream action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub credential: Credential,
    /// `true` if the credential was refreshed and persisted by this call.
    pub updated: bool,
}

pub struct CredentialRefresher {
    store: Arc<dyn CredentialStore>,
    auth: Arc<dyn AuthApi>,
}

impl CredentialRefresher {
    pub fn new(store: Arc<dyn CredentialStore>, auth: Arc<dyn AuthApi>) -> Self {
        Self { store, auth }
    }

    pub async fn resolve(&self, credential: Credential) -> Result<ResolvedCredential, RefreshError> {
        self.resolve_at(credential, OffsetDateTime::now_utc()).await
    }

    /// [`resolve`](Self::resolve) with an explicit clock reading.
    ///
    /// The new credential is written to the store before it is returned.
    #[tracing::instrument(skip_all, err, name = "CredentialRefresher:resolve", fields(subject_id = %credential.subject_id))]
    pub async fn resolve_at(
        &self,
        credential: Credential,
        now: OffsetDateTime,
    ) -> Result<ResolvedCredential, RefreshError> {
        if !credential.is_expired_at(now) {
            return Ok(ResolvedCredential {
                credential,
                updated: false,
            });
        }
        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            debug!("Credential expired and cannot be refreshed, using it as is");
            return Ok(ResolvedCredential {
                credential,
                updated: false,
            });
        };

        let token = self
            .auth
            .refresh(refresh_token)
            .await
            .map_err(RefreshError::Exchange)?;
        let refreshed = Credential::from_token(credential.subject_id.clone(), &token, now)
            .map_err(RefreshError::Invalid)?;
        self.store
            .put(&refreshed)
            .await
            .map_err(RefreshError::Persist)?;

        info!(expires_at = %refreshed.expires_at, "Credential refreshed");
        Ok(ResolvedCredential {
            credential: refreshed,
            updated: true,
        })
    }
}

// ---------------------------------------------------------------------------
// Processor trait implementation
// ---------------------------------------------------------------------------

impl Processor<Credential> for CredentialRefresher {
    type Output = ResolvedCredential;
    type Error = RefreshError;

    async fn process(&self, credential: Credential) -> Result<ResolvedCredential, RefreshError> {
        self.resolve(credential).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeUpstream, Journal, RecordingStore, api_error, credential, now_millis, token};

    fn setup() -> (Arc<Journal>, Arc<RecordingStore>, Arc<FakeUpstream>, CredentialRefresher) {
        let journal = Arc::new(Journal::default());
        let store = Arc::new(RecordingStore::new(journal.clone()));
        let upstream = Arc::new(FakeUpstream::new(journal.clone()));
        let refresher = CredentialRefresher::new(store.clone(), upstream.clone());
        (journal, store, upstream, refresher)
    }

    #[tokio::test]
    async fn test_valid_credential_is_untouched() {
        let (journal, store, _upstream, refresher) = setup();
        let now = now_millis();
        let valid = credential("U1", "A1", Some("R1"), now + time::Duration::minutes(5));

        let resolved = refresher.resolve_at(valid.clone(), now).await.unwrap();

        assert_eq!(resolved.credential, valid);
        assert!(!resolved.updated);
        assert!(journal.entries().is_empty());
        assert_eq!(store.put_calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_credential_is_refreshed_and_persisted() {
        let (journal, store, upstream, refresher) = setup();
        let now = now_millis();
        upstream.on_refresh("R1", Ok(token("A2", Some("R2"), 7200)));
        let stale = credential("U1", "A1", Some("R1"), now - time::Duration::hours(1));

        let resolved = refresher.resolve_at(stale, now).await.unwrap();

        assert!(resolved.updated);
        assert_eq!(resolved.credential.access_token, "A2");
        assert_eq!(resolved.credential.refresh_token.as_deref(), Some("R2"));
        assert_eq!(resolved.credential.expires_at, now + time::Duration::seconds(7200));
        assert_eq!(store.inner.get("U1").await, Some(resolved.credential));
        assert_eq!(journal.entries(), vec!["refresh:R1", "store:put:U1:A2"]);
    }

    #[tokio::test]
    async fn test_expiry_boundary_counts_as_expired() {
        let (journal, _store, upstream, refresher) = setup();
        let now = now_millis();
        upstream.on_refresh("R1", Ok(token("A2", Some("R2"), 60)));

        let resolved = refresher
            .resolve_at(credential("U1", "A1", Some("R1"), now), now)
            .await
            .unwrap();

        assert!(resolved.updated);
        assert_eq!(journal.count_prefix("refresh:"), 1);
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_is_returned_stale() {
        let (journal, store, _upstream, refresher) = setup();
        let now = now_millis();
        let stale = credential("U1", "A1", None, now - time::Duration::hours(1));

        let resolved = refresher.resolve_at(stale.clone(), now).await.unwrap();

        assert_eq!(resolved.credential, stale);
        assert!(!resolved.updated);
        assert!(journal.entries().is_empty());
        assert_eq!(store.put_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_refresh_leaves_record_untouched() {
        let (_journal, store, upstream, refresher) = setup();
        let now = now_millis();
        upstream.on_refresh("R1", Err(api_error(400)));
        let stale = credential("U1", "A1", Some("R1"), now - time::Duration::hours(1));
        store.seed(&stale).await;
        let before = store.inner.raw("U1").await;

        let result = refresher.resolve_at(stale, now).await;

        assert!(matches!(result, Err(RefreshError::Exchange(_))));
        assert_eq!(store.put_calls(), 0);
        assert_eq!(store.inner.raw("U1").await, before);
    }

    #[tokio::test]
    async fn test_persist_failure_withholds_credential() {
        let (_journal, store, upstream, refresher) = setup();
        let now = now_millis();
        upstream.on_refresh("R1", Ok(token("A2", Some("R2"), 7200)));
        store.fail_put();

        let result = refresher
            .resolve_at(
                credential("U1", "A1", Some("R1"), now - time::Duration::hours(1)),
                now,
            )
            .await;

        assert!(matches!(result, Err(RefreshError::Persist(_))));
    }

    #[tokio::test]
    async fn test_unrepresentable_lifetime_is_a_refresh_failure() {
        let (_journal, store, upstream, refresher) = setup();
        let now = now_millis();
        upstream.on_refresh("R1", Ok(token("A2", Some("R2"), u64::MAX)));

        let result = refresher
            .resolve_at(
                credential("U1", "A1", Some("R1"), now - time::Duration::hours(1)),
                now,
            )
            .await;

        assert!(matches!(result, Err(RefreshError::Invalid(RecordError::Lifetime(_)))));
        assert_eq!(store.put_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_without_rotated_token_drops_refresh_token() {
        let (_journal, store, upstream, refresher) = setup();
        let now = now_millis();
        upstream.on_refresh("R1", Ok(token("A2", None, 7200)));

        let resolved = refresher
            .resolve_at(
                credential("U1", "A1", Some("R1"), now - time::Duration::hours(1)),
                now,
            )
            .await
            .unwrap();

        assert_eq!(resolved.credential.refresh_token, None);
        assert_eq!(store.inner.get("U1").await.unwrap().refresh_token, None);
    }

    #[tokio::test]
    async fn test_processor_uses_wall_clock() {
        let (_journal, _store, upstream, refresher) = setup();
        upstream.on_refresh("R1", Ok(token("A2", Some("R2"), 7200)));
        let stale = credential(
            "U1",
            "A1",
            Some("R1"),
            OffsetDateTime::now_utc() - time::Duration::hours(1),
        );

        let resolved = refresher.process(stale).await.unwrap();
        assert!(resolved.updated);
        assert!(resolved.credential.expires_at > OffsetDateTime::now_utc());
    }
}
