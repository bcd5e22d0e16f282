//! Application state shared across all request handlers.

use likecast_core::counters::DispatchCounters;
use likecast_core::store::CredentialStore;
use likecast_core::upstream::HttpUpstream;
use likecast_sdk::pkce::PkceVerifier;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// How long a started login may take to come back through the callback.
pub const AUTHORIZATION_TTL: Duration = Duration::from_secs(10 * 60);

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Where registered credentials are written.
    pub store: Arc<dyn CredentialStore>,
    /// OAuth2 and user-context clients.
    pub upstream: Arc<HttpUpstream>,
    pub pending: PendingAuthorizations,
    pub redirect_uri: Url,
    /// Redirect target after a successful registration, if any.
    pub success_redirect: Option<String>,
    pub counters: Arc<DispatchCounters>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        upstream: Arc<HttpUpstream>,
        redirect_uri: Url,
        counters: Arc<DispatchCounters>,
    ) -> Self {
        Self {
            store,
            upstream,
            pending: PendingAuthorizations::default(),
            redirect_uri,
            success_redirect: None,
            counters,
        }
    }

    pub fn with_success_redirect(mut self, target: Option<String>) -> Self {
        self.success_redirect = target;
        self
    }
}

/// Logins waiting for their callback, keyed by `state`.
#[derive(Clone, Default)]
pub struct PendingAuthorizations {
    inner: Arc<Mutex<HashMap<String, (PkceVerifier, Instant)>>>,
}

impl PendingAuthorizations {
    /// Remember the verifier for `state`, dropping entries that expired.
    pub async fn insert(&self, state: String, verifier: PkceVerifier) {
        let mut pending = self.inner.lock().await;
        pending.retain(|_, (_, started)| started.elapsed() < AUTHORIZATION_TTL);
        pending.insert(state, (verifier, Instant::now()));
    }

    /// Remove and return the verifier for `state` if it has not expired.
    pub async fn take(&self, state: &str) -> Option<PkceVerifier> {
        let (verifier, started) = self.inner.lock().await.remove(state)?;
        (started.elapsed() < AUTHORIZATION_TTL).then_some(verifier)
    }
}

/// State wired to an in-memory store and an unreachable upstream.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use likecast_core::config::{ClientCredentials, UpstreamEndpoints};
    use likecast_core::store::InMemoryCredentialStore;

    let endpoints = UpstreamEndpoints {
        api_base: Url::parse("http://127.0.0.1:1").unwrap(),
        authorize_url: Url::parse("https://twitter.com/i/oauth2/authorize").unwrap(),
        token_url: Url::parse("http://127.0.0.1:1/2/oauth2/token").unwrap(),
    };
    let upstream = HttpUpstream::new(
        &endpoints,
        &ClientCredentials::new("client-1", "secret-1"),
        "bearer-1",
    )
    .unwrap();
    AppState::new(
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(upstream),
        Url::parse("http://127.0.0.1:3000/callback").unwrap(),
        Arc::new(DispatchCounters::default()),
    )
}
