//! Fakes for the store and upstream seams.
//!
//! Every fake writes to a shared [`Journal`] so tests can assert on the
//! order of side effects across components.

use crate::entities::Credential;
use crate::store::{CredentialStore, InMemoryCredentialStore, StoreError, SubscriberSet};
use crate::upstream::{ActionApi, AuthApi, FeedConnector, FeedStream, RulesApi, UpstreamError};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream;
use likecast_sdk::objects::ApiProblem;
use likecast_sdk::objects::rules::{
    RuleUpdateMeta, RuleUpdateRequest, RuleUpdateResponse, RuleUpdateSummary, StreamRule,
};
use likecast_sdk::objects::tokens::TokenResponse;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;

/// Ordered record of side effects.
#[derive(Debug, Default)]
pub struct Journal(Mutex<Vec<String>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Position of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == entry)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

pub fn api_error(status: u16) -> UpstreamError {
    UpstreamError::Api {
        status,
        body: format!("status {status}"),
        retry_after: None,
    }
}

pub fn token(access_token: &str, refresh_token: Option<&str>, expires_in: u64) -> TokenResponse {
    TokenResponse {
        token_type: "bearer".into(),
        access_token: access_token.into(),
        refresh_token: refresh_token.map(str::to_string),
        expires_in,
        scope: None,
    }
}

pub fn credential(
    subject_id: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: OffsetDateTime,
) -> Credential {
    Credential {
        subject_id: subject_id.into(),
        access_token: access_token.into(),
        refresh_token: refresh_token.map(str::to_string),
        expires_at,
    }
}

/// Current time truncated to whole milliseconds, the record precision.
pub fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000).unwrap()
}

pub fn post_line(id: &str, source: &str) -> Bytes {
    Bytes::from(format!(
        "{{\"data\":{{\"id\":\"{id}\",\"text\":\"post {id}\",\"source\":\"{source}\"}},\"matching_rules\":[{{\"id\":\"9\",\"tag\":\"ID filter\"}}]}}\r\n"
    ))
}

/// [`InMemoryCredentialStore`] with call counting and injectable failures.
#[derive(Debug)]
pub struct RecordingStore {
    pub inner: InMemoryCredentialStore,
    journal: Arc<Journal>,
    get_all_calls: AtomicUsize,
    put_calls: AtomicUsize,
    fail_get_all: AtomicBool,
    fail_put: AtomicBool,
}

impl RecordingStore {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self {
            inner: InMemoryCredentialStore::new(),
            journal,
            get_all_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            fail_get_all: AtomicBool::new(false),
            fail_put: AtomicBool::new(false),
        }
    }

    pub async fn seed(&self, credential: &Credential) {
        self.inner.put(credential).await.unwrap();
    }

    pub fn get_all_calls(&self) -> usize {
        self.get_all_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn fail_get_all(&self) {
        self.fail_get_all.store(true, Ordering::SeqCst);
    }

    pub fn fail_put(&self) {
        self.fail_put.store(true, Ordering::SeqCst);
    }

    fn unavailable() -> StoreError {
        StoreError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "store unavailable",
        )))
    }
}

#[async_trait]
impl CredentialStore for RecordingStore {
    async fn get_all(&self) -> Result<SubscriberSet, StoreError> {
        self.get_all_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record("store:get_all");
        if self.fail_get_all.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.get_all().await
    }

    async fn put(&self, credential: &Credential) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.put(credential).await?;
        self.journal.record(format!(
            "store:put:{}:{}",
            credential.subject_id, credential.access_token
        ));
        Ok(())
    }
}

/// One scripted stream connection.
pub struct ScriptedConnection {
    pub chunks: Vec<Result<Bytes, UpstreamError>>,
    /// Keep the connection open, silent, after the last chunk.
    pub hang: bool,
}

impl ScriptedConnection {
    pub fn closing(chunks: Vec<Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter().map(Ok).collect(),
            hang: false,
        }
    }

    pub fn hanging(chunks: Vec<Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter().map(Ok).collect(),
            hang: true,
        }
    }
}

/// Scriptable implementation of every upstream seam.
pub struct FakeUpstream {
    journal: Arc<Journal>,
    rules: Mutex<Vec<StreamRule>>,
    next_rule_id: AtomicUsize,
    fail_list: Mutex<Option<UpstreamError>>,
    fail_delete: Mutex<Option<UpstreamError>>,
    ignore_delete: AtomicBool,
    reject_add: Mutex<Option<ApiProblem>>,
    refresh_results: Mutex<HashMap<String, Result<TokenResponse, UpstreamError>>>,
    like_failures: Mutex<HashMap<String, UpstreamError>>,
    like_delays: Mutex<HashMap<String, Duration>>,
    likes: Mutex<Vec<(String, String, String)>>,
    connections: Mutex<VecDeque<Result<ScriptedConnection, UpstreamError>>>,
    connects: AtomicUsize,
    in_flight_likes: AtomicUsize,
    max_in_flight_likes: AtomicUsize,
}

impl FakeUpstream {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            rules: Mutex::new(Vec::new()),
            next_rule_id: AtomicUsize::new(100),
            fail_list: Mutex::new(None),
            fail_delete: Mutex::new(None),
            ignore_delete: AtomicBool::new(false),
            reject_add: Mutex::new(None),
            refresh_results: Mutex::new(HashMap::new()),
            like_failures: Mutex::new(HashMap::new()),
            like_delays: Mutex::new(HashMap::new()),
            likes: Mutex::new(Vec::new()),
            connections: Mutex::new(VecDeque::new()),
            connects: AtomicUsize::new(0),
            in_flight_likes: AtomicUsize::new(0),
            max_in_flight_likes: AtomicUsize::new(0),
        }
    }

    pub fn install_rule(&self, id: &str, value: &str) {
        self.rules.lock().unwrap().push(StreamRule {
            id: id.into(),
            value: value.into(),
            tag: None,
        });
    }

    pub fn rules(&self) -> Vec<StreamRule> {
        self.rules.lock().unwrap().clone()
    }

    pub fn fail_list(&self, error: UpstreamError) {
        *self.fail_list.lock().unwrap() = Some(error);
    }

    pub fn fail_delete(&self, error: UpstreamError) {
        *self.fail_delete.lock().unwrap() = Some(error);
    }

    /// Answer delete requests without removing anything.
    pub fn ignore_delete(&self) {
        self.ignore_delete.store(true, Ordering::SeqCst);
    }

    pub fn reject_add(&self, problem: ApiProblem) {
        *self.reject_add.lock().unwrap() = Some(problem);
    }

    pub fn on_refresh(&self, refresh_token: &str, result: Result<TokenResponse, UpstreamError>) {
        self.refresh_results
            .lock()
            .unwrap()
            .insert(refresh_token.into(), result);
    }

    pub fn fail_like(&self, subject_id: &str, error: UpstreamError) {
        self.like_failures
            .lock()
            .unwrap()
            .insert(subject_id.into(), error);
    }

    pub fn delay_like(&self, subject_id: &str, delay: Duration) {
        self.like_delays
            .lock()
            .unwrap()
            .insert(subject_id.into(), delay);
    }

    /// Successful likes as `(subject id, access token, post id)`.
    pub fn likes(&self) -> Vec<(String, String, String)> {
        self.likes.lock().unwrap().clone()
    }

    pub fn push_connection(&self, connection: ScriptedConnection) {
        self.connections.lock().unwrap().push_back(Ok(connection));
    }

    pub fn push_connect_error(&self, error: UpstreamError) {
        self.connections.lock().unwrap().push_back(Err(error));
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn max_in_flight_likes(&self) -> usize {
        self.max_in_flight_likes.load(Ordering::SeqCst)
    }

    /// Wait (in test time) until at least `n` likes were attempted.
    pub async fn wait_for_like_attempts(&self, n: usize) {
        while self.journal.count_prefix("like:") < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl RulesApi for FakeUpstream {
    async fn list_rules(&self) -> Result<Vec<StreamRule>, UpstreamError> {
        self.journal.record("rules:list");
        if let Some(e) = self.fail_list.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.rules())
    }

    async fn update_rules(&self, request: RuleUpdateRequest) -> Result<RuleUpdateResponse, UpstreamError> {
        let mut summary = RuleUpdateSummary::default();
        let mut data = Vec::new();
        let mut errors = Vec::new();
        match request {
            RuleUpdateRequest::Delete { ids } => {
                self.journal.record(format!("rules:delete:{}", ids.join(",")));
                if let Some(e) = self.fail_delete.lock().unwrap().clone() {
                    return Err(e);
                }
                if !self.ignore_delete.load(Ordering::SeqCst) {
                    let mut rules = self.rules.lock().unwrap();
                    let before = rules.len();
                    rules.retain(|rule| !ids.contains(&rule.id));
                    summary.deleted = (before - rules.len()) as u32;
                }
                summary.not_deleted = ids.len() as u32 - summary.deleted;
            }
            RuleUpdateRequest::Add(new_rules) => {
                for rule in new_rules {
                    self.journal.record(format!("rules:add:{}", rule.value));
                    if let Some(problem) = self.reject_add.lock().unwrap().clone() {
                        summary.not_created += 1;
                        errors.push(problem);
                        continue;
                    }
                    let id = self.next_rule_id.fetch_add(1, Ordering::SeqCst).to_string();
                    let installed = StreamRule {
                        id,
                        value: rule.value,
                        tag: rule.tag,
                    };
                    self.rules.lock().unwrap().push(installed.clone());
                    data.push(installed);
                    summary.created += 1;
                }
            }
        }
        Ok(RuleUpdateResponse {
            data,
            meta: RuleUpdateMeta {
                sent: None,
                summary,
            },
            errors,
        })
    }
}

#[async_trait]
impl FeedConnector for FakeUpstream {
    async fn connect(&self) -> Result<FeedStream, UpstreamError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.journal.record("feed:connect");
        let next = self.connections.lock().unwrap().pop_front();
        match next {
            Some(Ok(connection)) => {
                let chunks = stream::iter(connection.chunks);
                if connection.hang {
                    Ok(chunks.chain(stream::pending()).boxed())
                } else {
                    Ok(chunks.boxed())
                }
            }
            Some(Err(e)) => Err(e),
            None => std::future::pending().await,
        }
    }
}

#[async_trait]
impl AuthApi for FakeUpstream {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, UpstreamError> {
        self.journal.record(format!("refresh:{refresh_token}"));
        let result = self.refresh_results.lock().unwrap().get(refresh_token).cloned();
        result.unwrap_or_else(|| Err(api_error(400)))
    }
}

#[async_trait]
impl ActionApi for FakeUpstream {
    async fn like(&self, access_token: &str, subject_id: &str, post_id: &str) -> Result<(), UpstreamError> {
        self.journal
            .record(format!("like:{subject_id}:{access_token}:{post_id}"));
        let in_flight = self.in_flight_likes.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_likes.fetch_max(in_flight, Ordering::SeqCst);

        let delay = self.like_delays.lock().unwrap().get(subject_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight_likes.fetch_sub(1, Ordering::SeqCst);

        let failure = self.like_failures.lock().unwrap().get(subject_id).cloned();
        if let Some(e) = failure {
            return Err(e);
        }
        self.likes.lock().unwrap().push((
            subject_id.to_string(),
            access_token.to_string(),
            post_id.to_string(),
        ));
        Ok(())
    }
}
