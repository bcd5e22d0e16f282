//! Subscriber credential and its stored record format.
//!
//! The store holds one record per subscriber, keyed by `subject_id`. The
//! record is JSON:
//!
//! ```text
//! {"version":1,"accessToken":"...","refreshToken":"..."|null,"expiresAt":<unix ms>}
//! ```
//!
//! Records without a `version` field are the legacy layout written before the
//! schema was versioned (same field names, optional `refreshToken`, possibly
//! extra fields) and are migrated on read. Any other version is rejected.

use likecast_sdk::objects::tokens::TokenResponse;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Current record schema version.
pub const RECORD_VERSION: u32 = 1;

/// Errors from encoding or decoding a stored credential record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid credential record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported credential record version {0}")]
    UnsupportedVersion(u32),

    #[error("credential expiry out of range: {0}")]
    Expiry(#[from] time::error::ComponentRange),

    #[error("token lifetime of {0} seconds is out of range")]
    Lifetime(u64),
}

/// The access/refresh token pair and expiry held for one subscriber.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub subject_id: String,
    pub access_token: String,
    /// Absent when the upstream did not issue one; such credentials are used
    /// until they fail and never refreshed.
    pub refresh_token: Option<String>,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordV1 {
    version: u32,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<u32>,
}

impl Credential {
    /// Build a credential from a token endpoint response received at `now`.
    ///
    /// Fails with [`RecordError::Lifetime`] when `expires_in` puts the expiry
    /// past what a timestamp can hold.
    pub fn from_token(
        subject_id: impl Into<String>,
        token: &TokenResponse,
        now: OffsetDateTime,
    ) -> Result<Self, RecordError> {
        let expires_at = i64::try_from(token.expires_in)
            .ok()
            .and_then(|secs| now.checked_add(time::Duration::seconds(secs)))
            .ok_or(RecordError::Lifetime(token.expires_in))?;
        Ok(Self {
            subject_id: subject_id.into(),
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at,
        })
    }

    /// `true` once `now` has reached `expires_at`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Serialize to the current record version. The subject id is the store
    /// key and is not part of the value.
    pub fn encode_record(&self) -> Result<String, RecordError> {
        let record = RecordV1 {
            version: RECORD_VERSION,
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: unix_millis(self.expires_at),
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Parse a stored record for `subject_id`, migrating legacy records.
    pub fn decode_record(subject_id: &str, raw: &str) -> Result<Self, RecordError> {
        let probe: VersionProbe = serde_json::from_str(raw)?;
        let (access_token, refresh_token, expires_at) = match probe.version {
            None => {
                let legacy: LegacyRecord = serde_json::from_str(raw)?;
                (legacy.access_token, legacy.refresh_token, legacy.expires_at)
            }
            Some(RECORD_VERSION) => {
                let record: RecordV1 = serde_json::from_str(raw)?;
                (record.access_token, record.refresh_token, record.expires_at)
            }
            Some(other) => return Err(RecordError::UnsupportedVersion(other)),
        };
        Ok(Self {
            subject_id: subject_id.to_string(),
            access_token,
            refresh_token,
            expires_at: from_unix_millis(expires_at)?,
        })
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("subject_id", &self.subject_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_unix_millis(millis: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
}
