//! Filtered-stream payloads.
//!
//! The stream is newline-delimited JSON. Blank lines are keep-alives, a line
//! with `data` carries a post, and a line with only `errors` is an in-band
//! notice that the upstream is about to drop the connection.

use serde::{Deserialize, Serialize};

use super::ApiProblem;

/// Post fields requested from the stream (`tweet.fields`).
pub const STREAM_POST_FIELDS: &[&str] = &["id", "text", "source"];

/// The projection of a post delivered on the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPost {
    pub id: String,
    pub text: String,
    /// Name of the client that published the post. Only present when
    /// requested and when the upstream still exposes it.
    #[serde(default)]
    pub source: Option<String>,
}

/// A rule that caused a post to be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingRule {
    pub id: String,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[serde(default)]
    data: Option<StreamPost>,
    #[serde(default)]
    matching_rules: Vec<MatchingRule>,
    #[serde(default)]
    errors: Vec<ApiProblem>,
}

/// One decoded stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    KeepAlive,
    Post {
        post: StreamPost,
        matching_rules: Vec<MatchingRule>,
    },
    Disconnect(Vec<ApiProblem>),
}

/// A stream line that could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum StreamDecodeError {
    #[error("invalid stream payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stream payload carries neither data nor errors")]
    Empty,
}

impl StreamMessage {
    /// Decode a single line (without its trailing newline).
    ///
    /// Missing or mistyped `id`/`text` fields are rejected.
    pub fn decode(line: &[u8]) -> Result<Self, StreamDecodeError> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::KeepAlive);
        }
        let envelope: StreamEnvelope = serde_json::from_slice(line)?;
        match envelope.data {
            Some(post) => Ok(Self::Post {
                post,
                matching_rules: envelope.matching_rules,
            }),
            None if !envelope.errors.is_empty() => Ok(Self::Disconnect(envelope.errors)),
            None => Err(StreamDecodeError::Empty),
        }
    }
}
