//! Event type definitions.

use likecast_sdk::objects::posts::StreamPost;

/// A post delivered by the filtered stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Post identifier, the target of the like.
    pub id: String,
    pub text: String,
    /// Provenance tag: the client that published the post.
    pub source: Option<String>,
}

impl StreamEvent {
    /// `true` if the post was published by `provenance`.
    pub fn has_provenance(&self, provenance: &str) -> bool {
        self.source.as_deref() == Some(provenance)
    }
}

impl From<StreamPost> for StreamEvent {
    fn from(post: StreamPost) -> Self {
        Self {
            id: post.id,
            text: post.text,
            source: post.source,
        }
    }
}
