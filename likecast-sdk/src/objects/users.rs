//! User lookup and like bodies.

use serde::{Deserialize, Serialize};

/// `GET /2/users/me` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub name: String,
    pub username: String,
}

/// `POST /2/users/{id}/likes` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeRequest {
    pub tweet_id: String,
}

/// `POST /2/users/{id}/likes` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResult {
    pub liked: bool,
}
