//! User-context client (subscriber access token).

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::DataEnvelope;
use crate::objects::users::{LikeRequest, LikeResult, UserData};

/// Typed HTTP client acting on behalf of one subscriber.
///
/// Cheap to construct per call: it borrows nothing and clones the shared
/// `reqwest::Client`.
#[derive(Clone)]
pub struct UserClient {
    http: Client,
    base_url: Url,
    access_token: String,
}

impl UserClient {
    pub fn new(http: Client, base_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            access_token: access_token.into(),
        }
    }

    /// `GET /2/users/me` – the user the access token belongs to.
    pub async fn me(&self) -> Result<UserData, ClientError> {
        let url = self.base_url.join("/2/users/me")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let envelope: DataEnvelope<UserData> = parse_response(resp).await?;
        Ok(envelope.data)
    }

    /// `POST /2/users/{user_id}/likes` – like `post_id` as `user_id`.
    pub async fn like(&self, user_id: &str, post_id: &str) -> Result<LikeResult, ClientError> {
        let url = self.base_url.join(&format!("/2/users/{user_id}/likes"))?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&LikeRequest {
                tweet_id: post_id.to_string(),
            })
            .send()
            .await?;
        let envelope: DataEnvelope<LikeResult> = parse_response(resp).await?;
        Ok(envelope.data)
    }
}

impl std::fmt::Debug for UserClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
