//! App-only client (bearer token) for rule management and the filtered
//! stream.

use reqwest::Client;
use url::Url;

use super::{ClientError, check_status, parse_response};
use crate::objects::rules::{RuleListResponse, RuleUpdateRequest, RuleUpdateResponse};

const RULES_PATH: &str = "/2/tweets/search/stream/rules";
const STREAM_PATH: &str = "/2/tweets/search/stream";

/// Typed HTTP client authenticated with the application bearer token.
///
/// The `reqwest::Client` used for [`open_stream`](Self::open_stream) must not
/// carry a total request timeout, since the response body never ends.
#[derive(Clone)]
pub struct AppClient {
    http: Client,
    base_url: Url,
    bearer_token: String,
}

impl AppClient {
    /// * `base_url` – API root (e.g. `https://api.twitter.com`).
    /// * `bearer_token` – the application-only bearer token.
    pub fn new(base_url: Url, bearer_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            bearer_token: bearer_token.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /2/tweets/search/stream/rules`
    pub async fn list_rules(&self) -> Result<RuleListResponse, ClientError> {
        let url = self.base_url.join(RULES_PATH)?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /2/tweets/search/stream/rules`
    pub async fn update_rules(
        &self,
        request: &RuleUpdateRequest,
    ) -> Result<RuleUpdateResponse, ClientError> {
        let url = self.base_url.join(RULES_PATH)?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.bearer_token)
            .json(request)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /2/tweets/search/stream` – open the filtered stream.
    ///
    /// Returns the response once the upstream accepted the connection; the
    /// caller consumes `bytes_stream()`.
    pub async fn open_stream(&self, post_fields: &[&str]) -> Result<reqwest::Response, ClientError> {
        let mut url = self.base_url.join(STREAM_PATH)?;
        url.query_pairs_mut()
            .append_pair("tweet.fields", &post_fields.join(","));
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;
        check_status(resp).await
    }
}

impl std::fmt::Debug for AppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
