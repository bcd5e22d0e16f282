//! reqwest-backed implementation of the upstream seams.

use super::{ActionApi, AuthApi, FeedConnector, FeedStream, RulesApi, UpstreamError};
use crate::config::{ClientCredentials, UpstreamEndpoints};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use likecast_sdk::client::{AppClient, OAuthClient, UserClient};
use likecast_sdk::objects::posts::STREAM_POST_FIELDS;
use likecast_sdk::objects::rules::{RuleUpdateRequest, RuleUpdateResponse, StreamRule};
use likecast_sdk::objects::tokens::TokenResponse;
use std::time::Duration;
use url::Url;

/// Timeout for every request except the stream itself.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// All upstream seams over HTTP.
///
/// Holds two `reqwest::Client`s: a general one with a total request timeout,
/// and one for the stream, which only bounds connection setup.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    app: AppClient,
    stream_app: AppClient,
    oauth: OAuthClient,
    http: reqwest::Client,
    api_base: Url,
}

impl HttpUpstream {
    /// Fails only if the TLS backend or resolver cannot be initialized.
    pub fn new(
        endpoints: &UpstreamEndpoints,
        credentials: &ClientCredentials,
        bearer_token: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let stream_http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        let bearer_token = bearer_token.into();
        Ok(Self {
            app: AppClient::new(endpoints.api_base.clone(), bearer_token.clone())
                .with_http_client(http.clone()),
            stream_app: AppClient::new(endpoints.api_base.clone(), bearer_token)
                .with_http_client(stream_http),
            oauth: OAuthClient::new(
                endpoints.authorize_url.clone(),
                endpoints.token_url.clone(),
                credentials.client_id.clone(),
                credentials.client_secret.clone(),
            )
            .with_http_client(http.clone()),
            http,
            api_base: endpoints.api_base.clone(),
        })
    }

    /// The OAuth2 client, shared with the registration surface.
    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// A client acting as the owner of `access_token`.
    pub fn user_client(&self, access_token: &str) -> UserClient {
        UserClient::new(self.http.clone(), self.api_base.clone(), access_token)
    }
}

#[async_trait]
impl RulesApi for HttpUpstream {
    #[tracing::instrument(skip_all, err, name = "HTTP:ListRules")]
    async fn list_rules(&self) -> Result<Vec<StreamRule>, UpstreamError> {
        Ok(self.app.list_rules().await?.data)
    }

    #[tracing::instrument(skip_all, err, name = "HTTP:UpdateRules")]
    async fn update_rules(&self, request: RuleUpdateRequest) -> Result<RuleUpdateResponse, UpstreamError> {
        Ok(self.app.update_rules(&request).await?)
    }
}

#[async_trait]
impl FeedConnector for HttpUpstream {
    #[tracing::instrument(skip_all, err, name = "HTTP:OpenStream")]
    async fn connect(&self) -> Result<FeedStream, UpstreamError> {
        let response = self.stream_app.open_stream(STREAM_POST_FIELDS).await?;
        Ok(response
            .bytes_stream()
            .map_err(|e| UpstreamError::Transport(e.to_string()))
            .boxed())
    }
}

#[async_trait]
impl AuthApi for HttpUpstream {
    #[tracing::instrument(skip_all, err, name = "HTTP:RefreshToken")]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, UpstreamError> {
        Ok(self.oauth.refresh(refresh_token).await?)
    }
}

#[async_trait]
impl ActionApi for HttpUpstream {
    #[tracing::instrument(skip(self, access_token), err, name = "HTTP:Like")]
    async fn like(&self, access_token: &str, subject_id: &str, post_id: &str) -> Result<(), UpstreamError> {
        let result = self.user_client(access_token).like(subject_id, post_id).await?;
        if result.liked {
            Ok(())
        } else {
            Err(UpstreamError::NotApplied)
        }
    }
}
