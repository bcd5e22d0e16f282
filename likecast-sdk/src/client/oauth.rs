//! OAuth2 client for the authorization-code (PKCE) and refresh-token grants.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::tokens::TokenResponse;
use crate::pkce::{CHALLENGE_METHOD, PkceVerifier};

/// Typed client for the upstream OAuth2 endpoints.
///
/// Authenticates to the token endpoint as a confidential client (HTTP basic
/// with the registered client id/secret).
#[derive(Clone)]
pub struct OAuthClient {
    http: Client,
    authorize_url: Url,
    token_url: Url,
    client_id: String,
    client_secret: String,
}

impl OAuthClient {
    pub fn new(
        authorize_url: Url,
        token_url: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            authorize_url,
            token_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Build the URL the user is redirected to in order to grant access.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        verifier: &PkceVerifier,
        scopes: &[&str],
    ) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &scopes.join(" "))
            .append_pair("state", state)
            .append_pair("code_challenge", &verifier.challenge())
            .append_pair("code_challenge_method", CHALLENGE_METHOD);
        url
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &PkceVerifier,
        redirect_uri: &str,
    ) -> Result<TokenResponse, ClientError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier.as_str()),
            ("client_id", self.client_id.as_str()),
        ])
        .await
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ClientError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, ClientError> {
        let resp = self
            .http
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;
        parse_response(resp).await
    }
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::tokens::REGISTRATION_SCOPES;

    #[test]
    fn test_authorization_url_parameters() {
        let client = OAuthClient::new(
            Url::parse("https://twitter.com/i/oauth2/authorize").unwrap(),
            Url::parse("https://api.twitter.com/2/oauth2/token").unwrap(),
            "client-1",
            "secret-1",
        );
        let verifier = PkceVerifier::from_string("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        let url = client.authorization_url(
            "https://example.com/callback",
            "state-1",
            &verifier,
            REGISTRATION_SCOPES,
        );

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "client-1");
        assert_eq!(pairs["redirect_uri"], "https://example.com/callback");
        assert_eq!(pairs["scope"], "tweet.read like.write users.read offline.access");
        assert_eq!(pairs["state"], "state-1");
        assert_eq!(pairs["code_challenge"], "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert!(!url.as_str().contains("secret-1"));
    }
}
