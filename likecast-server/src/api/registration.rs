//! Subscriber registration handlers.
//!
//! A subscriber grants the like permission through the upstream OAuth2
//! authorization-code flow with PKCE. The resulting credential is written to
//! the store, where the dispatcher picks it up on the next event.
//!
//! # Endpoints
//!
//! - `GET /login`    – start a login and redirect to the upstream consent page
//! - `GET /callback` – finish the login and store the subscriber's credential

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use likecast_core::entities::{Credential, RecordError};
use likecast_core::store::StoreError;
use likecast_sdk::client::ClientError;
use likecast_sdk::objects::tokens::REGISTRATION_SCOPES;
use likecast_sdk::pkce::{PkceVerifier, random_state};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::state::{AUTHORIZATION_TTL, AppState};

/// Cookie binding a browser to the login it started.
pub const STATE_COOKIE: &str = "likecast_state";

/// Build the registration router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
    state: String,
}

#[derive(Debug, Serialize)]
struct RegisteredResponse {
    registered: bool,
    subject_id: String,
    username: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur while finishing a registration.
#[derive(Debug)]
enum RegistrationError {
    /// `code` or `state` missing from the query string.
    InvalidQuery,
    /// `state` unknown, expired, or not the one this browser started.
    InvalidState,
    /// The token endpoint refused the authorization code.
    InvalidCode(ClientError),
    /// The token endpoint issued a token that cannot be stored.
    Token(RecordError),
    /// The authorized user could not be looked up.
    Lookup(ClientError),
    /// The credential could not be written.
    Store(StoreError),
}

impl IntoResponse for RegistrationError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            RegistrationError::InvalidQuery => {
                (StatusCode::BAD_REQUEST, "invalid request query type")
            }
            RegistrationError::InvalidState => (StatusCode::BAD_REQUEST, "invalid state value"),
            RegistrationError::InvalidCode(e) => {
                tracing::warn!(error = %e, "Authorization code exchange failed");
                (StatusCode::BAD_REQUEST, "invalid code")
            }
            RegistrationError::Token(e) => {
                tracing::warn!(error = %e, "Unusable token response");
                (StatusCode::BAD_GATEWAY, "invalid token response")
            }
            RegistrationError::Lookup(e) => {
                tracing::error!(error = %e, "Failed to look up authorized user");
                (StatusCode::BAD_GATEWAY, "upstream unavailable")
            }
            RegistrationError::Store(e) => {
                tracing::error!(error = %e, "Failed to store credential");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /login` - start an authorization-code login.
async fn login(State(state): State<AppState>) -> Response {
    let auth_state = random_state();
    let verifier = PkceVerifier::generate();
    let authorize_url = state.upstream.oauth().authorization_url(
        state.redirect_uri.as_str(),
        &auth_state,
        &verifier,
        REGISTRATION_SCOPES,
    );
    state.pending.insert(auth_state.clone(), verifier).await;

    let cookie = state_cookie(
        &auth_state,
        AUTHORIZATION_TTL.as_secs(),
        state.redirect_uri.scheme() == "https",
    );
    (
        [(header::SET_COOKIE, cookie)],
        Redirect::to(authorize_url.as_str()),
    )
        .into_response()
}

/// `GET /callback` - exchange the code and store the credential.
async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, RegistrationError> {
    let Query(query) = query.map_err(|_| RegistrationError::InvalidQuery)?;

    if cookie_value(&headers, STATE_COOKIE) != Some(query.state.as_str()) {
        return Err(RegistrationError::InvalidState);
    }
    let verifier = state
        .pending
        .take(&query.state)
        .await
        .ok_or(RegistrationError::InvalidState)?;

    let token = state
        .upstream
        .oauth()
        .exchange_code(&query.code, &verifier, state.redirect_uri.as_str())
        .await
        .map_err(RegistrationError::InvalidCode)?;

    let user = state
        .upstream
        .user_client(&token.access_token)
        .me()
        .await
        .map_err(RegistrationError::Lookup)?;

    let credential = Credential::from_token(user.id.clone(), &token, OffsetDateTime::now_utc())
        .map_err(RegistrationError::Token)?;
    if !credential.can_refresh() {
        tracing::warn!(subject_id = %user.id, "No refresh token issued, credential will not be renewed");
    }
    state
        .store
        .put(&credential)
        .await
        .map_err(RegistrationError::Store)?;
    tracing::info!(subject_id = %user.id, username = %user.username, "Subscriber registered");

    Ok(registered_response(&state, user.id, user.username))
}

/// Clear the state cookie and either redirect to the configured page or
/// confirm as JSON.
fn registered_response(state: &AppState, subject_id: String, username: String) -> Response {
    let clear = [(
        header::SET_COOKIE,
        state_cookie("", 0, state.redirect_uri.scheme() == "https"),
    )];
    match &state.success_redirect {
        Some(target) => (clear, Redirect::to(target)).into_response(),
        None => (
            clear,
            Json(RegisteredResponse {
                registered: true,
                subject_id,
                username,
            }),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn state_cookie(value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie =
        format!("{STATE_COOKIE}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
