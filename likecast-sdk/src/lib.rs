//! Wire types and clients for the upstream social-media API consumed by likecast.
//!
//! - [`objects`]: request/response bodies for stream rules, the filtered post
//!   stream, OAuth2 tokens, users and likes.
//! - [`pkce`]: PKCE verifier/challenge and `state` generation for the
//!   authorization-code flow.
//! - `client` (feature `client`): typed reqwest clients.

#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod pkce;
