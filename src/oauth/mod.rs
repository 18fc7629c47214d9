//! OAuth2 / OIDC protocol engine
//!
//! This module provides the protocol pieces every provider variant is built
//! from: authorization request URLs, PKCE, the `state` parameter, OIDC
//! discovery, the token endpoint client and userinfo lookups.

pub mod authorize;
pub mod discovery;
pub mod exchange;
pub mod pkce;
pub mod state;
pub mod userinfo;

pub use authorize::AuthorizationRequest;
pub use discovery::{
    fetch_discovery_document, fetch_oauth_server_metadata, rewrite_base_url, DiscoveryDocument,
    OidcEndpoints,
};
pub use exchange::{
    coerce_expires_in, parse_token_response, Grant, TokenEndpointClient, TokenExchange,
};
pub use pkce::{challenge_for, PkceChallenge, CODE_CHALLENGE_METHOD};
pub use state::OAuthState;
pub use userinfo::fetch_userinfo;
