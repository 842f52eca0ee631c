#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use everyplan_core::CredentialPair;
use everyplan_session::{CredentialStore, SessionConfig, SessionContext};
use serde_json::{Value, json};

/// Builds an unsigned JWT-shaped token around the given claims.
pub fn token_with(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}

/// A token expiring `offset` from now, tagged with `sub` so tokens differ.
pub fn token_expiring_in(offset: Duration, sub: &str) -> String {
    token_with(json!({
        "sub": sub,
        "exp": (Utc::now() + offset).timestamp(),
    }))
}

pub fn pair(access: &str, refresh: &str) -> CredentialPair {
    CredentialPair::new(access, refresh).unwrap()
}

/// A context pointed at `base_url` with `pair` already stored.
pub fn context(base_url: &str, pair: Option<CredentialPair>) -> SessionContext {
    let config = SessionConfig::new(base_url).unwrap();
    let store = match pair {
        Some(pair) => CredentialStore::with_pair(pair),
        None => CredentialStore::new(),
    };
    SessionContext::builder(config)
        .with_store(store)
        .build()
        .unwrap()
}
