//! Core types: credential pairs, token claims, tracing

pub mod claims;
pub mod credentials;
pub mod tracing;

pub use claims::{
    ClaimsError, ClaimsResult, TokenClaims, TokenStatus, decode_claims, expires_at,
    is_expired, is_expiring_soon, looks_like_jwt, remaining,
};
pub use credentials::{CredentialPair, is_authenticated};
pub use tracing::{
    TracingConfig, TracingError, TracingOutputFormat, default_directive, init_tracing,
};
