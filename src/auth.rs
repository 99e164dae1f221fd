//! Minimal stand-in for the authentication collaborator that spec.md §1
//! treats as out of scope. Decodes a bearer token into the trusted
//! `{tenant, user, role}` tuple the rest of the core depends on; issuing,
//! rotating, or otherwise managing those tokens is not this crate's job.
//!
//! Grounded in the `jsonwebtoken`-based bearer extraction pattern common
//! across the retrieved corpus's server-shaped repos (see
//! `other_examples/manifests/mozilla-services-syncstorage-rs/Cargo.toml`,
//! `Titan-POS-Pk-titan-pos`, `palpo-matrix-server-palpo`) and the
//! `open-hims-rustcare-engine` sync handlers, which take an `AuthContext`
//! extractor parameter on every protected route.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CallerContext, Role};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    tenant_id: Uuid,
    user_id: Uuid,
    role: Role,
    exp: usize,
}

/// Shared HMAC key used to verify bearer tokens, stored in the router's
/// `State` alongside the connection pool.
#[derive(Clone)]
pub struct JwtKey(pub std::sync::Arc<str>);

/// Axum extractor that attaches the caller's trusted identity to a
/// handler. Returns 401 (never a detailed reason) when the token is
/// missing or invalid, so request authentication cannot be used to probe
/// anything about the system (spec.md §7 "authorization violations never
/// reveal whether the referenced row exists" — the same discipline
/// applies one layer up, at authentication).
pub struct AuthContext(pub CallerContext);

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    JwtKey: axum::extract::FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized)?;

        let key = JwtKey::from_ref(state);
        let data = decode::<Claims>(
            bearer.token(),
            &DecodingKey::from_secret(key.0.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized)?;

        Ok(AuthContext(CallerContext {
            tenant_id: data.claims.tenant_id,
            user_id: data.claims.user_id,
            role: data.claims.role,
        }))
    }
}
