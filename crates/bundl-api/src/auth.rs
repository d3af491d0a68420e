//! Bearer-token authentication seam. Real access-token minting/blacklisting
//! is an external collaborator (spec.md "out of scope"); this trait and its
//! extractor are the wiring a real implementation plugs into.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use bundl_types::{BundlError, UserId};

use crate::AppState;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve a bearer token to the `UserId` making the request.
    async fn authenticate(&self, bearer: &str) -> Result<UserId, BundlError>;
}

/// Decodes a bearer token that *is* a `UserId`, for tests and local
/// development. A real deployment authenticates against the access-token
/// service named in spec.md's external collaborators.
#[derive(Debug, Default)]
pub struct StaticAuthProvider;

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn authenticate(&self, bearer: &str) -> Result<UserId, BundlError> {
        bearer.parse::<UserId>().map_err(|_| BundlError::Unauthenticated)
    }
}

/// The authenticated caller, extracted from the `Authorization` header on
/// every non-health endpoint.
pub struct AuthedUser(pub UserId);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthedUser {
    type Rejection = BundlError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).ok_or(BundlError::Unauthenticated)?;
        let value = header.to_str().map_err(|_| BundlError::Unauthenticated)?;
        let bearer = value.strip_prefix("Bearer ").ok_or(BundlError::Unauthenticated)?;
        let user_id = state.auth.authenticate(bearer).await?;
        Ok(Self(user_id))
    }
}
