//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use fanforge_common::AppError;
use fanforge_core::Actor;

/// Authenticated caller extractor.
#[derive(Debug, Clone)]
pub struct AuthActor(pub Actor);

impl<S> FromRequestParts<S> for AuthActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthActor)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional caller extractor, for endpoints anonymous visitors may use.
#[derive(Debug, Clone)]
pub struct MaybeAuthActor(pub Option<Actor>);

impl<S> FromRequestParts<S> for MaybeAuthActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Actor>().cloned()))
    }
}
