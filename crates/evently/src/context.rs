//! Axum extractor for the calling user.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::error::{AppError, IdentityError};

/// Header carrying the caller's user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

fn extract_user_id(headers: &HeaderMap) -> Result<Uuid, IdentityError> {
    let value = headers
        .get(USER_ID_HEADER)
        .ok_or(IdentityError::Missing)?
        .to_str()
        .map_err(|e| IdentityError::Invalid(e.to_string()))?;

    Uuid::parse_str(value.trim()).map_err(|e| IdentityError::Invalid(e.to_string()))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = extract_user_id(&parts.headers)?;
        Ok(CurrentUser(user_id))
    }
}
