use axum::{
    extract::{FromRequestParts, Query},
    http::{HeaderMap, request::Parts},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::constants::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::error::AppError;
use crate::models::{Identity, Role};

/// Caller identity as asserted by the upstream identity service through the
/// `x-user-id` / `x-user-role` headers. Credentials are not re-verified here.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub identity: Identity,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = identity_from_headers(&parts.headers)?
            .ok_or_else(|| AppError::Unauthorized("Missing identity headers".to_string()))?;
        Ok(Self { identity })
    }
}

#[derive(Debug, Deserialize)]
struct IdentityQuery {
    user_id: Option<String>,
    role: Option<String>,
}

/// Identity for the websocket handshake. Browsers cannot set headers on an
/// upgrade request, so `user_id` and `role` query parameters are accepted
/// when the headers are absent.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser {
    pub identity: Identity,
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = identity_from_headers(&parts.headers)? {
            return Ok(Self { identity });
        }

        let Query(query) = Query::<IdentityQuery>::try_from_uri(&parts.uri)
            .map_err(|_| AppError::Unauthorized("Malformed identity query".to_string()))?;
        match (query.user_id, query.role) {
            (Some(user_id), Some(role)) => Ok(Self {
                identity: parse_identity(&user_id, &role)?,
            }),
            _ => Err(AppError::Unauthorized("Missing identity".to_string())),
        }
    }
}

/// `Ok(None)` when no identity header is present at all.
fn identity_from_headers(headers: &HeaderMap) -> Result<Option<Identity>, AppError> {
    let Some(user_id) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let user_id = user_id
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid user id header".to_string()))?;
    let role = headers
        .get(USER_ROLE_HEADER)
        .ok_or_else(|| AppError::Unauthorized("Missing role header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid role header".to_string()))?;

    parse_identity(user_id, role).map(Some)
}

fn parse_identity(user_id: &str, role: &str) -> Result<Identity, AppError> {
    let user_id: Uuid = user_id
        .trim()
        .parse()
        .map_err(|_| AppError::Unauthorized("User id must be a UUID".to_string()))?;
    let role: Role = role.trim().parse().map_err(AppError::Unauthorized)?;
    Ok(Identity::new(user_id, role))
}
