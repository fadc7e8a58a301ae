//! Caller identity handed over by the authentication layer.
//!
//! The gateway in front of this service authenticates the user and forwards
//! `x-user-id` (UUID) and `x-user-role` (`customer` or `admin`, default
//! `customer`).

use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use fulfillment::Actor;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Actor);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;
        let user_id = UserId::from_str(user_id)
            .map_err(|_| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER} header")))?;

        let actor = match header(parts, USER_ROLE_HEADER)? {
            None | Some("customer") => Actor::customer(user_id),
            Some("admin") => Actor::admin(user_id),
            Some(other) => return Err(ApiError::BadRequest(format!("Unknown role {other}"))),
        };
        Ok(Identity(actor))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    parts
        .headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| ApiError::BadRequest(format!("Invalid {name} header")))
        })
        .transpose()
}

/// Parses a UUID path segment into one of the typed ids.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what} id: {raw}")))
}
