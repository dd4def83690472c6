//! Request extractors: caller identity and JSON bodies.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::UserId;
use domain::{AccountType, Actor, Contact};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const ACCOUNT_TYPE_HEADER: &str = "x-account-type";

/// The authenticated caller, as forwarded by the auth gateway.
#[derive(Debug, Clone)]
pub struct Caller(pub Actor);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn required<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    header(headers, name).ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))
}

impl Caller {
    /// Builds a caller from gateway headers. The display name falls back to
    /// the email address.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let user_id: UserId = required(headers, USER_ID_HEADER)?
            .parse()
            .map_err(|_| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))?;
        let email = required(headers, USER_EMAIL_HEADER)?;
        let account_type: AccountType = required(headers, ACCOUNT_TYPE_HEADER)?
            .parse()
            .map_err(ApiError::Unauthorized)?;
        let name = header(headers, USER_NAME_HEADER).unwrap_or(email);

        Ok(Caller(Actor::new(
            Contact::new(user_id, name, email),
            account_type,
        )))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers)
    }
}

/// JSON body extractor whose rejections render as `{ "error": ... }` with 400.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}
