use actix_web::dev::Payload;
use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::auth::token::TokenService;
use crate::error::AppError;

/// The verified identity behind a request.
///
/// Resolution is a pure token check: the user table is not consulted, so a token issued
/// to a since-deleted user keeps resolving until it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: i32,
}

/// Returns the credential of an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Verifies the bearer token in `headers` and resolves it to an identity.
pub fn resolve_identity(
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<AuthenticatedUser, AppError> {
    let token = bearer_token(headers)
        .ok_or_else(|| AppError::Unauthenticated("Missing bearer token".into()))?;
    let id = tokens.verify(token)?;
    Ok(AuthenticatedUser { id })
}

/// Extracts the authenticated user for a handler.
///
/// On routes behind [`AuthMiddleware`](crate::auth::AuthMiddleware) the identity is
/// already in the request extensions. Elsewhere the bearer header is resolved here,
/// using the `TokenService` registered as app data.
impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthenticatedUser>().copied() {
            return ready(Ok(user));
        }

        let resolved = match req.app_data::<web::Data<TokenService>>() {
            Some(tokens) => resolve_identity(req.headers(), tokens),
            None => Err(AppError::Internal("Token service is not configured".into())),
        };
        ready(resolved.map_err(Into::into))
    }
}
