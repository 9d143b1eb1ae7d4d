//! Session cookie extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::config::SESSION_COOKIE_NAME;
use crate::error::AppError;
use crate::state::AppState;

/// Marks a request as coming from a signed-in client.
/// Add this as a handler parameter to require the session cookie.
/// Rejects with 401 if the cookie is missing or empty.
///
/// The token is carried through unverified; issuing and checking tokens
/// belongs to the login service.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl FromRequestParts<AppState> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

        jar.get(SESSION_COOKIE_NAME)
            .map(|c| c.value().trim().to_string())
            .filter(|token| !token.is_empty())
            .map(SessionToken)
            .ok_or(AppError::Unauthorized)
    }
}
