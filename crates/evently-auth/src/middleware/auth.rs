//! The authentication gate and the `CurrentUser` extractor.
//!
//! ```text
//! START → header? ──no──→ MissingHeader (401)
//!           │
//!       "Bearer <t>"? ──no──→ MalformedScheme (400)
//!           │
//!       verify(t) ──err──→ InvalidToken / InvalidSignature / Expired (401)
//!           │
//!       resolve(user_id) ──err──→ Unauthorized (401) / Unavailable (503)
//!           │
//!       AUTHENTICATED: principal stored in request extensions
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use evently_core::PublicUser;
use metrics::counter;

use crate::error::AuthError;
use crate::resolver::PrincipalResolver;
use crate::token::TokenService;

// =============================================================================
// Auth State
// =============================================================================

/// State required by the authentication gate.
///
/// Include it in the application state and expose it with `FromRef`, or pass
/// it directly to `middleware::from_fn_with_state`.
#[derive(Clone, Debug)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub resolver: PrincipalResolver,
}

impl AuthState {
    pub fn new(tokens: Arc<TokenService>, resolver: PrincipalResolver) -> Self {
        Self { tokens, resolver }
    }
}

/// The principal attached to an authenticated request.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub PublicUser);

// =============================================================================
// Gate
// =============================================================================

/// Extracts the bearer token from the `Authorization` header.
///
/// The scheme name is matched case-insensitively. A blank header counts as
/// missing.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedScheme)?.trim();
    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::MalformedScheme)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() {
        return Err(AuthError::MalformedScheme);
    }
    Ok(token)
}

/// Authentication middleware.
///
/// On success the resolved principal is inserted into the request
/// extensions as [`AuthenticatedUser`]. On failure the request never reaches
/// the handler.
pub async fn authenticate(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = match authenticate_headers(&state, request.headers()).await {
        Ok(principal) => principal,
        Err(err) => {
            counter!("evently_auth_rejections_total", "reason" => err.reason()).increment(1);
            tracing::debug!(reason = err.reason(), error = %err, "Request rejected");
            return Err(err);
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser(principal));
    Ok(next.run(request).await)
}

async fn authenticate_headers(
    state: &AuthState,
    headers: &HeaderMap,
) -> Result<PublicUser, AuthError> {
    let token = bearer_token(headers)?;
    let verified = state.tokens.verify(token)?;
    let principal = state.resolver.resolve(verified.user_id).await?;
    tracing::Span::current().record("user_id", principal.id);
    Ok(principal)
}

// =============================================================================
// Extractor
// =============================================================================

/// Extractor for the authenticated principal.
///
/// Never rejects. If the gate did not run for this route, the handler gets
/// the empty default principal and a warning is logged.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub PublicUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthenticatedUser>() {
            Some(AuthenticatedUser(user)) => Ok(CurrentUser(user.clone())),
            None => {
                tracing::warn!(
                    path = %parts.uri.path(),
                    "No authenticated principal on request; using empty principal"
                );
                Ok(CurrentUser(PublicUser::default()))
            }
        }
    }
}
