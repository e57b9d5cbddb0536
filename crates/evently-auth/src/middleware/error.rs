//! Error response handling for the authentication gate.
//!
//! Rejections use the same `{success, message, data}` envelope as every
//! other response. Infrastructure and configuration detail is logged and
//! replaced by a generic message.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use evently_api::Envelope;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, oauth_error, message) = error_details(&self);

        if status.is_server_error() {
            tracing::error!(error = %self, "Authentication failed on the server side");
        }

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(oauth_error, &message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(Envelope::<()>::failure(message))).into_response()
    }
}

/// Returns (HTTP status, RFC 6750 error code, client message).
fn error_details(error: &AuthError) -> (StatusCode, &'static str, String) {
    match error {
        AuthError::MissingHeader => (
            StatusCode::UNAUTHORIZED,
            "invalid_request",
            "Authorization header is required".to_string(),
        ),
        AuthError::MalformedScheme => (
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Authorization header must be 'Bearer <token>'".to_string(),
        ),
        AuthError::InvalidToken { .. } | AuthError::InvalidSignature => (
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "Invalid token".to_string(),
        ),
        AuthError::Expired => (
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "Token has expired".to_string(),
        ),
        AuthError::Unauthorized { message } => {
            (StatusCode::UNAUTHORIZED, "invalid_token", message.clone())
        }
        AuthError::Unavailable { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "temporarily_unavailable",
            "Authentication is temporarily unavailable".to_string(),
        ),
        AuthError::Configuration { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "Internal server error".to_string(),
        ),
    }
}

fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped = description.replace('\\', "\\\\").replace('"', "\\\"");
    format!("Bearer realm=\"evently\", error=\"{error}\", error_description=\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_401_with_challenge() {
        let resp = AuthError::MissingHeader.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let challenge = resp
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(challenge.starts_with("Bearer realm=\"evently\""));

        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn malformed_scheme_is_400_without_challenge() {
        let resp = AuthError::MalformedScheme.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(resp.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn statuses() {
        let cases = [
            (AuthError::invalid_token("x"), StatusCode::UNAUTHORIZED),
            (AuthError::InvalidSignature, StatusCode::UNAUTHORIZED),
            (AuthError::Expired, StatusCode::UNAUTHORIZED),
            (AuthError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (AuthError::unavailable("x"), StatusCode::SERVICE_UNAVAILABLE),
            (AuthError::configuration("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(error_details(&err).0, status);
        }
    }

    #[tokio::test]
    async fn unavailable_hides_detail() {
        let resp = AuthError::unavailable("redis://10.1.1.1 refused").into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(resp).await;
        assert!(!body.to_string().contains("10.1.1.1"));
    }
}
