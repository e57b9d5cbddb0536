use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use evently_core::CoreError;
use evently_storage::{JoinError, StorageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// -------------------------
// Response Envelope
// -------------------------

/// Body shape shared by every response: `{success, message, data}`.
///
/// `message` is omitted when absent; `data` is always present and is `null`
/// on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    axum::http::Response::builder()
        .status(status)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| {
            let mut fallback = Response::new(axum::body::Body::from("{}"));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

fn serialization_failure() -> Vec<u8> {
    serde_json::to_vec(&Envelope::<()>::failure("Serialization failure"))
        .unwrap_or_else(|_| b"{}".to_vec())
}

// -------------------------
// API Errors
// -------------------------

/// High-level API errors mapped to HTTP responses with a failure envelope.
///
/// `Unavailable` and `Internal` carry operator detail that is logged but
/// never sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client.
    pub fn public_message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => msg,
            ApiError::Unavailable(_) => "Service temporarily unavailable",
            ApiError::Internal(_) => "Internal server error",
        }
    }

    pub fn to_envelope(&self) -> Envelope<()> {
        Envelope::failure(self.public_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = serde_json::to_vec(&self.to_envelope()).unwrap_or_else(|_| serialization_failure());
        json_response(status, body)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { message } => Self::Conflict(message),
            StorageError::Timeout { .. } | StorageError::Connection { .. } => {
                Self::Unavailable(err.to_string())
            }
            StorageError::Internal { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<JoinError<StorageError>> for ApiError {
    fn from(err: JoinError<StorageError>) -> Self {
        match err {
            JoinError::Failed { source, .. } => source.into(),
            JoinError::NotFound { slot } => Self::NotFound(format!("{slot} record not found")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

// -------------------------
// API Response Wrapper
// -------------------------

/// Successful response: a status, extra headers and a success envelope.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub envelope: Envelope<T>,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            envelope: Envelope::ok(value),
            status,
            headers: Vec::new(),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn created(value: T) -> Self {
        Self::new(value, StatusCode::CREATED)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.envelope.message = Some(message.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self.envelope).unwrap_or_else(|_| serialization_failure());
        let mut response = json_response(self.status, body);
        for (name, value) in self.headers {
            response.headers_mut().insert(name, value);
        }
        response
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn error_body_is_failure_envelope() {
        let resp = ApiError::forbidden("Not the event owner").into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static("application/json")
        );
        let body = body_json(resp).await;
        assert_eq!(
            body,
            serde_json::json!({"success": false, "message": "Not the event owner", "data": null})
        );
    }

    #[tokio::test]
    async fn infrastructure_detail_is_not_leaked() {
        let err: ApiError = StorageError::connection("tcp 10.0.0.5:5432 refused").into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(err.into_response()).await;
        assert_eq!(body["message"], "Service temporarily unavailable");
        assert!(!body.to_string().contains("10.0.0.5"));
    }

    #[test]
    fn api_error_variants_map_to_status() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST),
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::conflict("x"), StatusCode::CONFLICT),
            (ApiError::unavailable("x"), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases.into_iter() {
            assert_eq!(err.status_code(), status);
        }
    }

    #[test]
    fn storage_errors_convert() {
        let conflict: ApiError = StorageError::conflict("email already registered").into();
        assert!(matches!(conflict, ApiError::Conflict(ref m) if m == "email already registered"));

        let timeout: ApiError = StorageError::timeout("get_user", Duration::from_secs(5)).into();
        assert_eq!(timeout.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let internal: ApiError = StorageError::internal("bad row").into();
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err: ApiError = CoreError::validation("name", "must be at least 3 characters").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "name: must be at least 3 characters");
    }

    #[tokio::test]
    async fn created_response_wraps_data() {
        let resp = ApiResponse::created(serde_json::json!({"id": 1}))
            .with_message("Event created")
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(
            body,
            serde_json::json!({"success": true, "message": "Event created", "data": {"id": 1}})
        );
    }

    #[tokio::test]
    async fn ok_response_omits_message() {
        let resp = ApiResponse::ok(vec![1, 2]).into_response();
        let body = body_json(resp).await;
        assert!(body.get("message").is_none());
        assert_eq!(body["data"], serde_json::json!([1, 2]));
    }
}
