use crate::backend::BackendResponse;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::error;

/// What the gateway hands back to the caller for one request
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    /// Backend payload passed through with its status
    Forwardable(StatusCode, Value),
    /// Bare status, no body
    StatusOnly(StatusCode),
}

impl ResponseEnvelope {
    pub fn not_implemented() -> Self {
        ResponseEnvelope::StatusOnly(StatusCode::NOT_IMPLEMENTED)
    }

    /// Only 200 and 202 carry a body through; every other status is relayed bare
    pub fn from_backend(response: BackendResponse) -> Self {
        let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
        match status {
            StatusCode::OK | StatusCode::ACCEPTED => {
                ResponseEnvelope::Forwardable(status, response.payload)
            }
            _ => ResponseEnvelope::StatusOnly(status),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ResponseEnvelope::Forwardable(status, _) | ResponseEnvelope::StatusOnly(status) => {
                *status
            }
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            ResponseEnvelope::Forwardable(_, payload) => Some(payload),
            ResponseEnvelope::StatusOnly(_) => None,
        }
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        match self {
            ResponseEnvelope::Forwardable(status, payload) => match serde_json::to_vec(&payload) {
                Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body)
                    .into_response(),
                Err(e) => {
                    error!("Failed to serialize backend payload: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            },
            ResponseEnvelope::StatusOnly(status) => status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_payload_is_forwarded() {
        let envelope = ResponseEnvelope::from_backend(BackendResponse::new(200, json!({"a": 1})));
        assert_eq!(
            envelope,
            ResponseEnvelope::Forwardable(StatusCode::OK, json!({"a": 1}))
        );
    }

    #[test]
    fn test_accepted_payload_is_forwarded() {
        let envelope =
            ResponseEnvelope::from_backend(BackendResponse::new(202, json!({"job": "abc"})));
        assert_eq!(envelope.status(), StatusCode::ACCEPTED);
        assert_eq!(envelope.payload(), Some(&json!({"job": "abc"})));
    }

    #[test]
    fn test_error_payload_is_dropped() {
        let envelope =
            ResponseEnvelope::from_backend(BackendResponse::new(404, json!({"trace": "..."})));
        assert_eq!(envelope, ResponseEnvelope::StatusOnly(StatusCode::NOT_FOUND));
        assert!(envelope.payload().is_none());
    }

    #[test]
    fn test_other_success_codes_are_status_only() {
        let envelope = ResponseEnvelope::from_backend(BackendResponse::new(201, json!({})));
        assert_eq!(envelope, ResponseEnvelope::StatusOnly(StatusCode::CREATED));
    }

    #[tokio::test]
    async fn test_into_response_bodies() {
        let response = ResponseEnvelope::Forwardable(StatusCode::OK, json!({"a": 1})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"a": 1}));

        let response = ResponseEnvelope::StatusOnly(StatusCode::NOT_FOUND).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }
}
