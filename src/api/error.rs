//! HTTP rendering of domain errors and JSON/query extractors that reject with them

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::domain::DomainError;
use crate::utils::now_rfc3339;

pub fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::Validation(_) | DomainError::SelfReview => StatusCode::BAD_REQUEST,
        DomainError::InvalidTransition { .. } | DomainError::DuplicateReview => StatusCode::CONFLICT,
        DomainError::Permission(_) => StatusCode::FORBIDDEN,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Database(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = status_for(&self);

        // Server-side details stay in the logs
        let message = if self.is_server_error() {
            tracing::error!("{}", self);
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "error": true,
                "code": self.code(),
                "message": message,
                "status_code": status.as_u16(),
                "timestamp": now_rfc3339(),
            })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for DomainError {
    fn from(rejection: JsonRejection) -> Self {
        DomainError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for DomainError {
    fn from(rejection: QueryRejection) -> Self {
        DomainError::Validation(rejection.body_text())
    }
}

/// `Json` whose rejection is rendered like every other API error
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(DomainError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection is rendered like every other API error
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(DomainError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(status_for(&DomainError::invalid("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&DomainError::SelfReview), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&DomainError::DuplicateReview), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&DomainError::InvalidTransition {
                from: "completed".into(),
                to: "pending".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&DomainError::forbidden("x")), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&DomainError::not_found("Review")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&DomainError::Database("locked".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let response = DomainError::Database("disk I/O error".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "database_error");
        assert_eq!(body["status_code"], 500);
        assert!(!body["message"].as_str().unwrap().contains("disk"));
    }
}
