//! Response envelope shared by every JSON endpoint.
//!
//! `{ "success": bool, "message": string, "data"?: T, "errors": [string] }`

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::error::ServiceError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: Vec::new(),
        }
    }
}

/// Envelope without a payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors,
        }
    }
}

impl ServiceError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials
            | Self::InvalidOrExpiredRefreshToken
            | Self::InvalidRefreshToken
            | Self::AccountUnavailable
            | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Validation { message, errors } => ApiMessage::failure(message, errors),
            Self::Internal(ref err) => {
                error!("Request failed: {err:#}");
                ApiMessage::failure(self.to_string(), Vec::new())
            }
            other => ApiMessage::failure(other.to_string(), Vec::new()),
        };
        (status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, reporting malformed input in the envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::Validation {
            message: "Invalid request data".to_string(),
            errors: vec![rejection.body_text()],
        })
}

/// Parse an owner id path segment.
pub(crate) fn owner_id(
    path: Result<axum::extract::Path<String>, PathRejection>,
) -> Result<uuid::Uuid, ServiceError> {
    let invalid = || ServiceError::Validation {
        message: "Invalid request data".to_string(),
        errors: vec!["Invalid owner id".to_string()],
    };
    let axum::extract::Path(id) = path.map_err(|_| invalid())?;
    uuid::Uuid::parse_str(id.trim()).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ServiceError) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn validation_errors_carry_field_messages() -> anyhow::Result<()> {
        let (status, body) = render(ServiceError::validation(vec![
            "Invalid NIC format".to_string(),
        ]))
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0], "Invalid NIC format");
        Ok(())
    }

    #[tokio::test]
    async fn internal_errors_are_generic() -> anyhow::Result<()> {
        let (status, body) =
            render(ServiceError::Internal(anyhow::anyhow!("pool timed out on db-3"))).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
        assert!(!body.to_string().contains("db-3"));
        Ok(())
    }

    #[tokio::test]
    async fn auth_failures_map_to_401() -> anyhow::Result<()> {
        for err in [
            ServiceError::InvalidCredentials,
            ServiceError::InvalidOrExpiredRefreshToken,
            ServiceError::AccountUnavailable,
            ServiceError::Unauthenticated,
        ] {
            let (status, body) = render(err).await?;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["success"], false);
        }
        assert_eq!(ServiceError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::not_found("EV Owner not found").status_code(),
            StatusCode::NOT_FOUND
        );
        Ok(())
    }

    #[tokio::test]
    async fn rate_limited_maps_to_429() -> anyhow::Result<()> {
        let (status, body) = render(ServiceError::RateLimited).await?;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Rate limit exceeded. Please try again later."
        );
        Ok(())
    }

    #[test]
    fn data_is_serialized_with_envelope() -> anyhow::Result<()> {
        let body = serde_json::to_value(ApiResponse::ok("done", 7))?;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 7);
        assert_eq!(body["errors"], serde_json::json!([]));
        Ok(())
    }
}
