use {
    axum::{
        Json,
        extract::multipart::MultipartError,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde_json::json,
    snaplist_listing::{FailureDetail, PublishError, PublishStage, ValidationError},
    snaplist_oauth::OAuthError,
    tracing::error,
};

use crate::uploads::UploadError;

/// Handler error, rendered as `{"success": false, "error": …}`.
///
/// Publish failures also carry the failing `stage`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Multipart(e) => e.status(),
            Self::Upload(e) => match e {
                UploadError::NotFound(_) => StatusCode::NOT_FOUND,
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::OAuth(e) => match e {
                OAuthError::Configuration(_) | OAuthError::StateMismatch => StatusCode::BAD_REQUEST,
                OAuthError::NotAuthenticated | OAuthError::NoRefreshToken => {
                    StatusCode::UNAUTHORIZED
                },
                OAuthError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Publish(e) => match (e.stage, &e.detail) {
                (PublishStage::Auth, _) => StatusCode::UNAUTHORIZED,
                (_, FailureDetail::Timeout) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Publish(e) => json!({
                "success": false,
                "stage": e.stage,
                "error": e.detail.to_string(),
            }),
            Self::Internal(msg) => {
                error!(error = %msg, "request failed");
                json!({ "success": false, "error": msg })
            },
            other => json!({ "success": false, "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_errors_keep_stage_and_detail() {
        let err = ApiError::from(PublishError::new(PublishStage::Offer, FailureDetail::Status {
            status: 500,
            body: "boom".into(),
        }));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let timeout = ApiError::from(PublishError::new(
            PublishStage::Inventory,
            FailureDetail::Timeout,
        ));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let auth = ApiError::from(PublishError::new(
            PublishStage::Auth,
            FailureDetail::Auth("not logged in".into()),
        ));
        assert_eq!(auth.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn oauth_errors_map_to_client_or_upstream_status() {
        assert_eq!(
            ApiError::from(OAuthError::StateMismatch).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(OAuthError::TokenExchange {
                status: 400,
                body: "invalid_grant".into(),
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
