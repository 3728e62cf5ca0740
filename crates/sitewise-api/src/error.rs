use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sitewise_core::error::SitewiseError;

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: Option<&'static str>,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, code: None, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.message, code: self.code };
        (self.status, Json(body)).into_response()
    }
}

fn status_for(err: &SitewiseError) -> StatusCode {
    match err {
        SitewiseError::ProjectNotFound { .. } | SitewiseError::CapabilityNotFound { .. } => StatusCode::NOT_FOUND,
        SitewiseError::NameAlreadyExists { .. }
        | SitewiseError::ProjectInProgress { .. }
        | SitewiseError::AmbiguousReference { .. } => StatusCode::CONFLICT,
        SitewiseError::ConfirmationRequired { .. } => StatusCode::PRECONDITION_REQUIRED,
        SitewiseError::MissingProjectData { .. }
        | SitewiseError::InvalidCoordinates { .. }
        | SitewiseError::InvalidSearchRadius { .. }
        | SitewiseError::InvalidProjectName { .. }
        | SitewiseError::InvalidParameters(_)
        | SitewiseError::UnsupportedExportVersion { .. } => StatusCode::BAD_REQUEST,
        SitewiseError::DeploymentIssue { .. } | SitewiseError::AgentUnavailable { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SitewiseError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
        SitewiseError::CapabilityTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SitewiseError::CapabilityFailed { .. } => StatusCode::BAD_GATEWAY,
        SitewiseError::Storage { .. }
        | SitewiseError::ConfigMissing { .. }
        | SitewiseError::ConfigInvalid { .. }
        | SitewiseError::Io(_)
        | SitewiseError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SitewiseError> for ApiError {
    fn from(err: SitewiseError) -> Self {
        let status = status_for(&err);
        if !err.is_user_facing() {
            tracing::error!(error = %err, "Request failed");
            return Self { code: Some(err.code()), ..Self::internal("Internal error") };
        }

        let message = match &err {
            SitewiseError::ConfirmationRequired { prompt, .. } => prompt.clone(),
            other => other.to_string(),
        };
        Self { status, code: Some(err.code()), message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found: ApiError = SitewiseError::ProjectNotFound { name: "x".into() }.into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let confirm: ApiError = SitewiseError::ConfirmationRequired {
            action: "delete x".into(),
            prompt: "Really delete x?".into(),
        }
        .into();
        assert_eq!(confirm.status, StatusCode::PRECONDITION_REQUIRED);
        assert_eq!(confirm.message, "Really delete x?");

        let timeout: ApiError =
            SitewiseError::CapabilityTimeout { function: "terrain".into(), elapsed_ms: 1 }.into();
        assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let err: ApiError = SitewiseError::storage_permanent("put", "bucket secret-bucket denied").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("secret-bucket"));
        assert_eq!(err.code, Some("S3_ERROR"));
    }
}
