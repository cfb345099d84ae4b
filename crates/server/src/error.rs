use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use storefront_core::{ApplicationError, InterfaceError};
use tracing::{error, warn};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

/// Handler error carrying the interface classification and correlation id.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn from_application(error: impl Into<ApplicationError>, correlation_id: &str) -> Self {
        Self(error.into().into_interface(correlation_id))
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id.to_string(),
        })
    }

    pub fn not_found(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::NotFound {
            message: message.into(),
            correlation_id: correlation_id.to_string(),
        })
    }

    pub fn internal(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::Internal {
            message: message.into(),
            correlation_id: correlation_id.to_string(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn correlation_id(&self) -> &str {
        match &self.0 {
            InterfaceError::BadRequest { correlation_id, .. }
            | InterfaceError::NotFound { correlation_id, .. }
            | InterfaceError::Conflict { correlation_id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id, .. }
            | InterfaceError::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let correlation_id = self.correlation_id().to_string();

        // Client errors echo the detail; server-side failures only get the generic text.
        let message = if status.is_server_error() {
            error!(
                event_name = "http.request.failed",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
            self.0.user_message().to_string()
        } else {
            warn!(
                event_name = "http.request.rejected",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
            self.0.message().to_string()
        };

        (status, Json(ErrorBody { error: message, correlation_id })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use storefront_core::{ApplicationError, ConversionError};

    use super::ApiError;

    #[test]
    fn application_errors_map_to_http_statuses() {
        let conversion =
            ApiError::from_application(ConversionError::Quantity { value: "x".into() }, "c-1");
        assert_eq!(conversion.status(), StatusCode::BAD_REQUEST);

        let conflict = ApiError::from_application(ApplicationError::Conflict("v".into()), "c-2");
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let persistence =
            ApiError::from_application(ApplicationError::Persistence("db".into()), "c-3");
        assert_eq!(persistence.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
