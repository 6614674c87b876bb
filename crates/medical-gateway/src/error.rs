use crate::tools::ToolError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// A failed API call, rendered as `{success: false, error, message?}`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A required body field was absent or empty.
    #[error("{0} parameter is required")]
    MissingField(&'static str),

    #[error("{0}")]
    BadRequest(String),

    /// The operation failed; `error` names the operation, `message` the cause.
    #[error("{error}: {message}")]
    Failed { error: String, message: String },
}

impl GatewayError {
    /// Map a tool failure for the operation described by `error`.
    pub fn from_tool(error: impl Into<String>, cause: ToolError) -> Self {
        match cause {
            ToolError::MissingField(field) => GatewayError::MissingField(field),
            ToolError::InvalidArguments(message) => GatewayError::BadRequest(message),
            other => GatewayError::Failed {
                error: error.into(),
                message: other.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingField(_) | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::MissingField(_) => json!({
                "success": false,
                "error": self.to_string(),
            }),
            GatewayError::BadRequest(message) => json!({
                "success": false,
                "error": "Invalid request body",
                "message": message,
            }),
            GatewayError::Failed { error, message } => {
                tracing::error!(error = %error, message = %message, "request failed");
                json!({
                    "success": false,
                    "error": error,
                    "message": message,
                })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceError;
    use http_body_util::BodyExt;

    async fn body_json(err: GatewayError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_field_is_400_without_message() {
        let (status, body) = body_json(GatewayError::MissingField("Query")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": "Query parameter is required"}));
    }

    #[tokio::test]
    async fn tool_failure_is_500_with_message() {
        let cause = ToolError::Upstream {
            operation: "Drug search failed",
            source: SourceError::Status(502),
        };
        let (status, body) = body_json(GatewayError::from_tool("Failed to search for drugs", cause)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to search for drugs");
        assert_eq!(body["message"], "Drug search failed: upstream returned HTTP 502");
    }

    #[test]
    fn tool_argument_errors_stay_client_errors() {
        let err = GatewayError::from_tool("x", ToolError::MissingField("NDC"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = GatewayError::from_tool("x", ToolError::InvalidArguments("bad".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = GatewayError::from_tool("x", ToolError::UnknownTool("y".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
