//! Typed errors and HTTP mapping.
//!
//! The `Api`/`InvalidValue`/`NotFound`/`Permission` family is the structured
//! handler-level error model: each carries a machine-readable code, a data
//! payload, and a human message, and is recovered at the dispatch boundary
//! into a `{error, data, message}` JSON payload instead of propagating as an
//! unhandled failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Entity-definition-time failures, raised once when entity metadata is built.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("duplicate primary key for field: {field} (entity {entity})")]
    DuplicatePrimaryKey { entity: String, field: String },
    #[error("primary key not found (entity {entity})")]
    MissingPrimaryKey { entity: String },
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// Generic API error: caller supplies the code.
    #[error("{message}")]
    Api {
        code: String,
        data: String,
        message: String,
    },
    /// Invalid or missing input value; `field` names the offending form field.
    #[error("{message}")]
    InvalidValue { field: String, message: String },
    /// Resource not found; `field` names the resource.
    #[error("{message}")]
    NotFound { field: String, message: String },
    /// Caller lacks permission.
    #[error("{message}")]
    Permission { message: String },
    /// A required keyword parameter was absent after argument binding.
    #[error("missing argument: {0}")]
    MissingArgument(String),
    /// Request could not be parsed into handler arguments (bad content type,
    /// malformed body).
    #[error("{0}")]
    Dispatch(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("template: {0}")]
    Template(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn api(code: impl Into<String>, data: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Api {
            code: code.into(),
            data: data.into(),
            message: message.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        ApiError::Permission {
            message: message.into(),
        }
    }

    /// (code, data) for the structured payload, when this error belongs to
    /// the recoverable API family.
    pub fn code_and_data(&self) -> Option<(&str, &str)> {
        match self {
            ApiError::Api { code, data, .. } => Some((code, data)),
            ApiError::InvalidValue { field, .. } => Some(("value:invalid", field)),
            ApiError::NotFound { field, .. } => Some(("value:notfound", field)),
            ApiError::Permission { .. } => Some(("permission:forbidden", "permission")),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Some((code, data)) = self.code_and_data() {
            // Recoverable API family: structured payload, normal response.
            let body = json!({
                "error": code,
                "data": data,
                "message": self.to_string(),
            });
            return Json(body).into_response();
        }
        match self {
            ApiError::MissingArgument(ref name) => {
                let body = json!({
                    "error": "value:invalid",
                    "data": name,
                    "message": self.to_string(),
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Dispatch(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            other => {
                tracing::error!(error = %other, "server failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_family_codes() {
        let e = ApiError::invalid_value("email", "bad email");
        assert_eq!(e.code_and_data(), Some(("value:invalid", "email")));
        let e = ApiError::not_found("blog", "no such blog");
        assert_eq!(e.code_and_data(), Some(("value:notfound", "blog")));
        let e = ApiError::permission("admin only");
        assert_eq!(e.code_and_data(), Some(("permission:forbidden", "permission")));
        let e = ApiError::api("register:failed", "email", "email in use");
        assert_eq!(e.code_and_data(), Some(("register:failed", "email")));
    }

    #[test]
    fn server_failures_are_not_recoverable() {
        assert!(ApiError::Internal("boom".into()).code_and_data().is_none());
        assert!(ApiError::MissingArgument("pwd".into()).code_and_data().is_none());
    }
}
