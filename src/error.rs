use axum::{
    Json,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::{
    forms::{ActionReply, SubmissionReply},
    models::ErrorResponse,
    views,
};

/// AppError
///
/// Every failure a route can surface. Each variant maps to exactly one HTTP status;
/// nothing is retried and nothing is swallowed.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    NotFound { message: String },

    /// Only the `entity:action` pair is reported, never the scope that was missing.
    #[error("Unauthorized: required permission {required}")]
    Forbidden { required: String },

    /// No session on a route that requires one.
    #[error("login required")]
    Unauthenticated { redirect_to: String },

    #[error("invalid submission")]
    Validation(SubmissionReply),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Unauthenticated { .. } => StatusCode::FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log_internal(&self) {
        match self {
            AppError::Database(e) => tracing::error!("database error: {:?}", e),
            AppError::Storage(e) => tracing::error!("storage error: {}", e),
            _ => {}
        }
    }

    /// into_page_response
    ///
    /// Error boundary for HTML routes: the same status codes as the JSON form, with a
    /// rendered page instead of a JSON body.
    pub fn into_page_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::NotFound { message } => Some(message.clone()),
            AppError::Forbidden { .. } => Some("You are not allowed to do that".to_string()),
            AppError::Storage(_) | AppError::Database(_) => {
                self.log_internal();
                Some("Something went wrong on our end".to_string())
            }
            AppError::Unauthenticated { .. } | AppError::Validation(_) => None,
        };
        match message {
            Some(message) => {
                (status, Html(views::render_error_page(status, &message))).into_response()
            }
            None => self.into_response(),
        }
    }
}

/// 302 to the login page. `redirect_to` is percent-encoded so its own query string
/// survives the round trip.
pub fn login_redirect(redirect_to: &str) -> Response {
    let location = format!("/login?redirectTo={}", urlencoding::encode(redirect_to));
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match self {
            AppError::Unauthenticated { redirect_to } => return login_redirect(&redirect_to),
            AppError::Validation(reply) => {
                return (status, Json(ActionReply { result: reply })).into_response();
            }
            AppError::NotFound { message } => ("NotFound", message),
            forbidden @ AppError::Forbidden { .. } => ("Unauthorized", forbidden.to_string()),
            internal => {
                internal.log_internal();
                ("InternalError", "Internal server error".to_string())
            }
        };
        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
