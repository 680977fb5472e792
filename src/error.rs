use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::simulation::SimulationError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal {
            message: message.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            ServiceError::Validation { ref message } => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            ServiceError::Simulation(ref e) => {
                tracing::error!("Simulation error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ServiceError::Internal { ref message } => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
        };

        // Flat error body; stack traces stay in the logs.
        let body = Json(json!({ "error": error_message }));

        (status_code, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
