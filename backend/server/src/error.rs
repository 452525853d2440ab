use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledger::payloads::ErrorBody;
use thiserror::Error;
use tracing::{error, warn};

use crate::{completion::CompletionError, database::StoreError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("Malformed payload: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upstream(#[from] CompletionError),

    #[error("Action {action_id} was logged but points were not updated: {source}")]
    PartiallyApplied {
        action_id: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(_) | AppError::Upstream(_) | AppError::PartiallyApplied { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        let action_id = match &self {
            AppError::PartiallyApplied { action_id, .. } => Some(action_id.clone()),
            _ => None,
        };

        let body = ErrorBody {
            detail: self.to_string(),
            action_id,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::NotFound("User not found").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation("user_id is empty".to_string()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Upstream(CompletionError::EmptyReply).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Store(StoreError::Empty("eco action insert")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_partial_message_names_action() {
        let err = AppError::PartiallyApplied {
            action_id: "12".to_string(),
            source: Box::new(AppError::NotFound("User not found")),
        };

        assert_eq!(
            err.to_string(),
            "Action 12 was logged but points were not updated: User not found"
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
