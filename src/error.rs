use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub type CoreResult<T> = Result<T, CoreError>;

/// Every state-changing operation either commits fully or fails with exactly
/// one of these. Nothing is retried internally; `Conflict` from a raced
/// uniqueness constraint is expected and the caller should re-read.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Role(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    State(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl CoreError {
    /// Translate a constraint violation on insert into `Conflict`, leaving
    /// every other database failure untouched.
    pub(crate) fn or_conflict(err: sqlx::Error, msg: &str) -> CoreError {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CoreError::Conflict(msg.to_owned())
            }
            _ => CoreError::Db(err),
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::Role(_) => StatusCode::FORBIDDEN,
            CoreError::Authorization(_) => StatusCode::FORBIDDEN,
            CoreError::State(_) => StatusCode::BAD_REQUEST,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{self}");
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
