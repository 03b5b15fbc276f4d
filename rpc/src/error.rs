//! RPC error types and their HTTP rendering.
//!
//! Ledger rejections are surfaced verbatim: the body carries the error's own
//! message plus a stable machine-readable code.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ideas_ledger::{ErrorKind, LedgerError};
use ideas_store::StoreError;
use ideas_types::TypesError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("missing x-caller-address header")]
    MissingCaller,

    #[error("invalid caller: {0}")]
    InvalidCaller(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server error: {0}")]
    Server(String),
}

impl From<TypesError> for RpcError {
    fn from(e: TypesError) -> Self {
        RpcError::InvalidRequest(e.to_string())
    }
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        RpcError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for RpcError {
    fn from(rejection: PathRejection) -> Self {
        RpcError::InvalidRequest(rejection.body_text())
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl RpcError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            RpcError::Ledger(e) => match e.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ErrorKind::Unauthorized => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
                ErrorKind::SelfVoteForbidden => (StatusCode::FORBIDDEN, "SELF_VOTE_FORBIDDEN"),
                ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                ErrorKind::Snapshot => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            RpcError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            RpcError::Store(StoreError::InvalidLocator(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT")
            }
            RpcError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
            RpcError::MissingCaller => (StatusCode::UNAUTHORIZED, "MISSING_CALLER"),
            RpcError::InvalidCaller(_) | RpcError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT")
            }
            RpcError::Server(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ideas_types::{Address, IdeaId};

    #[test]
    fn ledger_kinds_map_to_stable_codes() {
        let cases = [
            (LedgerError::IdeaNotFound(IdeaId::new(1)), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                LedgerError::Unauthorized {
                    caller: Address::from_index(1),
                },
                StatusCode::FORBIDDEN,
                "UNAUTHORIZED",
            ),
            (
                LedgerError::SelfVoteForbidden(IdeaId::new(1)),
                StatusCode::FORBIDDEN,
                "SELF_VOTE_FORBIDDEN",
            ),
            (
                LedgerError::InvalidInput("title must not be empty".into()),
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
            ),
        ];
        for (error, status, code) in cases {
            assert_eq!(RpcError::from(error).status_and_code(), (status, code));
        }
    }

    #[test]
    fn message_is_the_ledger_text() {
        let error = RpcError::from(LedgerError::IdeaNotFound(IdeaId::new(7)));
        assert_eq!(error.to_string(), "idea 7 not found");
    }
}
