//! Closed error taxonomy for the authentication core and its single mapping to HTTP.
//! Every failure surfaced by the stores, the session manager or the gate is one of these
//! kinds; frontends never pick a status themselves, they call [`AuthError::http_status`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("username or password is invalid")]
    WrongCredentials,
    #[error("need to authorize")]
    Unauthorized,
    #[error("session token is invalid")]
    InvalidToken,
    #[error("request is not valid: {0}")]
    BadRequest(String),
    #[error("requested item is not found")]
    NotFound,
    #[error("resource already exists")]
    AlreadyExists,
    #[error("forbidden")]
    Forbidden,
    #[error("internal server error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn bad_request(msg: impl Into<String>) -> Self { AuthError::BadRequest(msg.into()) }
    pub fn internal(msg: impl Into<String>) -> Self { AuthError::Internal(msg.into()) }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AuthError::WrongCredentials => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::BAD_REQUEST,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::AlreadyExists => StatusCode::CONFLICT,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape of every failed response: `{"err": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub err: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody { err: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AuthError::WrongCredentials.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::Unauthorized.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidToken.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::bad_request("oops").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::AlreadyExists.http_status(), StatusCode::CONFLICT);
        assert_eq!(AuthError::Forbidden.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::internal("db down").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn into_response_uses_mapped_status() {
        let resp = AuthError::AlreadyExists.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = AuthError::internal("boom").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_body_serializes_as_err_field() {
        let body = ErrorBody { err: AuthError::InvalidToken.to_string() };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v, serde_json::json!({"err": "session token is invalid"}));
    }
}
