/*
 * This file is part of the Obvia ERP.
 *
 * Copyright (C) 2025 Kovács Dávid <kapcsolat@kovacsdavid.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{Level, event};

/// Stable machine-readable codes for the error taxonomy, one per category
/// named in the external interface contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    InvalidCredentials,
    InvalidToken,
    RefreshReused,
    NoEligibleRoles,
    WebauthnFailed,
    CloneDetected,
    TenantNotFound,
    TenantSuspended,
    ValidationFailed,
    Conflict,
    SlugTaken,
    DomainTaken,
    NotFound,
    Unauthorized,
    Forbidden,
    UpstreamUnavailable,
    Internal,
}

impl ApiErrorCode {
    fn status(self) -> StatusCode {
        use ApiErrorCode::*;
        match self {
            InvalidCredentials | InvalidToken | RefreshReused | Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            NoEligibleRoles | Forbidden | CloneDetected => StatusCode::FORBIDDEN,
            WebauthnFailed | ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            TenantNotFound | NotFound => StatusCode::NOT_FOUND,
            TenantSuspended => StatusCode::LOCKED,
            Conflict | SlugTaken | DomainTaken => StatusCode::CONFLICT,
            UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A single user-facing error, generalizing the teacher's `FriendlyError<T>`
/// into the envelope shape this API actually ships:
/// `{ "data": null, "error": { "code", "message", "details" } }`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    code: ApiErrorCode,
    message: String,
    details: Option<Value>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        let err = Self {
            code,
            message: message.into(),
            details: None,
        };
        err.trace()
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn internal(loc: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        event!(Level::ERROR, location = loc, %message, "internal error");
        Self {
            code: ApiErrorCode::Internal,
            message: "An unexpected error occurred".to_string(),
            details: None,
        }
    }

    pub fn code(&self) -> ApiErrorCode {
        self.code
    }

    fn trace(self) -> Self {
        let level = match self.code {
            ApiErrorCode::Internal => Level::ERROR,
            ApiErrorCode::CloneDetected | ApiErrorCode::RefreshReused => Level::WARN,
            _ => Level::DEBUG,
        };
        match level {
            Level::ERROR => event!(Level::ERROR, code = ?self.code, message = %self.message, "api error"),
            Level::WARN => event!(Level::WARN, code = ?self.code, message = %self.message, "api error"),
            _ => event!(Level::DEBUG, code = ?self.code, message = %self.message, "api error"),
        }
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: ApiErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let body = json!({
            "data": Value::Null,
            "error": ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        });
        (status, Json(body)).into_response()
    }
}

/// Wraps a successful payload in the same envelope shape errors use.
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(json!({ "data": data, "error": Value::Null }))).into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(json!({ "data": data, "error": Value::Null }))).into_response()
}

/// Errors surfaced by repository implementations, kept distinct from
/// `ApiError` exactly as the teacher keeps `RepositoryError` distinct from
/// `FriendlyError` — a repository doesn't know the right HTTP status.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migrate error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("record not found")]
    NotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("slug already registered")]
    SlugTaken,
    #[error("domain already registered")]
    DomainTaken,
}

impl RepositoryError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RepositoryError::Database(sqlx::Error::Database(e)) if e.is_unique_violation())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => ApiError::new(ApiErrorCode::NotFound, "Not found"),
            RepositoryError::InvalidInput(msg) => {
                ApiError::new(ApiErrorCode::ValidationFailed, msg)
            }
            RepositoryError::SlugTaken => {
                ApiError::new(ApiErrorCode::SlugTaken, "Slug already registered")
            }
            RepositoryError::DomainTaken => {
                ApiError::new(ApiErrorCode::DomainTaken, "Domain already registered")
            }
            other if other.is_unique_violation() => {
                ApiError::new(ApiErrorCode::Conflict, "Resource already exists")
            }
            other => ApiError::internal(file!(), other.to_string()),
        }
    }
}
