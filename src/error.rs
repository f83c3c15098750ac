//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The client sent an access code or admin code that does not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// A transaction was created with a zero or negative amount.
    ///
    /// Amounts are magnitudes in minor currency units; the direction is
    /// carried by the transaction type.
    #[error("transaction amounts must be positive, got {0}")]
    InvalidAmount(i64),

    /// The transaction type string was not "entrada" or "saida".
    #[error("\"{0}\" is not a valid transaction type")]
    InvalidTransactionType(String),

    /// The transaction status string was not one of the known statuses.
    #[error("\"{0}\" is not a valid transaction status")]
    InvalidTransactionStatus(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The database could not be reached in time, e.g. the busy timeout
    /// elapsed or the connection lock was poisoned.
    ///
    /// The operation had no effect and the client may retry.
    #[error("the database is unavailable")]
    DatabaseUnavailable,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::SqliteFailure(sql_error, _)
                if matches!(
                    sql_error.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                Error::DatabaseUnavailable
            }
            error => Error::SqlError(error),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::InvalidCredentials
            | Error::CookieMissing
            | Error::InvalidDateFormat(_, _) => StatusCode::UNAUTHORIZED,
            Error::InvalidAmount(_)
            | Error::InvalidTransactionType(_)
            | Error::InvalidTransactionStatus(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            // SQL error strings are for the server logs, not the client.
            Error::SqlError(error) => {
                tracing::error!("unhandled SQL error: {error}");
                "an internal error occurred".to_owned()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
