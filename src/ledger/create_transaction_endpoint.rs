//! The route handler for recording a new transaction.

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{Error, user::UserId};

use super::{NewTransaction, apply_transaction, balance_endpoint::LedgerState};

/// A route handler that records a transaction for the logged-in user and
/// bumps their balance.
///
/// Returns 201 with the stored transaction on success, 422 if the amount is
/// not positive, and 503 if the database stayed locked past the busy timeout.
/// A rejected transaction leaves no trace in the history or the balance.
pub async fn create_transaction_endpoint(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserId>,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    let transaction = apply_transaction(user_id, new_transaction, &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}
