//! The route handlers for reading the balance and the transaction history.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, Error, user::UserId};

use super::{DEFAULT_HISTORY_LIMIT, Transaction, get_balance, get_history};

/// The state needed to read from the ledger.
#[derive(Clone)]
pub struct LedgerState {
    /// The database connection for the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LedgerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns the logged-in user's balance in minor
/// currency units.
///
/// Users without a balance row get zero; converting to display units is the
/// client's job.
pub async fn get_balance_endpoint(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    let balance = get_balance(user_id, &connection)?;

    Ok(Json(json!({ "balance": balance })))
}

/// The query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// How many entries to return, newest first.
    pub limit: Option<u32>,
}

/// A route handler that returns the most recent transactions for the
/// logged-in user, newest first.
pub async fn get_history_endpoint(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    get_history(user_id, limit, &connection).map(Json)
}
