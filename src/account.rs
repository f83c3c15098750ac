//! Account initialization: gives a user the rows the dashboard expects — a
//! zero balance, an admin-settings row, and the default action buttons.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    button::ensure_default_buttons,
    ledger::initialize_balance,
    settings::ensure_settings,
    user::UserId,
};

/// Derive an admin code for a newly initialized account.
///
/// Eight uppercase hex characters, matching the format users see in the
/// admin panel.
pub fn generate_admin_code(user_id: UserId) -> String {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    let digest = Sha512::digest(format!("{}:{nanos}", user_id.as_i64()));

    digest
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02X}"))
        .collect()
}

/// Create the account data for `user_id` if any of it is missing.
///
/// Idempotent: rows that already exist are left untouched, so a second call
/// changes nothing — in particular, an existing balance is never reset and
/// an existing admin code is kept. All inserts happen in one SQL
/// transaction.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred; nothing is
/// written in that case.
pub fn initialize_account(
    user_id: UserId,
    admin_code: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    initialize_balance(user_id, &sql_transaction)?;
    ensure_settings(user_id, admin_code, &sql_transaction)?;
    ensure_default_buttons(user_id, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(())
}

/// The state needed to initialize an account.
#[derive(Clone)]
pub struct InitializeAccountState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for InitializeAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that (re-)initializes the logged-in user's account data.
///
/// Safe to call any number of times.
pub async fn initialize_account_endpoint(
    State(state): State<InitializeAccountState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    initialize_account(user_id, &generate_admin_code(user_id), &connection)?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response())
}
