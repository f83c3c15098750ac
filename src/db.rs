//! Database initialization for the application.
//!
//! Each feature module owns its `create_*_table` function; this module calls
//! them in dependency order inside a single SQL transaction and sets the
//! connection pragmas the application relies on.

use std::time::Duration;

use rusqlite::Connection;

use crate::{
    Error,
    button::create_button_table,
    ledger::create_ledger_tables,
    settings::create_settings_table,
    user::create_user_table,
};

/// How long a statement may wait on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create the tables for the domain models in the database.
///
/// Tables are only created if they do not already exist, so it is safe to
/// call this on every server start.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    connection.busy_timeout(BUSY_TIMEOUT)?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_ledger_tables(&transaction)?;
    create_settings_table(&transaction)?;
    create_button_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
