//! The balance ledger: an append-only transaction history per user and the
//! running balance derived from it.
//!
//! The stored balance is maintained incrementally at write time so that
//! reads never re-sum the history. Every write goes through
//! [apply_transaction], which inserts the history record and bumps the
//! balance in a single SQL transaction; the two effects are never visible
//! separately.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId, user::UserId};

/// How many history entries are returned when the client does not ask for a
/// specific amount.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// The direction of a transaction.
///
/// Amounts are stored as positive magnitudes; the type carries the sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// A credit, increases the balance.
    Entrada,
    /// A debit, decreases the balance.
    Saida,
}

impl TransactionType {
    /// The string stored in the database for this transaction type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Entrada => "entrada",
            TransactionType::Saida => "saida",
        }
    }

    /// The sign applied to the amount when updating the balance.
    pub fn sign(&self) -> i64 {
        match self {
            TransactionType::Entrada => 1,
            TransactionType::Saida => -1,
        }
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrada" => Ok(TransactionType::Entrada),
            "saida" => Ok(TransactionType::Saida),
            other => Err(Error::InvalidTransactionType(other.to_owned())),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The settlement status of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// The transaction is awaiting settlement.
    Pendente,
    /// The transaction settled.
    Concluido,
    /// The transaction was cancelled.
    Cancelado,
}

impl TransactionStatus {
    /// The string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pendente => "pendente",
            TransactionStatus::Concluido => "concluido",
            TransactionStatus::Cancelado => "cancelado",
        }
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Concluido
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendente" => Ok(TransactionStatus::Pendente),
            "concluido" => Ok(TransactionStatus::Concluido),
            "cancelado" => Ok(TransactionStatus::Cancelado),
            other => Err(Error::InvalidTransactionStatus(other.to_owned())),
        }
    }
}

/// A single entry in a user's balance history.
///
/// Once written, a transaction is never edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction. Assigned in insertion order.
    pub id: DatabaseId,
    /// The user that owns this transaction.
    pub user_id: UserId,
    /// The magnitude of the transaction in minor currency units (cents).
    /// Always positive.
    pub amount: i64,
    /// Whether the transaction credits or debits the balance.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// A free-text description of the transaction.
    pub description: String,
    /// An optional external reference, e.g. a Pix key.
    pub reference: Option<String>,
    /// The settlement status of the transaction.
    pub status: TransactionStatus,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The data needed to record a new transaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTransaction {
    /// The magnitude of the transaction in minor currency units. Must be
    /// positive; the direction comes from `transaction_type`.
    pub amount: i64,
    /// Whether the transaction credits or debits the balance.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// A free-text description of the transaction.
    pub description: String,
    /// An optional external reference, e.g. a Pix key.
    #[serde(default)]
    pub reference: Option<String>,
}

/// Create the tables for the balance history and the per-user balance.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_ledger_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS balance_history (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
                amount INTEGER NOT NULL CHECK (amount > 0),
                type TEXT NOT NULL CHECK (type IN ('entrada', 'saida')),
                description TEXT NOT NULL,
                reference TEXT,
                status TEXT NOT NULL DEFAULT 'concluido',
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS balance_history_user_created
             ON balance_history (user_id, created_at)",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_balance (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL UNIQUE REFERENCES user(id) ON DELETE CASCADE,
                balance INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

pub(crate) fn map_row_to_transaction(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let type_string: String = row.get(3)?;
    let status_string: String = row.get(6)?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        amount: row.get(2)?,
        transaction_type: TransactionType::from_str(&type_string).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                error.to_string().into(),
            )
        })?,
        description: row.get(4)?,
        reference: row.get(5)?,
        status: TransactionStatus::from_str(&status_string).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                error.to_string().into(),
            )
        })?,
        created_at: row.get(7)?,
    })
}

/// Get the stored balance for `user_id` in minor currency units.
///
/// Returns zero when the user has no balance row yet; absence is not an
/// error.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_balance(user_id: UserId, connection: &Connection) -> Result<i64, Error> {
    let balance = connection
        .prepare("SELECT balance FROM user_balance WHERE user_id = :user_id")?
        .query_row(&[(":user_id", &user_id.as_i64())], |row| row.get(0));

    match balance {
        Ok(balance) => Ok(balance),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(error) => Err(error.into()),
    }
}

/// Get up to `limit` of the most recent transactions for `user_id`, newest
/// first.
///
/// Entries recorded at the same instant are ordered by ID, which matches
/// insertion order. A user with no transactions yields an empty vector.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_history(
    user_id: UserId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, type, description, reference, status, created_at
             FROM balance_history
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?
        .query_map(params![user_id.as_i64(), limit], map_row_to_transaction)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Record a transaction for `user_id` and update the stored balance.
///
/// The history insert and the balance update happen in a single SQL
/// transaction: after this function returns `Ok`, [get_balance] reflects the
/// new balance and [get_history] contains the new record; on any error,
/// neither does. A user without a balance row gets one, treating the prior
/// balance as zero. The balance change is expressed as an in-database
/// increment, so concurrent writers cannot lose an update by racing on a
/// stale read.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidAmount] if `new_transaction.amount` is not positive
///   (nothing is written),
/// - [Error::DatabaseUnavailable] if the database stayed locked past the
///   busy timeout,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn apply_transaction(
    user_id: UserId,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.amount <= 0 {
        return Err(Error::InvalidAmount(new_transaction.amount));
    }

    let created_at = OffsetDateTime::now_utc();
    let sql_transaction = connection.unchecked_transaction()?;

    let transaction = sql_transaction
        .prepare(
            "INSERT INTO balance_history
                (user_id, amount, type, description, reference, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, user_id, amount, type, description, reference, status, created_at",
        )?
        .query_row(
            params![
                user_id.as_i64(),
                new_transaction.amount,
                new_transaction.transaction_type.as_str(),
                new_transaction.description,
                new_transaction.reference,
                TransactionStatus::default().as_str(),
                created_at,
            ],
            map_row_to_transaction,
        )?;

    let delta = new_transaction.amount * new_transaction.transaction_type.sign();

    sql_transaction.execute(
        "INSERT INTO user_balance (user_id, balance, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                balance = balance + excluded.balance,
                updated_at = excluded.updated_at",
        params![user_id.as_i64(), delta, created_at],
    )?;

    sql_transaction.commit()?;

    Ok(transaction)
}

/// Create a zero balance row for `user_id` if none exists.
///
/// An existing balance is left untouched, so calling this for a user with
/// history never loses the accumulated balance.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn initialize_balance(user_id: UserId, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO user_balance (user_id, balance, updated_at)
             VALUES (?1, 0, ?2)
             ON CONFLICT(user_id) DO NOTHING",
        params![user_id.as_i64(), OffsetDateTime::now_utc()],
    )?;

    Ok(())
}

#[cfg(test)]
mod ledger_tests {
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        user::{UserId, upsert_user},
    };

    use super::{
        Error, NewTransaction, TransactionStatus, TransactionType, apply_transaction, get_balance,
        get_history, initialize_balance,
    };

    fn get_db_connection_and_user() -> (Connection, UserId) {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        let user = upsert_user("quick-access", "Cliente", &connection).unwrap();

        (connection, user.id)
    }

    fn deposit(amount: i64, description: &str) -> NewTransaction {
        NewTransaction {
            amount,
            transaction_type: TransactionType::Entrada,
            description: description.to_owned(),
            reference: None,
        }
    }

    fn withdrawal(amount: i64, description: &str) -> NewTransaction {
        NewTransaction {
            amount,
            transaction_type: TransactionType::Saida,
            description: description.to_owned(),
            reference: None,
        }
    }

    /// The stored balance must always equal the signed sum of the history.
    #[track_caller]
    fn assert_balance_matches_history(user_id: UserId, connection: &Connection) {
        let balance = get_balance(user_id, connection).unwrap();
        let history_sum: i64 = get_history(user_id, u32::MAX, connection)
            .unwrap()
            .iter()
            .map(|transaction| transaction.amount * transaction.transaction_type.sign())
            .sum();

        assert_eq!(
            balance, history_sum,
            "stored balance {balance} does not match history sum {history_sum}"
        );
    }

    #[test]
    fn balance_of_fresh_user_is_zero() {
        let (connection, user_id) = get_db_connection_and_user();

        initialize_balance(user_id, &connection).unwrap();

        assert_eq!(get_balance(user_id, &connection), Ok(0));
    }

    #[test]
    fn balance_of_unknown_user_is_zero_not_an_error() {
        let (connection, _) = get_db_connection_and_user();

        assert_eq!(get_balance(UserId::new(999), &connection), Ok(0));
    }

    #[test]
    fn history_of_unknown_user_is_empty() {
        let (connection, _) = get_db_connection_and_user();

        let history = get_history(UserId::new(999), 50, &connection).unwrap();

        assert!(history.is_empty());
    }

    #[test]
    fn deposit_increases_balance_and_is_recorded() {
        let (connection, user_id) = get_db_connection_and_user();

        let transaction =
            apply_transaction(user_id, deposit(10_000, "Depósito"), &connection).unwrap();

        assert_eq!(get_balance(user_id, &connection), Ok(10_000));
        assert_eq!(transaction.amount, 10_000);
        assert_eq!(transaction.transaction_type, TransactionType::Entrada);
        assert_eq!(transaction.status, TransactionStatus::Concluido);

        let history = get_history(user_id, 50, &connection).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], transaction);
        assert_balance_matches_history(user_id, &connection);
    }

    #[test]
    fn withdrawal_decreases_balance_and_orders_history_newest_first() {
        let (connection, user_id) = get_db_connection_and_user();

        apply_transaction(user_id, deposit(10_000, "Depósito"), &connection).unwrap();
        apply_transaction(user_id, withdrawal(3_000, "Saque"), &connection).unwrap();

        assert_eq!(get_balance(user_id, &connection), Ok(7_000));

        let history = get_history(user_id, 50, &connection).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].description, "Saque");
        assert_eq!(history[1].description, "Depósito");
        assert!(history[0].id > history[1].id);
        assert_balance_matches_history(user_id, &connection);
    }

    #[test]
    fn first_transaction_creates_balance_row() {
        let (connection, user_id) = get_db_connection_and_user();

        // No initialize_balance call: the prior balance is treated as zero.
        apply_transaction(user_id, withdrawal(2_500, "Saque"), &connection).unwrap();

        assert_eq!(get_balance(user_id, &connection), Ok(-2_500));
        assert_balance_matches_history(user_id, &connection);
    }

    #[test]
    fn rejects_non_positive_amounts_without_writing() {
        let (connection, user_id) = get_db_connection_and_user();

        let result = apply_transaction(user_id, deposit(-5, "x"), &connection);
        assert_eq!(result, Err(Error::InvalidAmount(-5)));

        let result = apply_transaction(user_id, deposit(0, "x"), &connection);
        assert_eq!(result, Err(Error::InvalidAmount(0)));

        assert_eq!(get_balance(user_id, &connection), Ok(0));
        assert!(get_history(user_id, 50, &connection).unwrap().is_empty());
    }

    #[test]
    fn failed_insert_leaves_balance_untouched() {
        let (connection, user_id) = get_db_connection_and_user();

        apply_transaction(user_id, deposit(1_000, "Depósito"), &connection).unwrap();

        // A transaction for an unknown user violates the foreign key and
        // must not leave a partial write behind.
        let result = apply_transaction(UserId::new(999), deposit(500, "x"), &connection);
        assert!(result.is_err());

        assert_eq!(get_balance(user_id, &connection), Ok(1_000));
        assert_eq!(get_balance(UserId::new(999), &connection), Ok(0));
        assert!(get_history(UserId::new(999), 50, &connection).unwrap().is_empty());
    }

    #[test]
    fn initialize_balance_is_idempotent() {
        let (connection, user_id) = get_db_connection_and_user();

        initialize_balance(user_id, &connection).unwrap();
        initialize_balance(user_id, &connection).unwrap();

        assert_eq!(get_balance(user_id, &connection), Ok(0));

        let balance_rows: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM user_balance WHERE user_id = ?1",
                [user_id.as_i64()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(balance_rows, 1);
    }

    #[test]
    fn initialize_balance_never_resets_an_existing_balance() {
        let (connection, user_id) = get_db_connection_and_user();

        apply_transaction(user_id, deposit(10_000, "Depósito"), &connection).unwrap();
        initialize_balance(user_id, &connection).unwrap();

        assert_eq!(get_balance(user_id, &connection), Ok(10_000));
        assert_balance_matches_history(user_id, &connection);
    }

    #[test]
    fn history_respects_limit() {
        let (connection, user_id) = get_db_connection_and_user();

        for n in 1..=5 {
            apply_transaction(user_id, deposit(n * 100, "Depósito"), &connection).unwrap();
        }

        let history = get_history(user_id, 3, &connection).unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].amount, 500);
        assert_eq!(history[2].amount, 300);
    }

    #[test]
    fn transactions_for_one_user_do_not_affect_another() {
        let (connection, first_user) = get_db_connection_and_user();
        let second_user = upsert_user("other-user", "Outro", &connection).unwrap().id;

        apply_transaction(first_user, deposit(5_000, "Depósito"), &connection).unwrap();
        apply_transaction(second_user, withdrawal(1_200, "Saque"), &connection).unwrap();

        assert_eq!(get_balance(first_user, &connection), Ok(5_000));
        assert_eq!(get_balance(second_user, &connection), Ok(-1_200));
        assert_eq!(get_history(first_user, 50, &connection).unwrap().len(), 1);
        assert_eq!(get_history(second_user, 50, &connection).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_transactions_do_not_lose_updates() {
        use std::sync::{Arc, Mutex};

        let (connection, user_id) = get_db_connection_and_user();
        let connection = Arc::new(Mutex::new(connection));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let connection = Arc::clone(&connection);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let new_transaction = if n % 2 == 0 {
                            deposit(100, "Depósito")
                        } else {
                            withdrawal(40, "Saque")
                        };

                        let guard = connection.lock().unwrap();
                        apply_transaction(user_id, new_transaction, &guard).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let guard = connection.lock().unwrap();
        // 4 threads deposit 25 * 100, 4 threads withdraw 25 * 40.
        assert_eq!(get_balance(user_id, &guard), Ok(4 * 25 * 100 - 4 * 25 * 40));
        assert_eq!(get_history(user_id, u32::MAX, &guard).unwrap().len(), 200);
        assert_balance_matches_history(user_id, &guard);
    }
}
