//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Error;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The role of a user.
///
/// Every user the server creates is [Role::User]; [Role::Admin] is only ever
/// read back from the database. The column exists so an operator can promote
/// a user by hand, and so role checks can be added without a schema
/// migration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A regular user of the dashboard.
    User,
    /// An operator-promoted user. Currently grants nothing extra; reserved
    /// for role checks on the admin settings routes.
    Admin,
}

impl Role {
    /// The string stored in the database for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    fn from_column(value: &str, column: usize) -> Result<Self, rusqlite::Error> {
        match value {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                format!("unknown role \"{value}\"").into(),
            )),
        }
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The external identifier the user signed in with, unique per user.
    pub open_id: String,
    /// The display name shown on the dashboard.
    pub name: String,
    /// The user's role.
    pub role: Role,
    /// When the user row was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the user last signed in.
    #[serde(with = "time::serde::rfc3339")]
    pub last_signed_in: OffsetDateTime,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                open_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL,
                last_signed_in TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

pub(crate) fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    let role_string: String = row.get(3)?;

    Ok(User {
        id: UserId::new(row.get(0)?),
        open_id: row.get(1)?,
        name: row.get(2)?,
        role: Role::from_column(&role_string, 3)?,
        created_at: row.get(4)?,
        last_signed_in: row.get(5)?,
    })
}

/// Insert a user with `open_id`, or refresh the sign-in time of the existing
/// row with the same `open_id`.
///
/// The name is only set when the row is first created.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn upsert_user(open_id: &str, name: &str, connection: &Connection) -> Result<User, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(
            "INSERT INTO user (open_id, name, role, created_at, last_signed_in)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(open_id) DO UPDATE SET last_signed_in = excluded.last_signed_in
             RETURNING id, open_id, name, role, created_at, last_signed_in",
        )?
        .query_row(params![open_id, name, Role::User.as_str(), now], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a known user.
/// - there was an error trying to access the database.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, open_id, name, role, created_at, last_signed_in
             FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_row_to_user)
        .map_err(|error| error.into())
}
