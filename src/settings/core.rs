//! Admin panel settings: the per-user admin code and the cosmetic options
//! (colors, site title) the dashboard renders with.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, auth::secrets_match, user::UserId};

/// The default primary color (hex).
pub const DEFAULT_PRIMARY_COLOR: &str = "#000000";
/// The default secondary color (hex).
pub const DEFAULT_SECONDARY_COLOR: &str = "#FFFFFF";
/// The default accent color (hex).
pub const DEFAULT_ACCENT_COLOR: &str = "#FF0000";
/// The default site title.
pub const DEFAULT_SITE_TITLE: &str = "Painel Premium";

/// The admin panel settings for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSettings {
    /// The code that unlocks the admin panel.
    pub admin_code: String,
    /// The primary UI color as a hex string.
    pub primary_color: String,
    /// The secondary UI color as a hex string.
    pub secondary_color: String,
    /// The accent UI color as a hex string.
    pub accent_color: String,
    /// The title shown in the dashboard header.
    pub site_title: String,
}

impl Default for AdminSettings {
    /// The settings presented before a user has an admin-settings row.
    ///
    /// The admin code is empty, which matches no input.
    fn default() -> Self {
        Self {
            admin_code: String::new(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_owned(),
            secondary_color: DEFAULT_SECONDARY_COLOR.to_owned(),
            accent_color: DEFAULT_ACCENT_COLOR.to_owned(),
            site_title: DEFAULT_SITE_TITLE.to_owned(),
        }
    }
}

/// A partial settings update; `None` fields keep their current value.
///
/// Updates are last-write-wins.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    /// A new admin code.
    pub admin_code: Option<String>,
    /// A new primary color.
    pub primary_color: Option<String>,
    /// A new secondary color.
    pub secondary_color: Option<String>,
    /// A new accent color.
    pub accent_color: Option<String>,
    /// A new site title.
    pub site_title: Option<String>,
}

/// Create the admin settings table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_settings_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS admin_settings (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL UNIQUE REFERENCES user(id) ON DELETE CASCADE,
                admin_code TEXT NOT NULL,
                primary_color TEXT NOT NULL DEFAULT '#000000',
                secondary_color TEXT NOT NULL DEFAULT '#FFFFFF',
                accent_color TEXT NOT NULL DEFAULT '#FF0000',
                site_title TEXT NOT NULL DEFAULT 'Painel Premium',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

pub(crate) fn map_row_to_settings(row: &Row) -> Result<AdminSettings, rusqlite::Error> {
    Ok(AdminSettings {
        admin_code: row.get(0)?,
        primary_color: row.get(1)?,
        secondary_color: row.get(2)?,
        accent_color: row.get(3)?,
        site_title: row.get(4)?,
    })
}

/// Get the admin settings for `user_id`.
///
/// A user without a settings row gets the defaults (with an empty admin
/// code); absence is not an error.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_settings(user_id: UserId, connection: &Connection) -> Result<AdminSettings, Error> {
    let settings = connection
        .prepare(
            "SELECT admin_code, primary_color, secondary_color, accent_color, site_title
             FROM admin_settings WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row_to_settings);

    match settings {
        Ok(settings) => Ok(settings),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(AdminSettings::default()),
        Err(error) => Err(error.into()),
    }
}

/// Create the settings row for `user_id` with `admin_code` and default
/// cosmetics, unless one already exists.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn ensure_settings(
    user_id: UserId,
    admin_code: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let now = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO admin_settings (user_id, admin_code, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO NOTHING",
        params![user_id.as_i64(), admin_code, now],
    )?;

    Ok(())
}

/// Apply a partial update to the settings of `user_id`.
///
/// Fields left as `None` keep their stored value. The last write wins.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the user has no settings row yet,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_settings(
    user_id: UserId,
    update: SettingsUpdate,
    connection: &Connection,
) -> Result<AdminSettings, Error> {
    let rows_changed = connection.execute(
        "UPDATE admin_settings SET
                admin_code = COALESCE(?2, admin_code),
                primary_color = COALESCE(?3, primary_color),
                secondary_color = COALESCE(?4, secondary_color),
                accent_color = COALESCE(?5, accent_color),
                site_title = COALESCE(?6, site_title),
                updated_at = ?7
             WHERE user_id = ?1",
        params![
            user_id.as_i64(),
            update.admin_code,
            update.primary_color,
            update.secondary_color,
            update.accent_color,
            update.site_title,
            OffsetDateTime::now_utc(),
        ],
    )?;

    if rows_changed == 0 {
        return Err(Error::NotFound);
    }

    get_settings(user_id, connection)
}

/// Check whether `code` matches the stored admin code for `user_id`.
///
/// A user without a settings row (or with the empty initial code) matches
/// nothing. The comparison does not leak where the strings differ.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn verify_admin_code(
    user_id: UserId,
    code: &str,
    connection: &Connection,
) -> Result<bool, Error> {
    let settings = get_settings(user_id, connection)?;

    if settings.admin_code.is_empty() {
        return Ok(false);
    }

    Ok(secrets_match(&settings.admin_code, code))
}
