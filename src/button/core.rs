//! Customizable dashboard action buttons.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId, user::UserId};

/// The icon assigned to buttons that have not picked one.
pub const DEFAULT_BUTTON_ICON: &str = "Square";

/// An action button shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomButton {
    /// The ID of the button.
    pub id: DatabaseId,
    /// The user that owns this button.
    pub user_id: UserId,
    /// The machine name of the action, e.g. "transferencia".
    pub name: String,
    /// The label shown to the user, e.g. "Transferência".
    pub label: String,
    /// The name of the icon shown on the button.
    pub icon: String,
    /// Where the button appears relative to its siblings (ascending).
    pub display_order: i64,
    /// Whether the button is currently shown.
    pub is_active: bool,
}

/// A partial button update; `None` fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct ButtonUpdate {
    /// A new machine name.
    pub name: Option<String>,
    /// A new label.
    pub label: Option<String>,
    /// A new icon name.
    pub icon: Option<String>,
    /// A new position.
    pub display_order: Option<i64>,
}

/// Create the custom button table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_button_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS custom_button (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                label TEXT NOT NULL,
                icon TEXT NOT NULL DEFAULT 'Square',
                display_order INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

pub(crate) fn map_row_to_button(row: &Row) -> Result<CustomButton, rusqlite::Error> {
    Ok(CustomButton {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        label: row.get(3)?,
        icon: row.get(4)?,
        display_order: row.get(5)?,
        is_active: row.get(6)?,
    })
}

/// Get the buttons for `user_id`, ordered by display order then ID.
///
/// A user without buttons yields an empty vector.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn list_buttons(user_id: UserId, connection: &Connection) -> Result<Vec<CustomButton>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, label, icon, display_order, is_active
             FROM custom_button
             WHERE user_id = :user_id
             ORDER BY display_order, id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row_to_button)?
        .map(|maybe_button| maybe_button.map_err(|error| error.into()))
        .collect()
}

/// Apply a partial update to one of the buttons owned by `user_id`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if `button_id` does not refer to a button owned by
///   `user_id` (buttons of other users are reported as missing, not as
///   forbidden),
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_button(
    user_id: UserId,
    button_id: DatabaseId,
    update: ButtonUpdate,
    connection: &Connection,
) -> Result<CustomButton, Error> {
    let button = connection
        .prepare(
            "UPDATE custom_button SET
                name = COALESCE(?3, name),
                label = COALESCE(?4, label),
                icon = COALESCE(?5, icon),
                display_order = COALESCE(?6, display_order),
                updated_at = ?7
             WHERE id = ?1 AND user_id = ?2
             RETURNING id, user_id, name, label, icon, display_order, is_active",
        )?
        .query_row(
            params![
                button_id,
                user_id.as_i64(),
                update.name,
                update.label,
                update.icon,
                update.display_order,
                OffsetDateTime::now_utc(),
            ],
            map_row_to_button,
        )?;

    Ok(button)
}

/// Create the default action buttons for `user_id` if they have none.
///
/// A user that already has buttons (including fewer than the default three,
/// e.g. after deleting one by hand in the database) is left untouched.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn ensure_default_buttons(user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let button_count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM custom_button WHERE user_id = ?1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    if button_count > 0 {
        return Ok(());
    }

    let now = OffsetDateTime::now_utc();
    let default_buttons = [
        ("transferencia", "Transferência", 1),
        ("deposito", "Depósito", 2),
        ("saque", "Saque", 3),
    ];

    let mut statement = connection.prepare(
        "INSERT INTO custom_button (user_id, name, label, icon, display_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )?;

    for (name, label, display_order) in default_buttons {
        statement.execute(params![
            user_id.as_i64(),
            name,
            label,
            DEFAULT_BUTTON_ICON,
            display_order,
            now,
        ])?;
    }

    Ok(())
}

#[cfg(test)]
mod button_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        user::{UserId, upsert_user},
    };

    use super::{ButtonUpdate, ensure_default_buttons, list_buttons, update_button};

    fn get_db_connection_and_user() -> (Connection, UserId) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = upsert_user("quick-access", "Cliente", &connection).unwrap();

        (connection, user.id)
    }

    #[test]
    fn default_buttons_are_created_once() {
        let (connection, user_id) = get_db_connection_and_user();

        ensure_default_buttons(user_id, &connection).unwrap();
        ensure_default_buttons(user_id, &connection).unwrap();

        let buttons = list_buttons(user_id, &connection).unwrap();
        assert_eq!(buttons.len(), 3);
        assert_eq!(buttons[0].name, "transferencia");
        assert_eq!(buttons[0].display_order, 1);
        assert_eq!(buttons[2].label, "Saque");
        assert!(buttons.iter().all(|button| button.is_active));
        assert!(buttons.iter().all(|button| button.icon == "Square"));
    }

    #[test]
    fn list_is_ordered_by_display_order() {
        let (connection, user_id) = get_db_connection_and_user();
        ensure_default_buttons(user_id, &connection).unwrap();

        let buttons = list_buttons(user_id, &connection).unwrap();
        let first_id = buttons[0].id;

        // Move the first button to the end.
        update_button(
            user_id,
            first_id,
            ButtonUpdate {
                display_order: Some(9),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        let buttons = list_buttons(user_id, &connection).unwrap();
        assert_eq!(buttons[2].id, first_id);
    }

    #[test]
    fn update_changes_only_the_given_fields() {
        let (connection, user_id) = get_db_connection_and_user();
        ensure_default_buttons(user_id, &connection).unwrap();

        let button_id = list_buttons(user_id, &connection).unwrap()[0].id;

        let updated = update_button(
            user_id,
            button_id,
            ButtonUpdate {
                label: Some("PIX".to_owned()),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.label, "PIX");
        assert_eq!(updated.name, "transferencia");
        assert_eq!(updated.display_order, 1);
    }

    #[test]
    fn cannot_update_another_users_button() {
        let (connection, owner) = get_db_connection_and_user();
        ensure_default_buttons(owner, &connection).unwrap();
        let intruder = upsert_user("other-user", "Outro", &connection).unwrap().id;

        let button_id = list_buttons(owner, &connection).unwrap()[0].id;

        let result = update_button(
            intruder,
            button_id,
            ButtonUpdate {
                label: Some("hijacked".to_owned()),
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(result.unwrap_err(), Error::NotFound);

        let buttons = list_buttons(owner, &connection).unwrap();
        assert_eq!(buttons[0].label, "Transferência");
    }

    #[test]
    fn updating_a_missing_button_is_not_found() {
        let (connection, user_id) = get_db_connection_and_user();

        let result = update_button(user_id, 42, ButtonUpdate::default(), &connection);

        assert_eq!(result.unwrap_err(), Error::NotFound);
    }
}
