//! The route handlers for listing and updating the dashboard buttons.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;

use crate::{AppState, Error, database_id::DatabaseId, user::UserId};

use super::{ButtonUpdate, CustomButton, list_buttons, update_button};

/// The state needed to manage dashboard buttons.
#[derive(Clone)]
pub struct ButtonState {
    /// The database connection for the dashboard buttons.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ButtonState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns the logged-in user's buttons in display
/// order.
pub async fn list_buttons_endpoint(
    State(state): State<ButtonState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<CustomButton>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    list_buttons(user_id, &connection).map(Json)
}

/// A route handler that applies a partial update to one button and returns
/// the updated button.
///
/// Buttons belonging to other users are reported as 404.
pub async fn update_button_endpoint(
    State(state): State<ButtonState>,
    Extension(user_id): Extension<UserId>,
    Path(button_id): Path<DatabaseId>,
    Json(update): Json<ButtonUpdate>,
) -> Result<Json<CustomButton>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    update_button(user_id, button_id, update, &connection).map(Json)
}
