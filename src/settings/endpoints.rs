//! The route handlers for reading, updating and unlocking the admin panel
//! settings.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, Error, user::UserId};

use super::{
    AdminSettings, SettingsUpdate, get_settings, update_settings, verify_admin_code,
};

/// The state needed to manage admin settings.
#[derive(Clone)]
pub struct SettingsState {
    /// The database connection for the admin settings.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns the admin settings for the logged-in user.
///
/// Users without a settings row get the defaults.
pub async fn get_settings_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<AdminSettings>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    get_settings(user_id, &connection).map(Json)
}

/// A route handler that applies a partial update to the admin settings and
/// returns the updated settings.
pub async fn update_settings_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserId>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<AdminSettings>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    update_settings(user_id, update, &connection).map(Json)
}

/// The request body for admin code verification.
#[derive(Debug, Deserialize)]
pub struct VerifyCodeData {
    /// The admin code the client entered.
    pub code: String,
}

/// A route handler that checks an admin code against the stored one.
///
/// Responds with `{"valid": bool}`; a wrong code is a normal response, not
/// an error, so clients can show their own message.
pub async fn verify_admin_code_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserId>,
    Json(data): Json<VerifyCodeData>,
) -> Result<Json<serde_json::Value>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    let valid = verify_admin_code(user_id, &data.code, &connection)?;

    Ok(Json(json!({ "valid": valid })))
}

#[cfg(test)]
mod settings_endpoint_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        AppState,
        auth::AccessCode,
        endpoints,
        routing::build_router,
        settings::AdminSettings,
    };

    const ACCESS_CODE: &str = "acesso123";

    async fn get_logged_in_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection, "42", AccessCode::new(ACCESS_CODE)).unwrap();

        let mut server =
            TestServer::new(build_router(state)).expect("Could not create test server.");
        server.save_cookies();

        server
            .post(endpoints::LOG_IN)
            .json(&serde_json::json!({ "access_code": ACCESS_CODE }))
            .await
            .assert_status_ok();

        server
    }

    #[tokio::test]
    async fn get_settings_returns_initialized_row() {
        let server = get_logged_in_server().await;

        let response = server.get(endpoints::SETTINGS).await;

        response.assert_status_ok();
        let settings = response.json::<AdminSettings>();
        assert_eq!(settings.site_title, "Painel Premium");
        assert_eq!(settings.admin_code.len(), 8);
    }

    #[tokio::test]
    async fn update_settings_round_trips() {
        let server = get_logged_in_server().await;

        let response = server
            .put(endpoints::SETTINGS)
            .json(&serde_json::json!({
                "site_title": "Meu Banco",
                "primary_color": "#123456",
            }))
            .await;

        response.assert_status_ok();
        let settings = response.json::<AdminSettings>();
        assert_eq!(settings.site_title, "Meu Banco");
        assert_eq!(settings.primary_color, "#123456");

        let settings = server.get(endpoints::SETTINGS).await.json::<AdminSettings>();
        assert_eq!(settings.site_title, "Meu Banco");
    }

    #[tokio::test]
    async fn verify_code_accepts_the_stored_code_only() {
        let server = get_logged_in_server().await;

        let settings = server.get(endpoints::SETTINGS).await.json::<AdminSettings>();

        let response = server
            .post(endpoints::VERIFY_ADMIN_CODE)
            .json(&serde_json::json!({ "code": settings.admin_code }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["valid"], true);

        let response = server
            .post(endpoints::VERIFY_ADMIN_CODE)
            .json(&serde_json::json!({ "code": "wrong" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["valid"], false);
    }

    #[tokio::test]
    async fn settings_require_a_session() {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection, "42", AccessCode::new(ACCESS_CODE)).unwrap();
        let server = TestServer::new(build_router(state)).unwrap();

        server
            .get(endpoints::SETTINGS)
            .await
            .assert_status_unauthorized();
    }
}
