//! The quick-access log-in and log-out routes.
//!
//! A successful log-in upserts the quick-access user, makes sure their
//! account data (balance, settings, default buttons) exists, and sets the
//! encrypted session cookies.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    account::{generate_admin_code, initialize_account},
    auth::{
        AccessCode,
        cookie::{invalidate_auth_cookie, set_auth_cookie},
    },
    user::{User, UserId, get_user_by_id, upsert_user},
};

/// The well-known identity used for quick-access sessions.
const QUICK_ACCESS_OPEN_ID: &str = "quick-access";
/// The display name given to the quick-access user on first log-in.
const QUICK_ACCESS_NAME: &str = "Cliente Premium";

/// The state needed to perform a log-in.
#[derive(Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The configured quick-access code.
    pub access_code: AccessCode,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            access_code: state.access_code.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The request body for log-in requests.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    /// The quick-access code the client entered.
    pub access_code: String,
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in the auth cookies are set and the logged-in user is
/// returned as JSON. A wrong access code gets a 401 without touching the
/// database.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Json(log_in_data): Json<LogInData>,
) -> Result<Response, Error> {
    if !state.access_code.matches(&log_in_data.access_code) {
        tracing::debug!("rejected log-in with wrong access code");
        return Err(Error::InvalidCredentials);
    }

    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseUnavailable)?;

        let user = upsert_user(QUICK_ACCESS_OPEN_ID, QUICK_ACCESS_NAME, &connection)?;
        initialize_account(user.id, &generate_admin_code(user.id), &connection)?;

        user
    };

    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;

    tracing::info!("user {} logged in via quick access", user.id);

    Ok((jar, Json(user)).into_response())
}

/// Handler for log-out requests.
///
/// Always succeeds, even without a session; the cookies are cleared either
/// way.
pub async fn get_log_out(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);

    (jar, Json(serde_json::json!({ "success": true }))).into_response()
}

/// Returns the user the current session belongs to.
///
/// Used by clients to restore a session after a reload.
pub async fn get_me(
    State(state): State<LogInState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<User>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseUnavailable)?;

    get_user_by_id(user_id, &connection).map(Json)
}
