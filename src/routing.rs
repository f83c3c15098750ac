//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::{
    AppState,
    account::initialize_account_endpoint,
    auth::{auth_guard, get_log_out, get_me, post_log_in},
    button::{list_buttons_endpoint, update_button_endpoint},
    endpoints,
    ledger::{create_transaction_endpoint, get_balance_endpoint, get_history_endpoint},
    settings::{get_settings_endpoint, update_settings_endpoint, verify_admin_code_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_health))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(endpoints::ME, get(get_me))
        .route(endpoints::INITIALIZE_ACCOUNT, post(initialize_account_endpoint))
        .route(endpoints::BALANCE, get(get_balance_endpoint))
        .route(endpoints::BALANCE_HISTORY, get(get_history_endpoint))
        .route(endpoints::TRANSACTIONS, post(create_transaction_endpoint))
        .route(
            endpoints::SETTINGS,
            get(get_settings_endpoint).put(update_settings_endpoint),
        )
        .route(endpoints::VERIFY_ADMIN_CODE, post(verify_admin_code_endpoint))
        .route(endpoints::BUTTONS, get(list_buttons_endpoint))
        .route(endpoints::BUTTON, put(update_button_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_not_found)
        .with_state(state)
}

/// Report that the server is up.
async fn get_health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// The JSON body served for routes that do not exist.
async fn get_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}
