//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/buttons/{button_id}', use
//! [format_endpoint].

/// The root route, which reports that the server is up.
pub const ROOT: &str = "/";
/// The route for logging in with the quick-access code.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route for fetching the logged-in user.
pub const ME: &str = "/api/me";
/// The route for setting up the logged-in user's account defaults.
pub const INITIALIZE_ACCOUNT: &str = "/api/account/initialize";
/// The route for the logged-in user's balance.
pub const BALANCE: &str = "/api/balance";
/// The route for the logged-in user's transaction history.
pub const BALANCE_HISTORY: &str = "/api/balance/history";
/// The route for recording transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for the admin panel settings.
pub const SETTINGS: &str = "/api/settings";
/// The route for checking an admin code.
pub const VERIFY_ADMIN_CODE: &str = "/api/settings/verify_code";
/// The route for the dashboard buttons.
pub const BUTTONS: &str = "/api/buttons";
/// The route for updating a single dashboard button.
pub const BUTTON: &str = "/api/buttons/{button_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/buttons/{button_id}',
/// '{button_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
