//! Authentication middleware that validates session cookies and extends
//! their sliding expiry.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use serde_json::json;
use time::Duration;

use crate::{
    AppState,
    auth::cookie::{get_user_id_from_cookies, set_auth_cookie},
};

/// The state needed for the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid authorization cookie.
///
/// On success the user ID is placed into the request extensions and the
/// session expiry is pushed out by the configured cookie duration. Route
/// handlers can use `Extension(user_id): Extension<UserId>` to receive the
/// user ID.
///
/// Requests without a valid session get a 401 JSON response.
pub async fn auth_guard(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Error getting cookie jar: {error:?}");
            return unauthorized();
        }
    };

    let user_id = match get_user_id_from_cookies(&jar) {
        Ok(user_id) => user_id,
        Err(error) => {
            tracing::debug!("Rejecting request without a valid session: {error}");
            return unauthorized();
        }
    };

    // Sliding expiry: an active session stays logged in.
    let jar = match set_auth_cookie(jar, user_id, state.cookie_duration) {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Could not refresh auth cookie: {error}");
            return unauthorized();
        }
    };

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);

    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    for (key, value) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, value.to_owned());
    }

    Response::from_parts(parts, body)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "authentication required" })),
    )
        .into_response()
}

#[cfg(test)]
mod auth_guard_tests {
    use axum::{
        Extension, Json, Router, extract::State, middleware, response::IntoResponse,
        routing::{get, post},
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use axum_test::TestServer;
    use sha2::Digest;
    use time::Duration;

    use crate::{
        auth::cookie::{COOKIE_EXPIRY, COOKIE_USER_ID, DEFAULT_COOKIE_DURATION, set_auth_cookie},
        user::UserId,
    };

    use super::{AuthState, auth_guard};

    async fn whoami(Extension(user_id): Extension<UserId>) -> impl IntoResponse {
        Json(user_id)
    }

    async fn stub_log_in_route(
        State(state): State<AuthState>,
        jar: PrivateCookieJar,
    ) -> PrivateCookieJar {
        set_auth_cookie(jar, UserId::new(1), state.cookie_duration).unwrap()
    }

    const TEST_LOG_IN_ROUTE: &str = "/log_in";
    const TEST_PROTECTED_ROUTE: &str = "/protected";

    fn get_test_server(cookie_duration: Duration) -> TestServer {
        let hash = sha2::Sha512::digest("nafstenoas");
        let state = AuthState {
            cookie_key: Key::from(&hash),
            cookie_duration,
        };

        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in_route))
            .with_state(state);

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn get_protected_route_with_valid_cookies() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server.post(TEST_LOG_IN_ROUTE).await;
        response.assert_status_ok();
        let cookies = response.cookies();

        let response = server.get(TEST_PROTECTED_ROUTE).add_cookies(cookies).await;

        response.assert_status_ok();
        assert_eq!(response.json::<UserId>(), UserId::new(1));
    }

    #[tokio::test]
    async fn get_protected_route_without_cookies_is_unauthorized() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        server
            .get(TEST_PROTECTED_ROUTE)
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn get_protected_route_with_expired_session_is_unauthorized() {
        let server = get_test_server(Duration::minutes(-5));

        let response = server.post(TEST_LOG_IN_ROUTE).await;
        let cookies = response.cookies();

        server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookies(cookies)
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn auth_guard_refreshes_session_cookies() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server.post(TEST_LOG_IN_ROUTE).await;
        let cookies = response.cookies();

        let response = server.get(TEST_PROTECTED_ROUTE).add_cookies(cookies).await;
        let refreshed = response.cookies();

        assert!(refreshed.get(COOKIE_USER_ID).is_some());
        assert!(refreshed.get(COOKIE_EXPIRY).is_some());
    }
}
