//! Authentication for the dashboard: the configuration-supplied quick-access
//! code, the encrypted session cookies, and the middleware that guards the
//! API routes.

mod access_code;
pub(crate) mod cookie;
mod log_in;
mod middleware;

pub use access_code::{AccessCode, secrets_match};
pub use log_in::{LogInData, LogInState, get_log_out, get_me, post_log_in};
pub use middleware::{AuthState, auth_guard};
