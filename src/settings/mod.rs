//! The admin panel settings: admin code, colors and site title.

mod core;
mod endpoints;

pub use core::{
    AdminSettings, DEFAULT_ACCENT_COLOR, DEFAULT_PRIMARY_COLOR, DEFAULT_SECONDARY_COLOR,
    DEFAULT_SITE_TITLE, SettingsUpdate, create_settings_table, ensure_settings, get_settings,
    update_settings, verify_admin_code,
};
pub use endpoints::{
    SettingsState, VerifyCodeData, get_settings_endpoint, update_settings_endpoint,
    verify_admin_code_endpoint,
};
