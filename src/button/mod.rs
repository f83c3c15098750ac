//! Customizable dashboard action buttons.

mod core;
mod endpoints;

pub use core::{
    ButtonUpdate, CustomButton, DEFAULT_BUTTON_ICON, create_button_table, ensure_default_buttons,
    list_buttons, update_button,
};
pub use endpoints::{ButtonState, list_buttons_endpoint, update_button_endpoint};
