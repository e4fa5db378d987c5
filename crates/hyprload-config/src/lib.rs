//! Shared settings for the hyprload plugin manager.
//!
//! [`Settings`] is loaded through `ortho_config`, layering defaults, a
//! `.hyprload.toml` file, and `HYPRLOAD_*` environment variables. Fields are
//! optional so that every layer may leave a key unset; the accessor methods
//! resolve the defaults documented in [`defaults`].

pub mod defaults;
mod logging;
mod settings;

pub use defaults::{
    DEFAULT_LOG_FILTER, default_log_filter, default_log_format, default_root_path,
    default_user_config_path,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use settings::Settings;
