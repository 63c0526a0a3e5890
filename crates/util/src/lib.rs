//! Helpers shared by the flowwatch crates: configuration loading, the HTML
//! rendering boundary for log entries, and small text utilities used when
//! logging server-supplied content.

pub mod config;
pub mod markup;
pub mod text_processing;

pub use config::{CONFIG_PATH_ENV, ConfigError, default_config_path, load_config};
pub use markup::{render_entry_html, render_error_html};
pub use text_processing::{redact_sensitive, truncate_for_summary};
