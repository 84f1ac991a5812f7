//! Common utilities shared across Eclipse CLI crates.

pub mod file_notation;
pub mod html;
pub mod http_client;
pub mod notation_file;
pub mod subprocess_env;

pub use file_notation::{
    Notation, NotationError, coerce_value, decode, encode, from_notation, to_notation,
};
pub use html::escape_html;
pub use http_client::{
    DEFAULT_TIMEOUT, USER_AGENT, create_client_builder, create_client_with_timeout,
    create_default_client,
};
pub use notation_file::NotationFile;
pub use subprocess_env::{NAMESPACE_MARKER, is_internal_env_var, merge_env, sanitized_env_with};
