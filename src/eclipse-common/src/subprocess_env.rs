//! Child process environment assembly.
//!
//! The child sees the parent's environment plus the injected secrets, minus
//! every variable that belongs to the CLI itself (API URL, CLI key, log level)
//! so internal credentials never reach the user's process.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};

/// Variables whose name contains this marker are internal to the CLI.
pub const NAMESPACE_MARKER: &str = "ECLIPSE";

/// Whether `name` belongs to the CLI's own namespace. Case-sensitive.
pub fn is_internal_env_var(name: &str) -> bool {
    name.contains(NAMESPACE_MARKER)
}

fn is_internal_os_var(name: &OsStr) -> bool {
    is_internal_env_var(&name.to_string_lossy())
}

/// Merge `secrets` over `base` and drop internal variables.
///
/// Secrets win over inherited values of the same name. Inherited entries
/// that are not valid UTF-8 pass through untouched.
pub fn merge_env<I, K, V>(base: I, secrets: &HashMap<String, String>) -> HashMap<OsString, OsString>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
{
    base.into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .chain(
            secrets
                .iter()
                .map(|(k, v)| (OsString::from(k), OsString::from(v))),
        )
        .filter(|(key, _)| !is_internal_os_var(key))
        .collect()
}

/// The current process environment merged with `secrets`, sanitized.
pub fn sanitized_env_with(secrets: &HashMap<String, String>) -> HashMap<OsString, OsString> {
    merge_env(std::env::vars_os(), secrets)
}
