//! Per-invocation settings resolved from flags and the environment.

use std::path::PathBuf;
use std::time::Duration;

use eclipse_login::LoginOptions;

use crate::cli::Cli;

/// Everything the command handlers need from the command line.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Overrides the API URL stored in the app config.
    pub api_url: Option<String>,
    pub cli_key: Option<String>,
    pub suppress_error: bool,
    pub login: LoginOptions,
    /// Directory holding `.eclipserc` and receiving `.env.<environment>`.
    pub work_dir: PathBuf,
}

impl CliConfig {
    pub fn from_cli(cli: &Cli, work_dir: PathBuf) -> Self {
        Self {
            api_url: non_empty(cli.api_url.as_deref()),
            cli_key: non_empty(cli.cli_key.as_deref()),
            suppress_error: cli.suppress_error,
            login: LoginOptions {
                timeout: cli.login_timeout.map(Duration::from_secs),
                open_browser: !cli.no_browser,
            },
            work_dir,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
