//! CLI argument structures and parsing.

use clap::{Args, Parser, Subcommand};

use super::styles::{AFTER_HELP, get_styles};

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors (default)
    #[default]
    Warn,
    /// Show informational messages, warnings, and errors
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Color output mode for CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if output is a terminal
    #[default]
    Auto,
    /// Always output with colors
    Always,
    /// Never output with colors
    Never,
}

/// Eclipse - inject project secrets into processes at runtime
#[derive(Debug, Parser)]
#[command(name = "eclipse")]
#[command(author, version)]
#[command(about = "Eclipse - inject environment variables on runtime", long_about = None)]
#[command(styles = get_styles(), after_help = AFTER_HELP)]
pub struct Cli {
    /// Base URL of the Eclipse API
    #[arg(long = "api-url", global = true, env = "ECLIPSE_API_URL")]
    pub api_url: Option<String>,

    /// Key used to fetch the CLI configuration from the Eclipse API
    #[arg(
        long = "cli-key",
        global = true,
        env = "ECLIPSE_CLI_KEY",
        hide_env_values = true
    )]
    pub cli_key: Option<String>,

    /// Exit with status 0 even when the command fails
    #[arg(long = "suppress-error", visible_alias = "suppressError", global = true)]
    pub suppress_error: bool,

    /// Print the login URL instead of opening a browser
    #[arg(long = "no-browser", global = true)]
    pub no_browser: bool,

    /// Stop waiting for the login callback after this many seconds
    #[arg(long = "login-timeout", global = true, value_name = "SECONDS")]
    pub login_timeout: Option<u64>,

    /// Enable verbose output (debug logging)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Enable trace logging
    #[arg(long = "trace", global = true)]
    pub trace: bool,

    /// Log level for stderr output
    #[arg(long = "log-level", global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Write ALL trace-level logs to ./debug.txt
    #[arg(long = "debug", global = true, help_heading = "Debugging")]
    pub debug: bool,

    /// Control colored output
    #[arg(long = "color", global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in through the browser, replacing any cached session
    Login,

    /// Remove the cached session
    Logout,

    /// Show configuration and session state without logging in
    Status,

    /// Create or replace the CLI configuration
    Init(InitArgs),

    /// Delete the CLI configuration and the cached session
    Reset(ResetArgs),

    /// List the projects you have access to
    Projects(OutputArgs),

    /// Tag the working directory with a project (writes .eclipserc)
    Link(LinkArgs),

    /// Run a command with the secrets of component/environment injected
    #[command(visible_alias = "i")]
    Inject(InjectArgs),

    /// List the secrets of component/environment
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Create a secret under component/environment
    #[command(visible_alias = "a")]
    Add(AddArgs),

    /// Delete a secret under component/environment
    #[command(visible_alias = "rm")]
    Remove(RemoveArgs),

    /// Write the secrets of component/environment to .env.<environment>
    Env(TargetArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct InitArgs {
    /// Authorization server domain
    #[arg(long)]
    pub domain: Option<String>,

    /// OAuth client ID
    #[arg(long = "client-id")]
    pub client_id: Option<String>,

    /// Audience requested for the access token
    #[arg(long)]
    pub audience: Option<String>,

    /// Redirect URL registered with the authorization server
    #[arg(long = "callback-url")]
    pub callback_url: Option<String>,

    /// Port of the local callback server
    #[arg(long)]
    pub port: Option<u16>,

    /// Fetch the auth settings from the Eclipse API instead of prompting
    #[arg(long = "from-server")]
    pub from_server: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ResetArgs {
    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct LinkArgs {
    /// Project ID or name
    pub project: String,

    /// Default component for this directory
    pub component: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// `component/environment`, or just `environment` when .eclipserc names a component
    pub target: String,
}

#[derive(Debug, Clone, Args)]
pub struct InjectArgs {
    /// `component/environment`, or just `environment` when .eclipserc names a component
    pub target: String,

    /// Command to run, followed by its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// `component/environment`, or just `environment` when .eclipserc names a component
    pub target: String,

    /// Secret name
    pub name: String,

    /// Secret value
    pub value: String,
}

#[derive(Debug, Clone, Args)]
pub struct RemoveArgs {
    /// `component/environment`, or just `environment` when .eclipserc names a component
    pub target: String,

    /// Secret name
    pub name: String,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}
