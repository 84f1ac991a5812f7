//! CLI styling for help output.

use clap::builder::styling::{AnsiColor, Effects, Styles};

pub fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Cyan.on_default())
        .invalid(AnsiColor::Yellow.on_default())
}

/// After-help section with examples and environment variables.
pub const AFTER_HELP: &str = color_print::cstr!(
    r#"<cyan,bold>EXAMPLES</>
    <green,bold>eclipse link</> <dim>my-project api</>       Tag this directory with a project
    <green,bold>eclipse i</> <dim>api/staging npm start</>    Run npm with the staging secrets of api
    <green,bold>eclipse ls</> <dim>api/staging</>             List the staging secrets of api
    <green,bold>eclipse a</> <dim>api/staging KEY VALUE</>    Create KEY under api/staging
    <green,bold>eclipse rm</> <dim>api/staging KEY</>         Delete KEY under api/staging
    <green,bold>eclipse env</> <dim>staging</>                Write .env.staging

<cyan,bold>ENVIRONMENT VARIABLES</>
    <yellow>ECLIPSE_API_URL</>      Base URL of the Eclipse API
    <yellow>ECLIPSE_CLI_KEY</>      Key for fetching the CLI configuration
    <yellow>ECLIPSE_LOG_LEVEL</>    Log verbosity (error, warn, info, debug, trace)
    <yellow>NO_COLOR</>             Disable colored output (set to '1' or 'true')"#
);
