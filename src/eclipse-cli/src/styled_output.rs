//! Styled CLI output.
//!
//! Messages carry an `[OK]`/`[ERROR]`/`[WARN]`/`[INFO]` tag and are colored
//! when writing to a terminal, unless `NO_COLOR` is set.
//!
//! ```
//! use eclipse_cli::styled_output::{print_success, print_warning};
//!
//! print_success("Secret created");
//! print_warning("No secrets found");
//! ```

use std::io::IsTerminal;

use eclipse_login::Notifier;

fn colors_disabled() -> bool {
    std::env::var("NO_COLOR")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

fn is_terminal_output(stderr: bool) -> bool {
    if stderr {
        std::io::stderr().is_terminal()
    } else {
        std::io::stdout().is_terminal()
    }
}

mod palette {
    pub const SUCCESS: &str = "\x1b[38;2;0;245;212m";
    pub const ERROR: &str = "\x1b[38;2;255;107;107m";
    pub const WARNING: &str = "\x1b[38;2;255;200;87m";
    pub const INFO: &str = "\x1b[38;2;72;202;228m";
    pub const DIM: &str = "\x1b[38;2;130;154;177m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

/// Message type for styled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Success,
    Error,
    Warning,
    Info,
    Dim,
}

impl MessageType {
    fn icon(&self) -> &'static str {
        match self {
            MessageType::Success => "[OK]",
            MessageType::Error => "[ERROR]",
            MessageType::Warning => "[WARN]",
            MessageType::Info => "[INFO]",
            MessageType::Dim => "-",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            MessageType::Success => palette::SUCCESS,
            MessageType::Error => palette::ERROR,
            MessageType::Warning => palette::WARNING,
            MessageType::Info => palette::INFO,
            MessageType::Dim => palette::DIM,
        }
    }
}

fn render(msg_type: MessageType, message: &str, use_colors: bool) -> String {
    if use_colors {
        format!(
            "{}{} {}{}",
            msg_type.color(),
            msg_type.icon(),
            message,
            palette::RESET
        )
    } else {
        format!("{} {}", msg_type.icon(), message)
    }
}

fn print_styled_internal(msg_type: MessageType, message: &str, to_stderr: bool) {
    let use_colors = !colors_disabled() && is_terminal_output(to_stderr);
    let formatted = render(msg_type, message, use_colors);
    if to_stderr {
        eprintln!("{formatted}");
    } else {
        println!("{formatted}");
    }
}

/// Print a success message to stderr.
pub fn print_success(message: &str) {
    print_styled_internal(MessageType::Success, message, true);
}

/// Print an error message to stderr.
pub fn print_error(message: &str) {
    print_styled_internal(MessageType::Error, message, true);
}

/// Print a warning message to stderr.
pub fn print_warning(message: &str) {
    print_styled_internal(MessageType::Warning, message, true);
}

/// Print an info message to stderr.
pub fn print_info(message: &str) {
    print_styled_internal(MessageType::Info, message, true);
}

/// Print a dimmed message to stderr.
pub fn print_dim(message: &str) {
    print_styled_internal(MessageType::Dim, message, true);
}

/// Format a message without printing it.
pub fn format_styled(msg_type: MessageType, message: &str) -> String {
    render(
        msg_type,
        message,
        !colors_disabled() && is_terminal_output(true),
    )
}

/// Bold text for headings, plain when colors are off.
pub fn bold(text: &str) -> String {
    if !colors_disabled() && is_terminal_output(false) {
        format!("{}{}{}", palette::BOLD, text, palette::RESET)
    } else {
        text.to_string()
    }
}

/// Routes login flow messages through the styled printers.
#[derive(Debug, Default, Clone, Copy)]
pub struct StyledNotifier;

impl Notifier for StyledNotifier {
    fn message(&self, text: &str) {
        print_info(text);
    }

    fn success(&self, text: &str) {
        print_success(text);
    }

    fn warning(&self, text: &str) {
        print_warning(text);
    }

    fn error(&self, text: &str) {
        print_error(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_message_type_icons() {
        assert_eq!(MessageType::Success.icon(), "[OK]");
        assert_eq!(MessageType::Error.icon(), "[ERROR]");
        assert_eq!(MessageType::Warning.icon(), "[WARN]");
        assert_eq!(MessageType::Info.icon(), "[INFO]");
        assert_eq!(MessageType::Dim.icon(), "-");
    }

    #[test]
    fn test_render_plain_and_colored() {
        assert_eq!(render(MessageType::Warning, "careful", false), "[WARN] careful");
        let colored = render(MessageType::Success, "done", true);
        assert!(colored.starts_with(palette::SUCCESS));
        assert!(colored.ends_with(palette::RESET));
        assert!(colored.contains("[OK] done"));
    }

    #[test]
    #[serial]
    fn test_colors_disabled() {
        // SAFETY: These tests run serially and we restore env vars immediately
        unsafe { std::env::set_var("NO_COLOR", "1") };
        assert!(colors_disabled());
        assert_eq!(format_styled(MessageType::Info, "x"), "[INFO] x");
        unsafe { std::env::remove_var("NO_COLOR") };

        unsafe { std::env::set_var("NO_COLOR", "false") };
        assert!(!colors_disabled());
        unsafe { std::env::remove_var("NO_COLOR") };

        unsafe { std::env::set_var("NO_COLOR", "") };
        assert!(!colors_disabled());
        unsafe { std::env::remove_var("NO_COLOR") };
    }
}
