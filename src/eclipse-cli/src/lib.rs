//! Eclipse CLI library.
//!
//! - `cli/` - argument parsing and command dispatch
//! - `api` - client for the Eclipse REST API
//! - `project_config` - the `.eclipserc` marker and `component/environment` targets
//! - `secrets` - tables, env maps and `.env.<environment>` files
//! - `shell` - running a command with secrets injected
//! - `styled_output` - themed terminal output

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod api;
pub mod cli;
pub mod config;
pub mod messages;
pub mod project_config;
pub mod prompt;
pub mod secrets;
pub mod shell;
pub mod styled_output;

static PANIC_HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install a panic hook that points at `--debug` after the default report.
pub fn install_panic_hook() {
    if PANIC_HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        original_hook(panic_info);
        eprintln!("\nEclipse crashed. Run again with --debug to write a trace log to ./debug.txt.");
    }));
}
