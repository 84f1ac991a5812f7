//! Launch a user command with secrets in its environment.

use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};

use eclipse_common::sanitized_env_with;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("command not found: {program}")]
    NotFound { program: String },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run `program` with `args`, inheriting stdio, and return its exit code.
///
/// The child gets the current environment plus `secrets`, with every
/// `*ECLIPSE*` variable removed.
pub async fn spawn_with_secrets(
    program: &str,
    args: &[String],
    secrets: &HashMap<String, String>,
) -> Result<i32, ShellError> {
    let env = sanitized_env_with(secrets);
    tracing::debug!(
        program,
        args = args.len(),
        injected = secrets.len(),
        "Spawning command"
    );

    let mut child = Command::new(program)
        .args(args)
        .env_clear()
        .envs(&env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ShellError::NotFound {
                program: program.to_string(),
            },
            _ => ShellError::Spawn {
                program: program.to_string(),
                source,
            },
        })?;

    let status = child.wait().await.map_err(|source| ShellError::Wait {
        program: program.to_string(),
        source,
    })?;
    let code = exit_code(status);
    tracing::debug!(program, code, "Command exited");
    Ok(code)
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
