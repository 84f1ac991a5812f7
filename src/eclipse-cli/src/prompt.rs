//! Line prompts on stdin.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

/// Ask for a line of input, falling back to `default` on an empty answer.
pub fn prompt_input<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: Option<&str>,
) -> Result<String> {
    match default {
        Some(d) if !d.is_empty() => write!(output, "{prompt} [{d}]: ")?,
        _ => write!(output, "{prompt}: ")?,
    }
    output.flush()?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read input")?;
    let answer = line.trim();

    if answer.is_empty() {
        if let Some(d) = default {
            return Ok(d.to_string());
        }
        if read == 0 {
            bail!("No input for {prompt:?}");
        }
    }
    Ok(answer.to_string())
}

/// Ask until a non-empty answer is given.
pub fn prompt_required<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: Option<&str>,
) -> Result<String> {
    loop {
        let answer = prompt_input(input, output, prompt, default)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
        writeln!(output, "A value is required.")?;
    }
}

/// `[y/N]` confirmation. Anything but `y`/`yes` is a no.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<bool> {
    write!(output, "{prompt} [y/N]: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// [`confirm`] on the process stdin/stdout.
pub fn confirm_stdin(prompt: &str) -> Result<bool> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    confirm(&mut stdin.lock(), &mut stdout, prompt)
}
