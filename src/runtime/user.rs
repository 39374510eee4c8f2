//! User interaction operations (confirmation prompts).

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

use super::RealRuntime;

/// Writes `prompt` followed by a `[y/N]` hint, then reads one answer.
///
/// Only "y" and "yes" (any case, surrounding whitespace ignored) confirm.
/// End of input counts as no.
pub(crate) fn ask_yes_no(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt).context("Failed to write prompt")?;
    output.flush().context("Failed to write prompt")?;

    let mut answer = String::new();
    if input.read_line(&mut answer).context("Failed to read answer")? == 0 {
        writeln!(output).ok();
        return Ok(false);
    }

    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

impl RealRuntime {
    pub(crate) fn confirm_impl(&self, prompt: &str) -> Result<bool> {
        ask_yes_no(prompt, &mut io::stdin().lock(), &mut io::stdout())
    }
}
