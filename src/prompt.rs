//! Confirmation prompts.

use anyhow::{Context, Result};
use cleanupkit::ConfirmCallback;
use std::io::{self, BufRead, IsTerminal, Write};

/// Pick a prompter for the current process: dialoguer on an attended
/// terminal, plain line reads otherwise.
pub fn stdin_prompter() -> Box<dyn ConfirmCallback> {
    if console::user_attended() && io::stdin().is_terminal() {
        Box::new(TerminalPrompter)
    } else {
        Box::new(LinePrompter::new(io::stdin().lock(), io::stderr()))
    }
}

/// Interactive `[y/N]` confirmation via dialoguer
pub struct TerminalPrompter;

impl ConfirmCallback for TerminalPrompter {
    fn confirm(&mut self, prompt: &str, auto_confirm: bool) -> Result<bool> {
        if auto_confirm {
            return Ok(true);
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }
}

/// Line-oriented confirmation over any reader/writer pair
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ConfirmCallback for LinePrompter<R, W> {
    /// `y`/`yes` confirm; empty, `n`, `no` or end of input decline.
    fn confirm(&mut self, prompt: &str, auto_confirm: bool) -> Result<bool> {
        if auto_confirm {
            return Ok(true);
        }

        loop {
            write!(self.output, "{prompt} [y/N]: ")?;
            self.output.flush()?;

            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .context("Failed to read confirmation")?;
            if read == 0 {
                writeln!(self.output)?;
                return Ok(false);
            }

            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "" | "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer yes or no.")?,
            }
        }
    }
}
