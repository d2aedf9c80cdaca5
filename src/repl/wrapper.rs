//! Prompt-driven command runner on top of [`PtyProcess`].

use std::time::Duration;

use super::pty::{Interrupter, PtyProcess, PtySpawnSpec};
use super::ReplSession;
use crate::types::{Error, ReplConfig, Result};

const CONTINUATION: usize = 1;
const INTERRUPT_GRACE: Duration = Duration::from_secs(1);

/// Drives an interactive interpreter by its prompts.
///
/// Each line of a command is sent only after the interpreter has shown a
/// prompt for the previous one, so the text captured before each prompt
/// belongs to exactly one line.
#[derive(Debug)]
pub struct ReplWrapper {
    process: PtyProcess,
    prompt: String,
    continuation_prompt: String,
    timeout: Option<Duration>,
    strip_echo: bool,
}

impl ReplWrapper {
    /// Launch the configured interpreter and wait for its first prompt.
    pub fn spawn(config: &ReplConfig) -> Result<Self> {
        config.validate()?;
        let process = PtyProcess::spawn(&PtySpawnSpec {
            program: config.command.clone(),
            args: config.args.clone(),
            environment: config
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })?;
        Self::attach(process, config)
    }

    /// Wrap an already running process and wait for its first prompt.
    pub fn attach(process: PtyProcess, config: &ReplConfig) -> Result<Self> {
        let mut wrapper = Self {
            process,
            prompt: config.prompt.clone(),
            continuation_prompt: config.continuation_prompt.clone(),
            timeout: config.timeout,
            strip_echo: config.strip_echo,
        };
        let (_, banner) = wrapper.expect_prompt(wrapper.timeout)?;
        tracing::debug!(banner = %banner.trim_end(), "interpreter ready");
        Ok(wrapper)
    }

    pub fn interrupter(&self) -> Interrupter {
        self.process.interrupter()
    }

    fn expect_prompt(&mut self, timeout: Option<Duration>) -> Result<(usize, String)> {
        let patterns = [self.prompt.as_str(), self.continuation_prompt.as_str()];
        self.process.expect_exact(&patterns, timeout)
    }

    /// Send one line and swallow the terminal's echo of it, so text in the
    /// line that looks like a prompt is never matched as one.
    fn send_line(&mut self, line: &str) -> Result<()> {
        self.process.send_line(line)?;
        if self.strip_echo {
            let echo = format!("{}\r\n", line);
            if !self.process.consume_echo(echo.as_bytes(), self.timeout)? {
                tracing::trace!(line, "sent line was not echoed verbatim");
            }
        }
        Ok(())
    }

    fn run_lines(&mut self, lines: &[&str], command: &str) -> Result<String> {
        let mut output = String::new();
        for (i, &line) in lines.iter().enumerate() {
            self.send_line(line)?;
            let (index, before) = self.expect_prompt(self.timeout)?;
            output.push_str(&before.replace("\r\n", "\n"));

            if i + 1 == lines.len() && index == CONTINUATION {
                tracing::warn!("interpreter left waiting for more input, sending interrupt");
                if let Err(e) = self.interrupt_and_resync() {
                    tracing::debug!(error = %e, "no prompt after interrupt");
                }
                return Err(Error::incomplete_input(command));
            }
        }
        Ok(output)
    }

    /// Ctrl-C, then wait for the primary prompt and drop whatever trails it.
    fn interrupt_and_resync(&mut self) -> Result<()> {
        self.process.interrupter().interrupt()?;
        self.process
            .expect_exact(&[self.prompt.as_str()], Some(INTERRUPT_GRACE))?;
        self.process.discard_pending();
        Ok(())
    }
}

impl ReplSession for ReplWrapper {
    fn run_command(&mut self, command: &str) -> Result<String> {
        let lines = split_command(command);
        if lines.is_empty() {
            return Err(Error::validation("no command was given"));
        }

        // Late output of an interrupted command, or the extra prompt printed
        // after an idle interrupt, belongs to no one.
        let stale = self.process.discard_pending();
        if stale > 0 {
            tracing::debug!(bytes = stale, "discarded output from before this command");
        }

        match self.run_lines(&lines, command) {
            Err(Error::Timeout(reason)) => {
                tracing::warn!(%reason, "command timed out, sending interrupt");
                match self.interrupt_and_resync() {
                    Ok(()) => Err(Error::Timeout(reason)),
                    Err(e) => Err(Error::repl_exited(format!(
                        "interpreter unresponsive after timeout ({}): {}",
                        reason, e
                    ))),
                }
            }
            other => other,
        }
    }
}

/// Split on newlines; a trailing newline yields a final empty line.
fn split_command(command: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = command.lines().collect();
    if command.ends_with('\n') {
        lines.push("");
    }
    lines
}
