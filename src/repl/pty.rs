//! Child process under a pseudo-terminal with exact-string expectation.

use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

use crate::types::{Error, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;
const CTRL_C: u8 = 0x03;

/// What to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtySpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub environment: Vec<(String, String)>,
}

/// A running child attached to the slave side of a pty.
///
/// Output is pumped by a reader thread into a channel; `expect_exact` pulls
/// from it into a local buffer until one of the requested strings appears.
pub struct PtyProcess {
    _master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    output: Receiver<Vec<u8>>,
    buffer: Vec<u8>,
    eof: bool,
}

impl std::fmt::Debug for PtyProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyProcess")
            .field("pid", &self.child.process_id())
            .field("buffered", &self.buffer.len())
            .field("eof", &self.eof)
            .finish()
    }
}

impl PtyProcess {
    pub fn spawn(spec: &PtySpawnSpec) -> Result<Self> {
        if spec.program.trim().is_empty() {
            return Err(Error::validation("PTY spawn program must not be empty"));
        }

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(pty_error)?;

        let mut command = CommandBuilder::new(&spec.program);
        for arg in &spec.args {
            command.arg(arg);
        }
        command.env("TERM", "dumb");
        for (key, value) in &spec.environment {
            command.env(key, value);
        }

        let child = pair.slave.spawn_command(command).map_err(pty_error)?;
        drop(pair.slave);

        let reader = match pair.master.try_clone_reader() {
            Ok(reader) => reader,
            Err(error) => {
                terminate_child(child);
                return Err(pty_error(error));
            }
        };
        let writer = match pair.master.take_writer() {
            Ok(writer) => writer,
            Err(error) => {
                terminate_child(child);
                return Err(pty_error(error));
            }
        };

        let (output_tx, output_rx) = mpsc::channel();
        spawn_read_loop(reader, output_tx);

        tracing::debug!(
            program = %spec.program,
            pid = ?child.process_id(),
            "spawned interpreter under pty"
        );

        Ok(Self {
            _master: pair.master,
            child,
            writer: Arc::new(Mutex::new(writer)),
            output: output_rx,
            buffer: Vec::new(),
            eof: false,
        })
    }

    /// Write `line` followed by a newline.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::internal("PTY writer lock poisoned"))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Handle that can deliver Ctrl-C while another thread is blocked in
    /// `expect_exact`.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            writer: Arc::clone(&self.writer),
        }
    }

    /// Block until one of `patterns` appears in the output.
    ///
    /// Returns the index of the pattern that matched and the text before it.
    /// The earliest match in the stream wins; ties go to the lower index.
    /// Everything up to the end of the match is consumed.
    pub fn expect_exact(
        &mut self,
        patterns: &[&str],
        timeout: Option<Duration>,
    ) -> Result<(usize, String)> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some((index, start, len)) = find_earliest(&self.buffer, patterns) {
                let before = String::from_utf8_lossy(&self.buffer[..start]).into_owned();
                self.buffer.drain(..start + len);
                return Ok((index, before));
            }

            if self.eof {
                return Err(Error::repl_exited(self.exit_description()));
            }

            if !self.receive(deadline) {
                return Err(Error::timeout(format!(
                    "no prompt after {:?}, waiting for {:?}",
                    timeout.unwrap_or_default(),
                    patterns
                )));
            }
        }
    }

    /// Consume `echo` if it is exactly what the terminal sends next.
    ///
    /// Returns `false`, leaving the buffer untouched, as soon as the output
    /// differs from `echo` or the stream ends.
    pub fn consume_echo(&mut self, echo: &[u8], timeout: Option<Duration>) -> Result<bool> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            match match_prefix(&self.buffer, echo) {
                PrefixMatch::Complete => {
                    self.buffer.drain(..echo.len());
                    return Ok(true);
                }
                PrefixMatch::Diverged => return Ok(false),
                PrefixMatch::Partial if self.eof => return Ok(false),
                PrefixMatch::Partial => {
                    if !self.receive(deadline) {
                        return Err(Error::timeout(format!(
                            "no echo after {:?}",
                            timeout.unwrap_or_default()
                        )));
                    }
                }
            }
        }
    }

    /// Throw away buffered and already received output. Returns the number
    /// of bytes dropped.
    pub fn discard_pending(&mut self) -> usize {
        let mut discarded = self.buffer.len();
        self.buffer.clear();
        loop {
            match self.output.try_recv() {
                Ok(chunk) => discarded += chunk.len(),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.eof = true;
                    break;
                }
            }
        }
        discarded
    }

    /// Wait for one chunk. Returns `false` once the deadline has passed.
    fn receive(&mut self, deadline: Option<Instant>) -> bool {
        let chunk = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match self.output.recv_timeout(remaining) {
                    Ok(chunk) => Some(chunk),
                    Err(RecvTimeoutError::Timeout) => return false,
                    Err(RecvTimeoutError::Disconnected) => None,
                }
            }
            None => self.output.recv().ok(),
        };

        match chunk {
            Some(chunk) => self.buffer.extend_from_slice(&chunk),
            None => self.eof = true,
        }
        true
    }

    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn exit_description(&mut self) -> String {
        match self.child.try_wait() {
            Ok(Some(status)) => format!("process exited with status {}", status.exit_code()),
            _ => "output stream closed".to_string(),
        }
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        if self.is_alive() {
            tracing::debug!(pid = ?self.child.process_id(), "terminating interpreter");
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Sends Ctrl-C to the pty; the line discipline turns it into SIGINT for the
/// foreground process.
#[derive(Clone)]
pub struct Interrupter {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl std::fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interrupter").finish_non_exhaustive()
    }
}

impl Interrupter {
    pub fn interrupt(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::internal("PTY writer lock poisoned"))?;
        writer.write_all(&[CTRL_C])?;
        writer.flush()?;
        Ok(())
    }
}

/// Earliest occurrence of any non-empty pattern: `(pattern index, start, len)`.
pub(crate) fn find_earliest(haystack: &[u8], patterns: &[&str]) -> Option<(usize, usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;
    for (index, pattern) in patterns.iter().enumerate() {
        let needle = pattern.as_bytes();
        if needle.is_empty() || needle.len() > haystack.len() {
            continue;
        }
        if let Some(start) = haystack.windows(needle.len()).position(|w| w == needle) {
            if best.map_or(true, |(_, best_start, _)| start < best_start) {
                best = Some((index, start, needle.len()));
            }
        }
    }
    best
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrefixMatch {
    /// `buffer` starts with all of `expected`.
    Complete,
    /// `buffer` is a proper prefix of `expected`.
    Partial,
    Diverged,
}

pub(crate) fn match_prefix(buffer: &[u8], expected: &[u8]) -> PrefixMatch {
    let n = buffer.len().min(expected.len());
    if buffer[..n] != expected[..n] {
        PrefixMatch::Diverged
    } else if n == expected.len() {
        PrefixMatch::Complete
    } else {
        PrefixMatch::Partial
    }
}

fn spawn_read_loop(mut reader: Box<dyn Read + Send>, output_tx: mpsc::Sender<Vec<u8>>) {
    std::thread::spawn(move || {
        let mut buffer = [0_u8; READ_CHUNK_SIZE];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => {
                    if output_tx.send(buffer[..read].to_vec()).is_err() {
                        break;
                    }
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                // Linux reports EIO on the master once the slave side closes.
                Err(_) => break,
            }
        }
    });
}

fn terminate_child(mut child: Box<dyn Child + Send + Sync>) {
    let _ = child.kill();
    let _ = child.wait();
}

fn pty_error(error: impl std::fmt::Display) -> Error {
    Error::pty(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_earliest_prefers_first_in_stream() {
        let found = find_earliest(b"abc | def>> ", &[">> ", " | "]);
        assert_eq!(found, Some((1, 3, 3)));
    }

    #[test]
    fn test_find_earliest_tie_goes_to_lower_index() {
        let found = find_earliest(b"out>> ", &[">> ", ">"]);
        assert_eq!(found, Some((0, 3, 3)));
    }

    #[test]
    fn test_find_earliest_none() {
        assert_eq!(find_earliest(b"still running", &[">> ", " | "]), None);
        assert_eq!(find_earliest(b"", &[">> "]), None);
        assert_eq!(find_earliest(b">> ", &[""]), None);
    }

    #[test]
    fn test_match_prefix() {
        assert_eq!(match_prefix(b"ls\r\nout", b"ls\r\n"), PrefixMatch::Complete);
        assert_eq!(match_prefix(b"ls\r\n", b"ls\r\n"), PrefixMatch::Complete);
        assert_eq!(match_prefix(b"ls", b"ls\r\n"), PrefixMatch::Partial);
        assert_eq!(match_prefix(b"", b"ls\r\n"), PrefixMatch::Partial);
        assert_eq!(match_prefix(b"lx", b"ls\r\n"), PrefixMatch::Diverged);
        assert_eq!(match_prefix(b">> ", b"ls\r\n"), PrefixMatch::Diverged);
    }

    #[test]
    fn test_spawn_rejects_empty_program() {
        let spec = PtySpawnSpec {
            program: "  ".to_string(),
            args: vec![],
            environment: vec![],
        };
        assert!(matches!(PtyProcess::spawn(&spec), Err(Error::Validation(_))));
    }

    #[test]
    fn test_spawn_missing_binary_fails() {
        let spec = PtySpawnSpec {
            program: "definitely-not-an-interpreter-4f1c".to_string(),
            args: vec![],
            environment: vec![],
        };
        assert!(matches!(PtyProcess::spawn(&spec), Err(Error::Pty(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_expect_reports_exit() {
        let spec = PtySpawnSpec {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "printf 'bye'".to_string()],
            environment: vec![],
        };
        let mut process = PtyProcess::spawn(&spec).unwrap();

        let (index, before) = process
            .expect_exact(&["bye"], Some(Duration::from_secs(10)))
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(before, "");

        let err = process
            .expect_exact(&[">> "], Some(Duration::from_secs(10)))
            .unwrap_err();
        assert!(matches!(err, Error::ReplExited(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_consume_echo_stops_at_divergence() {
        let spec = PtySpawnSpec {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "printf 'hello>> '".to_string()],
            environment: vec![],
        };
        let mut process = PtyProcess::spawn(&spec).unwrap();
        let wait = Some(Duration::from_secs(10));

        assert!(!process.consume_echo(b"help\r\n", wait).unwrap());
        assert!(process.consume_echo(b"hel", wait).unwrap());
        let (_, before) = process.expect_exact(&[">> "], wait).unwrap();
        assert_eq!(before, "lo");
    }

    #[cfg(unix)]
    #[test]
    fn test_discard_pending_drops_unread_output() {
        let spec = PtySpawnSpec {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "printf 'stale>> '; sleep 5".to_string()],
            environment: vec![],
        };
        let mut process = PtyProcess::spawn(&spec).unwrap();
        std::thread::sleep(Duration::from_millis(500));

        assert!(process.discard_pending() > 0);
        let err = process
            .expect_exact(&[">> "], Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
