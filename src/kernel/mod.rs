//! Kernel - the session adapter.
//!
//! The Kernel owns the one interpreter session for the life of the process
//! and turns each execute request into a wrapped command for it. It knows
//! nothing about sockets or message framing; the `ipc` layer supplies the
//! execution counter and an [`OutputSink`] for iopub.

pub mod execute;
pub mod info;

pub use execute::{
    wrap_code, ExecuteReply, ExecuteRequest, ExecutionError, KernelEvent, OutputSink, StreamName,
};
pub use info::{KernelInfo, LanguageInfo, PROTOCOL_VERSION};

use crate::repl::ReplSession;
use crate::types::Error;

/// Session state between cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// At the primary prompt.
    Ready,
    /// The interpreter died or stopped responding. There is no restart.
    Exited,
}

/// Session adapter over a single interpreter.
#[derive(Debug)]
pub struct Kernel<S> {
    session: S,
    state: SessionState,
}

impl<S: ReplSession> Kernel<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            state: SessionState::Ready,
        }
    }

    pub fn info(&self) -> KernelInfo {
        KernelInfo::mcore()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run one cell.
    ///
    /// `execution_count` is owned by the caller and echoed back. Unless the
    /// request is silent, the captured output goes to `sink` as a single
    /// stdout stream event. Interpreter failures become an error reply.
    pub fn execute(
        &mut self,
        request: &ExecuteRequest,
        execution_count: u32,
        sink: &mut dyn OutputSink,
    ) -> ExecuteReply {
        if request.allow_stdin {
            tracing::debug!("allow_stdin requested; interactive input is not supported");
        }

        if self.state == SessionState::Exited {
            let error = Error::repl_exited("the interpreter is no longer running");
            return self.fail(request, execution_count, &error, sink);
        }

        let result = self.session.run_command(&wrap_code(&request.code));

        match result {
            Ok(output) => {
                tracing::debug!(
                    execution_count,
                    output_bytes = output.len(),
                    "cell executed"
                );
                if !request.silent {
                    sink.emit(KernelEvent::Stream {
                        name: StreamName::Stdout,
                        text: output,
                    });
                }
                ExecuteReply::ok(execution_count)
            }
            Err(error) => {
                if error.is_fatal() {
                    self.state = SessionState::Exited;
                }
                tracing::error!(execution_count, error = %error, "cell execution failed");
                self.fail(request, execution_count, &error, sink)
            }
        }
    }

    fn fail(
        &self,
        request: &ExecuteRequest,
        execution_count: u32,
        error: &Error,
        sink: &mut dyn OutputSink,
    ) -> ExecuteReply {
        let details = ExecutionError::from(error);
        if !request.silent {
            sink.emit(KernelEvent::Error(details.clone()));
        }
        ExecuteReply::error(execution_count, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::MockReplSession;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn kernel_answering(output: &'static str) -> Kernel<MockReplSession> {
        let mut session = MockReplSession::new();
        session
            .expect_run_command()
            .returning(move |_| Ok(output.to_string()));
        Kernel::new(session)
    }

    #[test]
    fn test_execute_sends_wrapped_code() {
        let mut session = MockReplSession::new();
        session
            .expect_run_command()
            .withf(|command| command == ":{\n1 + 1\n:}")
            .times(1)
            .returning(|_| Ok("2\n".to_string()));
        let mut kernel = Kernel::new(session);

        let mut events = Vec::new();
        let reply = kernel.execute(&ExecuteRequest::new("1 + 1"), 1, &mut events);

        assert_eq!(reply, ExecuteReply::ok(1));
        assert_eq!(
            events,
            vec![KernelEvent::Stream {
                name: StreamName::Stdout,
                text: "2\n".to_string(),
            }]
        );
        assert_eq!(kernel.state(), SessionState::Ready);
    }

    #[test]
    fn test_silent_emits_nothing() {
        let mut kernel = kernel_answering("noise\n");
        let mut events = Vec::new();

        let reply = kernel.execute(&ExecuteRequest::new("x").silent(), 4, &mut events);

        assert!(reply.is_ok());
        assert_eq!(reply.execution_count(), 4);
        assert!(events.is_empty());
    }

    #[test]
    fn test_empty_output_still_streams_once() {
        let mut kernel = kernel_answering("");
        let mut events = Vec::new();

        kernel.execute(&ExecuteRequest::new("let x = 5"), 1, &mut events);

        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_timeout_becomes_error_reply() {
        let mut session = MockReplSession::new();
        session
            .expect_run_command()
            .returning(|_| Err(Error::timeout("no prompt after 30s")));
        let mut kernel = Kernel::new(session);
        let mut events = Vec::new();

        let reply = kernel.execute(&ExecuteRequest::new("loop"), 2, &mut events);

        match &reply {
            ExecuteReply::Error { ename, execution_count, .. } => {
                assert_eq!(ename, "ReplTimeout");
                assert_eq!(*execution_count, 2);
            }
            other => panic!("expected error reply, got {other:?}"),
        }
        assert!(matches!(events.as_slice(), [KernelEvent::Error(_)]));
        // The wrapper recovered from the timeout, so the session stays usable.
        assert_eq!(kernel.state(), SessionState::Ready);
    }

    #[test]
    fn test_exit_is_sticky() {
        let mut session = MockReplSession::new();
        session
            .expect_run_command()
            .times(1)
            .returning(|_| Err(Error::repl_exited("process exited with status 2")));
        let mut kernel = Kernel::new(session);
        let mut events = Vec::new();

        let first = kernel.execute(&ExecuteRequest::new("exit"), 1, &mut events);
        assert!(!first.is_ok());
        assert_eq!(kernel.state(), SessionState::Exited);

        // The session is not touched again (times(1) above).
        let second = kernel.execute(&ExecuteRequest::new("1").silent(), 1, &mut events);
        match second {
            ExecuteReply::Error { ename, .. } => assert_eq!(ename, "ReplExited"),
            other => panic!("expected error reply, got {other:?}"),
        }
        // Only the first, non-silent failure was published.
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_info_is_constant_across_executions() {
        let mut kernel = kernel_answering("ok\n");
        let before = kernel.info();
        let mut events = Vec::new();
        kernel.execute(&ExecuteRequest::new("1"), 1, &mut events);
        kernel.execute(&ExecuteRequest::new("2"), 2, &mut events);
        assert_eq!(kernel.info(), before);
    }

    proptest! {
        #[test]
        fn prop_wrapping_and_stream_text_are_exact(code in ".*", output in ".*", count in 1u32..10_000) {
            let expected = format!(":{{\n{code}\n:}}");
            let reply_text = output.clone();
            let mut session = MockReplSession::new();
            session
                .expect_run_command()
                .withf(move |command| command == expected)
                .times(1)
                .returning(move |_| Ok(reply_text.clone()));
            let mut kernel = Kernel::new(session);
            let mut events = Vec::new();

            let reply = kernel.execute(&ExecuteRequest::new(code), count, &mut events);

            prop_assert_eq!(reply, ExecuteReply::ok(count));
            prop_assert_eq!(events, vec![KernelEvent::Stream { name: StreamName::Stdout, text: output }]);
        }

        #[test]
        fn prop_silent_never_emits(code in ".*") {
            let mut kernel = kernel_answering("anything\n");
            let mut events = Vec::new();
            kernel.execute(&ExecuteRequest::new(code).silent(), 1, &mut events);
            prop_assert!(events.is_empty());
        }
    }
}
