//! ZeroMQ kernel server: socket setup and the per-channel request loops.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zeromq::{
    PubSocket, RepSocket, RouterSocket, Socket, SocketRecv, SocketSend, ZmqMessage,
};

use crate::ipc::codec::{self, Signer};
use crate::ipc::connection::ConnectionInfo;
use crate::ipc::message::Message;
use crate::ipc::publisher::{ExecutionState, Publisher};
use crate::ipc::router::{self, Channel, DispatchResponse, KernelContext};
use crate::kernel::Kernel;
use crate::repl::{Interrupter, ReplSession};
use crate::types::{Error, Result, SessionId};

/// Kernel server wrapping the session adapter.
#[derive(Debug)]
pub struct KernelServer<S> {
    connection: ConnectionInfo,
    kernel: Kernel<S>,
    interrupter: Option<Interrupter>,
    session: SessionId,
    cancel: CancellationToken,
}

impl<S: ReplSession + 'static> KernelServer<S> {
    pub fn new(connection: ConnectionInfo, kernel: Kernel<S>) -> Self {
        Self {
            connection,
            kernel,
            interrupter: None,
            session: SessionId::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Let `interrupt_request` reach the interpreter.
    pub fn with_interrupter(mut self, interrupter: Interrupter) -> Self {
        self.interrupter = Some(interrupter);
        self
    }

    /// Token that stops [`serve`](Self::serve) when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Bind all five sockets and serve until a shutdown request arrives or
    /// the cancellation token fires.
    pub async fn serve(self) -> Result<()> {
        let kernel = self.kernel;
        let signer = self.connection.signer();

        let mut shell = RouterSocket::new();
        shell.bind(&self.connection.endpoint(self.connection.shell_port)).await?;
        let mut control = RouterSocket::new();
        control.bind(&self.connection.endpoint(self.connection.control_port)).await?;
        // Input requests are unsupported; the socket is bound so frontends
        // can connect, and never read.
        let mut stdin = RouterSocket::new();
        stdin.bind(&self.connection.endpoint(self.connection.stdin_port)).await?;
        let mut iopub = PubSocket::new();
        iopub.bind(&self.connection.endpoint(self.connection.iopub_port)).await?;
        let mut heartbeat = RepSocket::new();
        heartbeat.bind(&self.connection.endpoint(self.connection.hb_port)).await?;

        tracing::info!(
            ip = %self.connection.ip,
            shell = self.connection.shell_port,
            iopub = self.connection.iopub_port,
            control = self.connection.control_port,
            hb = self.connection.hb_port,
            session = %self.session,
            "kernel listening"
        );

        let (iopub_tx, iopub_rx) = mpsc::unbounded_channel();
        let publisher = Publisher::new(iopub_tx, self.session.clone());
        publisher.status(None, ExecutionState::Starting);

        let ctx = Arc::new(KernelContext::new(
            kernel,
            self.interrupter.clone(),
            publisher,
        ));

        let iopub_task = tokio::spawn(run_iopub(iopub, iopub_rx, signer.clone()));
        let heartbeat_task = tokio::spawn(run_heartbeat(heartbeat, self.cancel.clone()));
        let control_task = tokio::spawn(serve_channel(
            control,
            Channel::Control,
            Arc::clone(&ctx),
            signer.clone(),
            self.cancel.clone(),
        ));

        let shell_result =
            serve_channel(shell, Channel::Shell, ctx, signer, self.cancel.clone()).await;
        self.cancel.cancel();

        let control_result = control_task
            .await
            .map_err(|e| Error::internal(format!("control loop failed: {}", e)))?;
        if let Err(e) = heartbeat_task.await {
            tracing::warn!("heartbeat task failed: {}", e);
        }
        // Drains once both loops have dropped their publishers.
        if let Err(e) = iopub_task.await {
            tracing::warn!("iopub task failed: {}", e);
        }
        drop(stdin);

        tracing::info!("kernel stopped");
        shell_result.and(control_result)
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }
}

/// Read requests from one ROUTER socket, dispatch, reply.
async fn serve_channel<S: ReplSession + 'static>(
    mut socket: RouterSocket,
    channel: Channel,
    ctx: Arc<KernelContext<S>>,
    signer: Signer,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv() => received?,
        };

        let request = match codec::decode(received.into_vec(), &signer) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(?channel, "dropping undecodable message: {}", e);
                continue;
            }
        };
        tracing::debug!(?channel, msg_type = request.msg_type(), "request");

        ctx.publisher
            .status(Some(&request.header), ExecutionState::Busy);
        let result = router::route_request(channel, &ctx, &request).await;

        let mut stop = false;
        match result {
            Ok(DispatchResponse::Reply { msg_type, content }) => {
                let reply = request.reply(&msg_type, ctx.publisher.session(), content);
                send(&mut socket, &reply, &signer).await?;
            }
            Ok(DispatchResponse::Shutdown { content }) => {
                let reply = request.reply("shutdown_reply", ctx.publisher.session(), content);
                send(&mut socket, &reply, &signer).await?;
                stop = true;
            }
            Ok(DispatchResponse::Ignored) => {}
            Err(e) => {
                tracing::error!(?channel, msg_type = request.msg_type(), "request failed: {}", e);
            }
        }
        ctx.publisher
            .status(Some(&request.header), ExecutionState::Idle);

        if stop {
            cancel.cancel();
            break;
        }
    }
    Ok(())
}

async fn send<T: SocketSend>(socket: &mut T, message: &Message, signer: &Signer) -> Result<()> {
    socket.send(to_zmq(codec::encode(message, signer)?)?).await?;
    Ok(())
}

fn to_zmq(frames: Vec<bytes::Bytes>) -> Result<ZmqMessage> {
    ZmqMessage::try_from(frames).map_err(|_| Error::protocol("cannot send an empty message"))
}

/// Owns the PUB socket; ends when every publisher is dropped.
async fn run_iopub(
    mut socket: PubSocket,
    mut rx: mpsc::UnboundedReceiver<Message>,
    signer: Signer,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = send(&mut socket, &message, &signer).await {
            tracing::warn!(msg_type = message.msg_type(), "iopub send failed: {}", e);
        }
    }
}

/// Echo every ping.
async fn run_heartbeat(mut socket: RepSocket, cancel: CancellationToken) {
    loop {
        let ping = tokio::select! {
            _ = cancel.cancelled() => break,
            ping = socket.recv() => ping,
        };
        let result = match ping {
            Ok(ping) => socket.send(ping).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!("heartbeat failed: {}", e);
            break;
        }
    }
}
