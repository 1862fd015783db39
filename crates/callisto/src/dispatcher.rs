/*
 * dispatcher.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crossbeam::channel::Sender;
use futures::executor::block_on;
use log::debug;
use log::info;
use log::trace;
use log::warn;
use serde_json::json;
use stdext::debug_panic;
use stdext::unwrap;
use stdext::ResultExt;

use crate::comm::comm_manager::CommManager;
use crate::config::KernelConfig;
use crate::error::Error;
use crate::executor::ExecuteTask;
use crate::history::History;
use crate::language::interpreter::Interpreter;
use crate::session_state::SessionState;
use crate::socket::channel::Channel;
use crate::socket::iopub;
use crate::socket::iopub::IOPubMessage;
use crate::socket::socket::Socket;
use crate::wire::comm_close::CommClose;
use crate::wire::comm_info_reply::CommInfoReply;
use crate::wire::comm_info_request::CommInfoRequest;
use crate::wire::comm_open::CommOpen;
use crate::wire::error_reply::ErrorReply;
use crate::wire::exception::Exception;
use crate::wire::execute_reply::ExecuteReply;
use crate::wire::interrupt_reply::InterruptReply;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::Message;
use crate::wire::jupyter_message::ProtocolMessage;
use crate::wire::jupyter_message::Status;
use crate::wire::kernel_info_reply::KernelInfoReply;
use crate::wire::shutdown_reply::ShutdownReply;
use crate::wire::shutdown_request::ShutdownRequest;
use crate::wire::wire_message::WireMessage;

/// Whether the channel loop should keep reading after a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

/// Routes requests arriving on the shell and control channels. Execute
/// requests are queued for the executor; everything else is answered on the
/// calling thread.
pub struct Dispatcher {
    interpreter: Arc<dyn Interpreter>,
    state: Arc<SessionState>,
    history: Arc<History>,
    comm_manager: Arc<CommManager>,

    /// Shared with the executor; held by introspection requests when the
    /// interpreter cannot serve them during an execution
    lane: Arc<Mutex<()>>,

    execute_tx: Sender<ExecuteTask>,
    iopub_tx: Sender<IOPubMessage>,

    /// Wakes up a pending `input_request` on interrupt
    stdin_interrupt_tx: Sender<()>,

    /// Receives the request that shut the kernel down
    shutdown_tx: Sender<ShutdownRequest>,

    reply_flush_timeout: Duration,

    /// How long a shutdown waits for the running execution to be answered
    shutdown_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        interpreter: Arc<dyn Interpreter>,
        state: Arc<SessionState>,
        history: Arc<History>,
        comm_manager: Arc<CommManager>,
        lane: Arc<Mutex<()>>,
        execute_tx: Sender<ExecuteTask>,
        iopub_tx: Sender<IOPubMessage>,
        stdin_interrupt_tx: Sender<()>,
        shutdown_tx: Sender<ShutdownRequest>,
        config: &KernelConfig,
    ) -> Self {
        Self {
            interpreter,
            state,
            history,
            comm_manager,
            lane,
            execute_tx,
            iopub_tx,
            stdin_interrupt_tx,
            shutdown_tx,
            reply_flush_timeout: config.reply_flush_timeout,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// Handles one authenticated message received on `channel`. Replies are
    /// sent on `socket`. Once the kernel is shutting down nothing is
    /// answered anymore.
    pub fn dispatch(&self, wire: WireMessage, socket: &Socket, channel: Channel) -> Flow {
        if self.state.is_shutting_down() {
            info!(
                "Dropping '{}' message on {channel}: the kernel is shutting down",
                wire.message_type()
            );
            return Flow::Shutdown;
        }

        let msg = match Message::try_from(&wire) {
            Ok(msg) => msg,
            Err(Error::UnknownMessageType(kind)) => {
                self.handle_unknown(&wire, &kind, socket);
                return Flow::Continue;
            },
            Err(err) => {
                warn!(
                    "Dropping malformed '{}' message on {channel}: {err}",
                    wire.message_type()
                );
                return Flow::Continue;
            },
        };

        let result = match msg {
            Message::KernelInfoRequest(req) => self.handle_request(req, socket, |_| {
                self.with_lane(|| block_on(self.interpreter.kernel_info()))
                    .map(KernelInfoReply::from)
            }),
            Message::CompleteRequest(req) => self.handle_request(req, socket, |content| {
                self.with_lane(|| block_on(self.interpreter.complete(content)))
            }),
            Message::InspectRequest(req) => self.handle_request(req, socket, |content| {
                self.with_lane(|| block_on(self.interpreter.inspect(content)))
            }),
            Message::IsCompleteRequest(req) => self.handle_request(req, socket, |content| {
                self.with_lane(|| block_on(self.interpreter.is_complete(content)))
            }),
            Message::HistoryRequest(req) => self.handle_request(req, socket, |content| {
                self.history.process(content).map_err(Error::ShellErrorReply)
            }),
            Message::CommInfoRequest(req) => {
                self.handle_request(req, socket, |content| Ok(self.comm_info(content)))
            },
            Message::CommOpen(req) => self.handle_comm_open(req),
            Message::CommMsg(req) => {
                self.comm_manager.handle_msg(req.header, &req.content)
            },
            Message::CommClose(req) => {
                self.comm_manager.handle_close(req.header, &req.content)
            },
            Message::ExecuteRequest(req) => match channel {
                Channel::Shell => {
                    trace!("Queueing execute request '{}'", req.header.msg_id);
                    self.execute_tx
                        .send(ExecuteTask { request: req })
                        .map_err(Error::from)
                },
                _ => req.send_error::<ExecuteReply>(
                    Exception::internal_error(format!(
                        "execute_request is not accepted on the {channel} channel"
                    )),
                    socket,
                ),
            },
            Message::InterruptRequest(req) => {
                info!("Received interrupt request: {:?}", req.header.msg_id);
                self.interrupt();
                req.send_reply(InterruptReply { status: Status::Ok }, socket)
            },
            Message::ShutdownRequest(req) => {
                info!("Received shutdown request (restart = {})", req.content.restart);
                self.handle_shutdown(req, socket)
                    .log_err("Could not complete shutdown request");
                return Flow::Shutdown;
            },
            other => {
                warn!("{}", Error::UnsupportedMessage(format!("{other:?}"), channel.to_string()));
                Ok(())
            },
        };

        result.log_err(&format!("Could not handle {channel} message"));
        Flow::Continue
    }

    /// Blocks until the running execution, if any, has been answered.
    pub fn wait_for_execution(&self) -> bool {
        self.state.wait_for_execution(self.shutdown_timeout)
    }

    /// Wrapper for request handlers; sends the handler's reply, or an error
    /// reply of the same message type when it fails.
    fn handle_request<Req, Rep, Handler>(
        &self,
        req: JupyterMessage<Req>,
        socket: &Socket,
        handler: Handler,
    ) -> crate::Result<()>
    where
        Req: ProtocolMessage,
        Rep: ProtocolMessage,
        Handler: FnOnce(&Req) -> crate::Result<Rep>,
    {
        trace!("Received {} request: {:?}", socket.name, req.content);

        match handler(&req.content) {
            Ok(reply) => req.send_reply(reply, socket),
            Err(Error::ShellErrorReply(exception)) => req.send_error::<Rep>(exception, socket),
            Err(err) => {
                let exception = Exception::internal_error(format!("{err}"));
                req.send_error::<Rep>(exception, socket)
            },
        }
    }

    /// Runs an introspection call, waiting for the running execution first
    /// if the interpreter can't serve both at once.
    fn with_lane<T>(&self, f: impl FnOnce() -> T) -> T {
        if self.interpreter.supports_concurrent_introspection() {
            return f();
        }
        let _lane = self.lane.lock().unwrap_or_else(|err| err.into_inner());
        f()
    }

    fn comm_info(&self, req: &CommInfoRequest) -> CommInfoReply {
        CommInfoReply {
            status: Status::Ok,
            comms: self.comm_manager.comm_info(req.target_name.as_deref()),
        }
    }

    /// There is no error reply for `comm_open`; a comm that can't be opened
    /// is closed right away instead.
    fn handle_comm_open(&self, req: JupyterMessage<CommOpen>) -> crate::Result<()> {
        let Err(err) = self
            .comm_manager
            .handle_open(req.header.clone(), &req.content)
        else {
            return Ok(());
        };

        info!("Closing comm '{}': {err}", req.content.comm_id);
        let close = CommClose {
            comm_id: req.content.comm_id.clone(),
            data: json!({}),
        };
        self.iopub_tx
            .send(IOPubMessage::CommClose(Some(req.header), close))?;
        Ok(())
    }

    /// Replies with an error to requests of a type we don't know. Anything
    /// that is not a request is dropped.
    fn handle_unknown(&self, wire: &WireMessage, kind: &str, socket: &Socket) {
        let Some(prefix) = kind.strip_suffix("_request") else {
            warn!("Dropping unknown message type '{kind}' on {}", socket.name);
            return;
        };

        warn!("Received unknown request type '{kind}'");
        let content = ErrorReply {
            status: Status::Error,
            exception: Exception::unknown_request(kind),
        };
        let content = unwrap!(serde_json::to_value(content), Err(err) => {
            debug_panic!("Could not serialize error reply: {err}");
            return;
        });

        let reply = wire.create_reply(format!("{prefix}_reply"), content, &socket.session);
        reply
            .send(socket)
            .log_err(&format!("Could not reply to unknown request '{kind}'"));
    }

    fn interrupt(&self) {
        if !self.state.interrupt() {
            debug!("Interrupt requested while idle");
        }

        // Unblock a pending input request; a full buffer already carries an
        // interrupt
        let _ = self.stdin_interrupt_tx.try_send(());
    }

    fn handle_shutdown(
        &self,
        req: JupyterMessage<ShutdownRequest>,
        socket: &Socket,
    ) -> crate::Result<()> {
        let restart = req.content.restart;

        // Stops the executor from starting anything else, then lets the
        // running execution wind down and answer
        if self.state.begin_shutdown() {
            let _ = self.stdin_interrupt_tx.try_send(());
            if !self.state.wait_for_execution(self.shutdown_timeout) {
                warn!(
                    "Execution still running {:?} after shutdown request; shutting down anyway",
                    self.shutdown_timeout
                );
            }
        }

        let status = match block_on(self.interpreter.shutdown(restart)) {
            Ok(()) => Status::Ok,
            Err(err) => {
                warn!("Interpreter failed to shut down cleanly: {err}");
                Status::Error
            },
        };

        iopub::flush(&self.iopub_tx, self.reply_flush_timeout);
        req.send_reply(ShutdownReply { status, restart }, socket)?;
        self.shutdown_tx.send(req.content)?;
        Ok(())
    }
}
