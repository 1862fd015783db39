/*
 * executor.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crossbeam::channel::bounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::RecvTimeoutError;
use crossbeam::channel::Sender;
use futures::executor::block_on;
use log::error;
use log::info;
use log::trace;
use log::warn;
use serde_json::json;
use serde_json::Value;
use stdext::spawn;
use stdext::ResultExt;

use crate::config::KernelConfig;
use crate::dispatcher::Flow;
use crate::history::History;
use crate::language::cancellation::CancellationToken;
use crate::language::execution_context::ExecutionContext;
use crate::language::interpreter::ExecuteFailure;
use crate::language::interpreter::ExecuteOutcome;
use crate::language::interpreter::Interpreter;
use crate::session_state::SessionState;
use crate::socket::iopub;
use crate::socket::iopub::IOPubMessage;
use crate::socket::socket::Socket;
use crate::wire::exception::Exception;
use crate::wire::execute_error::ExecuteError;
use crate::wire::execute_input::ExecuteInput;
use crate::wire::execute_reply::ExecuteReply;
use crate::wire::execute_reply_exception::ExecuteReplyException;
use crate::wire::execute_request::ExecuteRequest;
use crate::wire::execute_result::ExecuteResult;
use crate::wire::header::JupyterHeader;
use crate::wire::input_request::ShellInputRequest;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::Status;
use crate::wire::originator::Originator;
use crate::wire::status::ExecutionState;

/// An execute request waiting for the execution lane
pub struct ExecuteTask {
    pub request: JupyterMessage<ExecuteRequest>,
}

/// Runs queued execute requests one at a time, in arrival order.
pub struct Executor {
    interpreter: Arc<dyn Interpreter>,
    state: Arc<SessionState>,
    history: Arc<History>,

    /// Held while the interpreter runs code
    lane: Arc<Mutex<()>>,

    iopub_tx: Sender<IOPubMessage>,
    input_request_tx: Sender<ShellInputRequest>,

    /// PAIR socket connected to the shell thread, which forwards replies to
    /// the frontend
    reply_socket: Socket,

    receiver: Receiver<ExecuteTask>,

    execution_timeout: Option<Duration>,
    reply_flush_timeout: Duration,
}

type RunResult = Result<Result<ExecuteOutcome, ExecuteFailure>, String>;

impl Executor {
    pub fn new(
        interpreter: Arc<dyn Interpreter>,
        state: Arc<SessionState>,
        history: Arc<History>,
        lane: Arc<Mutex<()>>,
        iopub_tx: Sender<IOPubMessage>,
        input_request_tx: Sender<ShellInputRequest>,
        reply_socket: Socket,
        receiver: Receiver<ExecuteTask>,
        config: &KernelConfig,
    ) -> Self {
        Self {
            interpreter,
            state,
            history,
            lane,
            iopub_tx,
            input_request_tx,
            reply_socket,
            receiver,
            execution_timeout: config.execution_timeout,
            reply_flush_timeout: config.reply_flush_timeout,
        }
    }

    /// Runs execute requests until the queue is closed or the kernel shuts
    /// down. Requests still queued at shutdown are dropped unanswered.
    pub fn listen(&self) {
        for task in self.receiver.iter() {
            if self.execute(task.request) == Flow::Shutdown {
                let dropped = self.receiver.try_iter().count() + 1;
                info!("Kernel is shutting down; dropped {dropped} queued execute request(s)");
                return;
            }
        }
        info!("Execute queue closed; stopping executor");
    }

    fn execute(&self, request: JupyterMessage<ExecuteRequest>) -> Flow {
        let parent = request.header.clone();
        let req = &request.content;

        // Registered before busy is broadcast so an interrupt sent as soon
        // as the kernel looks busy always finds the execution
        let Some(token) = self.state.begin_execution(parent.clone()) else {
            return Flow::Shutdown;
        };
        trace!("Executing request '{}': {:?}", parent.msg_id, req.code);

        self.set_status(ExecutionState::Busy, &parent);

        let execution_count = if req.silent {
            self.state.execution_count()
        } else {
            self.state.next_execution_count()
        };

        if !req.silent {
            self.publish(IOPubMessage::ExecuteInput(parent.clone(), ExecuteInput {
                code: req.code.clone(),
                execution_count,
            }));
        }

        let watchdog = self
            .execution_timeout
            .map(|timeout| Watchdog::start(timeout, token.clone()));

        let input_request_tx = if req.allow_stdin {
            Some(self.input_request_tx.clone())
        } else {
            None
        };
        let context = ExecutionContext::new(
            Originator::from(&request),
            execution_count,
            token,
            self.iopub_tx.clone(),
            input_request_tx,
        );

        let result = self.run(req, &context);
        let timed_out = watchdog.map_or(false, Watchdog::finish);

        let result: Result<ExecuteOutcome, Exception> = match result {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(ExecuteFailure::Error(exception))) => Err(exception),
            Ok(Err(ExecuteFailure::Interrupted)) if timed_out => {
                let seconds = self.execution_timeout.unwrap_or_default().as_secs_f64();
                Err(Exception::timed_out(seconds))
            },
            Ok(Err(ExecuteFailure::Interrupted)) => Err(Exception::interrupted()),
            Err(message) => {
                error!("Interpreter panicked during execution: {message}");
                Err(Exception::internal_error(message))
            },
        };

        match &result {
            Ok(outcome) => {
                if let Some(data) = &outcome.data {
                    if !req.silent && !is_empty_bundle(data) {
                        self.publish(IOPubMessage::ExecuteResult(parent.clone(), ExecuteResult {
                            data: data.clone(),
                            execution_count,
                            metadata: outcome.metadata.clone(),
                        }));
                    }
                }
            },
            Err(exception) => {
                self.publish(IOPubMessage::ExecuteError(parent.clone(), ExecuteError {
                    exception: exception.clone(),
                }));
            },
        }

        if req.store_history && !req.silent {
            self.history.store(execution_count, &req.code);
        }

        self.set_status(ExecutionState::Idle, &parent);
        iopub::flush(&self.iopub_tx, self.reply_flush_timeout);

        let sent = match &result {
            Ok(outcome) => request.send_reply(
                ExecuteReply {
                    status: Status::Ok,
                    execution_count,
                    payload: outcome.payload.clone(),
                    user_expressions: outcome.user_expressions.clone(),
                },
                &self.reply_socket,
            ),
            Err(exception) => request.send_reply(
                ExecuteReplyException {
                    status: Status::Error,
                    execution_count,
                    exception: exception.clone(),
                },
                &self.reply_socket,
            ),
        };
        sent.log_err("Could not send execute_reply");

        if result.is_err() && req.stop_on_error && !req.silent {
            self.abort_queue();
        }

        // Ended only once answered, so a shutdown waiting on this execution
        // replies after it
        self.state.end_execution();
        Flow::Continue
    }

    /// Runs the interpreter on the execution lane. A panic is reported as
    /// `Err` with the panic message.
    fn run(&self, req: &ExecuteRequest, context: &ExecutionContext) -> RunResult {
        let _lane = self.lane.lock().unwrap_or_else(|err| err.into_inner());
        std::panic::catch_unwind(AssertUnwindSafe(|| {
            block_on(self.interpreter.execute(req, context))
        }))
        .map_err(panic_message)
    }

    /// Answers every queued execute request with an aborted reply without
    /// running it.
    fn abort_queue(&self) {
        while let Ok(task) = self.receiver.try_recv() {
            let request = task.request;
            info!(
                "Aborting queued execute request '{}' after an error",
                request.header.msg_id
            );

            self.set_status(ExecutionState::Busy, &request.header);
            self.set_status(ExecutionState::Idle, &request.header);
            iopub::flush(&self.iopub_tx, self.reply_flush_timeout);

            let reply = ExecuteReply {
                status: Status::Aborted,
                execution_count: self.state.execution_count(),
                payload: Vec::new(),
                user_expressions: json!({}),
            };
            request
                .send_reply(reply, &self.reply_socket)
                .log_err("Could not send aborted execute_reply");
        }
    }

    fn set_status(&self, status: ExecutionState, parent: &JupyterHeader) {
        if let Err(err) = self.state.set_status(status, Some(parent.clone())) {
            warn!("Could not broadcast '{status}' status: {err}");
        }
    }

    fn publish(&self, message: IOPubMessage) {
        if let Err(err) = self.iopub_tx.send(message) {
            warn!("Could not publish execution output: {err}");
        }
    }
}

fn is_empty_bundle(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("Interpreter panicked")
}

/// Cancels an execution that outlives the configured timeout
struct Watchdog {
    done_tx: Sender<()>,
    fired: Arc<AtomicBool>,
}

impl Watchdog {
    fn start(timeout: Duration, token: CancellationToken) -> Self {
        let (done_tx, done_rx) = bounded::<()>(1);
        let fired = Arc::new(AtomicBool::new(false));

        let fired_clone = fired.clone();
        spawn!("callisto-watchdog", move || {
            if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(timeout) {
                info!("Execution exceeded {timeout:?}; cancelling");
                fired_clone.store(true, Ordering::SeqCst);
                token.cancel();
            }
        });

        Self { done_tx, fired }
    }

    /// Stops the watchdog and returns whether it fired.
    fn finish(self) -> bool {
        let _ = self.done_tx.send(());
        self.fired.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bundles() {
        assert!(is_empty_bundle(&Value::Null));
        assert!(is_empty_bundle(&json!({})));
        assert!(!is_empty_bundle(&json!({"text/plain": "42"})));
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload), "boom");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 42)).unwrap_err();
        assert_eq!(panic_message(payload), "code 42");
    }

    #[test]
    fn test_watchdog_fires_after_timeout() {
        let token = CancellationToken::new();
        let watchdog = Watchdog::start(Duration::from_millis(20), token.clone());
        std::thread::sleep(Duration::from_millis(200));
        assert!(token.is_cancelled());
        assert!(watchdog.finish());
    }

    #[test]
    fn test_watchdog_stopped_in_time() {
        let token = CancellationToken::new();
        let watchdog = Watchdog::start(Duration::from_secs(10), token.clone());
        assert!(!watchdog.finish());
        assert!(!token.is_cancelled());
    }
}
