/*
 * execution_context.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use crossbeam::channel::bounded;
use crossbeam::channel::Sender;
use log::warn;
use serde_json::json;
use serde_json::Value;

use crate::error::Error;
use crate::language::cancellation::CancellationToken;
use crate::socket::iopub::IOPubMessage;
use crate::wire::display_data::DisplayData;
use crate::wire::header::JupyterHeader;
use crate::wire::input_request::InputRequest;
use crate::wire::input_request::ShellInputRequest;
use crate::wire::originator::Originator;
use crate::wire::stream::Stream;
use crate::wire::stream::StreamOutput;

/// Handed to [crate::language::interpreter::Interpreter::execute]. Everything
/// published through it is parented to the execute request being run.
pub struct ExecutionContext {
    originator: Originator,
    execution_count: u32,
    token: CancellationToken,
    iopub_tx: Sender<IOPubMessage>,

    /// `None` when the frontend did not allow stdin for this request
    input_request_tx: Option<Sender<ShellInputRequest>>,
}

impl ExecutionContext {
    pub fn new(
        originator: Originator,
        execution_count: u32,
        token: CancellationToken,
        iopub_tx: Sender<IOPubMessage>,
        input_request_tx: Option<Sender<ShellInputRequest>>,
    ) -> Self {
        Self {
            originator,
            execution_count,
            token,
            iopub_tx,
            input_request_tx,
        }
    }

    /// The execution count assigned to this execution
    pub fn execution_count(&self) -> u32 {
        self.execution_count
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Header of the execute request being run
    pub fn parent(&self) -> &JupyterHeader {
        &self.originator.header
    }

    pub fn stdout(&self, text: &str) {
        self.stream(Stream::Stdout, text)
    }

    pub fn stderr(&self, text: &str) {
        self.stream(Stream::Stderr, text)
    }

    /// Publishes stream output right away; nothing is buffered.
    pub fn stream(&self, name: Stream, text: &str) {
        self.publish(IOPubMessage::Stream(self.parent().clone(), StreamOutput {
            name,
            text: String::from(text),
        }));
    }

    /// Publishes a rich MIME bundle.
    pub fn display_data(&self, data: Value, metadata: Value) {
        self.publish(IOPubMessage::DisplayData(self.parent().clone(), DisplayData {
            data,
            metadata,
            transient: json!({}),
        }));
    }

    /// Prompts the frontend for a line of input and blocks until it answers.
    /// Fails with [Error::InputInterrupted] if the kernel is interrupted in
    /// the meantime.
    pub fn input(&self, prompt: &str, password: bool) -> crate::Result<String> {
        let input_request_tx = match &self.input_request_tx {
            Some(tx) => tx,
            None => return Err(Error::StdinNotAllowed),
        };

        if self.is_cancelled() {
            return Err(Error::InputInterrupted);
        }

        let (reply_tx, reply_rx) = bounded(1);
        input_request_tx.send(ShellInputRequest {
            originator: self.originator.clone(),
            request: InputRequest {
                prompt: String::from(prompt),
                password,
            },
            reply_tx,
        })?;

        match reply_rx.recv() {
            Ok(result) => result,
            Err(err) => Err(Error::ReceiveError(format!(
                "Could not receive input reply: {err}"
            ))),
        }
    }

    fn publish(&self, message: IOPubMessage) {
        if let Err(err) = self.iopub_tx.send(message) {
            warn!("Could not publish execution output: {err}");
        }
    }
}
