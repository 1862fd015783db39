/*
 * stdin.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use crossbeam::channel::Receiver;
use crossbeam::select;
use log::debug;
use log::error;
use log::trace;
use log::warn;

use crate::error::Error;
use crate::socket::socket::Socket;
use crate::wire::input_request::ShellInputRequest;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::Message;

/// How long to block on the socket before checking for interrupts while
/// waiting for an `input_reply`
const REPLY_POLL_INTERVAL_MS: i64 = 50;

pub struct Stdin {
    /// The underlying ZeroMQ socket
    socket: Socket,

    /// Input requests from running executions
    input_request_rx: Receiver<ShellInputRequest>,

    /// Notified when the kernel is interrupted
    interrupt_rx: Receiver<()>,
}

impl Stdin {
    /// Create a new Stdin socket
    ///
    /// * `socket` - The underlying ZeroMQ socket
    /// * `input_request_rx` - Input requests to forward to the frontend
    /// * `interrupt_rx` - Interrupt notifications
    pub fn new(
        socket: Socket,
        input_request_rx: Receiver<ShellInputRequest>,
        interrupt_rx: Receiver<()>,
    ) -> Self {
        Self {
            socket,
            input_request_rx,
            interrupt_rx,
        }
    }

    /// Listens for input requests; forwards each one to the frontend and
    /// delivers the answer. Returns once the request channel is closed.
    pub fn listen(&self) {
        loop {
            // Interrupts are only meaningful while a reply is pending, so
            // they are consumed and dropped here
            let req = select! {
                recv(self.input_request_rx) -> msg => match msg {
                    Ok(req) => req,
                    Err(_) => {
                        debug!("Input request channel closed; stopping");
                        return;
                    },
                },
                recv(self.interrupt_rx) -> _ => continue,
            };

            let result = self.request_input(&req);
            if req.reply_tx.send(result).is_err() {
                warn!("Input was no longer awaited by the execution");
            }
        }
    }

    fn request_input(&self, req: &ShellInputRequest) -> crate::Result<String> {
        let msg = JupyterMessage::create_with_identity(
            req.originator.clone(),
            req.request.clone(),
            &self.socket.session,
        );
        msg.send(&self.socket)?;
        trace!("Sent input request to front end, waiting for input reply...");

        loop {
            if self.interrupt_rx.try_recv().is_ok() {
                debug!("Input request interrupted");
                return Err(Error::InputInterrupted);
            }

            match self.socket.poll_incoming(REPLY_POLL_INTERVAL_MS) {
                Ok(true) => {},
                Ok(false) => continue,
                Err(err) => return Err(Error::ZmqError(self.socket.name.clone(), err)),
            }

            // Only input replies are expected on this socket
            match Message::read_from_socket(&self.socket) {
                Ok(Message::InputReply(reply)) => {
                    trace!("Received input reply from front-end: {:?}", reply.content);
                    return Ok(reply.content.value);
                },
                Ok(message) => {
                    warn!("Received unexpected message on stdin socket: {message:?}");
                },
                Err(err) => {
                    error!("Could not read message from stdin socket: {err}");
                },
            }
        }
    }
}
