/*
 * shell.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;

use log::error;
use log::info;
use log::trace;
use log::warn;
use stdext::unwrap;
use stdext::ResultExt;

use crate::dispatcher::Dispatcher;
use crate::dispatcher::Flow;
use crate::error::ErrorKind;
use crate::socket::channel::Channel;
use crate::socket::socket::Socket;
use crate::wire::wire_message::WireMessage;

/// In-process endpoint over which the executor hands its replies to the
/// shell thread, the only thread allowed to use the shell socket
pub const SHELL_RELAY_ENDPOINT: &str = "inproc://callisto-shell-relay";

/// Wrapper for the Shell socket; receives requests from the frontend and
/// hands them to the dispatcher.
pub struct Shell {
    /// The ZeroMQ Shell socket
    socket: Socket,

    /// PAIR socket receiving fully formed replies from the executor
    relay: Socket,

    dispatcher: Arc<Dispatcher>,
}

impl Shell {
    /// Create a new Shell socket.
    ///
    /// * `socket` - The underlying ZeroMQ Shell socket
    /// * `relay` - The bound end of the executor's reply relay
    /// * `dispatcher` - Routes incoming requests
    pub fn new(socket: Socket, relay: Socket, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            socket,
            relay,
            dispatcher,
        }
    }

    /// Main loop for the Shell thread; to be invoked by the kernel.
    pub fn listen(&self) {
        loop {
            trace!("Waiting for shell messages");

            let (incoming, relayed) = {
                let mut items = [
                    self.socket.socket.as_poll_item(zmq::POLLIN),
                    self.relay.socket.as_poll_item(zmq::POLLIN),
                ];
                if let Err(err) = zmq::poll(&mut items, -1) {
                    error!("Could not poll shell sockets: {err}");
                    continue;
                }
                (items[0].is_readable(), items[1].is_readable())
            };

            if relayed {
                self.forward_reply();
            }

            if incoming && self.process_incoming() == Flow::Shutdown {
                // The interrupted execution's reply must still reach the
                // frontend
                self.dispatcher.wait_for_execution();
                while let Ok(true) = self.relay.has_incoming_data() {
                    self.forward_reply();
                }
                info!("Kernel is shutting down; stopping shell thread");
                return;
            }
        }
    }

    /// Sends a reply produced by the executor to the frontend, frames
    /// untouched.
    fn forward_reply(&self) {
        let frames = unwrap!(self.relay.recv_multipart(), Err(err) => {
            warn!("Could not read reply from the executor: {err}");
            return;
        });
        self.socket
            .send_multipart(&frames)
            .log_err("Could not deliver execute reply");
    }

    fn process_incoming(&self) -> Flow {
        match WireMessage::read_from_socket(&self.socket) {
            Ok(wire) => self.dispatcher.dispatch(wire, &self.socket, Channel::Shell),
            Err(err) => {
                match err.kind() {
                    ErrorKind::Authentication => {
                        warn!("Rejected shell message with a bad signature: {err}")
                    },
                    ErrorKind::Transport => error!("Could not read from shell socket: {err}"),
                    _ => warn!("Dropping malformed shell message: {err}"),
                }
                Flow::Continue
            },
        }
    }
}
