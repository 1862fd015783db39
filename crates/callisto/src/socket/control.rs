/*
 * control.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;

use log::error;
use log::info;
use log::trace;
use log::warn;
use stdext::unwrap;

use crate::dispatcher::Dispatcher;
use crate::dispatcher::Flow;
use crate::error::ErrorKind;
use crate::socket::channel::Channel;
use crate::socket::socket::Socket;
use crate::wire::wire_message::WireMessage;

pub struct Control {
    socket: Socket,
    dispatcher: Arc<Dispatcher>,
}

impl Control {
    pub fn new(socket: Socket, dispatcher: Arc<Dispatcher>) -> Self {
        Self { socket, dispatcher }
    }

    /// Main loop for the Control thread; to be invoked by the kernel.
    /// Returns after a shutdown request has been answered.
    pub fn listen(&self) {
        loop {
            trace!("Waiting for control messages");

            let wire = unwrap!(WireMessage::read_from_socket(&self.socket), Err(err) => {
                match err.kind() {
                    ErrorKind::Authentication => {
                        warn!("Rejected control message with a bad signature: {err}")
                    },
                    ErrorKind::Transport => error!("Could not read from control socket: {err}"),
                    _ => warn!("Dropping malformed control message: {err}"),
                }
                continue;
            });

            if self.dispatcher.dispatch(wire, &self.socket, Channel::Control) == Flow::Shutdown {
                info!("Kernel shutdown handled; stopping control thread");
                break;
            }
        }
    }
}
