/*
 * heartbeat.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use log::trace;
use log::warn;

use crate::socket::socket::Socket;

/// Structure used for heartbeat messages
pub struct Heartbeat {
    socket: Socket,
}

impl Heartbeat {
    /// Create a new heartbeat handler from the given heartbeat socket
    pub fn new(socket: Socket) -> Self {
        Self { socket }
    }

    /// Listen for heartbeats and echo them back unchanged; does not return.
    /// Independent of everything else so that liveness is reported even
    /// while an execution is running.
    pub fn listen(&self) {
        loop {
            let frames = match self.socket.recv_multipart() {
                Ok(frames) => frames,
                Err(err) => {
                    warn!("Error receiving heartbeat: {err}");

                    // Wait 1s before trying to receive another heartbeat. This
                    // keeps us from flooding the logs when recv() isn't working.
                    std::thread::sleep(std::time::Duration::from_secs(1));
                    continue;
                },
            };
            trace!("Heartbeat message: {} frame(s)", frames.len());

            // Echo the message right back!
            if let Err(err) = self.socket.send_multipart(&frames) {
                warn!("Error replying to heartbeat: {err}");
            }
        }
    }
}
