/*
 * channel.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

/// The five Jupyter channels of a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Channel {
    Shell,
    Control,
    Stdin,
    IOPub,
    Heartbeat,
}

impl Channel {
    /// The socket type the kernel side of the channel uses
    pub fn kernel_socket_type(&self) -> zmq::SocketType {
        match self {
            Channel::Shell | Channel::Control | Channel::Stdin => zmq::ROUTER,
            Channel::IOPub => zmq::XPUB,
            Channel::Heartbeat => zmq::REP,
        }
    }

    /// The socket type a frontend uses to talk to the channel
    pub fn frontend_socket_type(&self) -> zmq::SocketType {
        match self {
            Channel::Shell | Channel::Control | Channel::Stdin => zmq::DEALER,
            Channel::IOPub => zmq::SUB,
            Channel::Heartbeat => zmq::REQ,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::IOPub.to_string(), "IOPub");
        assert_eq!(Channel::Heartbeat.to_string(), "Heartbeat");
    }

    #[test]
    fn test_socket_types() {
        assert_eq!(Channel::Shell.kernel_socket_type(), zmq::ROUTER);
        assert_eq!(Channel::IOPub.kernel_socket_type(), zmq::XPUB);
        assert_eq!(Channel::IOPub.frontend_socket_type(), zmq::SUB);
        assert_eq!(Channel::Heartbeat.frontend_socket_type(), zmq::REQ);
    }
}
