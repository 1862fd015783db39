/*
 * iopub.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::time::Duration;

use crossbeam::channel::bounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;
use crossbeam::select;
use log::debug;
use log::info;
use log::warn;

use crate::error::Error;
use crate::socket::socket::Socket;
use crate::wire::comm_close::CommClose;
use crate::wire::comm_msg::CommWireMsg;
use crate::wire::comm_open::CommOpen;
use crate::wire::display_data::DisplayData;
use crate::wire::execute_error::ExecuteError;
use crate::wire::execute_input::ExecuteInput;
use crate::wire::execute_result::ExecuteResult;
use crate::wire::header::JupyterHeader;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::ProtocolMessage;
use crate::wire::status::ExecutionState;
use crate::wire::status::KernelStatus;
use crate::wire::stream::StreamOutput;
use crate::wire::subscription_message::SubscriptionKind;
use crate::wire::subscription_message::SubscriptionMessage;

/// How often the XPUB socket is checked for subscriptions while no message
/// is waiting to be broadcast
const SUBSCRIPTION_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct IOPub {
    /// The underlying IOPub socket
    socket: Socket,

    /// A channel that receives IOPub messages from other threads
    receiver: Receiver<IOPubMessage>,

    /// Notified when a frontend subscribes. Messages broadcast before the
    /// first subscription are dropped by ZeroMQ.
    subscription_tx: Sender<()>,
}

/// Enumeration of all messages that can be delivered from the IOPub XPUB/SUB
/// socket. These messages generally are created on other threads and then sent
/// via a channel to the IOPub thread. Each carries the header of the request
/// it belongs to, which becomes the parent header on the wire.
#[derive(Debug)]
pub enum IOPubMessage {
    Status(Option<JupyterHeader>, ExecutionState),
    ExecuteInput(JupyterHeader, ExecuteInput),
    ExecuteResult(JupyterHeader, ExecuteResult),
    ExecuteError(JupyterHeader, ExecuteError),
    Stream(JupyterHeader, StreamOutput),
    DisplayData(JupyterHeader, DisplayData),
    CommOpen(Option<JupyterHeader>, CommOpen),
    CommMsg(Option<JupyterHeader>, CommWireMsg),
    CommClose(Option<JupyterHeader>, CommClose),

    /// Acknowledged once every message queued before it has been handed to
    /// the socket
    Flush(Sender<()>),
}

/// Waits until every message queued on `iopub_tx` so far has been handed to
/// the socket. Returns false if IOPub did not acknowledge in time.
pub fn flush(iopub_tx: &Sender<IOPubMessage>, timeout: Duration) -> bool {
    let (flush_tx, flush_rx) = bounded(1);
    if iopub_tx.send(IOPubMessage::Flush(flush_tx)).is_err() {
        warn!("Can't flush IOPub: the IOPub thread is gone");
        return false;
    }
    match flush_rx.recv_timeout(timeout) {
        Ok(()) => true,
        Err(err) => {
            warn!("IOPub flush was not acknowledged: {err}");
            false
        },
    }
}

impl IOPub {
    /// Create a new IOPub socket wrapper.
    ///
    /// * `socket` - The ZeroMQ socket that will deliver IOPub messages to
    ///   subscribed clients.
    /// * `receiver` - The receiver channel that will receive IOPub
    ///   messages from other threads.
    /// * `subscription_tx` - Notified of frontend subscriptions.
    pub fn new(
        socket: Socket,
        receiver: Receiver<IOPubMessage>,
        subscription_tx: Sender<()>,
    ) -> Self {
        Self {
            socket,
            receiver,
            subscription_tx,
        }
    }

    /// Listen for IOPub messages from other threads. Returns once every
    /// sender is gone.
    pub fn listen(&self) {
        loop {
            select! {
                recv(self.receiver) -> message => {
                    match message {
                        Ok(message) => {
                            if let Err(error) = self.process_message(message) {
                                warn!("Error delivering iopub message: {error}")
                            }
                        },
                        Err(_) => {
                            debug!("IOPub channel closed; stopping");
                            return;
                        },
                    }
                },
                default(SUBSCRIPTION_POLL_INTERVAL) => {},
            }

            self.process_subscriptions();
        }
    }

    /// Process an IOPub message from another thread.
    fn process_message(&self, message: IOPubMessage) -> Result<(), Error> {
        match message {
            IOPubMessage::Status(parent, execution_state) => {
                self.send_message_with_header(parent, KernelStatus { execution_state })
            },
            IOPubMessage::ExecuteInput(parent, msg) => self.send_message_with_header(Some(parent), msg),
            IOPubMessage::ExecuteResult(parent, msg) => {
                self.send_message_with_header(Some(parent), msg)
            },
            IOPubMessage::ExecuteError(parent, msg) => self.send_message_with_header(Some(parent), msg),
            IOPubMessage::Stream(parent, msg) => self.send_message_with_header(Some(parent), msg),
            IOPubMessage::DisplayData(parent, msg) => self.send_message_with_header(Some(parent), msg),
            IOPubMessage::CommOpen(parent, msg) => self.send_message_with_header(parent, msg),
            IOPubMessage::CommMsg(parent, msg) => self.send_message_with_header(parent, msg),
            IOPubMessage::CommClose(parent, msg) => self.send_message_with_header(parent, msg),
            IOPubMessage::Flush(flush_tx) => {
                // Messages are sent synchronously, so everything queued
                // before the flush is already on the socket
                if flush_tx.send(()).is_err() {
                    debug!("Flush requester went away before the acknowledgement");
                }
                Ok(())
            },
        }
    }

    /// Send a message using the underlying socket with the given content and
    /// parent header.
    fn send_message_with_header<T: ProtocolMessage>(
        &self,
        parent: Option<JupyterHeader>,
        content: T,
    ) -> Result<(), Error> {
        let msg = JupyterMessage::create(content, parent, &self.socket.session);
        msg.send(&self.socket)
    }

    /// Drain subscription notifications from the XPUB socket.
    fn process_subscriptions(&self) {
        loop {
            match self.socket.has_incoming_data() {
                Ok(true) => {},
                Ok(false) => return,
                Err(err) => {
                    warn!("Could not poll IOPub socket for subscriptions: {err}");
                    return;
                },
            }

            match SubscriptionMessage::read_from_socket(&self.socket) {
                Ok(msg) if msg.kind == SubscriptionKind::Subscribe => {
                    info!("IOPub subscription received: '{}'", msg.subscription);
                    // Only the first notification matters to the listener
                    let _ = self.subscription_tx.try_send(());
                },
                Ok(msg) => {
                    info!("IOPub unsubscription received: '{}'", msg.subscription);
                },
                Err(err) => {
                    warn!("Invalid IOPub subscription message: {err}");
                },
            }
        }
    }
}
