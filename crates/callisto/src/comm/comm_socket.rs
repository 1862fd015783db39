/*
 * comm_socket.rs
 *
 * Copyright (C) 2023 Posit Software, PBC. All rights reserved.
 *
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;
use serde_json::json;
use serde_json::Value;

use crate::socket::iopub::IOPubMessage;
use crate::wire::comm_close::CommClose;
use crate::wire::comm_msg::CommWireMsg;
use crate::wire::header::JupyterHeader;

/// A message delivered to the kernel's end of a comm
#[derive(Debug, Clone, PartialEq)]
pub enum CommMsg {
    /// Data sent by the frontend
    Data(Value),

    /// The frontend closed the comm; carries the data of its `comm_close`
    Close(Value),
}

/// Describes which side opened a comm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommInitiator {
    FrontEnd,
    BackEnd,
}

/// Header of the last frontend message seen on a comm; outgoing messages
/// are parented to it
pub(crate) type CommParent = Arc<Mutex<Option<JupyterHeader>>>;

/// Book-keeping for one open comm
pub(crate) struct OpenComm {
    pub target_name: String,
    pub incoming_tx: Sender<CommMsg>,
    pub parent: CommParent,
}

/// Every open comm, keyed by comm ID
#[derive(Clone, Default)]
pub(crate) struct OpenComms(Arc<Mutex<HashMap<String, OpenComm>>>);

impl OpenComms {
    pub fn lock(&self) -> MutexGuard<'_, HashMap<String, OpenComm>> {
        self.0.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/**
 * The kernel's end of an open comm.
 *
 * Messages from the frontend arrive on `incoming_rx`; the owner of the
 * socket is expected to drain it on a thread of its own. `send()` and
 * `close()` reach the frontend over IOPub.
 */
#[derive(Clone)]
pub struct CommSocket {
    /// The comm's unique identifier
    pub comm_id: String,

    /// The target the comm was opened with
    pub target_name: String,

    pub initiator: CommInitiator,

    /// Messages sent by the frontend, in arrival order
    pub incoming_rx: Receiver<CommMsg>,

    parent: CommParent,
    iopub_tx: Sender<IOPubMessage>,
    open_comms: OpenComms,
}

impl CommSocket {
    pub(crate) fn new(
        comm_id: String,
        target_name: String,
        initiator: CommInitiator,
        parent: Option<JupyterHeader>,
        iopub_tx: Sender<IOPubMessage>,
        open_comms: OpenComms,
    ) -> Self {
        let (incoming_tx, incoming_rx) = crossbeam::channel::unbounded();
        let parent = Arc::new(Mutex::new(parent));

        open_comms.lock().insert(comm_id.clone(), OpenComm {
            target_name: target_name.clone(),
            incoming_tx,
            parent: parent.clone(),
        });

        Self {
            comm_id,
            target_name,
            initiator,
            incoming_rx,
            parent,
            iopub_tx,
            open_comms,
        }
    }

    /// Sends data to the frontend, parented to the last message the frontend
    /// sent on this comm.
    pub fn send(&self, data: Value) -> crate::Result<()> {
        let msg = CommWireMsg {
            comm_id: self.comm_id.clone(),
            data,
        };
        self.iopub_tx.send(IOPubMessage::CommMsg(self.parent(), msg))?;
        Ok(())
    }

    /// Closes the comm from the kernel side. Does nothing if the comm is
    /// already closed.
    pub fn close(&self) -> crate::Result<()> {
        if self.open_comms.lock().remove(&self.comm_id).is_none() {
            return Ok(());
        }
        let msg = CommClose {
            comm_id: self.comm_id.clone(),
            data: json!({}),
        };
        self.iopub_tx.send(IOPubMessage::CommClose(self.parent(), msg))?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open_comms.lock().contains_key(&self.comm_id)
    }

    fn parent(&self) -> Option<JupyterHeader> {
        self.parent
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}
