/*
 * comm_manager.rs
 *
 * Copyright (C) 2023 Posit Software, PBC. All rights reserved.
 *
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crossbeam::channel::Sender;
use log::info;
use log::warn;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use uuid::Uuid;

use crate::comm::comm_socket::CommInitiator;
use crate::comm::comm_socket::CommMsg;
use crate::comm::comm_socket::CommSocket;
use crate::comm::comm_socket::OpenComms;
use crate::error::Error;
use crate::socket::iopub::IOPubMessage;
use crate::wire::comm_close::CommClose;
use crate::wire::comm_msg::CommWireMsg;
use crate::wire::comm_open::CommOpen;
use crate::wire::header::JupyterHeader;

/// Accepts the comms the frontend opens for a given target name.
pub trait CommTarget: Send + Sync {
    /// Called when the frontend opens a comm for this target, with the data
    /// of its `comm_open`. Returning an error refuses the comm, which is
    /// then closed.
    fn open(&self, comm: CommSocket, data: &Value) -> crate::Result<()>;
}

impl<F> CommTarget for F
where
    F: Fn(CommSocket, &Value) -> crate::Result<()> + Send + Sync,
{
    fn open(&self, comm: CommSocket, data: &Value) -> crate::Result<()> {
        self(comm, data)
    }
}

/// Registry of comm targets and of the comms currently open.
pub struct CommManager {
    targets: Mutex<HashMap<String, Arc<dyn CommTarget>>>,
    open_comms: OpenComms,
    iopub_tx: Sender<IOPubMessage>,
}

impl CommManager {
    pub fn new(iopub_tx: Sender<IOPubMessage>) -> Self {
        Self {
            targets: Mutex::new(HashMap::new()),
            open_comms: OpenComms::default(),
            iopub_tx,
        }
    }

    fn targets(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn CommTarget>>> {
        self.targets.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Registers `target` under `name`, replacing any previous target of
    /// that name. Comms already open are not affected.
    pub fn register_target(&self, name: &str, target: impl CommTarget + 'static) {
        info!("Registering comm target '{name}'");
        self.targets().insert(String::from(name), Arc::new(target));
    }

    /// Returns false if no target was registered under `name`.
    pub fn unregister_target(&self, name: &str) -> bool {
        self.targets().remove(name).is_some()
    }

    /// Opens a comm from the kernel side and announces it to the frontend.
    pub fn open_comm(&self, target_name: &str, data: Value) -> crate::Result<CommSocket> {
        let comm = CommSocket::new(
            Uuid::new_v4().to_string(),
            String::from(target_name),
            CommInitiator::BackEnd,
            None,
            self.iopub_tx.clone(),
            self.open_comms.clone(),
        );
        let msg = CommOpen {
            comm_id: comm.comm_id.clone(),
            target_name: String::from(target_name),
            data,
        };
        self.iopub_tx.send(IOPubMessage::CommOpen(None, msg))?;
        Ok(comm)
    }

    /// Hands a comm opened by the frontend to its target.
    pub fn handle_open(&self, header: JupyterHeader, msg: &CommOpen) -> crate::Result<()> {
        // Released before the target runs so it may register targets itself
        let target = self.targets().get(&msg.target_name).cloned();
        let Some(target) = target else {
            return Err(Error::UnknownCommTarget(msg.target_name.clone()));
        };

        if self.open_comms.lock().contains_key(&msg.comm_id) {
            return Err(crate::anyhow!("Comm '{}' is already open", msg.comm_id));
        }

        let comm = CommSocket::new(
            msg.comm_id.clone(),
            msg.target_name.clone(),
            CommInitiator::FrontEnd,
            Some(header),
            self.iopub_tx.clone(),
            self.open_comms.clone(),
        );
        if let Err(err) = target.open(comm, &msg.data) {
            self.open_comms.lock().remove(&msg.comm_id);
            return Err(err);
        }

        info!(
            "Opened comm '{}' for target '{}'",
            msg.comm_id, msg.target_name
        );
        Ok(())
    }

    /// Delivers a frontend message to the comm it is addressed to.
    pub fn handle_msg(&self, header: JupyterHeader, msg: &CommWireMsg) -> crate::Result<()> {
        let open_comms = self.open_comms.lock();
        let Some(comm) = open_comms.get(&msg.comm_id) else {
            return Err(Error::UnknownComm(msg.comm_id.clone()));
        };

        *comm.parent.lock().unwrap_or_else(|err| err.into_inner()) = Some(header);
        comm.incoming_tx.send(CommMsg::Data(msg.data.clone()))?;
        Ok(())
    }

    /// Forgets a comm the frontend closed and notifies its owner.
    pub fn handle_close(&self, header: JupyterHeader, msg: &CommClose) -> crate::Result<()> {
        let Some(comm) = self.open_comms.lock().remove(&msg.comm_id) else {
            return Err(Error::UnknownComm(msg.comm_id.clone()));
        };

        *comm.parent.lock().unwrap_or_else(|err| err.into_inner()) = Some(header);
        if comm.incoming_tx.send(CommMsg::Close(msg.data.clone())).is_err() {
            warn!("Owner of comm '{}' went away before it was closed", msg.comm_id);
        }
        Ok(())
    }

    /// Open comms as listed in a `comm_info_reply`, optionally restricted to
    /// one target.
    pub fn comm_info(&self, target_name: Option<&str>) -> Map<String, Value> {
        self.open_comms
            .lock()
            .iter()
            .filter(|(_, comm)| target_name.map_or(true, |name| comm.target_name == name))
            .map(|(comm_id, comm)| {
                (comm_id.clone(), json!({ "target_name": comm.target_name }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use crossbeam::channel::unbounded;
    use crossbeam::channel::Receiver;

    use super::*;

    fn header(msg_type: &str) -> JupyterHeader {
        JupyterHeader::create(
            String::from(msg_type),
            String::from("session"),
            String::from("user"),
        )
    }

    fn comm_open(comm_id: &str, target_name: &str) -> CommOpen {
        CommOpen {
            comm_id: String::from(comm_id),
            target_name: String::from(target_name),
            data: json!({}),
        }
    }

    /// Registers a target that hands every opened comm to the returned
    /// receiver.
    fn capture_target(manager: &CommManager, name: &str) -> Receiver<CommSocket> {
        let (comm_tx, comm_rx) = unbounded();
        manager.register_target(name, move |comm: CommSocket, _data: &Value| -> crate::Result<()> {
            comm_tx.send(comm)?;
            Ok(())
        });
        comm_rx
    }

    #[test]
    fn test_frontend_comm_lifecycle() {
        let (iopub_tx, iopub_rx) = unbounded();
        let manager = CommManager::new(iopub_tx);
        let comm_rx = capture_target(&manager, "plots");

        manager
            .handle_open(header("comm_open"), &comm_open("c1", "plots"))
            .unwrap();
        let comm = comm_rx.try_recv().unwrap();
        assert_eq!(comm.initiator, CommInitiator::FrontEnd);
        assert_eq!(manager.comm_info(None).get("c1"), Some(&json!({ "target_name": "plots" })));
        assert!(manager.comm_info(Some("other")).is_empty());

        let msg_header = header("comm_msg");
        manager
            .handle_msg(msg_header.clone(), &CommWireMsg {
                comm_id: String::from("c1"),
                data: json!({ "x": 1 }),
            })
            .unwrap();
        assert_eq!(comm.incoming_rx.try_recv(), Ok(CommMsg::Data(json!({ "x": 1 }))));

        // Replies are parented to the message being answered
        comm.send(json!({ "y": 2 })).unwrap();
        assert_matches!(iopub_rx.try_recv(), Ok(IOPubMessage::CommMsg(Some(parent), msg)) => {
            assert_eq!(parent, msg_header);
            assert_eq!(msg.comm_id, "c1");
            assert_eq!(msg.data, json!({ "y": 2 }));
        });

        manager
            .handle_close(header("comm_close"), &CommClose {
                comm_id: String::from("c1"),
                data: json!({}),
            })
            .unwrap();
        assert_eq!(comm.incoming_rx.try_recv(), Ok(CommMsg::Close(json!({}))));
        assert!(!comm.is_open());
        assert!(manager.comm_info(None).is_empty());
    }

    #[test]
    fn test_unknown_targets_and_comms() {
        let (iopub_tx, _iopub_rx) = unbounded();
        let manager = CommManager::new(iopub_tx);

        assert_matches!(
            manager.handle_open(header("comm_open"), &comm_open("c1", "plots")),
            Err(Error::UnknownCommTarget(name)) => assert_eq!(name, "plots")
        );
        assert_matches!(
            manager.handle_msg(header("comm_msg"), &CommWireMsg {
                comm_id: String::from("c1"),
                data: json!({}),
            }),
            Err(Error::UnknownComm(_))
        );

        let _comm_rx = capture_target(&manager, "plots");
        assert!(manager.unregister_target("plots"));
        assert!(!manager.unregister_target("plots"));
        assert!(manager
            .handle_open(header("comm_open"), &comm_open("c1", "plots"))
            .is_err());
    }

    #[test]
    fn test_refused_comm_is_forgotten() {
        let (iopub_tx, _iopub_rx) = unbounded();
        let manager = CommManager::new(iopub_tx);
        manager.register_target("picky", |_comm: CommSocket, _data: &Value| -> crate::Result<()> {
            Err(crate::anyhow!("Not today"))
        });

        assert!(manager
            .handle_open(header("comm_open"), &comm_open("c1", "picky"))
            .is_err());
        assert!(manager.comm_info(None).is_empty());
    }

    #[test]
    fn test_kernel_opened_comm() {
        let (iopub_tx, iopub_rx) = unbounded();
        let manager = CommManager::new(iopub_tx);

        let comm = manager.open_comm("status", json!({ "ready": true })).unwrap();
        assert_eq!(comm.initiator, CommInitiator::BackEnd);
        assert_matches!(iopub_rx.try_recv(), Ok(IOPubMessage::CommOpen(None, msg)) => {
            assert_eq!(msg.comm_id, comm.comm_id);
            assert_eq!(msg.target_name, "status");
        });
        assert!(manager.comm_info(Some("status")).contains_key(&comm.comm_id));

        comm.close().unwrap();
        assert_matches!(iopub_rx.try_recv(), Ok(IOPubMessage::CommClose(None, msg)) => {
            assert_eq!(msg.comm_id, comm.comm_id);
        });
        assert!(manager.comm_info(None).is_empty());

        // Closing twice is a no-op
        comm.close().unwrap();
        assert!(iopub_rx.try_recv().is_err());
    }
}
