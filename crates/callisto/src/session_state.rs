/*
 * session_state.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use crossbeam::channel::Sender;
use log::trace;

use crate::language::cancellation::CancellationToken;
use crate::socket::iopub::IOPubMessage;
use crate::wire::header::JupyterHeader;
use crate::wire::status::ExecutionState;

/// The execution currently running, if any
#[derive(Debug, Clone)]
pub struct ActiveExecution {
    pub header: JupyterHeader,
    pub token: CancellationToken,
}

struct StateInner {
    execution_count: u32,
    status: ExecutionState,
    active: Option<ActiveExecution>,

    /// Set once a shutdown request has been received; no execution starts
    /// afterwards
    shutting_down: bool,
}

/// Kernel-wide state shared by the channel threads and the executor.
pub struct SessionState {
    inner: Mutex<StateInner>,

    /// Notified when the running execution has been fully answered
    execution_done: Condvar,

    iopub_tx: Sender<IOPubMessage>,
}

impl SessionState {
    pub fn new(iopub_tx: Sender<IOPubMessage>) -> Self {
        Self {
            inner: Mutex::new(StateInner {
                execution_count: 0,
                status: ExecutionState::Starting,
                active: None,
                shutting_down: false,
            }),
            execution_done: Condvar::new(),
            iopub_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateInner> {
        // The state stays consistent across a panicking holder since every
        // update is a single assignment
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Increments the execution counter and returns the new value.
    pub fn next_execution_count(&self) -> u32 {
        let mut inner = self.lock();
        inner.execution_count += 1;
        inner.execution_count
    }

    pub fn execution_count(&self) -> u32 {
        self.lock().execution_count
    }

    pub fn status(&self) -> ExecutionState {
        self.lock().status
    }

    /// Records the new status and broadcasts it on IOPub, parented to the
    /// request that caused it. The broadcast is queued under the state lock
    /// so concurrent transitions reach IOPub in the order they were recorded.
    pub fn set_status(
        &self,
        status: ExecutionState,
        parent: Option<JupyterHeader>,
    ) -> crate::Result<()> {
        let mut inner = self.lock();
        trace!("Kernel status: {} -> {}", inner.status, status);
        inner.status = status;
        self.iopub_tx.send(IOPubMessage::Status(parent, status))?;
        Ok(())
    }

    /// Marks the given request as the running execution and returns the
    /// token it should observe. Returns `None` once the kernel is shutting
    /// down.
    pub fn begin_execution(&self, header: JupyterHeader) -> Option<CancellationToken> {
        let mut inner = self.lock();
        if inner.shutting_down {
            return None;
        }
        let token = CancellationToken::new();
        inner.active = Some(ActiveExecution {
            header,
            token: token.clone(),
        });
        Some(token)
    }

    pub fn end_execution(&self) {
        self.lock().active = None;
        self.execution_done.notify_all();
    }

    pub fn active_execution(&self) -> Option<ActiveExecution> {
        self.lock().active.clone()
    }

    /// Refuses every later execution and cancels the running one. Returns
    /// false if nothing was running.
    pub fn begin_shutdown(&self) -> bool {
        let mut inner = self.lock();
        inner.shutting_down = true;
        match &inner.active {
            Some(active) => {
                active.token.cancel();
                true
            },
            None => false,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }

    /// Blocks until no execution is running. Returns false if one was still
    /// running after `timeout`.
    pub fn wait_for_execution(&self, timeout: Duration) -> bool {
        let inner = self.lock();
        let (_inner, result) = self
            .execution_done
            .wait_timeout_while(inner, timeout, |inner| inner.active.is_some())
            .unwrap_or_else(|err| err.into_inner());
        !result.timed_out()
    }

    /// Cancels the running execution. Returns false if nothing was running.
    pub fn interrupt(&self) -> bool {
        match &self.lock().active {
            Some(active) => {
                active.token.cancel();
                true
            },
            None => false,
        }
    }
}
