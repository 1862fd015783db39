/*
 * config.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Runtime settings of a kernel that are not part of the connection file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Used to name the kernel's threads
    pub name: String,

    /// Username stamped in the headers of outgoing messages
    pub username: String,

    /// How long to wait at startup for a frontend to subscribe to IOPub
    /// before broadcasting the initial status
    pub iopub_subscription_timeout: Duration,

    /// Executions running longer than this are cancelled and fail with a
    /// `TimeoutError`
    pub execution_timeout: Option<Duration>,

    /// How long an `execute_reply` waits for pending IOPub output to be
    /// flushed
    pub reply_flush_timeout: Duration,

    /// How long a shutdown request waits for an interrupted execution to
    /// finish
    pub shutdown_timeout: Duration,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: String::from("callisto"),
            username: String::from("kernel"),
            iopub_subscription_timeout: Duration::from_secs(10),
            execution_timeout: None,
            reply_flush_timeout: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}
