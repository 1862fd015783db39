/*
 * header.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Version of the Jupyter messaging protocol spoken by the kernel
pub const PROTOCOL_VERSION: &str = "5.3";

/// Represents the header of a Jupyter message
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JupyterHeader {
    /// The message identifier; must be unique per message
    pub msg_id: String,

    /// Session ID; must be unique per session
    pub session: String,

    /// Username; must be unique per user
    pub username: String,

    /// Date/time when message was created (ISO 8601)
    #[serde(default)]
    pub date: String,

    /// Message type
    pub msg_type: String,

    /// Message protocol version
    #[serde(default)]
    pub version: String,
}

impl JupyterHeader {
    /// Creates a new header with a fresh message ID and the current time.
    pub fn create(msg_type: String, session: String, username: String) -> Self {
        Self {
            msg_id: Uuid::new_v4().to_string(),
            session,
            username,
            date: chrono::Utc::now().to_rfc3339(),
            msg_type,
            version: String::from(PROTOCOL_VERSION),
        }
    }
}
