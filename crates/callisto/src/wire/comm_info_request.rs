/*
 * comm_info_request.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::jupyter_message::MessageType;

/// Represents a request from the frontend to list open comms
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommInfoRequest {
    /// Optional target name; if specified, only comms with this target are
    /// listed
    pub target_name: Option<String>,
}

impl MessageType for CommInfoRequest {
    fn message_type() -> String {
        String::from("comm_info_request")
    }
}
