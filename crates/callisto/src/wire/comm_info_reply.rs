/*
 * comm_info_reply.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::wire::jupyter_message::MessageType;
use crate::wire::jupyter_message::Status;

/// Represents a reply listing open comms; keys are comm IDs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommInfoReply {
    pub status: Status,

    pub comms: Map<String, Value>,
}

impl MessageType for CommInfoReply {
    fn message_type() -> String {
        String::from("comm_info_reply")
    }
}
