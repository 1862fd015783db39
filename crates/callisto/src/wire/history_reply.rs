/*
 * history_reply.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::jupyter_message::MessageType;
use crate::wire::jupyter_message::Status;

/// One history entry, serialized as `[session, line_number, input]`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryEntry(pub i64, pub u32, pub String);

/// Represents a reply to a history request
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryReply {
    pub status: Status,

    pub history: Vec<HistoryEntry>,
}

impl MessageType for HistoryReply {
    fn message_type() -> String {
        String::from("history_reply")
    }
}
