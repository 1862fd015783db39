/*
 * is_complete_reply.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::jupyter_message::MessageType;

/// Represents a reply to an is_complete_request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IsCompleteReply {
    /// The status of the code that was tested for completeness
    pub status: IsComplete,

    /// Characters to use to indent the next line (for 'incomplete' only)
    pub indent: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum IsComplete {
    /// The code is complete and can be executed as is
    Complete,

    /// The code is incomplete and requires more input
    Incomplete,

    /// The code is invalid, so more input won't help
    Invalid,

    /// The completeness of the code could not be determined
    Unknown,
}

impl MessageType for IsCompleteReply {
    fn message_type() -> String {
        String::from("is_complete_reply")
    }
}
