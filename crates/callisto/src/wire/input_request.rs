/*
 * input_request.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use crossbeam::channel::Sender;
use serde::Deserialize;
use serde::Serialize;

use crate::wire::jupyter_message::MessageType;
use crate::wire::originator::Originator;

/// Represents a request from the kernel to the frontend to prompt the user for
/// input
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputRequest {
    /// The prompt to display to the user
    pub prompt: String,

    /// Whether the string being requested is a password (and should therefore
    /// be obscured)
    pub password: bool,
}

impl MessageType for InputRequest {
    fn message_type() -> String {
        String::from("input_request")
    }
}

/// An input request originating from a running execution
pub struct ShellInputRequest {
    /// The execute request that prompts for input
    pub originator: Originator,

    /// The input request itself
    pub request: InputRequest,

    /// Where to deliver the user's answer
    pub reply_tx: Sender<crate::Result<String>>,
}
