/*
 * complete_request.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::jupyter_message::MessageType;

/// Represents a request from the frontend to show possible completions
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct CompleteRequest {
    /// The code context in which completion is requested
    pub code: String,

    /// The position of the cursor in the code, in unicode code points
    pub cursor_pos: u32,
}

impl MessageType for CompleteRequest {
    fn message_type() -> String {
        String::from("complete_request")
    }
}
