/*
 * execute_request.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::wire::jupyter_message::MessageType;

/// Represents a request from the frontend to execute code
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecuteRequest {
    /// The code to be executed
    pub code: String,

    /// Whether the code should be executed silently (not shown to the user)
    #[serde(default)]
    pub silent: bool,

    /// Whether the code should be stored in history
    #[serde(default = "default_true")]
    pub store_history: bool,

    /// Mapping of expressions to be evaluated after the code is executed.
    #[serde(default)]
    pub user_expressions: Value,

    /// Whether the kernel can prompt the user for input
    #[serde(default = "default_true")]
    pub allow_stdin: bool,

    /// If an error occurs, whether to stop executing queued execution requests
    #[serde(default)]
    pub stop_on_error: bool,
}

fn default_true() -> bool {
    true
}

impl MessageType for ExecuteRequest {
    fn message_type() -> String {
        String::from("execute_request")
    }
}
