/*
 * comm_close.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::wire::jupyter_message::MessageType;

/// Closes a comm. Either side may send it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommClose {
    pub comm_id: String,

    #[serde(default)]
    pub data: Value,
}

impl MessageType for CommClose {
    fn message_type() -> String {
        String::from("comm_close")
    }
}
