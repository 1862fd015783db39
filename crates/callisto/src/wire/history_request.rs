/*
 * history_request.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::jupyter_message::MessageType;

/// How history entries are selected
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum HistAccessType {
    Range,
    Tail,
    Search,
}

/// Represents a request from the frontend for past inputs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryRequest {
    /// Whether outputs should be returned as well; they are not recorded
    #[serde(default)]
    pub output: bool,

    /// Whether to return the raw input rather than transformed input
    #[serde(default = "default_true")]
    pub raw: bool,

    pub hist_access_type: HistAccessType,

    /// Session number; 0 (or negative offsets) refer to the current session
    #[serde(default)]
    pub session: i64,

    /// First line of a `range` request
    pub start: Option<u32>,

    /// Line after the last of a `range` request
    pub stop: Option<u32>,

    /// Number of entries for `tail` and `search` requests
    pub n: Option<usize>,

    /// Glob pattern for `search` requests
    pub pattern: Option<String>,

    /// Whether `search` should drop duplicate inputs
    #[serde(default)]
    pub unique: bool,
}

fn default_true() -> bool {
    true
}

impl MessageType for HistoryRequest {
    fn message_type() -> String {
        String::from("history_request")
    }
}
