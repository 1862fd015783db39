/*
 * exception.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

/// Represents a runtime exception on a ROUTER/DEALER socket
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Exception {
    /// The name of the exception
    pub ename: String,

    /// The value/description of the exception
    pub evalue: String,

    /// List of traceback frames, as strings
    pub traceback: Vec<String>,
}

impl Exception {
    pub fn internal_error(evalue: String) -> Self {
        Self {
            ename: String::from("InternalError"),
            evalue,
            traceback: vec![],
        }
    }

    pub fn interrupted() -> Self {
        Self {
            ename: String::from("KeyboardInterrupt"),
            evalue: String::from("Execution interrupted"),
            traceback: vec![],
        }
    }

    pub fn timed_out(seconds: f64) -> Self {
        Self {
            ename: String::from("TimeoutError"),
            evalue: format!("Execution exceeded the {seconds}s time limit"),
            traceback: vec![],
        }
    }

    pub fn unknown_request(msg_type: &str) -> Self {
        Self {
            ename: String::from("UnknownRequestType"),
            evalue: format!("Unknown request type '{msg_type}'"),
            traceback: vec![],
        }
    }
}
