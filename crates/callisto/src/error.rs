/*
 * error.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::fmt;

use crate::wire::exception::Exception;

/// Kernel errors.
#[derive(Debug)]
pub enum Error {
    MissingDelimiter,
    InsufficientParts(usize, usize),
    InvalidHmac(Vec<u8>, hex::FromHexError),
    BadSignature(Vec<u8>, hmac::digest::MacError),
    Utf8Error(String, Vec<u8>, std::str::Utf8Error),
    JsonParseError(String, String, serde_json::Error),
    InvalidPart(String, serde_json::Value, serde_json::Error),
    InvalidMessage(String, serde_json::Value, serde_json::Error),
    CannotSerialize(serde_json::Error),
    UnknownMessageType(String),
    UnsupportedMessage(String, String),
    UnsupportedSignatureScheme(String),
    HmacKeyInvalid(usize, hmac::digest::InvalidLength),
    CreateSocketFailed(String, zmq::Error),
    SocketBindError(String, String, zmq::Error),
    SocketConnectError(String, String, zmq::Error),
    UnsupportedSocketType(zmq::SocketType),
    ZmqError(String, zmq::Error),
    SendError(String),
    ReceiveError(String),
    ShellErrorReply(Exception),
    StdinNotAllowed,
    InputInterrupted,
    UnknownCommTarget(String),
    UnknownComm(String),
    Anyhow(anyhow::Error),
}

/// Coarse classification of [Error], used by the channel loops to decide
/// how loudly to report a failure and whether a reply is still possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    MalformedMessage,
    UnknownRequestType,
    Evaluation,
    Interrupted,
    Transport,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidHmac(..) | Error::BadSignature(..) => ErrorKind::Authentication,

            Error::MissingDelimiter |
            Error::InsufficientParts(..) |
            Error::Utf8Error(..) |
            Error::JsonParseError(..) |
            Error::InvalidPart(..) |
            Error::InvalidMessage(..) => ErrorKind::MalformedMessage,

            Error::UnknownMessageType(_) | Error::UnsupportedMessage(..) => {
                ErrorKind::UnknownRequestType
            },

            Error::ShellErrorReply(_) => ErrorKind::Evaluation,
            Error::InputInterrupted => ErrorKind::Interrupted,

            Error::CreateSocketFailed(..) |
            Error::SocketBindError(..) |
            Error::SocketConnectError(..) |
            Error::UnsupportedSocketType(_) |
            Error::ZmqError(..) |
            Error::SendError(_) |
            Error::ReceiveError(_) => ErrorKind::Transport,

            Error::CannotSerialize(_) |
            Error::UnsupportedSignatureScheme(_) |
            Error::HmacKeyInvalid(..) |
            Error::StdinNotAllowed |
            Error::UnknownCommTarget(_) |
            Error::UnknownComm(_) |
            Error::Anyhow(_) => ErrorKind::Internal,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingDelimiter => {
                write!(
                    f,
                    "ZeroMQ message did not include expected <IDS|MSG> delimiter"
                )
            },
            Error::InsufficientParts(found, expected) => {
                write!(
                    f,
                    "ZeroMQ message did not contain sufficient parts (found {found}, expected {expected})"
                )
            },
            Error::InvalidHmac(data, err) => {
                write!(
                    f,
                    "ZeroMQ message HMAC signature {data:?} is not a valid hexadecimal value: {err}"
                )
            },
            Error::BadSignature(sig, err) => {
                write!(
                    f,
                    "ZeroMQ message HMAC signature {sig:?} is incorrect: {err}"
                )
            },
            Error::Utf8Error(part, data, err) => {
                write!(
                    f,
                    "Message part '{part}' was not valid UTF-8: {err} (raw: {data:?})"
                )
            },
            Error::JsonParseError(part, str, err) => {
                write!(f, "Message part '{part}' is invalid JSON: {err} (raw: {str})")
            },
            Error::InvalidPart(part, json, err) => {
                write!(
                    f,
                    "Message part '{part}' does not match schema: {err} (raw: {json})"
                )
            },
            Error::InvalidMessage(kind, json, err) => {
                write!(f, "Invalid '{kind}' message: {err} (raw: {json})")
            },
            Error::CannotSerialize(err) => {
                write!(f, "Cannot serialize message: {err}")
            },
            Error::UnknownMessageType(kind) => {
                write!(f, "Unknown message type '{kind}'")
            },
            Error::UnsupportedMessage(kind, socket) => {
                write!(f, "Unsupported message '{kind}' received on {socket}")
            },
            Error::UnsupportedSignatureScheme(scheme) => {
                write!(f, "Unsupported signature scheme '{scheme}'")
            },
            Error::HmacKeyInvalid(len, err) => {
                write!(
                    f,
                    "The supplied HMAC signing key ({len} bytes) cannot be used: {err}"
                )
            },
            Error::CreateSocketFailed(name, err) => {
                write!(f, "Could not create ZeroMQ socket '{name}': {err}")
            },
            Error::SocketBindError(name, endpoint, err) => {
                write!(
                    f,
                    "Could not bind to ZeroMQ socket '{name}' at '{endpoint}': {err}"
                )
            },
            Error::SocketConnectError(name, endpoint, err) => {
                write!(
                    f,
                    "Could not connect to ZeroMQ socket '{name}' at '{endpoint}': {err}"
                )
            },
            Error::UnsupportedSocketType(kind) => {
                write!(f, "Unsupported socket type: {kind:?}")
            },
            Error::ZmqError(name, err) => {
                write!(f, "ZeroMQ protocol error on {name} socket: {err}")
            },
            Error::SendError(err) => {
                write!(f, "{err}")
            },
            Error::ReceiveError(err) => {
                write!(f, "{err}")
            },
            Error::ShellErrorReply(exception) => {
                write!(f, "{}: {}", exception.ename, exception.evalue)
            },
            Error::StdinNotAllowed => {
                write!(f, "The frontend does not accept input for this request")
            },
            Error::InputInterrupted => {
                write!(f, "Input request was interrupted")
            },
            Error::UnknownCommTarget(name) => {
                write!(f, "No comm target named '{name}' is registered")
            },
            Error::UnknownComm(comm_id) => {
                write!(f, "No open comm with ID '{comm_id}'")
            },
            Error::Anyhow(err) => {
                write!(f, "{err:?}")
            },
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Self::Anyhow(error)
    }
}

impl<T> From<crossbeam::channel::SendError<T>> for Error {
    fn from(err: crossbeam::channel::SendError<T>) -> Self {
        Self::SendError(format!("Could not send message to channel: {err}"))
    }
}

#[macro_export]
macro_rules! anyhow {
    ($($rest: expr),*) => {{
        let message = anyhow::anyhow!($($rest, )*);
        $crate::error::Error::Anyhow(message)
    }}
}
