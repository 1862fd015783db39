/*
 * kernel_info_reply.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::header::PROTOCOL_VERSION;
use crate::wire::help_link::HelpLink;
use crate::wire::jupyter_message::MessageType;
use crate::wire::jupyter_message::Status;
use crate::wire::language_info::LanguageInfo;

/// Kernel description provided by an interpreter.
///
/// The engine completes it into a [KernelInfoReply] by adding the fields it
/// owns, such as the protocol version.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KernelInfo {
    /// Name of the kernel implementation
    pub implementation: String,

    /// Version of the kernel implementation
    pub implementation_version: String,

    /// Information about the language the kernel supports
    pub language_info: LanguageInfo,

    /// A startup banner
    pub banner: String,

    /// Whether debugging is supported
    pub debugger: bool,

    /// A list of help links
    pub help_links: Vec<HelpLink>,
}

/// Represents a reply to a `kernel_info_request`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KernelInfoReply {
    /// The execution status ("ok" or "error")
    pub status: Status,

    /// Version of messaging protocol
    pub protocol_version: String,

    pub implementation: String,

    pub implementation_version: String,

    pub language_info: LanguageInfo,

    pub banner: String,

    pub debugger: bool,

    pub help_links: Vec<HelpLink>,
}

impl MessageType for KernelInfoReply {
    fn message_type() -> String {
        String::from("kernel_info_reply")
    }
}

impl From<KernelInfo> for KernelInfoReply {
    fn from(value: KernelInfo) -> Self {
        Self {
            status: Status::Ok,
            protocol_version: String::from(PROTOCOL_VERSION),
            implementation: value.implementation,
            implementation_version: value.implementation_version,
            language_info: value.language_info,
            banner: value.banner,
            debugger: value.debugger,
            help_links: value.help_links,
        }
    }
}
