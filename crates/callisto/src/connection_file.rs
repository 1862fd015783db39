/*
 * connection_file.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

/// The connection file written by the launching client. It names the
/// transport, address, ports and signing key of the five channels.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConnectionFile {
    // ZeroMQ ports
    pub control_port: u16,
    pub shell_port: u16,
    pub stdin_port: u16,
    pub iopub_port: u16,
    pub hb_port: u16,

    /// Usually "tcp"
    #[serde(default = "default_transport")]
    pub transport: String,

    /// "hmac-sha256", "hmac-sha384" or "hmac-sha512"
    #[serde(default = "default_signature_scheme")]
    pub signature_scheme: String,

    pub ip: String,

    /// Signing key; an empty key disables message signing
    #[serde(default)]
    pub key: String,

    pub kernel_name: Option<String>,
}

fn default_transport() -> String {
    String::from("tcp")
}

fn default_signature_scheme() -> String {
    String::from("hmac-sha256")
}

impl ConnectionFile {
    /// Create a ConnectionFile by parsing the contents of a connection file.
    pub fn from_file<P: AsRef<Path>>(connection_file: P) -> crate::Result<ConnectionFile> {
        let path = connection_file.as_ref();
        let file = File::open(path).map_err(|err| {
            crate::anyhow!("Can't open connection file '{}': {err}", path.display())
        })?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|err| {
            crate::anyhow!("Can't parse connection file '{}': {err}", path.display())
        })
    }

    /// Write the connection file to disk; used by test harnesses to launch
    /// kernels the way a client would.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| {
            crate::anyhow!("Can't create connection file '{}': {err}", path.display())
        })?;
        serde_json::to_writer_pretty(file, self).map_err(crate::Error::CannotSerialize)
    }

    /// Given a port, return a URI-like string that can be used to connect to
    /// the port, given the other parameters in the connection file.
    ///
    /// Example: `32` => `"tcp://127.0.0.1:32"`
    pub fn endpoint(&self, port: u16) -> String {
        format!("{}://{}:{}", self.transport, self.ip, port)
    }
}
