/*
 * session.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use uuid::Uuid;

use crate::wire::signature::SignatureKey;

/// Signing identity of one side of a connection. Every message created with
/// a session carries its ID and username in the header.
#[derive(Clone, Debug)]
pub struct Session {
    /// Signing key; `None` when the connection key is empty
    pub key: Option<SignatureKey>,

    pub username: String,

    pub session_id: String,
}

impl Session {
    pub fn create(signature_scheme: &str, key: &str) -> crate::Result<Self> {
        Ok(Self {
            key: SignatureKey::new(signature_scheme, key)?,
            session_id: Uuid::new_v4().to_string(),
            username: String::from("kernel"),
        })
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = String::from(username);
        self
    }
}
