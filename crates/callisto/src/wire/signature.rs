/*
 * signature.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::fmt;
use std::str::FromStr;

use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;
use sha2::Sha384;
use sha2::Sha512;

use crate::error::Error;

/// The signature schemes named in connection files
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
pub enum SignatureScheme {
    #[strum(serialize = "hmac-sha256")]
    HmacSha256,
    #[strum(serialize = "hmac-sha384")]
    HmacSha384,
    #[strum(serialize = "hmac-sha512")]
    HmacSha512,
}

/// A keyed HMAC used to sign outgoing and verify incoming messages.
#[derive(Clone)]
pub enum SignatureKey {
    Sha256(Hmac<Sha256>),
    Sha384(Hmac<Sha384>),
    Sha512(Hmac<Sha512>),
}

impl SignatureKey {
    /// Creates a signing key for the given scheme. An empty key disables
    /// signing altogether and yields `None`.
    pub fn new(scheme: &str, key: &str) -> crate::Result<Option<Self>> {
        if key.is_empty() {
            return Ok(None);
        }

        let scheme = SignatureScheme::from_str(scheme)
            .map_err(|_| Error::UnsupportedSignatureScheme(String::from(scheme)))?;

        let invalid = |err| Error::HmacKeyInvalid(key.len(), err);
        let key = match scheme {
            SignatureScheme::HmacSha256 => {
                Self::Sha256(Hmac::<Sha256>::new_from_slice(key.as_bytes()).map_err(invalid)?)
            },
            SignatureScheme::HmacSha384 => {
                Self::Sha384(Hmac::<Sha384>::new_from_slice(key.as_bytes()).map_err(invalid)?)
            },
            SignatureScheme::HmacSha512 => {
                Self::Sha512(Hmac::<Sha512>::new_from_slice(key.as_bytes()).map_err(invalid)?)
            },
        };

        Ok(Some(key))
    }

    pub fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Sha256(_) => SignatureScheme::HmacSha256,
            Self::Sha384(_) => SignatureScheme::HmacSha384,
            Self::Sha512(_) => SignatureScheme::HmacSha512,
        }
    }

    /// Computes the lowercase hex digest over the given message sections.
    pub fn sign(&self, parts: &[Vec<u8>]) -> String {
        match self {
            Self::Sha256(mac) => sign_with(mac, parts),
            Self::Sha384(mac) => sign_with(mac, parts),
            Self::Sha512(mac) => sign_with(mac, parts),
        }
    }

    /// Verifies a hex-encoded signature over the given message sections. The
    /// digest comparison is constant time.
    pub fn verify(&self, signature: &[u8], parts: &[Vec<u8>]) -> crate::Result<()> {
        let decoded = match hex::decode(signature) {
            Ok(decoded) => decoded,
            Err(err) => return Err(Error::InvalidHmac(signature.to_vec(), err)),
        };

        let result = match self {
            Self::Sha256(mac) => verify_with(mac, &decoded, parts),
            Self::Sha384(mac) => verify_with(mac, &decoded, parts),
            Self::Sha512(mac) => verify_with(mac, &decoded, parts),
        };

        result.map_err(|err| Error::BadSignature(decoded, err))
    }
}

// Keys never show up in logs
impl fmt::Debug for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureKey({})", self.scheme())
    }
}

fn sign_with<M: Mac + Clone>(mac: &M, parts: &[Vec<u8>]) -> String {
    let mut mac = mac.clone();
    for part in parts {
        mac.update(part);
    }
    hex::encode(mac.finalize().into_bytes().as_slice())
}

fn verify_with<M: Mac + Clone>(
    mac: &M,
    signature: &[u8],
    parts: &[Vec<u8>],
) -> Result<(), hmac::digest::MacError> {
    let mut mac = mac.clone();
    for part in parts {
        mac.update(part);
    }
    mac.verify_slice(signature)
}
