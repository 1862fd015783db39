/*
 * wire_message.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use log::trace;
use serde::de::DeserializeOwned;
use serde_json::json;
use serde_json::Value;

use crate::error::Error;
use crate::session::Session;
use crate::socket::socket::Socket;
use crate::wire::header::JupyterHeader;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::ProtocolMessage;
use crate::wire::signature::SignatureKey;

/// This delimiter separates the ZeroMQ socket identities (IDS) from the message
/// body payload (MSG).
pub const MSG_DELIM: &[u8] = b"<IDS|MSG>";

/// Represents an untyped Jupyter message delivered over the wire. A WireMessage
/// can represent any kind of Jupyter message; typically its header will be
/// examined and it will be converted into a typed JupyterMessage.
#[derive(Debug, Clone)]
pub struct WireMessage {
    /// The ZeroMQ identities. These store the peer identity for messages
    /// delivered request-reply style over ROUTER sockets (like the shell)
    pub zmq_identities: Vec<Vec<u8>>,

    /// The header for this message
    pub header: JupyterHeader,

    /// The header of the message from which this message originated, if any.
    /// If none, it's serialized as an empty dict as required by the Jupyter
    /// protocol.
    pub parent_header: Option<JupyterHeader>,

    /// Additional metadata, if any
    pub metadata: Value,

    /// The body (payload) of the message
    pub content: Value,

    /// Trailing binary buffers; passed through without interpretation
    pub buffers: Vec<Vec<u8>>,
}

impl WireMessage {
    /// Read a WireMessage from a ZeroMQ socket.
    pub fn read_from_socket(socket: &Socket) -> crate::Result<WireMessage> {
        let frames = socket.recv_multipart()?;
        Self::from_frames(frames, socket.session.key.as_ref())
    }

    /// Return the Jupyter type of the message.
    pub fn message_type(&self) -> &str {
        self.header.msg_type.as_str()
    }

    /// Parse a Jupyter message from the frames of a multipart ZeroMQ message.
    /// When a key is given, the signature must match before anything is
    /// parsed.
    pub fn from_frames(
        mut frames: Vec<Vec<u8>>,
        key: Option<&SignatureKey>,
    ) -> crate::Result<WireMessage> {
        // Find the position of the <IDS|MSG> delimiter in the message, which
        // separates the socket identities (IDS) from the body of the message
        // (MSG).
        let pos = match frames.iter().position(|frame| frame.as_slice() == MSG_DELIM) {
            Some(pos) => pos,
            None => return Err(Error::MissingDelimiter),
        };

        // Form a collection of the remaining parts, and remove the delimiter.
        let mut parts: Vec<Vec<u8>> = frames.drain(pos + 1..).collect();
        frames.pop();

        // We expect the signature followed by 4 message sections
        if parts.len() < 5 {
            return Err(Error::InsufficientParts(parts.len(), 5));
        }

        let buffers: Vec<Vec<u8>> = parts.drain(5..).collect();

        if let Some(key) = key {
            key.verify(&parts[0], &parts[1..5])?;
        }

        // Parse the message header
        let header_val = WireMessage::parse_buffer(String::from("header"), &parts[1])?;
        let header: JupyterHeader = match serde_json::from_value(header_val.clone()) {
            Ok(h) => h,
            Err(err) => return Err(Error::InvalidPart(String::from("header"), header_val, err)),
        };

        // An empty parent header means the message has no parent, which is OK
        // per the wire protocol.
        let parent_val = WireMessage::parse_buffer(String::from("parent header"), &parts[2])?;
        let parent = match &parent_val {
            Value::Object(map) if map.is_empty() => None,
            _ => match serde_json::from_value(parent_val.clone()) {
                Ok(h) => Some(h),
                Err(err) => {
                    return Err(Error::InvalidPart(
                        String::from("parent header"),
                        parent_val,
                        err,
                    ))
                },
            },
        };

        Ok(Self {
            zmq_identities: frames,
            header,
            parent_header: parent,
            metadata: WireMessage::parse_buffer(String::from("metadata"), &parts[3])?,
            content: WireMessage::parse_buffer(String::from("content"), &parts[4])?,
            buffers,
        })
    }

    /// Parse raw buffer data from a single part of a multipart ZeroMQ message
    /// into a JSON value.
    fn parse_buffer(desc: String, buf: &[u8]) -> crate::Result<Value> {
        // Convert the raw byte sequence from the ZeroMQ message into UTF-8
        let str = match std::str::from_utf8(buf) {
            Ok(s) => s,
            Err(err) => return Err(Error::Utf8Error(desc, buf.to_vec(), err)),
        };

        // Parse the UTF-8 string as JSON
        match serde_json::from_str(str) {
            Ok(v) => Ok(v),
            Err(err) => Err(Error::JsonParseError(desc, String::from(str), err)),
        }
    }

    /// Encode the message as multipart frames: identities, delimiter,
    /// signature (empty without a key), the 4 JSON sections, then buffers.
    pub fn to_frames(&self, key: Option<&SignatureKey>) -> crate::Result<Vec<Vec<u8>>> {
        // Serialize JSON values into byte parts in preparation for transmission
        let mut parts = match self.to_raw_parts() {
            Ok(v) => v,
            Err(err) => return Err(Error::CannotSerialize(err)),
        };

        let signature = match key {
            Some(key) => key.sign(&parts),
            None => String::new(),
        };

        let mut frames: Vec<Vec<u8>> = self.zmq_identities.clone();
        frames.push(MSG_DELIM.to_vec());
        frames.push(signature.into_bytes());
        frames.append(&mut parts);
        frames.extend(self.buffers.iter().cloned());
        Ok(frames)
    }

    /// Send this message to the given ZeroMQ socket.
    pub fn send(&self, socket: &Socket) -> crate::Result<()> {
        match &self.parent_header {
            Some(parent) => {
                trace!(
                    "Sending '{}' message (reply to '{}') via {} socket",
                    self.describe(),
                    parent.msg_type,
                    socket.name
                );
            },
            None => {
                trace!(
                    "Sending '{}' message via {} socket",
                    self.describe(),
                    socket.name
                );
            },
        }

        let frames = self.to_frames(socket.session.key.as_ref())?;
        socket.send_multipart(&frames)
    }

    /// Creates a reply with an arbitrary message type. Used when the request
    /// type is not one we know a typed reply for.
    pub fn create_reply(&self, msg_type: String, content: Value, session: &Session) -> Self {
        Self {
            zmq_identities: self.zmq_identities.clone(),
            header: JupyterHeader::create(
                msg_type,
                session.session_id.clone(),
                session.username.clone(),
            ),
            parent_header: Some(self.header.clone()),
            metadata: json!({}),
            content,
            buffers: Vec::new(),
        }
    }

    /// Returns a vector containing the raw parts of the message
    fn to_raw_parts(&self) -> Result<Vec<Vec<u8>>, serde_json::Error> {
        let mut parts: Vec<Vec<u8>> = Vec::new();
        parts.push(serde_json::to_vec(&self.header)?);

        // Orphan messages have an empty dict as parent
        match &self.parent_header {
            Some(parent) => parts.push(serde_json::to_vec(parent)?),
            None => parts.push(serde_json::to_vec(&serde_json::Map::new())?),
        }

        parts.push(serde_json::to_vec(&self.metadata)?);
        parts.push(serde_json::to_vec(&self.content)?);
        Ok(parts)
    }

    /// Message type annotated with the execution state for status messages
    fn describe(&self) -> String {
        if self.header.msg_type == "status" {
            if let Some(Value::String(state)) = self.content.get("execution_state") {
                return format!("status/{state}");
            }
        }
        self.header.msg_type.clone()
    }
}

// Conversion: WireMessage (untyped) -> JupyterMessage (typed); used on
// messages we receive over the wire to parse into the correct type.
impl<T: ProtocolMessage + DeserializeOwned> TryFrom<&WireMessage> for JupyterMessage<T> {
    type Error = crate::error::Error;

    fn try_from(msg: &WireMessage) -> Result<JupyterMessage<T>, Error> {
        let content = match serde_json::from_value(msg.content.clone()) {
            Ok(val) => val,
            Err(err) => {
                return Err(Error::InvalidMessage(
                    T::message_type(),
                    msg.content.clone(),
                    err,
                ))
            },
        };
        Ok(JupyterMessage {
            zmq_identities: msg.zmq_identities.clone(),
            header: msg.header.clone(),
            parent_header: msg.parent_header.clone(),
            metadata: msg.metadata.clone(),
            buffers: msg.buffers.clone(),
            content,
        })
    }
}

// Conversion: JupyterMessage (typed) -> WireMessage (untyped); used prior to
// sending messages to get them ready for dispatch.
impl<T: ProtocolMessage> TryFrom<&JupyterMessage<T>> for WireMessage {
    type Error = crate::error::Error;

    /// Convert a typed JupyterMessage into a WireMessage, preserving ZeroMQ
    /// socket identities.
    fn try_from(msg: &JupyterMessage<T>) -> Result<Self, Error> {
        let content = match serde_json::to_value(&msg.content) {
            Ok(val) => val,
            Err(err) => return Err(Error::CannotSerialize(err)),
        };
        Ok(Self {
            zmq_identities: msg.zmq_identities.clone(),
            header: msg.header.clone(),
            parent_header: msg.parent_header.clone(),
            metadata: msg.metadata.clone(),
            content,
            buffers: msg.buffers.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn key() -> SignatureKey {
        SignatureKey::new("hmac-sha256", "a0436f6c-1916-498b-8eb9-e81ab9368e84")
            .unwrap()
            .unwrap()
    }

    fn message() -> WireMessage {
        WireMessage {
            zmq_identities: vec![b"frontend".to_vec()],
            header: JupyterHeader::create(
                String::from("execute_request"),
                String::from("session"),
                String::from("user"),
            ),
            parent_header: None,
            metadata: json!({}),
            content: json!({"code": "6*7"}),
            buffers: Vec::new(),
        }
    }

    #[test]
    fn test_frames_layout() {
        let frames = message().to_frames(Some(&key())).unwrap();
        assert_eq!(frames.len(), 7);
        assert_eq!(frames[0], b"frontend".to_vec());
        assert_eq!(frames[1], MSG_DELIM.to_vec());
        assert_eq!(frames[2].len(), 64);
        assert_eq!(frames[4], b"{}".to_vec());
    }

    #[test]
    fn test_decode_signed_message() {
        let original = message();
        let frames = original.to_frames(Some(&key())).unwrap();
        let decoded = WireMessage::from_frames(frames, Some(&key())).unwrap();
        assert_eq!(decoded.zmq_identities, original.zmq_identities);
        assert_eq!(decoded.header, original.header);
        assert_eq!(decoded.parent_header, None);
        assert_eq!(decoded.content, original.content);
    }

    #[test]
    fn test_tampered_content_is_rejected() {
        let mut frames = message().to_frames(Some(&key())).unwrap();
        let last = frames.len() - 1;
        frames[last] = b"{\"code\": \"rm -rf\"}".to_vec();
        assert_matches!(
            WireMessage::from_frames(frames, Some(&key())),
            Err(Error::BadSignature(..))
        );
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let other = SignatureKey::new("hmac-sha256", "other").unwrap().unwrap();
        let frames = message().to_frames(Some(&other)).unwrap();
        let err = WireMessage::from_frames(frames, Some(&key())).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authentication);
    }

    #[test]
    fn test_empty_key_accepts_any_signature() {
        let mut frames = message().to_frames(None).unwrap();
        assert!(frames[2].is_empty());
        frames[2] = b"deadbeef".to_vec();
        assert!(WireMessage::from_frames(frames, None).is_ok());
    }

    #[test]
    fn test_missing_delimiter() {
        let frames = vec![b"id".to_vec(), b"{}".to_vec()];
        assert_matches!(
            WireMessage::from_frames(frames, None),
            Err(Error::MissingDelimiter)
        );
    }

    #[test]
    fn test_insufficient_parts() {
        let frames = vec![MSG_DELIM.to_vec(), Vec::new(), b"{}".to_vec()];
        assert_matches!(
            WireMessage::from_frames(frames, None),
            Err(Error::InsufficientParts(2, 5))
        );
    }

    #[test]
    fn test_malformed_json() {
        let mut frames = message().to_frames(None).unwrap();
        frames[6] = b"{not json".to_vec();
        let err = WireMessage::from_frames(frames, None).unwrap_err();
        assert_matches!(err, Error::JsonParseError(ref part, ..) => {
            assert_eq!(part, "content");
        });
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedMessage);
    }

    #[test]
    fn test_buffers_are_kept_and_unsigned() {
        let mut original = message();
        original.buffers = vec![vec![0, 1, 2], vec![3]];
        let frames = original.to_frames(Some(&key())).unwrap();

        let mut unbuffered = original.clone();
        unbuffered.buffers.clear();
        let plain = unbuffered.to_frames(Some(&key())).unwrap();

        assert_eq!(frames.len(), plain.len() + 2);
        assert_eq!(frames[2], plain[2]);

        let decoded = WireMessage::from_frames(frames, Some(&key())).unwrap();
        assert_eq!(decoded.buffers, original.buffers);
    }

    #[test]
    fn test_parent_header_decodes() {
        let parent = message().header;
        let mut child = message();
        child.parent_header = Some(parent.clone());
        let frames = child.to_frames(None).unwrap();
        let decoded = WireMessage::from_frames(frames, None).unwrap();
        assert_eq!(decoded.parent_header, Some(parent));
    }
}
