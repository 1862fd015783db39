/*
 * subscription_message.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use crate::error::Error;
use crate::socket::socket::Socket;

/// Represents a special `SubscriptionMessage` sent from a SUB to an XPUB
/// upon `socket.set_subscribe(subscription)` or `socket.set_unsubscribe(subscription)`.
#[derive(Debug, PartialEq)]
pub struct SubscriptionMessage {
    pub kind: SubscriptionKind,
    pub subscription: String,
}

#[derive(Debug, PartialEq)]
pub enum SubscriptionKind {
    Subscribe,
    Unsubscribe,
}

impl SubscriptionMessage {
    /// Read a SubscriptionMessage from a ZeroMQ socket.
    pub fn read_from_socket(socket: &Socket) -> crate::Result<SubscriptionMessage> {
        let frames = socket.recv_multipart()?;
        Self::from_frames(frames)
    }

    /// Always a single frame: `1{subscription}` to subscribe and
    /// `0{subscription}` to unsubscribe.
    fn from_frames(frames: Vec<Vec<u8>>) -> crate::Result<SubscriptionMessage> {
        let frame = match frames.as_slice() {
            [frame] => frame,
            _ => {
                let n = frames.len();
                return Err(crate::anyhow!(
                    "Subscription message on XPUB must be a single frame. {n} frames were received."
                ));
            },
        };

        let (flag, rest) = match frame.split_first() {
            Some(parts) => parts,
            None => {
                return Err(crate::anyhow!(
                    "Subscription message on XPUB must be at least length 1 to determine subscribe/unsubscribe."
                ))
            },
        };

        let kind = if *flag == 1 {
            SubscriptionKind::Subscribe
        } else {
            SubscriptionKind::Unsubscribe
        };

        // The rest of the message is the UTF-8 `subscription`
        let subscription = match std::str::from_utf8(rest) {
            Ok(subscription) => subscription.to_string(),
            Err(err) => {
                return Err(Error::Utf8Error(
                    String::from("subscription"),
                    rest.to_vec(),
                    err,
                ))
            },
        };

        Ok(Self { kind, subscription })
    }
}
