//! Frame codec for the Jupyter wire protocol.
//!
//! Frame layout of one ZeroMQ multipart message:
//! ```text
//! ┌──────────────┬───────────┬───────────┬────────┬───────────────┬──────────┬─────────┬─────────┐
//! │ identities…  │ <IDS|MSG> │ signature │ header │ parent_header │ metadata │ content │ buffers…│
//! └──────────────┴───────────┴───────────┴────────┴───────────────┴──────────┴─────────┴─────────┘
//! ```
//! The signature is the hex HMAC-SHA256 of the four JSON frames. An empty
//! key disables signing: the signature frame is empty and never checked.

use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::ipc::message::{Header, Message};
use crate::types::{Error, Result};

/// Separates routing identities from the message body.
pub const DELIMITER: &[u8] = b"<IDS|MSG>";

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies messages with the connection key.
#[derive(Clone)]
pub struct Signer {
    key: Option<Vec<u8>>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("signed", &self.key.is_some())
            .finish()
    }
}

impl Signer {
    pub fn new(key: &str) -> Self {
        Self {
            key: (!key.is_empty()).then(|| key.as_bytes().to_vec()),
        }
    }

    fn mac(&self, parts: &[&[u8]]) -> Result<Option<HmacSha256>> {
        let Some(key) = &self.key else {
            return Ok(None);
        };
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| Error::signature(format!("invalid key: {}", e)))?;
        for part in parts {
            mac.update(part);
        }
        Ok(Some(mac))
    }

    /// Hex signature over `parts`; empty when unsigned.
    pub fn sign(&self, parts: &[&[u8]]) -> Result<String> {
        Ok(self
            .mac(parts)?
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default())
    }

    /// Constant-time check of a received hex signature.
    pub fn verify(&self, signature: &[u8], parts: &[&[u8]]) -> Result<()> {
        let Some(mac) = self.mac(parts)? else {
            return Ok(());
        };
        let expected = hex::decode(signature)
            .map_err(|_| Error::signature("signature is not valid hex"))?;
        mac.verify_slice(&expected)
            .map_err(|_| Error::signature("signature mismatch"))
    }
}

/// Serialize and sign a message into wire frames.
pub fn encode(message: &Message, signer: &Signer) -> Result<Vec<Bytes>> {
    let header = serde_json::to_vec(&message.header)?;
    let parent_header = serde_json::to_vec(&message.parent_header)?;
    let metadata = serde_json::to_vec(&message.metadata)?;
    let content = serde_json::to_vec(&message.content)?;
    let signature = signer.sign(&[
        header.as_slice(),
        parent_header.as_slice(),
        metadata.as_slice(),
        content.as_slice(),
    ])?;

    let mut frames = Vec::with_capacity(message.identities.len() + 6 + message.buffers.len());
    frames.extend(message.identities.iter().cloned());
    frames.push(Bytes::from_static(DELIMITER));
    frames.push(Bytes::from(signature));
    frames.push(Bytes::from(header));
    frames.push(Bytes::from(parent_header));
    frames.push(Bytes::from(metadata));
    frames.push(Bytes::from(content));
    frames.extend(message.buffers.iter().cloned());
    Ok(frames)
}

/// Verify and parse wire frames into a message.
pub fn decode(mut frames: Vec<Bytes>, signer: &Signer) -> Result<Message> {
    let delimiter = frames
        .iter()
        .position(|frame| &frame[..] == DELIMITER)
        .ok_or_else(|| Error::protocol("missing <IDS|MSG> delimiter"))?;
    if frames.len() < delimiter + 6 {
        return Err(Error::protocol(format!(
            "expected at least 5 frames after the delimiter, got {}",
            frames.len() - delimiter - 1
        )));
    }

    let buffers = frames.split_off(delimiter + 6);
    let body = frames.split_off(delimiter + 1);
    frames.truncate(delimiter);
    let identities = frames;

    let (signature, header, parent_header, metadata, content) =
        (&body[0][..], &body[1][..], &body[2][..], &body[3][..], &body[4][..]);
    signer.verify(signature, &[header, parent_header, metadata, content])?;

    let header: Header = serde_json::from_slice(header)?;
    Ok(Message {
        identities,
        header,
        parent_header: serde_json::from_slice(parent_header)?,
        metadata: serde_json::from_slice(metadata)?,
        content: serde_json::from_slice(content)?,
        buffers,
    })
}
