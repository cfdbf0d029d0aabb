//! JSON codec for the [`Envelope`] wire unit.
//!
//! Decoding is strict about shape (exactly a `{command, payload}` object
//! with string fields) and indifferent to the command tag itself.

use serde_json::Value;

use crate::error::ChannelError;
use crate::message::Envelope;

pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Serialize an envelope to its textual wire form.
    pub fn encode(envelope: &Envelope) -> Result<String, ChannelError> {
        serde_json::to_string(envelope).map_err(|e| ChannelError::Encoding(e.to_string()))
    }

    /// Shorthand for encoding a `(command, payload)` pair.
    pub fn encode_parts(command: &str, payload: &str) -> Result<String, ChannelError> {
        Self::encode(&Envelope::new(command, payload))
    }

    pub fn decode(text: &str) -> Result<Envelope, ChannelError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode a binary frame. The bytes must be UTF-8 JSON.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Envelope, ChannelError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ChannelError::MalformedMessage(format!("invalid utf-8: {e}")))?;
        Self::decode(text)
    }

    fn from_value(value: Value) -> Result<Envelope, ChannelError> {
        // serde would accept a two-element array for a struct.
        if !value.is_object() {
            return Err(ChannelError::MalformedMessage(
                "envelope is not a JSON object".into(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}
