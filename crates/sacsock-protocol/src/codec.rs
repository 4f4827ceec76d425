//! Codec for encoding and decoding sac-sock frames.
//!
//! A frame is `<event>[0x01 <flags>*]0x02<payload>`, carried either as a text
//! or a binary socket message. The same scan is used for both encodings so a
//! text frame and a binary frame with equal bytes decode to the same message.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use thiserror::Error;

use crate::message::{HeaderFlags, Message, Payload, WireFrame, JSON_FLAG};

/// Marks the start of the header flag section.
pub const HEADER_START: u8 = 0x01;

/// Marks the start of the payload.
pub const DATA_START: u8 = 0x02;

const HEADER_START_CHAR: char = HEADER_START as char;
const DATA_START_CHAR: char = DATA_START as char;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Event name is empty or contains a control byte.
    #[error("Invalid event name: {0}")]
    InvalidEventName(&'static str),

    /// Header flags are not valid UTF-8.
    #[error("Invalid header: {0}")]
    InvalidHeader(&'static str),

    /// Payload could not be serialized.
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// A JSON-flagged payload failed to parse.
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),
}

/// Controls whether the encoder writes a header section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderMode {
    /// Never write header flags. Servers that split on the first `DATA_START`
    /// only understand this form.
    #[default]
    Legacy,
    /// Write the `J` flag for JSON payloads so decoding recovers it.
    Symmetric,
}

/// Validate an event name.
///
/// # Errors
///
/// Returns an error message if the name is empty or contains a control byte.
pub fn validate_event_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Event name cannot be empty");
    }
    if name.bytes().any(|b| b == HEADER_START || b == DATA_START) {
        return Err("Event name contains a reserved control byte");
    }
    Ok(())
}

/// Encode an event without header flags.
///
/// # Errors
///
/// Returns an error if the event name is invalid.
pub fn encode(event: &str, payload: &Payload) -> Result<WireFrame, ProtocolError> {
    encode_with(HeaderMode::Legacy, event, payload)
}

/// Encode an event using the given header mode.
///
/// # Errors
///
/// Returns an error if the event name is invalid.
pub fn encode_with(
    mode: HeaderMode,
    event: &str,
    payload: &Payload,
) -> Result<WireFrame, ProtocolError> {
    validate_event_name(event).map_err(ProtocolError::InvalidEventName)?;

    let frame = match payload {
        Payload::Binary(data) => {
            let mut buf = BytesMut::with_capacity(event.len() + 1 + data.len());
            buf.extend_from_slice(event.as_bytes());
            buf.put_u8(DATA_START);
            buf.extend_from_slice(data);
            WireFrame::Binary(buf.freeze())
        }
        Payload::Json(value) => {
            let body = serde_json::to_string(value).map_err(ProtocolError::InvalidPayload)?;
            let mut text = String::with_capacity(event.len() + 3 + body.len());
            text.push_str(event);
            if mode == HeaderMode::Symmetric {
                text.push(HEADER_START_CHAR);
                text.push(JSON_FLAG);
            }
            text.push(DATA_START_CHAR);
            text.push_str(&body);
            WireFrame::Text(text)
        }
        Payload::Text(body) => {
            let mut text = String::with_capacity(event.len() + 1 + body.len());
            text.push_str(event);
            text.push(DATA_START_CHAR);
            text.push_str(body);
            WireFrame::Text(text)
        }
    };

    Ok(frame)
}

/// Serialize `value` and encode it as a JSON event.
///
/// # Errors
///
/// Returns an error if serialization fails or the event name is invalid.
pub fn encode_json<T: Serialize + ?Sized>(
    mode: HeaderMode,
    event: &str,
    value: &T,
) -> Result<WireFrame, ProtocolError> {
    let payload = Payload::json(value).map_err(ProtocolError::InvalidPayload)?;
    encode_with(mode, event, &payload)
}

/// Decode a socket message.
///
/// Returns `Ok(None)` for frames that carry nothing to dispatch: no event name,
/// or no `DATA_START` marker.
///
/// # Errors
///
/// Returns an error if a JSON-flagged payload does not parse, or a binary
/// event name is not UTF-8.
pub fn decode(frame: &WireFrame) -> Result<Option<Message>, ProtocolError> {
    match frame {
        WireFrame::Text(text) => decode_text(text),
        WireFrame::Binary(data) => decode_binary(data),
    }
}

/// Decode a text frame.
///
/// # Errors
///
/// Returns an error if a JSON-flagged payload does not parse.
pub fn decode_text(text: &str) -> Result<Option<Message>, ProtocolError> {
    let mut event = String::new();
    let mut headers = HeaderFlags::new();
    let mut in_headers = false;

    for (idx, chr) in text.char_indices() {
        match chr {
            DATA_START_CHAR => {
                if event.is_empty() {
                    return Ok(None);
                }
                let body = &text[idx + 1..];
                let payload = if headers.is_json() {
                    Payload::Json(serde_json::from_str(body).map_err(ProtocolError::MalformedPayload)?)
                } else {
                    Payload::Text(body.to_string())
                };
                return Ok(Some(Message {
                    event,
                    headers,
                    payload,
                }));
            }
            HEADER_START_CHAR if !in_headers => in_headers = true,
            _ if in_headers => headers.insert(chr),
            _ => event.push(chr),
        }
    }

    Ok(None)
}

/// Decode a binary frame. The payload is a zero-copy slice of `data`.
///
/// Event name and header flags are read as UTF-8, so a binary frame decodes
/// to the same event and flags as a text frame with equal bytes.
///
/// # Errors
///
/// Returns an error if a JSON-flagged payload does not parse, or the event
/// name or header flags are not UTF-8.
pub fn decode_binary(data: &Bytes) -> Result<Option<Message>, ProtocolError> {
    let Some(data_start) = data.iter().position(|&b| b == DATA_START) else {
        return Ok(None);
    };

    let head = &data[..data_start];
    let (name, flags) = match head.iter().position(|&b| b == HEADER_START) {
        Some(idx) => (&head[..idx], &head[idx + 1..]),
        None => (head, &head[head.len()..]),
    };
    if name.is_empty() {
        return Ok(None);
    }

    let event = std::str::from_utf8(name)
        .map_err(|_| ProtocolError::InvalidEventName("Event name is not UTF-8"))?
        .to_string();
    let headers: HeaderFlags = std::str::from_utf8(flags)
        .map_err(|_| ProtocolError::InvalidHeader("Header flags are not UTF-8"))?
        .chars()
        .collect();

    let body = data.slice(data_start + 1..);
    let payload = if headers.is_json() {
        Payload::Json(serde_json::from_slice(&body).map_err(ProtocolError::MalformedPayload)?)
    } else {
        Payload::Binary(body)
    };

    Ok(Some(Message {
        event,
        headers,
        payload,
    }))
}

/// Codec bound to a header mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    mode: HeaderMode,
}

impl FrameCodec {
    /// Create a codec that never writes header flags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with the given header mode.
    #[must_use]
    pub fn with_mode(mode: HeaderMode) -> Self {
        Self { mode }
    }

    /// Encode an event.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self, event: &str, payload: &Payload) -> Result<WireFrame, ProtocolError> {
        encode_with(self.mode, event, payload)
    }

    /// Decode a socket message.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode(&self, frame: &WireFrame) -> Result<Option<Message>, ProtocolError> {
        decode(frame)
    }
}
