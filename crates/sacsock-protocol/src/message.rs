//! Message types for the sac-sock protocol.
//!
//! A [`Message`] is the logical unit the codec produces: an event name, the set of
//! header flags found on the wire, and a typed [`Payload`]. A [`WireFrame`] is what
//! actually travels over the socket.

use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Header flag marking a JSON-encoded payload.
pub const JSON_FLAG: char = 'J';

/// Header flag the reference server attaches to string payloads.
pub const STRING_FLAG: char = 'S';

/// Header flag the reference server attaches to binary payloads.
pub const BINARY_FLAG: char = 'B';

/// The set of single-character header flags carried by a frame.
///
/// Flags have set semantics: a flag repeated on the wire is recorded once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFlags(BTreeSet<char>);

impl HeaderFlags {
    /// Create an empty flag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a flag.
    pub fn insert(&mut self, flag: char) {
        self.0.insert(flag);
    }

    /// Check whether a flag is present.
    #[must_use]
    pub fn contains(&self, flag: char) -> bool {
        self.0.contains(&flag)
    }

    /// Whether the payload is flagged as JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.contains(JSON_FLAG)
    }

    /// Number of distinct flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no flags are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<char> for HeaderFlags {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain string data, sent as a text frame.
    Text(String),
    /// Structured data, sent as JSON text.
    Json(serde_json::Value),
    /// Raw bytes, sent as a binary frame.
    Binary(Bytes),
}

impl Payload {
    /// Build a JSON payload from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Payload::Json)
    }

    /// Get the payload as a string slice, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the payload as a JSON value, if it is JSON.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Get the payload as bytes, if it is binary.
    #[must_use]
    pub fn as_binary(&self) -> Option<&Bytes> {
        match self {
            Payload::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Short name of the variant, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Json(_) => "json",
            Payload::Binary(_) => "binary",
        }
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Json(v)
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Payload::Binary(b)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(b))
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Event name used for dispatch.
    pub event: String,
    /// Header flags present on the wire.
    pub headers: HeaderFlags,
    /// Typed payload.
    pub payload: Payload,
}

impl Message {
    /// Create a message with no header flags.
    #[must_use]
    pub fn new(event: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            event: event.into(),
            headers: HeaderFlags::new(),
            payload: payload.into(),
        }
    }

    /// Attach a header flag.
    #[must_use]
    pub fn with_flag(mut self, flag: char) -> Self {
        self.headers.insert(flag);
        self
    }
}

/// A raw socket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    /// A UTF-8 text frame.
    Text(String),
    /// A binary frame.
    Binary(Bytes),
}

impl WireFrame {
    /// Size of the frame body in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            WireFrame::Text(s) => s.len(),
            WireFrame::Binary(b) => b.len(),
        }
    }

    /// Whether the frame body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for WireFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFrame::Text(s) => write!(f, "text({} bytes)", s.len()),
            WireFrame::Binary(b) => write!(f, "binary({} bytes)", b.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_flags_collapse_duplicates() {
        let flags: HeaderFlags = "JJSJ".chars().collect();
        assert_eq!(flags.len(), 2);
        assert!(flags.is_json());
        assert!(flags.contains(STRING_FLAG));
        assert!(!flags.contains(BINARY_FLAG));
    }

    #[test]
    fn test_payload_accessors() {
        let text = Payload::from("hello");
        assert_eq!(text.as_text(), Some("hello"));
        assert!(text.as_json().is_none());
        assert_eq!(text.kind(), "text");

        let bin = Payload::from(vec![1u8, 2, 3]);
        assert_eq!(bin.as_binary().map(|b| b.len()), Some(3));
        assert_eq!(bin.kind(), "binary");
    }

    #[test]
    fn test_payload_json_from_struct() {
        #[derive(Serialize)]
        struct Chat<'a> {
            room: &'a str,
            body: &'a str,
        }

        let payload = Payload::json(&Chat {
            room: "lobby",
            body: "hi",
        })
        .unwrap();
        assert_eq!(
            payload.as_json(),
            Some(&serde_json::json!({"room": "lobby", "body": "hi"}))
        );
    }

    #[test]
    fn test_message_with_flag() {
        let msg = Message::new("chat", "hi").with_flag(JSON_FLAG);
        assert_eq!(msg.event, "chat");
        assert!(msg.headers.is_json());
    }
}
