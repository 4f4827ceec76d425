//! # sacsock-protocol
//!
//! Wire framing for the sac-sock event protocol.
//!
//! Every socket message names an event and carries one payload:
//!
//! ```text
//! <event name> [0x01 <flag>*] 0x02 <payload>
//! ```
//!
//! The optional header section holds single-character flags; `J` marks a
//! JSON payload. Frames travel as WebSocket text or binary messages under the
//! `sac-sock` subprotocol.
//!
//! ## Example
//!
//! ```rust
//! use sacsock_protocol::{codec, Payload, WireFrame};
//!
//! let frame = codec::encode("chat", &Payload::Text("hello".into())).unwrap();
//! assert_eq!(frame, WireFrame::Text("chat\u{2}hello".into()));
//!
//! let message = codec::decode(&frame).unwrap().unwrap();
//! assert_eq!(message.event, "chat");
//! ```

pub mod codec;
pub mod message;
pub mod subprotocol;

pub use codec::{decode, encode, FrameCodec, HeaderMode, ProtocolError};
pub use message::{HeaderFlags, Message, Payload, WireFrame, JSON_FLAG};
pub use subprotocol::SUBPROTOCOL;
