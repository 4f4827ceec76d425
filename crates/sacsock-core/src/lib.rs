//! # sacsock-core
//!
//! Client-side building blocks for the sac-sock event protocol.
//!
//! - **Registry** - Named event handlers, one per event
//! - **Hooks** - Single-slot connect/disconnect callbacks
//! - **Policy** - Reconnect configuration
//! - **Lifecycle** - The connect/disconnect/reconnect state machine
//! - **State** - Transport ready state shared with callers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Transport  │────▶│    Codec    │────▶│  Registry   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐     ┌─────────────┐
//! │  Lifecycle  │────▶│    Hooks    │
//! └─────────────┘     └─────────────┘
//! ```

pub mod hooks;
pub mod lifecycle;
pub mod policy;
pub mod registry;
pub mod state;

pub use hooks::{LifecycleHook, LifecycleHooks};
pub use lifecycle::{CloseOutcome, Lifecycle, OpenMode};
pub use policy::ReconnectPolicy;
pub use registry::{EventHandler, EventRegistry, RegistryError};
pub use state::{AtomicReadyState, ReadyState};
