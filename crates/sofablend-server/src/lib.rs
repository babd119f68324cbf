//! Sofablend Server - live simulation state over TCP.
//!
//! A simulation streams `<SOFABlender>{json}</SOFABlender>` messages; the
//! server reassembles them per connection and hands each one to a
//! [`MessageHandler`], by default a [`SceneSink`] that merges it into a
//! shared scene graph.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sofablend_server::{SceneSink, ServerOptions, ServerSession};
//!
//! let sink = SceneSink::new();
//! let scene = sink.scene();
//! let session = ServerSession::start(ServerOptions::default(), Arc::new(sink))?;
//! // ... scene.lock() to read the live graph ...
//! session.stop();
//! ```

pub mod client;
pub mod error;
pub mod framing;
pub mod handler;
pub mod options;
pub mod session;

pub use client::StreamClient;
pub use error::{Result, ServerError};
pub use framing::{FrameDecoder, CLOSE_TAG, OPEN_TAG};
pub use handler::{decode_message, lock_scene, LiveScene, MessageHandler, SceneSink, SharedScene};
pub use options::ServerOptions;
pub use session::{ServerEvent, ServerSession};
