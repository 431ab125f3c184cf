//! relay-core
//!
//! Transport-agnostic core of the chat relay:
//! - the chat message model
//! - connection handles and the `MessageSink` delivery seam
//! - the connection registry (add / remove / snapshot under one lock)
//! - the broadcast dispatcher (persist, then fan out)
//! - the `MessageStore` persistence seam

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod registry;
pub mod store;

pub use connection::{Connection, ConnectionId, MessageSink};
pub use dispatcher::Dispatcher;
pub use error::{SendError, StoreError};
pub use message::ChatMessage;
pub use registry::Registry;
pub use store::MessageStore;
