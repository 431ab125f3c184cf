//! Persistence seam.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::message::ChatMessage;

/// Durable store for chat messages.
///
/// The dispatcher only cares whether `append_message` succeeded; the
/// schema behind it is the implementor's business.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append_message(&self, msg: &ChatMessage) -> Result<(), StoreError>;
}
