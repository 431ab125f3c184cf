//! Broadcast dispatcher.
//!
//! `dispatch` is called inline from whichever receive loop got the
//! message. Policy:
//! - persist first; if the store rejects the message, nobody sees it.
//! - then deliver to every registry member, one after another, with the
//!   registry lock released.
//! - a member whose send fails is closed and removed; the rest still
//!   get the message.
//!
//! Nothing is reported back to the sender. Outcomes are only logged.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::message::ChatMessage;
use crate::registry::Registry;
use crate::store::MessageStore;

/// Persist-then-broadcast fan-out over a shared [`Registry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    store: Arc<dyn MessageStore>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, store: Arc<dyn MessageStore>) -> Self {
        Dispatcher { registry, store }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Persist `msg`, then fan it out to every live connection.
    pub async fn dispatch(&self, msg: &ChatMessage) {
        if let Err(e) = self.store.append_message(msg).await {
            warn!(
                user_id = msg.user_id(),
                error = %e,
                "failed to persist message, not broadcasting"
            );
            return;
        }

        // Snapshot so no send ever runs under the registry lock.
        let members = self.registry.snapshot().await;

        let mut delivered = 0usize;
        let mut evicted = 0usize;

        for conn in &members {
            match conn.send(msg).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(conn = %conn.id(), error = %e, "delivery failed, dropping connection");
                    self.evict(conn).await;
                    evicted += 1;
                }
            }
        }

        debug!(
            user_id = msg.user_id(),
            recipients = members.len(),
            delivered,
            evicted,
            "broadcast complete"
        );
    }

    async fn evict(&self, conn: &Connection) {
        self.registry.remove(conn).await;
        conn.close().await;
    }
}
