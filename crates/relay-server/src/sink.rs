//! `MessageSink` implementations over a WebSocket write half.
//!
//! Two delivery modes:
//! - [`InlineSink`]: the dispatching task encodes and writes the frame
//!   itself. A slow peer stalls that dispatch, and only that dispatch.
//! - [`QueuedSink`]: frames go into a bounded queue drained by a writer
//!   task. A full queue counts as a failed send, so the dispatcher drops
//!   the slow peer instead of waiting on it.
//!
//! Both share the session's `CancellationToken`: closing the sink cancels
//! it, which ends the receive loop too.

use std::fmt::Display;

use async_trait::async_trait;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use relay_core::{ChatMessage, MessageSink, SendError};
use relay_protocol::encode_message;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

fn encode_frame(msg: &ChatMessage) -> Result<Message, SendError> {
    let text = encode_message(msg).map_err(|e| SendError::Transport(e.to_string()))?;
    Ok(Message::Text(text.into()))
}

// -----------------------------------------------------------------------------
// Inline writes
// -----------------------------------------------------------------------------

pub struct InlineSink<W> {
    // Concurrent dispatches from different receive loops serialize here,
    // never on the registry lock.
    writer: Mutex<W>,
    closed: CancellationToken,
}

impl<W> InlineSink<W> {
    pub fn new(writer: W, closed: CancellationToken) -> Self {
        InlineSink {
            writer: Mutex::new(writer),
            closed,
        }
    }
}

#[async_trait]
impl<W> MessageSink for InlineSink<W>
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display + Send,
{
    async fn send(&self, msg: &ChatMessage) -> Result<(), SendError> {
        if self.closed.is_cancelled() {
            return Err(SendError::Closed);
        }
        let frame = encode_frame(msg)?;
        let mut writer = self.writer.lock().await;
        writer
            .send(frame)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))
    }

    async fn close(&self) {
        self.closed.cancel();
        let mut writer = self.writer.lock().await;
        // Peer may already be gone; nothing useful to do with the error.
        let _ = writer.close().await;
    }
}

// -----------------------------------------------------------------------------
// Queued writes
// -----------------------------------------------------------------------------

pub struct QueuedSink {
    tx: mpsc::Sender<Message>,
    closed: CancellationToken,
}

impl QueuedSink {
    /// Spawn the writer task for `writer` and return the queue in front of it.
    pub fn spawn<W>(writer: W, capacity: usize, closed: CancellationToken) -> Self
    where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: Display + Send,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_writer(writer, rx, closed.clone()));
        QueuedSink { tx, closed }
    }
}

#[async_trait]
impl MessageSink for QueuedSink {
    async fn send(&self, msg: &ChatMessage) -> Result<(), SendError> {
        if self.closed.is_cancelled() {
            return Err(SendError::Closed);
        }
        let frame = encode_frame(msg)?;
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    async fn close(&self) {
        self.closed.cancel();
    }
}

/// Writer task: drains the queue into the socket until the queue closes,
/// the session is cancelled, or a write fails.
async fn run_writer<W>(mut writer: W, mut rx: mpsc::Receiver<Message>, closed: CancellationToken)
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display + Send,
{
    loop {
        tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            next = rx.recv() => match next {
                Some(frame) => {
                    if let Err(e) = writer.send(frame).await {
                        debug!(error = %e, "outbound write failed");
                        // Ends the receive loop, which unregisters us.
                        closed.cancel();
                        break;
                    }
                }
                None => break,
            },
        }
    }
    let _ = writer.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{Connection, Dispatcher, MessageStore, Registry, StoreError};
    use chrono::Utc;
    use futures::channel::mpsc as fmpsc;
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;

    fn msg(n: i64) -> ChatMessage {
        ChatMessage::new(n, format!("m{}", n), Utc::now())
    }

    #[derive(Default)]
    struct MemoryStore {
        messages: std::sync::Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl MessageStore for MemoryStore {
        async fn append_message(&self, msg: &ChatMessage) -> Result<(), StoreError> {
            self.messages.lock().unwrap().push(msg.clone());
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let dispatcher = Dispatcher::new(Arc::new(Registry::new()), store.clone());
        (dispatcher, store)
    }

    fn text_of(frame: Message) -> String {
        match frame {
            Message::Text(t) => t.as_str().to_string(),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[tokio::test]
    async fn inline_sink_writes_text_frames() {
        let (tx, mut rx) = fmpsc::unbounded::<Message>();
        let sink = Connection::new(InlineSink::new(tx, CancellationToken::new()));

        sink.send(&msg(1)).await.unwrap();

        match rx.next().await {
            Some(Message::Text(text)) => assert!(text.as_str().contains("\"Content\":\"m1\"")),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn inline_sink_reports_dead_peer() {
        let (tx, rx) = fmpsc::unbounded::<Message>();
        drop(rx);
        let sink = Connection::new(InlineSink::new(tx, CancellationToken::new()));

        assert!(matches!(sink.send(&msg(1)).await, Err(SendError::Transport(_))));
    }

    #[tokio::test]
    async fn closing_cancels_the_session_and_refuses_sends() {
        let (tx, _rx) = fmpsc::unbounded::<Message>();
        let token = CancellationToken::new();
        let sink = Connection::new(InlineSink::new(tx, token.clone()));

        sink.close().await;
        sink.close().await;

        assert!(token.is_cancelled());
        assert!(matches!(sink.send(&msg(1)).await, Err(SendError::Closed)));
    }

    #[tokio::test]
    async fn queued_sink_delivers_in_order() {
        let (tx, rx) = fmpsc::unbounded::<Message>();
        let sink = Connection::new(QueuedSink::spawn(tx, 8, CancellationToken::new()));

        for n in 0..3 {
            sink.send(&msg(n)).await.unwrap();
        }

        let frames: Vec<Message> = tokio::time::timeout(Duration::from_secs(2), rx.take(3).collect())
            .await
            .unwrap();
        let contents: Vec<String> = frames
            .into_iter()
            .map(|f| match f {
                Message::Text(t) => t.as_str().to_string(),
                other => panic!("unexpected frame {:?}", other),
            })
            .collect();
        assert!(contents[0].contains("m0"));
        assert!(contents[1].contains("m1"));
        assert!(contents[2].contains("m2"));
    }

    #[tokio::test]
    async fn full_queue_is_a_send_failure() {
        let (tx, _rx) = fmpsc::unbounded::<Message>();
        let sink = Connection::new(QueuedSink::spawn(tx, 2, CancellationToken::new()));

        // Current-thread runtime: the writer task cannot run until we
        // yield, so the queue fills deterministically.
        sink.send(&msg(1)).await.unwrap();
        sink.send(&msg(2)).await.unwrap();
        assert!(matches!(sink.send(&msg(3)).await, Err(SendError::QueueFull)));
    }

    #[tokio::test]
    async fn writer_failure_cancels_the_session() {
        let (tx, rx) = fmpsc::unbounded::<Message>();
        drop(rx);
        let token = CancellationToken::new();
        let sink = Connection::new(QueuedSink::spawn(tx, 4, token.clone()));

        sink.send(&msg(1)).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), token.cancelled())
            .await
            .expect("writer did not cancel the session");
        assert!(matches!(sink.send(&msg(2)).await, Err(SendError::Closed)));
    }

    #[tokio::test]
    async fn dispatch_evicts_a_dead_inline_peer() {
        let (dispatcher, store) = dispatcher();

        let (live_tx, mut live_rx) = fmpsc::unbounded::<Message>();
        let live = Connection::new(InlineSink::new(live_tx, CancellationToken::new()));

        let (dead_tx, dead_rx) = fmpsc::unbounded::<Message>();
        drop(dead_rx);
        let dead_token = CancellationToken::new();
        let dead = Connection::new(InlineSink::new(dead_tx, dead_token.clone()));

        dispatcher.registry().add(dead.clone()).await;
        dispatcher.registry().add(live.clone()).await;

        dispatcher.dispatch(&msg(1)).await;
        dispatcher.dispatch(&msg(2)).await;

        assert!(!dispatcher.registry().contains(&dead).await);
        assert!(dispatcher.registry().contains(&live).await);
        assert!(dead_token.is_cancelled());

        assert!(text_of(live_rx.next().await.unwrap()).contains("m1"));
        assert!(text_of(live_rx.next().await.unwrap()).contains("m2"));
        assert_eq!(store.messages.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn dispatch_evicts_a_queued_peer_whose_queue_is_full() {
        let (dispatcher, store) = dispatcher();

        // Unread, zero-buffer channel: the writer task takes one frame,
        // then blocks forever on the next.
        let (stuck_tx, _stuck_rx) = fmpsc::channel::<Message>(0);
        let stuck_token = CancellationToken::new();
        let stuck = Connection::new(QueuedSink::spawn(stuck_tx, 1, stuck_token.clone()));

        let (fast_tx, fast_rx) = fmpsc::unbounded::<Message>();
        let fast = Connection::new(QueuedSink::spawn(fast_tx, 16, CancellationToken::new()));

        dispatcher.registry().add(stuck.clone()).await;
        dispatcher.registry().add(fast.clone()).await;

        for n in 0..5 {
            dispatcher.dispatch(&msg(n)).await;
            tokio::task::yield_now().await;
        }

        assert!(!dispatcher.registry().contains(&stuck).await);
        assert!(stuck_token.is_cancelled());
        assert!(matches!(stuck.send(&msg(9)).await, Err(SendError::Closed)));

        let frames: Vec<Message> = tokio::time::timeout(Duration::from_secs(2), fast_rx.take(5).collect())
            .await
            .unwrap();
        for (n, frame) in frames.into_iter().enumerate() {
            assert!(text_of(frame).contains(&format!("m{}", n)));
        }
        assert_eq!(store.messages.lock().unwrap().len(), 5);
    }
}
