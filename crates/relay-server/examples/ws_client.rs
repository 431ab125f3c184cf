//! Interactive client for the chat relay.
//!
//! Every stdin line is sent as one envelope; every envelope the relay
//! broadcasts (including our own) is printed.
//!
//! - `RELAY_CLIENT_URL`  (default: "ws://127.0.0.1:8000/ws")
//! - `RELAY_CLIENT_USER` (default: "1")

use std::env;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use relay_core::ChatMessage;
use relay_protocol::{decode_message, encode_message};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[tokio::main]
async fn main() -> Result<()> {
    let url = env::var("RELAY_CLIENT_URL").unwrap_or_else(|_| "ws://127.0.0.1:8000/ws".to_string());
    let user_id: i64 = env::var("RELAY_CLIENT_USER")
        .unwrap_or_else(|_| "1".to_string())
        .parse()
        .context("RELAY_CLIENT_USER must be an integer")?;

    println!("Connecting to {}...", url);
    let (ws, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("connecting to {}", url))?;
    println!("Connected as user {}. Type a message and press enter; 'quit' to leave.\n", user_id);

    let (mut write, mut read) = ws.split();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!("\nEOF on stdin, exiting client.");
                    break;
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
                    println!("Exiting client.");
                    break;
                }
                let msg = ChatMessage::new(user_id, trimmed, Utc::now());
                write.send(Message::text(encode_message(&msg)?)).await?;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode_message(text.as_bytes(), Utc::now()) {
                    Ok(msg) => println!(
                        "<< [{}] user {}: {}",
                        msg.time().format("%H:%M:%S"),
                        msg.user_id(),
                        msg.content()
                    ),
                    Err(e) => eprintln!("Undecodable frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    println!("Server closed the connection.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    eprintln!("Read error: {}", e);
                    break;
                }
            },
        }
    }

    let _ = write.close().await;
    Ok(())
}
