//! Echo round trip against a WebSocket server.
//!
//! Demonstrates:
//! - Opening a connection
//! - Sending a text payload
//! - Pulling replies from the receive stream
//! - Closing and observing the close event
//!
//! Usage:
//!   cargo run --example echo -- ws://127.0.0.1:9001
//!   RUST_LOG=ws_bridge=debug cargo run --example echo

// ============================================================================
// Imports
// ============================================================================

use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;

use ws_bridge::{Payload, open};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "ws://127.0.0.1:9001";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    if let Err(e) = run(&url).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(url: &str) -> anyhow::Result<()> {
    println!("connecting to {url}...");
    let handle = open(url).await?;
    println!("connected (state: {})", handle.ready_state());

    handle.send("hello from ws-bridge")?;

    let mut messages = handle.receive();
    if let Some(message) = messages.next().await {
        match message?.payload {
            Payload::Text(text) => println!("<- {text}"),
            Payload::Binary(bytes) => println!("<- {} binary bytes", bytes.len()),
        }
    }

    let close = handle.close().await?;
    println!("closed: code={} reason={:?}", close.code, close.reason);

    Ok(())
}
