//! Manual smoke-test client for a running relay.
//!
//! Connects, waits for its identity, sends a series of `move` frames and logs
//! every frame relayed to it.

use clap::Parser;
use futures::{SinkExt, StreamExt};
use log::{info, warn};
use serde_json::json;
use shared::{classify, MessageKind, ServerMessage};
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the relay
    #[arg(short, long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Number of move messages to send
    #[arg(short, long, default_value = "10")]
    moves: u32,

    /// Delay between moves in milliseconds, at least 1
    #[arg(short, long, default_value = "500", value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    info!("Connecting to {}", args.url);

    let (socket, _) = connect_async(args.url.as_str()).await?;
    let (mut writer, mut reader) = socket.split();

    let client_id = loop {
        match reader.next().await {
            Some(Ok(Message::Text(text))) => {
                if let Ok(ServerMessage::Id { id }) = serde_json::from_str(text.as_str()) {
                    break id;
                }
                info!("Received before id: {}", text.as_str());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
            None => return Err("connection closed before an id was assigned".into()),
        }
    };
    info!("Assigned id {}", client_id);

    let reader_task = tokio::spawn(async move {
        while let Some(frame) = reader.next().await {
            match frame {
                Ok(Message::Text(text)) => match classify(text.as_str().as_bytes()) {
                    MessageKind::Leave => info!("Player left: {}", text.as_str()),
                    kind => info!("Received {:?}: {}", kind, text.as_str()),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Read error: {}", e);
                    break;
                }
            }
        }
    });

    let mut ticker = interval(Duration::from_millis(args.interval_ms));
    for step in 0..args.moves {
        ticker.tick().await;
        let movement = json!({
            "type": "move",
            "x": step,
            "y": step * 2,
            "id": client_id,
        });
        writer.send(Message::text(movement.to_string())).await?;
        info!("Sent move {}", step + 1);
    }

    writer.send(Message::Close(None)).await?;
    let _ = reader_task.await;
    info!("Probe finished");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_defaults_to_half_a_second() {
        let args = Args::try_parse_from(["smoke-client"]).unwrap();
        assert_eq!(args.interval_ms, 500);
        assert_eq!(args.moves, 10);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(Args::try_parse_from(["smoke-client", "--interval-ms", "0"]).is_err());
        assert!(Args::try_parse_from(["smoke-client", "-i", "1"]).is_ok());
    }
}
