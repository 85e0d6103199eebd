//! Replay captured GT06 frames against a running gateway.
//!
//! Usage: cargo run --example replay_device [HOST] [PORT]
//!
//! Default target: 127.0.0.1:5023

use gt06_gateway::gt06::{bytes_to_hex, hex_to_bytes};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, sleep, timeout};

/// Frames captured from a live device, hex-encoded.
const CAPTURED_FRAMES: [(&str, &str); 3] = [
    ("login", "78780d0103577189512272510008f80d0a"),
    ("heartbeat", "78780b0403577189512272510002f10d0a"),
    (
        "location",
        "787821010357718951227251000800603a0c0b93c3e800780023005a190c0207243a90ae0d0a",
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let host = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = std::env::args().nth(2).and_then(|s| s.parse().ok()).unwrap_or(5023);

    println!("Replaying captured frames to {host}:{port}");
    println!("======================================");

    let mut stream = TcpStream::connect((host.as_str(), port)).await?;

    for (i, (name, hex)) in CAPTURED_FRAMES.iter().enumerate() {
        let frame = hex_to_bytes(hex)?;
        println!("\n[{}] Sending {name} ({} bytes)...", i + 1, frame.len());
        stream.write_all(&frame).await?;

        match read_ack(&mut stream).await {
            Some(ack) => println!("    Ack: {ack}"),
            None => println!("    No ack within 5s"),
        }
    }

    // Devices on flaky links fragment frames arbitrarily; send one in two
    // pieces to show the gateway reassembling it.
    let frame = hex_to_bytes(CAPTURED_FRAMES[2].1)?;
    println!("\n[4] Sending location split across two writes...");
    stream.write_all(&frame[..11]).await?;
    stream.flush().await?;
    sleep(Duration::from_millis(200)).await;
    stream.write_all(&frame[11..]).await?;

    match read_ack(&mut stream).await {
        Some(ack) => println!("    Ack: {ack}"),
        None => println!("    No ack within 5s"),
    }

    println!("\n======================================");
    println!("Done!");

    Ok(())
}

/// Read one 10-byte ack, hex-encoded for display.
async fn read_ack(stream: &mut TcpStream) -> Option<String> {
    let mut ack = [0u8; 10];
    match timeout(Duration::from_secs(5), stream.read_exact(&mut ack)).await {
        Ok(Ok(_)) => Some(bytes_to_hex(&ack)),
        _ => None,
    }
}
