//! TCP listener and per-connection decode pipeline.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::gt06::{
    DecodedRecord, Frame, FrameReassembler, ack_for, bytes_to_hex, decode, verify_checksum,
};
use crate::sink::{RecordSink, StoredRecord};

/// Queue depth between connection tasks and the sink writer.
const SINK_QUEUE: usize = 256;

/// Spawn the task draining decoded records into the sink.
///
/// Returns the sender side; connection tasks hold clones of it.
pub fn spawn_sink_writer(mut sink: Box<dyn RecordSink>) -> mpsc::Sender<StoredRecord> {
    let (tx, mut rx) = mpsc::channel::<StoredRecord>(SINK_QUEUE);
    tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            if let Err(e) = sink.store(&record) {
                warn!("Failed to store record: {e}");
            }
        }
        debug!("Sink writer stopped");
    });
    tx
}

/// Accept device connections until a shutdown signal arrives.
///
/// Each connection gets its own task and its own reassembler, so feeds for
/// one connection never interleave.
pub async fn run(config: &AppConfig, records: mpsc::Sender<StoredRecord>) -> Result<()> {
    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening for devices on {addr}");

    let idle_timeout = Duration::from_secs(config.server.idle_timeout_secs);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                debug!("{peer}: connected");
                tokio::spawn(handle_connection(stream, peer, records.clone(), idle_timeout));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

/// Read, reassemble, decode and acknowledge until the device goes away.
///
/// The connection's reassembler state dies with this task.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    records: mpsc::Sender<StoredRecord>,
    idle_timeout: Duration,
) {
    let mut reassembler = FrameReassembler::new();
    let mut buf = [0u8; 2048];

    'connection: loop {
        let n = match timeout(idle_timeout, stream.read(&mut buf)).await {
            Err(_) => {
                info!("{peer}: idle for {idle_timeout:?}, closing");
                break;
            }
            Ok(Ok(0)) => {
                debug!("{peer}: disconnected");
                break;
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                warn!("{peer}: read failed: {e}");
                break;
            }
        };

        for frame in reassembler.feed(&buf[..n]) {
            if let Err(e) = process_frame(&mut stream, peer, &frame, &records).await {
                warn!("{peer}: dropping connection: {e}");
                break 'connection;
            }
        }
    }
}

/// Handle one complete frame: verify, decode, acknowledge, forward.
///
/// Only a failed ack write is an error (the socket is gone); every protocol
/// problem is logged and survived.
async fn process_frame(
    stream: &mut TcpStream,
    peer: SocketAddr,
    frame: &Frame,
    records: &mpsc::Sender<StoredRecord>,
) -> Result<()> {
    let bytes = frame.as_bytes();
    debug!("{peer}: frame {}", bytes_to_hex(bytes));

    match verify_checksum(bytes) {
        Some(report) if !report.valid => warn!(
            "{peer}: checksum mismatch (frame {:#04x}, computed {:#04x}), keeping frame",
            report.expected, report.actual
        ),
        None => warn!("{peer}: frame too short to carry a checksum"),
        _ => {}
    }

    let record = match decode(frame) {
        Ok(record) => record,
        Err(e) => {
            warn!("{peer}: frame rejected: {e}");
            return Ok(());
        }
    };

    match &record {
        DecodedRecord::Login(r) => info!("{peer}: login from {}", r.device_id),
        DecodedRecord::Heartbeat(r) => debug!("{peer}: heartbeat from {}", r.device_id),
        DecodedRecord::Location(r) => info!(
            "{peer}: {} at {:.6}{} {:.6}{}, {:.1} km/h, {} sats",
            r.device_id,
            r.latitude.degrees.abs(),
            r.latitude.hemisphere,
            r.longitude.degrees.abs(),
            r.longitude.hemisphere,
            r.speed_kmh,
            r.satellites
        ),
        DecodedRecord::GpsNotReady(r) => debug!(
            "{peer}: {} waiting for satellite lock ({}-byte report)",
            r.device_id, r.frame_len
        ),
        DecodedRecord::Unknown(r) => debug!(
            "{peer}: unhandled message type {:#04x}",
            r.message_type
        ),
        DecodedRecord::Failed(r) => warn!("{peer}: undecodable frame: {}", r.error),
    }

    if let Some(ack) = ack_for(frame) {
        stream.write_all(&ack).await?;
        debug!("{peer}: ack {}", bytes_to_hex(&ack));
    }

    let stored = StoredRecord {
        received_at: Utc::now(),
        peer,
        record,
    };
    if records.send(stored).await.is_err() {
        warn!("{peer}: sink closed, record dropped");
    }

    Ok(())
}
