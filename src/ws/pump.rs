//! Connection pump: the per-participant loop pair bridging one WebSocket
//! to the room's event channels.
//!
//! The inbound loop decodes one frame at a time, stamps it with the
//! participant's identity, and forwards it to the room. The outbound loop
//! drains the participant's bounded queue and drives a periodic keepalive
//! probe, every write bounded by a deadline. Either loop terminating for
//! any reason requests Leave; the request is idempotent, so both loops
//! asking is harmless.

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::WireMessage;
use crate::domain::{RoomHandle, RoomMessage};

/// Tunables for one connection's pump pair.
#[derive(Debug, Clone, Copy)]
pub struct PumpSettings {
    /// Capacity of each participant's outbound queue.
    pub send_queue_capacity: usize,
    /// Largest accepted inbound text frame, in bytes.
    pub max_frame_bytes: usize,
    /// Interval between keepalive probes.
    pub keepalive_interval: Duration,
    /// Deadline for any single write to the socket.
    pub write_deadline: Duration,
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            send_queue_capacity: 512,
            max_frame_bytes: 512,
            // 90% of the conventional 60s pong window.
            keepalive_interval: Duration::from_secs(54),
            write_deadline: Duration::from_secs(10),
        }
    }
}

/// Runs both pump loops for one subscribed participant until the
/// connection dies or the room closes the outbound queue.
pub async fn run_connection(
    socket: WebSocket,
    room: RoomHandle,
    bidder_id: Uuid,
    outbound_rx: mpsc::Receiver<RoomMessage>,
    settings: PumpSettings,
) {
    let (ws_tx, ws_rx) = socket.split();

    let writer_room = room.clone();
    let writer = tokio::spawn(async move {
        outbound_loop(ws_tx, outbound_rx, &settings).await;
        writer_room.leave(bidder_id).await;
    });

    inbound_loop(ws_rx, &room, bidder_id, settings.max_frame_bytes).await;
    room.leave(bidder_id).await;

    // Leave closes the outbound queue, which ends the writer.
    let _ = writer.await;
    tracing::debug!(%bidder_id, "connection pumps stopped");
}

/// Decodes frames from the socket and forwards them to the room.
///
/// A decode failure becomes an `InvalidInput` domain message; only a
/// transport-level close or error ends the loop.
async fn inbound_loop(
    mut ws_rx: SplitStream<WebSocket>,
    room: &RoomHandle,
    bidder_id: Uuid,
    max_frame_bytes: usize,
) {
    while let Some(frame) = ws_rx.next().await {
        let message = match frame {
            Ok(Message::Text(text)) => decode_frame(text.as_str(), bidder_id, max_frame_bytes),
            Ok(Message::Binary(_)) => RoomMessage::InvalidInput {
                bidder_id,
                detail: "expected a text frame".to_string(),
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Err(err) => {
                tracing::debug!(%bidder_id, error = %err, "websocket read failed");
                break;
            }
        };

        // A closed room means the auction is over; stop producing.
        if room.send(message).await.is_err() {
            break;
        }
    }
}

/// Turns one text frame into a domain message, never dropping the
/// connection over bad input.
fn decode_frame(text: &str, bidder_id: Uuid, max_frame_bytes: usize) -> RoomMessage {
    if text.len() > max_frame_bytes {
        return RoomMessage::InvalidInput {
            bidder_id,
            detail: format!("frame exceeds {max_frame_bytes} bytes"),
        };
    }

    match serde_json::from_str::<WireMessage>(text) {
        Ok(wire) => wire
            .into_inbound(bidder_id)
            .unwrap_or_else(|detail| RoomMessage::InvalidInput { bidder_id, detail }),
        Err(_) => RoomMessage::InvalidInput {
            bidder_id,
            detail: "invalid json".to_string(),
        },
    }
}

/// Drains the outbound queue to the socket and keeps the connection alive.
///
/// Exits on the first failed or timed-out write, or when the room closes
/// the queue (final close notice is best-effort).
async fn outbound_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<RoomMessage>,
    settings: &PumpSettings,
) {
    let start = tokio::time::Instant::now() + settings.keepalive_interval;
    let mut keepalive = tokio::time::interval_at(start, settings.keepalive_interval);
    keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            item = outbound_rx.recv() => match item {
                Some(message) => {
                    let json = serde_json::to_string(&WireMessage::outbound(&message))
                        .unwrap_or_default();
                    if write_frame(&mut ws_tx, Message::text(json), settings.write_deadline)
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                None => {
                    // Queue closed by the room: terminal state.
                    let _ = write_frame(&mut ws_tx, Message::Close(None), settings.write_deadline)
                        .await;
                    return;
                }
            },
            _ = keepalive.tick() => {
                if write_frame(&mut ws_tx, Message::Ping(Bytes::new()), settings.write_deadline)
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}

/// Writes one frame under the configured deadline.
async fn write_frame(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    frame: Message,
    deadline: Duration,
) -> Result<(), ()> {
    match tokio::time::timeout(deadline, ws_tx.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) | Err(_) => Err(()),
    }
}
