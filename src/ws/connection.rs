//! WebSocket connection state machine.
//!
//! One task per socket runs [`run_connection`]: it reads control messages,
//! advances the send queue one frame per turn, and parks the queue on
//! backpressure until the writer task reports drain.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::codec::decode_chunk;
use crate::delivery::{ConnectionState, QueueState, WsTransport, run_writer};
use crate::error::PushError;
use crate::session::{Channel, ConnectionId};

/// How long the writer may keep flushing after the connection loop ends.
const WRITER_SHUTDOWN: Duration = Duration::from_secs(1);

/// Runs the read/write loop for a single WebSocket connection opened on
/// `endpoint`.
///
/// - Text frames are handed to the [`Dispatcher`](super::Dispatcher).
/// - Queued binary frames are offered to the transport one per turn.
/// - On close the queue is discarded and the connection is detached from
///   every session that referenced it.
pub async fn run_connection(socket: WebSocket, endpoint: Channel, state: AppState) {
    let id = ConnectionId::new();
    info!(conn_id = %id, %endpoint, "connection opened");

    let (sink, mut stream) = socket.split();
    let (mut transport, rx) = WsTransport::new(state.policy);
    let gauge = transport.gauge().clone();
    let writer = tokio::spawn(run_writer(sink, rx, gauge.clone()));
    let mut conn = ConnectionState::new(id, endpoint);

    loop {
        tokio::select! {
            biased;
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let _ = state
                            .dispatcher
                            .dispatch(&mut conn, &mut transport, text.as_str())
                            .await;
                    }
                    Some(Ok(Message::Binary(bytes))) => inspect_binary(id, bytes),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(conn_id = %id, error = %e, "ws read failed");
                        break;
                    }
                }
            }
            () = gauge.drained(), if conn.queue.state() == QueueState::Waiting => {
                debug!(
                    conn_id = %id,
                    remaining = gauge.buffered(),
                    pending = conn.queue.len(),
                    "drain"
                );
                let _ = conn.queue.on_drain();
            }
            () = tokio::task::yield_now(), if conn.queue.state() == QueueState::Sending => {
                let _ = conn.queue.step(&mut transport);
            }
        }

        if conn.queue.state() == QueueState::Closed {
            info!(conn_id = %id, reason = %PushError::ConnectionClosed, "transport gone");
            break;
        }
    }

    let discarded = conn.queue.on_close();
    drop(transport);
    let abort = writer.abort_handle();
    if tokio::time::timeout(WRITER_SHUTDOWN, writer).await.is_err() {
        debug!(conn_id = %id, "writer did not finish, aborting");
        abort.abort();
    }

    let left = state.dispatcher.registry().detach(id).await;
    for uuid in &left {
        info!(%uuid, "user disconnected");
    }
    info!(
        conn_id = %id,
        %endpoint,
        discarded,
        users_left = left.len(),
        "connection closed"
    );
}

/// Clients are not expected to send binary data; well-formed chunk frames
/// are logged and discarded, anything else is rejected.
fn inspect_binary(id: ConnectionId, bytes: Bytes) {
    match decode_chunk(bytes) {
        Ok(chunk) => debug!(
            conn_id = %id,
            message_id = chunk.message_id,
            chunk_index = chunk.chunk_index,
            "ignoring inbound chunk"
        ),
        Err(e) => warn!(conn_id = %id, error = %e, "rejecting inbound binary frame"),
    }
}
