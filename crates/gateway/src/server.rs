use crate::error::GatewayError;
use crate::lane::{ConnId, LaneMessage, Outbound};
use crate::pool::DecodePool;
use base::{log_info, log_warn};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio_websockets::{Message, ServerBuilder};

/// Accepts WebSocket connections and drives the per-connection state
/// machine described in the component design: each accepted socket gets a
/// fresh `Session` (created by its assigned lane), a reader task that
/// forwards frames into that lane, and a writer task that serializes
/// replies back onto the socket.
///
/// Every spawned connection task is tracked in `connections` rather than
/// fire-and-forgotten, so `shutdown` can stop accepting new sockets and
/// then wait for in-flight ones to finish on their own instead of cutting
/// them off mid-session.
pub struct Gateway {
    local_addr: SocketAddr,
    pool: Arc<DecodePool>,
    accept_task: JoinHandle<()>,
    next_conn_id: Arc<AtomicU64>,
    connections: Arc<AsyncMutex<JoinSet<()>>>,
}

impl Gateway {
    pub async fn bind(addr: impl ToSocketAddrs, pool: Arc<DecodePool>) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let next_conn_id = Arc::new(AtomicU64::new(1));
        let connections: Arc<AsyncMutex<JoinSet<()>>> = Arc::new(AsyncMutex::new(JoinSet::new()));

        let pool_for_accept = pool.clone();
        let ids_for_accept = next_conn_id.clone();
        let connections_for_accept = connections.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let pool = pool_for_accept.clone();
                        let conn_id = ids_for_accept.fetch_add(1, Ordering::SeqCst);
                        connections_for_accept.lock().await.spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, conn_id, pool).await {
                                log_warn!("connection {conn_id} ({peer}) ended with error: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        log_warn!("accept error: {e}");
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }
        });

        log_info!("gateway listening on {local_addr}");
        Ok(Gateway { local_addr, pool, accept_task, next_conn_id, connections })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn lane_count(&self) -> usize {
        self.pool.lane_count()
    }

    /// Approximate count of connections accepted so far (monotonic, not a
    /// live count — used for diagnostics, not correctness).
    pub fn connections_accepted(&self) -> u64 {
        self.next_conn_id.load(Ordering::SeqCst) - 1
    }

    /// Stops accepting new connections, then waits for every in-flight
    /// connection task to finish on its own (socket closed by the client,
    /// or by the session's end-of-speech / overflow handling). Consumes
    /// the gateway: there is no coming back from a shutdown.
    pub async fn shutdown(self) {
        self.accept_task.abort();
        let mut connections = self.connections.lock().await;
        while connections.join_next().await.is_some() {}
        log_info!("all connections drained, shutdown complete");
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    conn_id: ConnId,
    pool: Arc<DecodePool>,
) -> Result<(), GatewayError> {
    let (_request, ws_stream) = ServerBuilder::new()
        .accept(stream)
        .await
        .map_err(|e| GatewayError::Io(std::io::Error::other(e)))?;

    let lane_idx = pool.assign();
    let lane_tx = pool.sender(lane_idx);

    let (mut sink, mut stream) = ws_stream.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Outbound>();

    if lane_tx.send(LaneMessage::Open { id: conn_id, reply_tx }).is_err() {
        log_warn!("lane {lane_idx} unavailable for connection {conn_id}");
        return Ok(());
    }

    let writer = tokio::spawn(async move {
        while let Some(outbound) = reply_rx.recv().await {
            match outbound {
                Outbound::Text(json) => {
                    if sink.send(Message::text(json)).await.is_err() {
                        break;
                    }
                }
                Outbound::Disconnect => {
                    // Dropping `sink` below closes the underlying socket;
                    // the client observes this as an unclean close, which
                    // is an acceptable signal for "you overran the buffer
                    // cap".
                    break;
                }
            }
        }
    });

    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(m) => m,
            Err(e) => {
                log_warn!("connection {conn_id} ({peer}): read error: {e}");
                break;
            }
        };

        if message.is_binary() {
            let bytes = message.into_payload().to_vec();
            let _ = lane_tx.send(LaneMessage::Binary { id: conn_id, bytes });
        } else if message.is_text() {
            if let Some(text) = message.as_text() {
                let _ = lane_tx.send(LaneMessage::Control { id: conn_id, raw: text.to_string() });
            }
        } else if message.is_close() {
            break;
        }
    }

    let _ = lane_tx.send(LaneMessage::Close { id: conn_id });
    writer.abort();
    log_info!("connection {conn_id} ({peer}) closed");
    Ok(())
}
