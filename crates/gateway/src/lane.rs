use crate::session::{BinaryOutcome, SessionState};
use base::{log_debug, log_info, log_warn};
use engine::AsrEngine;
use proto::parse_control;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

pub type ConnId = u64;

/// One message posted to a connection's writer task. `Disconnect` is the
/// only way the decode side ever reaches back into the I/O side; it is how
/// the per-session sample cap is enforced without giving the lane a handle
/// to the socket itself.
pub enum Outbound {
    Text(String),
    Disconnect,
}

/// Parameters the server-global state hands every lane; read-only after
/// startup and shared across all lanes.
#[derive(Clone)]
pub struct LaneContext {
    pub engine: Arc<dyn AsrEngine>,
    pub server_hotwords: Arc<HashMap<String, i64>>,
    pub fst_inc_wts: i64,
    pub global_beam: f32,
    pub lattice_beam: f32,
    pub am_scale: f32,
    /// Soft cap on a session's pending `samples` buffer; `0` disables it.
    pub max_samples_bytes: usize,
}

pub enum LaneMessage {
    Open { id: ConnId, reply_tx: mpsc::UnboundedSender<Outbound> },
    Control { id: ConnId, raw: String },
    Binary { id: ConnId, bytes: Vec<u8> },
    Close { id: ConnId },
}

struct Connection {
    session: SessionState,
    reply_tx: mpsc::UnboundedSender<Outbound>,
}

/// One decode worker loop. A lane owns its sessions outright — nothing else
/// ever touches them — so serialization falls out of the fact that this is
/// a single task draining a single queue, with no lock required.
pub async fn run(lane_id: usize, mut rx: mpsc::UnboundedReceiver<LaneMessage>, ctx: LaneContext) {
    let mut connections: HashMap<ConnId, Connection> = HashMap::new();

    while let Some(message) = rx.recv().await {
        match message {
            LaneMessage::Open { id, reply_tx } => {
                let decoder = ctx.engine.init_decoder(
                    proto::Mode::TwoPass,
                    ctx.global_beam,
                    ctx.lattice_beam,
                    ctx.am_scale,
                );
                connections.insert(id, Connection { session: SessionState::new(decoder), reply_tx });
                log_debug!("lane {lane_id}: opened session {id}");
            }
            LaneMessage::Control { id, raw } => {
                let Some(conn) = connections.get_mut(&id) else { continue };
                match parse_control(&raw) {
                    Ok(outcome) => {
                        for warning in &outcome.warnings {
                            log_warn!("lane {lane_id}: session {id}: {warning}");
                        }
                        let client_hotwords = outcome.update.hotwords.clone();
                        let reply = conn.session.apply_control(
                            &outcome.update,
                            client_hotwords.as_deref(),
                            &ctx.server_hotwords,
                            ctx.fst_inc_wts,
                            ctx.engine.as_ref(),
                        );
                        if let Some(reply) = reply {
                            send_reply(conn, &reply.to_json());
                        }
                    }
                    Err(e) => {
                        log_warn!("lane {lane_id}: session {id}: malformed control frame: {e}");
                        conn.session.set_eof();
                    }
                }
            }
            LaneMessage::Binary { id, bytes } => {
                let Some(conn) = connections.get_mut(&id) else { continue };
                match conn.session.handle_binary(&bytes, ctx.engine.as_ref(), ctx.max_samples_bytes) {
                    BinaryOutcome::Accepted(Some(reply)) => send_reply(conn, &reply.to_json()),
                    BinaryOutcome::Accepted(None) => {}
                    BinaryOutcome::Overflow => {
                        log_warn!(
                            "lane {lane_id}: session {id}: samples buffer exceeded {} bytes, disconnecting",
                            ctx.max_samples_bytes
                        );
                        let _ = conn.reply_tx.send(Outbound::Disconnect);
                        connections.remove(&id);
                    }
                }
            }
            LaneMessage::Close { id } => {
                if connections.remove(&id).is_some() {
                    log_info!("lane {lane_id}: session {id} closed");
                }
            }
        }
    }
}

fn send_reply(conn: &Connection, json: &str) {
    // Send-on-closed-channel is discarded silently; the receiver side
    // (the connection's writer task) may have already exited.
    let _ = conn.reply_tx.send(Outbound::Text(json.to_string()));
}
