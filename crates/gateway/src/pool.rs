use crate::lane::{self, LaneContext, LaneMessage};
use base::log_info;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Fixed-size pool of decode lanes. Each session is assigned to exactly one
/// lane, round-robin, for its whole lifetime — the lane only needs to stay
/// stable for the life of the session.
///
/// Lanes are spawned onto a caller-supplied `Handle`, which in production is
/// a dedicated decode runtime separate from the one carrying socket I/O —
/// that is what makes this a *second* pool rather than more tasks competing
/// for the I/O runtime's worker threads. A lane's blocking engine call can
/// only starve other lanes on the same decode runtime, never the sockets.
pub struct DecodePool {
    senders: Vec<mpsc::UnboundedSender<LaneMessage>>,
    handles: Vec<JoinHandle<()>>,
    next: AtomicUsize,
}

impl DecodePool {
    pub fn spawn(size: usize, ctx: LaneContext, decode_runtime: &tokio::runtime::Handle) -> Self {
        let mut senders = Vec::with_capacity(size);
        let mut handles = Vec::with_capacity(size);
        for lane_id in 0..size {
            let (tx, rx) = mpsc::unbounded_channel();
            let lane_ctx = ctx.clone();
            handles.push(decode_runtime.spawn(lane::run(lane_id, rx, lane_ctx)));
            senders.push(tx);
        }
        log_info!("decode pool started with {size} lanes");
        DecodePool { senders, handles, next: AtomicUsize::new(0) }
    }

    pub fn lane_count(&self) -> usize {
        self.senders.len()
    }

    /// Assigns the next lane round-robin and returns its index.
    pub fn assign(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % self.senders.len()
    }

    pub fn sender(&self, lane_idx: usize) -> mpsc::UnboundedSender<LaneMessage> {
        self.senders[lane_idx].clone()
    }
}

impl Drop for DecodePool {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
