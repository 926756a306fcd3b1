use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared liveness counters an [`AsrEngine`](crate::AsrEngine) implementation
/// can use to make `free_*` happen structurally: a handle's `Drop` decrements
/// the counter it was handed at construction, so "every handle destroyed
/// exactly once" holds by construction rather than by convention.
#[derive(Debug, Default, Clone)]
pub struct LiveCounters {
    pub decoders: Arc<AtomicU64>,
    pub online: Arc<AtomicU64>,
    pub results: Arc<AtomicU64>,
}

impl LiveCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decoders_live(&self) -> u64 {
        self.decoders.load(Ordering::SeqCst)
    }

    pub fn online_live(&self) -> u64 {
        self.online.load(Ordering::SeqCst)
    }

    pub fn results_live(&self) -> u64 {
        self.results.load(Ordering::SeqCst)
    }
}

/// Opaque per-session decoder (WFST state). Created at session open,
/// destroyed when the session drops.
pub struct DecoderHandle {
    id: u64,
    counter: Arc<AtomicU64>,
    fst_loaded: bool,
}

impl DecoderHandle {
    pub(crate) fn new(id: u64, counter: Arc<AtomicU64>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        DecoderHandle { id, counter, fst_loaded: false }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn mark_fst_loaded(&mut self) {
        self.fst_loaded = true;
    }

    pub fn fst_loaded(&self) -> bool {
        self.fst_loaded
    }
}

impl Drop for DecoderHandle {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Opaque per-session streaming handle, created lazily once a valid
/// `chunk_size` arrives.
pub struct OnlineHandle {
    id: u64,
    counter: Arc<AtomicU64>,
}

impl OnlineHandle {
    pub(crate) fn new(id: u64, counter: Arc<AtomicU64>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        OnlineHandle { id, counter }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for OnlineHandle {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
