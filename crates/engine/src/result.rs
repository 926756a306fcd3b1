use crate::handle::LiveCounters;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A compiled NN hotword embedding. Opaque beyond "present or absent";
/// presence is the gate that allows decoding (invariant: once non-empty,
/// never clears mid-session).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotwordEmbedding(Vec<u8>);

impl HotwordEmbedding {
    pub fn compiled(bytes: Vec<u8>) -> Self {
        HotwordEmbedding(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Output of one `infer_offline` / `infer_stream` call.
///
/// Accessors mirror the facade's `result_text` / `result_online_text` /
/// `result_tpass_text` / `result_timestamp` / `result_stamp_sents`, each
/// returning an empty string when the engine produced nothing for that
/// field. Dropping an `InferResult` is the Rust equivalent of `free`.
pub struct InferResult {
    online_text: String,
    tpass_text: String,
    timestamp: String,
    stamp_sents: String,
    counter: Arc<AtomicU64>,
}

impl InferResult {
    pub fn new(online_text: String, tpass_text: String, timestamp: String, stamp_sents: String, counters: &LiveCounters) -> Self {
        counters.results.fetch_add(1, Ordering::SeqCst);
        InferResult {
            online_text,
            tpass_text,
            timestamp,
            stamp_sents,
            counter: Arc::clone(&counters.results),
        }
    }

    pub fn online_text(&self) -> &str {
        &self.online_text
    }

    pub fn tpass_text(&self) -> &str {
        &self.tpass_text
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn stamp_sents(&self) -> &str {
        &self.stamp_sents
    }
}

impl Drop for InferResult {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
