mod error;
mod handle;
mod null_engine;
mod punc_cache;
mod result;

use std::collections::HashMap;

pub use error::EngineError;
pub use handle::{DecoderHandle, LiveCounters, OnlineHandle};
pub use null_engine::NullEngine;
pub use proto::Mode;
pub use punc_cache::PuncCache;
pub use result::{HotwordEmbedding, InferResult};

/// Per-call settings that are fixed by session config and passed through to
/// every inference call unchanged.
#[derive(Debug, Clone)]
pub struct InferConfig {
    pub audio_fs: u32,
    pub wav_format: String,
    pub itn: bool,
    pub svs_lang: String,
    pub svs_itn: bool,
}

/// Numeric asr_mode code the source passes to `infer_stream`: 0 for online,
/// 1 for the offline pass inside 2pass, 2 for pure offline-as-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSubMode {
    Online = 0,
    TwoPassOffline = 1,
    Offline = 2,
}

/// Facade over the opaque ASR engine. Thread-safe across sessions; not
/// reentrant on the same handle — callers (the dispatcher) must serialize
/// calls that touch the same `DecoderHandle`/`OnlineHandle`.
pub trait AsrEngine: Send + Sync {
    fn live_counters(&self) -> &LiveCounters;

    fn init_decoder(&self, mode: Mode, global_beam: f32, lattice_beam: f32, am_scale: f32) -> DecoderHandle;

    fn init_online(&self, chunk_size: [i64; 3]) -> Result<OnlineHandle, EngineError>;

    /// Pure; safe to call concurrently for different sessions.
    fn compile_hotwords(&self, space_delimited_text: &str, mode: Mode) -> HotwordEmbedding;

    fn load_fst_hotwords(&self, decoder: &mut DecoderHandle, inc_weight: i64, map: &HashMap<String, i64>);

    fn infer_offline(
        &self,
        buffer: &[u8],
        embedding: &HotwordEmbedding,
        cfg: &InferConfig,
        decoder: &DecoderHandle,
    ) -> Option<InferResult>;

    fn infer_stream(
        &self,
        online: &OnlineHandle,
        buffer_chunk: &[u8],
        punc_cache: &mut PuncCache,
        is_final: bool,
        cfg: &InferConfig,
        sub_mode: StreamSubMode,
        embedding: &HotwordEmbedding,
        decoder: &DecoderHandle,
    ) -> Option<InferResult>;
}
