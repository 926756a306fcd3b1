use crate::{
    DecoderHandle, EngineError, HotwordEmbedding, InferConfig, InferResult, LiveCounters, Mode,
    OnlineHandle, PuncCache, StreamSubMode,
};
use crate::AsrEngine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Deterministic engine used in tests: it never loads model weights and
/// never transcribes anything, but it faithfully reproduces the shapes the
/// real engine is contracted to produce — non-null results with empty text
/// for silence, a null result when told to, handle lifetimes tracked via
/// [`LiveCounters`].
pub struct NullEngine {
    counters: LiveCounters,
    next_id: AtomicU64,
    return_null: bool,
}

impl NullEngine {
    pub fn new() -> Self {
        NullEngine { counters: LiveCounters::new(), next_id: AtomicU64::new(1), return_null: false }
    }

    /// An engine whose infer calls always return `None`, for exercising the
    /// "engine returned null" branch of the dispatcher.
    pub fn always_null() -> Self {
        NullEngine { counters: LiveCounters::new(), next_id: AtomicU64::new(1), return_null: true }
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for NullEngine {
    fn default() -> Self {
        NullEngine::new()
    }
}

impl AsrEngine for NullEngine {
    fn live_counters(&self) -> &LiveCounters {
        &self.counters
    }

    fn init_decoder(&self, _mode: Mode, _global_beam: f32, _lattice_beam: f32, _am_scale: f32) -> DecoderHandle {
        DecoderHandle::new(self.alloc_id(), self.counters.decoders.clone())
    }

    fn init_online(&self, chunk_size: [i64; 3]) -> Result<OnlineHandle, EngineError> {
        if chunk_size[1] == 0 {
            return Err(EngineError::InvalidChunkSize);
        }
        Ok(OnlineHandle::new(self.alloc_id(), self.counters.online.clone()))
    }

    fn compile_hotwords(&self, space_delimited_text: &str, _mode: Mode) -> HotwordEmbedding {
        // Always non-empty: compiling an empty hotword string still yields a
        // trivial embedding, and presence is what gates decoding.
        let mut bytes = space_delimited_text.as_bytes().to_vec();
        bytes.push(0);
        HotwordEmbedding::compiled(bytes)
    }

    fn load_fst_hotwords(&self, decoder: &mut DecoderHandle, _inc_weight: i64, _map: &HashMap<String, i64>) {
        decoder.mark_fst_loaded();
    }

    fn infer_offline(
        &self,
        _buffer: &[u8],
        _embedding: &HotwordEmbedding,
        _cfg: &InferConfig,
        _decoder: &DecoderHandle,
    ) -> Option<InferResult> {
        if self.return_null {
            return None;
        }
        Some(InferResult::new(String::new(), String::new(), String::new(), String::new(), &self.counters))
    }

    fn infer_stream(
        &self,
        _online: &OnlineHandle,
        _buffer_chunk: &[u8],
        _punc_cache: &mut PuncCache,
        _is_final: bool,
        _cfg: &InferConfig,
        _sub_mode: StreamSubMode,
        _embedding: &HotwordEmbedding,
        _decoder: &DecoderHandle,
    ) -> Option<InferResult> {
        if self.return_null {
            return None;
        }
        Some(InferResult::new(String::new(), String::new(), String::new(), String::new(), &self.counters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_online_rejects_zero_middle_chunk_size() {
        let engine = NullEngine::new();
        assert!(engine.init_online([5, 0, 5]).is_err());
        assert!(engine.init_online([5, 10, 5]).is_ok());
    }

    #[test]
    fn decoder_handle_drop_decrements_live_count() {
        let engine = NullEngine::new();
        {
            let _d = engine.init_decoder(Mode::Offline, 10.0, 2.0, 1.0);
            assert_eq!(engine.live_counters().decoders_live(), 1);
        }
        assert_eq!(engine.live_counters().decoders_live(), 0);
    }

    #[test]
    fn result_drop_decrements_live_count() {
        let engine = NullEngine::new();
        let decoder = engine.init_decoder(Mode::Offline, 10.0, 2.0, 1.0);
        let embedding = engine.compile_hotwords("", Mode::Offline);
        let cfg = InferConfig { audio_fs: 16000, wav_format: "pcm".to_string(), itn: true, svs_lang: "auto".to_string(), svs_itn: true };
        {
            let result = engine.infer_offline(&[], &embedding, &cfg, &decoder);
            assert!(result.is_some());
            assert_eq!(engine.live_counters().results_live(), 1);
        }
        assert_eq!(engine.live_counters().results_live(), 0);
    }

    #[test]
    fn always_null_engine_returns_none() {
        let engine = NullEngine::always_null();
        let decoder = engine.init_decoder(Mode::Offline, 10.0, 2.0, 1.0);
        let embedding = engine.compile_hotwords("", Mode::Offline);
        let cfg = InferConfig { audio_fs: 16000, wav_format: "pcm".to_string(), itn: true, svs_lang: "auto".to_string(), svs_itn: true };
        assert!(engine.infer_offline(&[], &embedding, &cfg, &decoder).is_none());
    }
}
