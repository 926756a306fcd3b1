use crate::chunker::drain_ready_chunk;
use crate::formatter::{format_reply, non_pcm_reply};
use crate::resolver::resolve_hotwords;
use base::{log_debug, log_warn};
use engine::{AsrEngine, DecoderHandle, HotwordEmbedding, InferConfig, OnlineHandle, PuncCache, StreamSubMode};
use proto::{ControlUpdate, Mode, ServerReply};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub wav_name: String,
    pub wav_format: String,
    pub mode: Mode,
    pub audio_fs: u32,
    pub itn: bool,
    pub svs_itn: bool,
    pub svs_lang: String,
    pub chunk_size: Option<[i64; 3]>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            wav_name: "wav-default-id".to_string(),
            wav_format: "pcm".to_string(),
            mode: Mode::TwoPass,
            audio_fs: 16000,
            itn: true,
            svs_itn: true,
            svs_lang: "auto".to_string(),
            chunk_size: None,
        }
    }
}

impl SessionConfig {
    fn apply(&mut self, update: &ControlUpdate) {
        if let Some(v) = &update.wav_name {
            self.wav_name = v.clone();
        }
        if let Some(v) = &update.wav_format {
            self.wav_format = v.clone();
        }
        if let Some(v) = update.mode {
            self.mode = v;
        }
        if let Some(v) = update.audio_fs {
            self.audio_fs = v;
        }
        if let Some(v) = update.itn {
            self.itn = v;
        }
        if let Some(v) = update.svs_itn {
            self.svs_itn = v;
        }
        if let Some(v) = &update.svs_lang {
            self.svs_lang = v.clone();
        }
        if let Some(v) = update.chunk_size {
            self.chunk_size = Some(v);
        }
    }

    fn is_pcm(&self) -> bool {
        self.wav_format.eq_ignore_ascii_case("pcm")
    }

    fn infer_config(&self) -> InferConfig {
        InferConfig {
            audio_fs: self.audio_fs,
            wav_format: self.wav_format.clone(),
            itn: self.itn,
            svs_lang: self.svs_lang.clone(),
            svs_itn: self.svs_itn,
        }
    }
}

/// Result of feeding a binary frame to a session.
pub enum BinaryOutcome {
    /// Frame accepted; carries a decode reply if one was dispatched.
    Accepted(Option<ServerReply>),
    /// The session's pending-bytes buffer exceeded its cap; `eof` is now
    /// set and the caller must close the socket.
    Overflow,
}

/// Per-connection state, owned exclusively by the decode lane it was
/// assigned to at open. Field order matters: Rust drops struct fields in
/// declaration order, so `online_handle` tears down before `decoder_handle`,
/// matching the teardown order the session lifecycle specifies.
pub struct SessionState {
    pub config: SessionConfig,
    pub samples: Vec<u8>,
    pub punc_cache: PuncCache,
    pub hotwords_embedding: Option<HotwordEmbedding>,
    pub fst_hotwords: HashMap<String, i64>,
    pub online_handle: Option<OnlineHandle>,
    pub decoder_handle: DecoderHandle,
    pub eof: bool,
    pub access_num: u64,
}

impl SessionState {
    pub fn new(decoder_handle: DecoderHandle) -> Self {
        SessionState {
            config: SessionConfig::default(),
            samples: Vec::new(),
            punc_cache: PuncCache::default(),
            hotwords_embedding: None,
            fst_hotwords: HashMap::new(),
            online_handle: None,
            decoder_handle,
            eof: false,
            access_num: 0,
        }
    }

    /// Marks the session terminal without running a final decode. Used for
    /// the "malformed control JSON" branch of the error taxonomy: the socket
    /// stays open, but nothing further will be dispatched.
    pub fn set_eof(&mut self) {
        self.eof = true;
    }

    fn is_configured(&self) -> bool {
        matches!(&self.hotwords_embedding, Some(e) if !e.is_empty())
    }

    /// Applies a control frame: merges config fields, runs the hotword
    /// resolver exactly once, and lazily creates the online handle once a
    /// valid `chunk_size` arrives. Returns any decode dispatched as a
    /// side effect of an end-of-speech signal in this same frame.
    pub fn apply_control(
        &mut self,
        update: &ControlUpdate,
        client_hotwords: Option<&str>,
        server_hotwords: &HashMap<String, i64>,
        fst_inc_wts: i64,
        engine: &dyn AsrEngine,
    ) -> Option<ServerReply> {
        if self.eof {
            return None;
        }

        self.config.apply(update);

        if self.hotwords_embedding.is_none() {
            let resolved = resolve_hotwords(client_hotwords, server_hotwords, engine, self.config.mode);
            engine.load_fst_hotwords(&mut self.decoder_handle, fst_inc_wts, &resolved.fst_map);
            self.fst_hotwords = resolved.fst_map;
            self.hotwords_embedding = Some(resolved.embedding);
        }

        if self.online_handle.is_none() {
            if let Some(chunk_size) = update.chunk_size {
                if update.wants_online() {
                    match engine.init_online(chunk_size) {
                        Ok(handle) => self.online_handle = Some(handle),
                        Err(e) => log_warn!("failed to init online handle: {e}"),
                    }
                } else {
                    log_warn!("chunk_size {:?} has a zero middle element; streaming decode disabled for this session", chunk_size);
                }
            }
        }

        if update.is_end_of_speech() {
            return self.finalize(engine);
        }

        None
    }

    /// Appends a binary frame and, if ready, dispatches one streaming chunk
    /// decode. A no-op once `eof` is set.
    ///
    /// `max_samples_bytes` is the soft per-session cap on buffered audio:
    /// `0` disables it, otherwise a `samples` buffer that grows past it sets `eof` and reports
    /// `BinaryOutcome::Overflow` so the caller can disconnect the socket.
    pub fn handle_binary(&mut self, bytes: &[u8], engine: &dyn AsrEngine, max_samples_bytes: usize) -> BinaryOutcome {
        if self.eof {
            return BinaryOutcome::Accepted(None);
        }

        self.samples.extend_from_slice(bytes);

        if max_samples_bytes > 0 && self.samples.len() > max_samples_bytes {
            log_warn!(
                "samples buffer grew to {} bytes, exceeding cap of {max_samples_bytes}",
                self.samples.len()
            );
            self.eof = true;
            return BinaryOutcome::Overflow;
        }

        if self.config.mode == Mode::Offline {
            // offline never slices; everything waits for the final flush.
            return BinaryOutcome::Accepted(None);
        }

        // Chunking happens unconditionally once in streaming mode, even
        // before the first control frame has resolved hotwords or a valid
        // chunk_size: a stride-aligned chunk is always sliced off, keeping
        // the remainder bounded. Whether that chunk is actually dispatched
        // is a separate question, gated below.
        let Some(chunk) = drain_ready_chunk(&mut self.samples) else {
            return BinaryOutcome::Accepted(None);
        };

        if !self.is_configured() || self.online_handle.is_none() {
            return BinaryOutcome::Accepted(None);
        }

        BinaryOutcome::Accepted(self.dispatch_stream(&chunk, false, engine))
    }

    /// Runs the final decode for the session and sets `eof`. Idempotent:
    /// a session that already observed eof produces no further replies.
    fn finalize(&mut self, engine: &dyn AsrEngine) -> Option<ServerReply> {
        if self.eof {
            return None;
        }
        self.eof = true;

        if !self.is_configured() {
            return None;
        }

        let reply = match self.config.mode {
            Mode::Offline => {
                let buffer = std::mem::take(&mut self.samples);
                self.dispatch_offline(&buffer, engine)
            }
            Mode::Online | Mode::TwoPass => {
                if !self.config.is_pcm() {
                    Some(non_pcm_reply(&self.config.wav_name))
                } else if self.online_handle.is_some() {
                    let buffer = std::mem::take(&mut self.samples);
                    self.dispatch_stream(&buffer, true, engine)
                } else {
                    // chunk_size was never validly set, so streaming never
                    // started; final still produces an empty-text reply
                    // rather than nothing.
                    Some(ServerReply {
                        text: String::new(),
                        mode: proto::ReplyMode::TwoPassOffline,
                        wav_name: self.config.wav_name.clone(),
                        is_final: true,
                        timestamp: None,
                        stamp_sents: None,
                    })
                }
            }
        };

        self.punc_cache.reset();
        reply
    }

    fn dispatch_offline(&mut self, buffer: &[u8], engine: &dyn AsrEngine) -> Option<ServerReply> {
        let Some(embedding) = &self.hotwords_embedding else { return None };
        self.access_num += 1;
        let cfg = self.config.infer_config();
        let result = engine.infer_offline(buffer, embedding, &cfg, &self.decoder_handle);
        self.access_num -= 1;
        let result = match result {
            Some(r) => r,
            None => {
                log_debug!("engine returned no result for offline final decode");
                return None;
            }
        };
        // The offline path's final reply is tagged is_final:false, not true;
        // offline mode never sends a second, truly-final message.
        Some(format_reply(Mode::Offline, false, &self.config.wav_name, &result))
    }

    fn dispatch_stream(&mut self, chunk: &[u8], is_final: bool, engine: &dyn AsrEngine) -> Option<ServerReply> {
        if self.eof && !is_final {
            return None;
        }
        let Some(embedding) = self.hotwords_embedding.clone() else { return None };
        let Some(online) = &self.online_handle else { return None };

        // asr_mode is fixed by the session's configured mode and stays the
        // same across every chunk, final or not — is_final is a separate
        // parameter the engine gets alongside it.
        let sub_mode = match self.config.mode {
            Mode::Online => StreamSubMode::Online,
            Mode::TwoPass => StreamSubMode::TwoPassOffline,
            Mode::Offline => StreamSubMode::Offline,
        };
        let cfg = self.config.infer_config();

        self.access_num += 1;
        let result = engine.infer_stream(
            online,
            chunk,
            &mut self.punc_cache,
            is_final,
            &cfg,
            sub_mode,
            &embedding,
            &self.decoder_handle,
        );
        self.access_num -= 1;

        let result = match result {
            Some(r) => r,
            None => {
                log_debug!("engine returned no result for a streaming decode (is_final={is_final})");
                return None;
            }
        };

        Some(format_reply(self.config.mode, is_final, &self.config.wav_name, &result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::NullEngine;

    fn new_session(engine: &dyn AsrEngine) -> SessionState {
        let decoder = engine.init_decoder(Mode::TwoPass, 10.0, 2.0, 1.0);
        SessionState::new(decoder)
    }

    #[test]
    fn binary_before_config_just_accumulates() {
        let engine = NullEngine::new();
        let mut session = new_session(&engine);
        let outcome = session.handle_binary(&[0u8; 100], &engine, 0);
        assert!(matches!(outcome, BinaryOutcome::Accepted(None)));
        assert_eq!(session.samples.len(), 100);
    }

    #[test]
    fn invalid_chunk_size_never_creates_online_handle() {
        let engine = NullEngine::new();
        let mut session = new_session(&engine);
        let update = ControlUpdate { chunk_size: Some([5, 0, 5]), wav_format: Some("pcm".to_string()), ..Default::default() };
        session.apply_control(&update, None, &HashMap::new(), 20, &engine);
        assert!(session.online_handle.is_none());

        session.handle_binary(&[0u8; 10_000], &engine, 0);
        // Chunking still happens (and the sliced chunk is discarded, never
        // dispatched) even though no online handle exists; only the
        // sub-stride remainder stays buffered.
        assert_eq!(session.samples.len(), 10_000 % (crate::chunker::STRIDE_BYTES));
    }

    #[test]
    fn second_end_of_speech_is_a_no_op() {
        let engine = NullEngine::new();
        let mut session = new_session(&engine);
        let update = ControlUpdate { mode: Some(Mode::Offline), is_speaking: Some(false), ..Default::default() };
        let first = session.apply_control(&update, None, &HashMap::new(), 20, &engine);
        assert!(first.is_some());
        let second = session.apply_control(&update, None, &HashMap::new(), 20, &engine);
        assert!(second.is_none());
    }

    #[test]
    fn non_pcm_streaming_final_emits_diagnostic() {
        let engine = NullEngine::new();
        let mut session = new_session(&engine);
        let update = ControlUpdate {
            mode: Some(Mode::TwoPass),
            wav_format: Some("mp3".to_string()),
            chunk_size: Some([5, 10, 5]),
            ..Default::default()
        };
        session.apply_control(&update, None, &HashMap::new(), 20, &engine);
        session.handle_binary(&[0u8; 1024], &engine, 0);
        let final_update = ControlUpdate { is_speaking: Some(false), ..Default::default() };
        let reply = session.apply_control(&final_update, None, &HashMap::new(), 20, &engine).expect("expected diagnostic reply");
        assert_eq!(reply.text, crate::formatter::NON_PCM_DIAGNOSTIC);
        assert!(reply.is_final);
    }

    #[test]
    fn offline_final_reply_is_is_final_false() {
        let engine = NullEngine::new();
        let mut session = new_session(&engine);
        let open = ControlUpdate { mode: Some(Mode::Offline), wav_name: Some("a".to_string()), wav_format: Some("pcm".to_string()), ..Default::default() };
        session.apply_control(&open, None, &HashMap::new(), 20, &engine);
        session.handle_binary(&[0u8; 32_000], &engine, 0);
        let end = ControlUpdate { is_speaking: Some(false), ..Default::default() };
        let reply = session.apply_control(&end, None, &HashMap::new(), 20, &engine).expect("expected a reply");
        assert_eq!(reply.text, "");
        assert!(!reply.is_final);
        assert_eq!(reply.wav_name, "a");
    }

    #[test]
    fn zero_byte_final_flush_in_two_pass_pcm() {
        let engine = NullEngine::new();
        let mut session = new_session(&engine);
        let open = ControlUpdate { mode: Some(Mode::TwoPass), wav_format: Some("pcm".to_string()), chunk_size: Some([5, 10, 5]), ..Default::default() };
        session.apply_control(&open, None, &HashMap::new(), 20, &engine);
        let end = ControlUpdate { is_speaking: Some(false), ..Default::default() };
        let reply = session.apply_control(&end, None, &HashMap::new(), 20, &engine).expect("expected a reply");
        assert_eq!(reply.text, "");
        assert!(reply.is_final);
    }

    #[test]
    fn samples_buffer_over_cap_signals_overflow_and_sets_eof() {
        let engine = NullEngine::new();
        let mut session = new_session(&engine);
        let outcome = session.handle_binary(&[0u8; 200], &engine, 100);
        assert!(matches!(outcome, BinaryOutcome::Overflow));
        assert!(session.eof);
    }

    #[test]
    fn zero_cap_means_unbounded() {
        let engine = NullEngine::new();
        let mut session = new_session(&engine);
        let outcome = session.handle_binary(&[0u8; 1_000_000], &engine, 0);
        assert!(matches!(outcome, BinaryOutcome::Accepted(_)));
        assert!(!session.eof);
    }
}
