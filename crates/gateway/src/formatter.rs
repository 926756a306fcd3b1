use engine::InferResult;
use proto::{Mode, ReplyMode, ServerReply};

/// Fixed diagnostic emitted when a streaming-mode session's final flush
/// turns out not to be PCM.
pub const NON_PCM_DIAGNOSTIC: &str = "ERROR. Real-time transcription service ONLY SUPPORT PCM stream.";

pub fn non_pcm_reply(wav_name: &str) -> ServerReply {
    ServerReply {
        text: NON_PCM_DIAGNOSTIC.to_string(),
        mode: ReplyMode::TwoPassOffline,
        wav_name: wav_name.to_string(),
        is_final: true,
        timestamp: None,
        stamp_sents: None,
    }
}

/// Builds the reply for a decoded (non-diagnostic) result.
///
/// `text` is the last non-empty of (online, tpass/offline). In 2pass, a
/// non-empty tpass text always wins the mode tag ("2pass-offline"); a
/// non-empty online text with no tpass text tags "2pass-online". When the
/// final flush produces neither (a zero-byte final chunk), the mode defaults
/// to "2pass-offline" rather than being left unset.
pub fn format_reply(mode: Mode, is_final: bool, wav_name: &str, result: &InferResult) -> ServerReply {
    let text = if !result.tpass_text().is_empty() {
        result.tpass_text().to_string()
    } else if !result.online_text().is_empty() {
        result.online_text().to_string()
    } else {
        String::new()
    };

    let reply_mode = if mode == Mode::Offline {
        ReplyMode::Offline
    } else if !result.tpass_text().is_empty() {
        ReplyMode::TwoPassOffline
    } else if !result.online_text().is_empty() {
        ReplyMode::TwoPassOnline
    } else if is_final {
        ReplyMode::TwoPassOffline
    } else {
        ReplyMode::TwoPassOnline
    };

    let timestamp = if result.timestamp().is_empty() { None } else { Some(result.timestamp().to_string()) };

    let stamp_sents = if result.stamp_sents().is_empty() {
        None
    } else {
        match serde_json::from_str(result.stamp_sents()) {
            Ok(value) => Some(value),
            Err(_) => Some(serde_json::Value::String(String::new())),
        }
    };

    ServerReply { text, mode: reply_mode, wav_name: wav_name.to_string(), is_final, timestamp, stamp_sents }
}
