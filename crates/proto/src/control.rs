use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Offline,
    Online,
    TwoPass,
}

impl Mode {
    fn from_str(s: &str) -> Option<Mode> {
        match s {
            "offline" => Some(Mode::Offline),
            "online" => Some(Mode::Online),
            "2pass" => Some(Mode::TwoPass),
            _ => None,
        }
    }
}

/// One client control frame, decoded field-by-field.
///
/// Unknown keys are ignored. A key present with the wrong JSON type is
/// skipped (left `None`) rather than failing the whole frame; the skipped
/// field's name is reported in `warnings` so the caller can log it.
#[derive(Debug, Clone, Default)]
pub struct ControlUpdate {
    pub wav_name: Option<String>,
    pub wav_format: Option<String>,
    pub mode: Option<Mode>,
    pub audio_fs: Option<u32>,
    pub itn: Option<bool>,
    pub svs_itn: Option<bool>,
    pub svs_lang: Option<String>,
    pub chunk_size: Option<[i64; 3]>,
    pub hotwords: Option<String>,
    pub is_speaking: Option<bool>,
    pub is_finished: Option<bool>,
}

pub struct ParseOutcome {
    pub update: ControlUpdate,
    pub warnings: Vec<String>,
}

/// Parses a text control frame.
///
/// Returns `Err` only when the frame is not a JSON object at all (not
/// valid JSON, or valid JSON but not an object) — that is the "malformed
/// control JSON" case in the error taxonomy, which sets `eof` on the
/// session. A well-formed object with a badly-typed field does not fail;
/// that field is dropped and noted in `ParseOutcome::warnings`.
pub fn parse_control(raw: &str) -> Result<ParseOutcome, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            return Err(serde::de::Error::custom("control frame is not a JSON object"));
        }
    };

    let mut update = ControlUpdate::default();
    let mut warnings = Vec::new();

    for (key, val) in obj {
        match key.as_str() {
            "wav_name" => match val.as_str() {
                Some(s) => update.wav_name = Some(s.to_string()),
                None => warnings.push("wav_name: expected string".to_string()),
            },
            "wav_format" => match val.as_str() {
                Some(s) => update.wav_format = Some(s.to_string()),
                None => warnings.push("wav_format: expected string".to_string()),
            },
            "mode" => match val.as_str().and_then(Mode::from_str) {
                Some(mode) => update.mode = Some(mode),
                None => warnings.push(format!("mode: unrecognized value {val}")),
            },
            "audio_fs" => match val.as_u64() {
                Some(n) => update.audio_fs = Some(n as u32),
                None => warnings.push("audio_fs: expected integer".to_string()),
            },
            "itn" => match val.as_bool() {
                Some(b) => update.itn = Some(b),
                None => warnings.push("itn: expected bool".to_string()),
            },
            "svs_itn" => match val.as_bool() {
                Some(b) => update.svs_itn = Some(b),
                None => warnings.push("svs_itn: expected bool".to_string()),
            },
            "svs_lang" => match val.as_str() {
                Some(s) => update.svs_lang = Some(s.to_string()),
                None => warnings.push("svs_lang: expected string".to_string()),
            },
            "chunk_size" => match parse_chunk_size(val) {
                Some(triple) => update.chunk_size = Some(triple),
                None => warnings.push("chunk_size: expected array of 3 integers".to_string()),
            },
            "hotwords" => match val.as_str() {
                Some(s) => update.hotwords = Some(s.to_string()),
                None => warnings.push("hotwords: expected string".to_string()),
            },
            "is_speaking" => match val.as_bool() {
                Some(b) => update.is_speaking = Some(b),
                None => warnings.push("is_speaking: expected bool".to_string()),
            },
            "is_finished" => match val.as_bool() {
                Some(b) => update.is_finished = Some(b),
                None => warnings.push("is_finished: expected bool".to_string()),
            },
            _ => {}
        }
    }

    Ok(ParseOutcome { update, warnings })
}

fn parse_chunk_size(val: &Value) -> Option<[i64; 3]> {
    let arr = val.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    let mut out = [0i64; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = arr[i].as_i64()?;
    }
    Some(out)
}

impl ControlUpdate {
    /// True once a `chunk_size` with a non-zero middle element has arrived.
    pub fn wants_online(&self) -> bool {
        matches!(self.chunk_size, Some([_, mid, _]) if mid != 0)
    }

    /// True if this frame signals end-of-speech.
    pub fn is_end_of_speech(&self) -> bool {
        self.is_speaking == Some(false) || self.is_finished == Some(true)
    }
}
