use base::log_warn;
use engine::{AsrEngine, HotwordEmbedding, Mode};
use proto::HotwordsSpec;
use std::collections::HashMap;

/// Result of resolving a session's hotword configuration: the compiled NN
/// embedding and the merged FST weight map to load into the decoder.
pub struct ResolvedHotwords {
    pub embedding: HotwordEmbedding,
    pub fst_map: HashMap<String, i64>,
}

/// Runs once per session, on the first control frame. Client FST keys are
/// inserted into the merged map first; server keys fill in whatever the
/// client did not provide. NN free text (if the client sent any) is always
/// supplemented with the merged FST map's keys before compiling, regardless
/// of which hotword style the client used.
pub fn resolve_hotwords(
    client_hotwords: Option<&str>,
    server_map: &HashMap<String, i64>,
    engine: &dyn AsrEngine,
    mode: Mode,
) -> ResolvedHotwords {
    let mut merged: HashMap<String, i64> = HashMap::new();
    let mut nn_text = String::new();

    if let Some(raw) = client_hotwords {
        match HotwordsSpec::resolve(raw) {
            HotwordsSpec::FstMap(client_map) => {
                for (phrase, weight) in client_map {
                    merged.entry(phrase).or_insert(weight);
                }
            }
            HotwordsSpec::FreeText(text) => {
                if !text.is_empty() {
                    nn_text.push_str(&text);
                }
            }
        }
    }

    for (phrase, weight) in server_map {
        merged.entry(phrase.clone()).or_insert(*weight);
    }

    let mut keys: Vec<&String> = merged.keys().collect();
    keys.sort();
    for key in keys {
        if !nn_text.is_empty() {
            nn_text.push(' ');
        }
        nn_text.push_str(key);
    }

    let embedding = engine.compile_hotwords(&nn_text, mode);
    if embedding.is_empty() {
        log_warn!("compiled hotword embedding is unexpectedly empty");
    }

    ResolvedHotwords { embedding, fst_map: merged }
}
