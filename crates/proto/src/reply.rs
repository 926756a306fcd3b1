use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplyMode {
    Offline,
    #[serde(rename = "2pass-online")]
    TwoPassOnline,
    #[serde(rename = "2pass-offline")]
    TwoPassOffline,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerReply {
    pub text: String,
    pub mode: ReplyMode,
    pub wav_name: String,
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamp_sents: Option<serde_json::Value>,
}

impl ServerReply {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ServerReply serialization cannot fail")
    }
}
