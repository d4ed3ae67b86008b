use serde::Deserialize;
use serde_json::Value;

/// One raw line of a transcript file.
///
/// Usage objects stay as `Value` because their layout varies between writers;
/// `crate::tokens` resolves them.
#[derive(Deserialize, Debug, Default)]
pub struct TranscriptLine {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub timestamp: Option<String>,
    #[serde(alias = "sessionId")]
    pub session_id: Option<String>,
    pub uuid: Option<String>,
    #[serde(alias = "requestId")]
    pub request_id: Option<String>,
    pub message: Option<Value>,
    pub usage: Option<Value>,
    pub error: Option<Value>,
}

impl TranscriptLine {
    /// `message.id` when the nested message object carries one
    pub fn message_id(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.get("id"))
            .and_then(|s| s.as_str())
    }

    pub fn model(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.get("model"))
            .and_then(|s| s.as_str())
    }
}
