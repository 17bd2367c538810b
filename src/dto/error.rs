use serde::Deserialize;

/// Failure envelope returned by the play API.
///
/// Routes answer either `{ "error": { "code", "message" } }` or the older `{ "error": "message" }`.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    /// Error details.
    pub error: ErrorDetail,
}

/// The `error` member of [`ErrorEnvelope`].
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// `{ "code", "message" }`.
    Structured {
        /// Machine-readable code.
        #[serde(default)]
        code: Option<String>,
        /// Human-readable message.
        message: String,
    },
    /// A bare message string.
    Message(String),
}

impl ErrorDetail {
    /// Split the detail into its optional code and message.
    pub fn into_parts(self) -> (Option<String>, String) {
        match self {
            ErrorDetail::Structured { code, message } => (code, message),
            ErrorDetail::Message(message) => (None, message),
        }
    }
}
