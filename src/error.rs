//! Error types reported by the Storage API client.

use serde_json::Value;

/// An error reported by the Storage API, or a logical failure raised by the
/// client itself (job failure, exhausted upload retries, unreadable file).
///
/// Travels inside `anyhow::Error`; use `downcast_ref::<ClientError>()` to
/// inspect the status and string code.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientError {
    pub message: String,
    /// HTTP status code, when the error came from a response.
    pub status: Option<u16>,
    /// Machine readable code such as `storage.buckets.notFound`.
    pub code: Option<String>,
    pub exception_id: Option<String>,
    pub context: Option<Value>,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
            exception_id: None,
            context: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_exception_id(mut self, exception_id: impl Into<String>) -> Self {
        self.exception_id = Some(exception_id.into());
        self
    }

    /// Builds an error from an API error body:
    /// `{"error": "...", "code": "...", "exceptionId": "...", "context": {...}}`.
    ///
    /// Falls back to `fallback` when the body carries no message.
    pub fn from_response_body(status: u16, body: &str, fallback: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let field = |name: &str| -> Option<String> {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
        };

        let message = field("error")
            .or_else(|| field("message"))
            .unwrap_or_else(|| fallback.to_string());

        Self {
            message,
            status: Some(status),
            code: field("code"),
            exception_id: field("exceptionId"),
            context: parsed
                .as_ref()
                .and_then(|v| v.get("context"))
                .filter(|v| !v.is_null())
                .cloned(),
        }
    }

    /// Returns the string code, or an empty string.
    pub fn string_code(&self) -> &str {
        self.code.as_deref().unwrap_or_default()
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ClientError {}

/// Finds a [`ClientError`] anywhere in an error chain.
pub fn client_error(err: &anyhow::Error) -> Option<&ClientError> {
    err.chain().find_map(|e| e.downcast_ref::<ClientError>())
}
