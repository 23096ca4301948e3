use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),
}

/// Failures of the four backend operations.
///
/// Every kind renders to a single human-readable line via
/// [`GatewayError::user_message`]; chat state never branches on the kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No route to host / connection refused.
    #[error("No internet connection")]
    Connectivity(String),

    /// The request exceeded the configured timeout.
    #[error("Connection timed out")]
    Timeout,

    /// Non-2xx HTTP status.
    #[error("HTTP error {status}: {}", protocol_detail(.body))]
    Protocol { status: u16, body: String },

    /// The response payload could not be decoded.
    #[error("Failed to process server response: {0}")]
    Decode(String),

    /// Anything else.
    #[error("{0}")]
    Unknown(String),
}

impl GatewayError {
    /// Returns the message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

fn protocol_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
