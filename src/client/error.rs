use thiserror::Error;

/// Errors returned by the Fivetran REST client.
///
/// Messages never include the API key or secret.
#[derive(Debug, Error)]
pub enum FivetranError {
    /// The API answered with a non-success status.
    #[error("API error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Connection failed, timed out, or the body could not be read.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response envelope did not have the expected shape.
    #[error("failed to decode {context}: {message}")]
    Decode { context: String, message: String },
}

impl FivetranError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FivetranError::Api { status: 404, .. })
    }

    /// Conflicts on the schema endpoints are transient: another writer holds
    /// the connection's schema, or a reload is still running.
    pub fn is_conflict(&self) -> bool {
        match self {
            FivetranError::Api { status: 409, .. } => true,
            FivetranError::Api { code, .. } => code.starts_with("Conflict"),
            _ => false,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            FivetranError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}
