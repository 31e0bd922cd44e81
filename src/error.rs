//! Error types surfaced by the provider.
//!
//! Every failure crosses the plugin boundary as diagnostics; [`ProviderError`]
//! is the in-process form and knows how to render itself into them.

use thiserror::Error;

use crate::client::FivetranError;
use crate::schema::Diagnostic;

/// Errors that can occur while serving a provider request.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found upstream.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The configuration is invalid; detected before any API call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Schema validation failed; carries one diagnostic per problem.
    #[error("Invalid configuration: {} problem(s)", .0.len())]
    Invalid(Vec<Diagnostic>),

    /// The provider configuration is invalid or incomplete.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A CRUD call arrived before `configure`.
    #[error("Provider is not configured: call configure before managing resources")]
    NotConfigured,

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The Fivetran API rejected a request.
    #[error("Fivetran API error ({status}) {code}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Fivetran error code, e.g. `NotFound_Group`.
        code: String,
        /// Human-readable message from the API.
        message: String,
    },

    /// Authentication or authorization failure against the API.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The API could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation not supported for this resource type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// A multi-call operation failed part way; carries the original error
    /// followed by the compensation outcome.
    #[error("{summary}")]
    PartialFailure {
        /// Short description of the failed operation.
        summary: String,
        /// Error and warning diagnostics describing what happened.
        diagnostics: Vec<Diagnostic>,
    },
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::PermissionDenied(msg)
            | Self::ResourceExhausted(msg)
            | Self::Unavailable(msg)
            | Self::Unimplemented(msg) => msg.clone(),
            Self::Api { message, .. } => message.clone(),
            Self::PartialFailure { summary, .. } => summary.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this error means the upstream object no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::Api { status: 404, .. })
    }

    /// Render the error as diagnostics for the host.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::PartialFailure { diagnostics, .. } | Self::Invalid(diagnostics) => diagnostics,
            Self::Api {
                status,
                code,
                message,
            } => vec![Diagnostic::error("Fivetran API request failed").with_detail(format!(
                "status: {}, code: {}, message: {}",
                status, code, message
            ))],
            Self::Validation(msg) => {
                vec![Diagnostic::error("Invalid configuration").with_detail(msg)]
            }
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

impl From<FivetranError> for ProviderError {
    fn from(err: FivetranError) -> Self {
        match err {
            FivetranError::Api {
                status: 401 | 403,
                code,
                message,
            } => ProviderError::PermissionDenied(format!("{}: {}", code, message)),
            FivetranError::Api {
                status: 429,
                code,
                message,
            } => ProviderError::ResourceExhausted(format!("{}: {}", code, message)),
            FivetranError::Api {
                status,
                code,
                message,
            } => ProviderError::Api {
                status,
                code,
                message,
            },
            FivetranError::Network(e) => ProviderError::Unavailable(e.to_string()),
            FivetranError::Decode { context, message } => {
                ProviderError::Unavailable(format!(
                    "malformed response for {}: {}",
                    context, message
                ))
            }
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Invalid(_) => tonic::Status::invalid_argument(err.to_string()),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::NotConfigured => tonic::Status::failed_precondition(err.to_string()),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Api { status: 404, .. } => tonic::Status::not_found(err.to_string()),
            ProviderError::Api { .. } => tonic::Status::unknown(err.to_string()),
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::ResourceExhausted(msg) => tonic::Status::resource_exhausted(msg),
            ProviderError::Unavailable(msg) => tonic::Status::unavailable(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            }
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::PartialFailure { summary, .. } => tonic::Status::aborted(summary),
        }
    }
}
