//! Error types and handling for the travel planner

use thiserror::Error;

/// Main error type for the travel planner
#[derive(Error, Debug)]
pub enum TravelError {
    /// A place name (or its coordinates) could not be mapped to a location
    #[error("Unresolved place '{name}': {reason}")]
    UnresolvedPlace { name: String, reason: String },

    /// Network, HTTP status or timeout failure while calling a provider
    #[error("Provider '{provider}' transport error: {message}")]
    ProviderTransport { provider: String, message: String },

    /// A provider answered with a payload we could not interpret
    #[error("Provider '{provider}' schema error: {message}")]
    ProviderSchema { provider: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TravelError {
    /// Create a new unresolved place error
    pub fn unresolved<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::UnresolvedPlace {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new provider transport error
    pub fn transport<P: Into<String>, S: Into<String>>(provider: P, message: S) -> Self {
        Self::ProviderTransport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a new provider schema error
    pub fn schema<P: Into<String>, S: Into<String>>(provider: P, message: S) -> Self {
        Self::ProviderSchema {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Whether the error came from talking to an external provider
    #[must_use]
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            TravelError::ProviderTransport { .. } | TravelError::ProviderSchema { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TravelError::UnresolvedPlace { name, .. } => {
                format!("Could not find a location for '{name}'.")
            }
            TravelError::ProviderTransport { .. } | TravelError::ProviderSchema { .. } => {
                "Unable to reach an external travel data service.".to_string()
            }
            TravelError::Configuration { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            TravelError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            TravelError::Cache { .. } => "Cache operation failed.".to_string(),
            TravelError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest_middleware::Error> for TravelError {
    fn from(err: reqwest_middleware::Error) -> Self {
        TravelError::transport("http", err.to_string())
    }
}
