// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

use thiserror::Error;

/// Main error type for Fluxion operations.
#[derive(Error, Debug)]
pub enum FluxionError {
    /// DNS, connect refused/reset, timeout, or a non-2xx status that
    /// retries did not resolve. Carries an HTTP status when applicable.
    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        suggestion: Option<String>,
    },

    /// TLS handshake failure, certificate pin mismatch, or integrity
    /// mismatch.
    #[error("Security error: {message}")]
    Security {
        message: String,
        suggestion: Option<String>,
    },

    /// Scheme-specific failure from an external (non-HTTP) downloader.
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        suggestion: Option<String>,
    },

    /// Malformed configuration document or unknown key at assignment.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        suggestion: Option<String>,
    },

    /// Unknown browser profile or an unparsable cookie source.
    #[error("Stealth error: {message}")]
    Stealth {
        message: String,
        suggestion: Option<String>,
    },

    /// Unresolved plugin identifier.
    #[error("Plugin error: {message}")]
    Plugin {
        message: String,
        suggestion: Option<String>,
    },

    /// Explicit resume requested against a non-supporting server when the
    /// caller declined silent downgrade.
    #[error("Resume error: {message}")]
    Resume {
        message: String,
        suggestion: Option<String>,
    },

    /// IO-related errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FluxionError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
            suggestion: None,
        }
    }

    pub fn network_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
            suggestion: None,
        }
    }

    pub fn with_suggestion(self, suggestion: impl Into<String>) -> Self {
        let suggestion = Some(suggestion.into());
        match self {
            Self::Network {
                message,
                status_code,
                ..
            } => Self::Network {
                message,
                status_code,
                suggestion,
            },
            Self::Security { message, .. } => Self::Security { message, suggestion },
            Self::Protocol { message, .. } => Self::Protocol { message, suggestion },
            Self::Config { message, .. } => Self::Config { message, suggestion },
            Self::Stealth { message, .. } => Self::Stealth { message, suggestion },
            Self::Plugin { message, .. } => Self::Plugin { message, suggestion },
            Self::Resume { message, .. } => Self::Resume { message, suggestion },
            other => other,
        }
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::Security {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn stealth(message: impl Into<String>) -> Self {
        Self::Stealth {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn plugin(message: impl Into<String>) -> Self {
        Self::Plugin {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn resume(message: impl Into<String>) -> Self {
        Self::Resume {
            message: message.into(),
            suggestion: None,
        }
    }

    /// Single-line human message, independent of any attached suggestion.
    pub fn message(&self) -> String {
        match self {
            Self::Network { message, .. }
            | Self::Security { message, .. }
            | Self::Protocol { message, .. }
            | Self::Config { message, .. }
            | Self::Stealth { message, .. }
            | Self::Plugin { message, .. }
            | Self::Resume { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Optional remediation suggestion, surfaced to CLI users.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Network { suggestion, .. }
            | Self::Security { suggestion, .. }
            | Self::Protocol { suggestion, .. }
            | Self::Config { suggestion, .. }
            | Self::Stealth { suggestion, .. }
            | Self::Plugin { suggestion, .. }
            | Self::Resume { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    /// HTTP status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Network { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Whether this error class is ever worth retrying. Network errors
    /// without a fatal status code, and any non-domain transport error,
    /// are retryable; all other kinds are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { status_code, .. } => !matches!(
                status_code,
                Some(400 | 401 | 403 | 404 | 405 | 410 | 451)
            ),
            Self::Io(_) => true,
            Self::Security { .. }
            | Self::Protocol { .. }
            | Self::Config { .. }
            | Self::Stealth { .. }
            | Self::Plugin { .. }
            | Self::Resume { .. }
            | Self::InvalidUrl(_)
            | Self::Json(_) => false,
        }
    }

    /// Error category tag, used for logging and CLI diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Security { .. } => "security",
            Self::Protocol { .. } => "protocol",
            Self::Config { .. } => "config",
            Self::Stealth { .. } => "stealth",
            Self::Plugin { .. } => "plugin",
            Self::Resume { .. } => "resume",
            Self::Io(_) => "io",
            Self::InvalidUrl(_) => "url",
            Self::Json(_) => "json",
        }
    }
}

/// Result type alias for Fluxion operations.
pub type Result<T> = std::result::Result<T, FluxionError>;
