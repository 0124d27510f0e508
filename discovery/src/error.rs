use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed aggregation: field '{field}' {reason}")]
    MalformedAggregation { field: String, reason: String },

    #[error("Unrecognized aggregation kind: {0}")]
    UnrecognizedAggregationKind(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service error (status {status}): {message}")]
    Service { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MalformedAggregation {
            field: field.into(),
            reason: "is missing".to_string(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, expected: &str) -> Self {
        Self::MalformedAggregation {
            field: field.into(),
            reason: format!("is not {}", expected),
        }
    }

    /// True for failures raised while talking to the service, as opposed to
    /// failures decoding what it sent back.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Service { .. })
    }

    /// HTTP status of a service-side failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
