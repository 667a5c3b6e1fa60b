use thiserror::Error;

#[derive(Error, Debug)]
pub enum CvecatError {
    #[error("invalid CVE: {0}")]
    InvalidIdentifier(String),

    #[error("invalid CVE prefix: {0}")]
    InvalidPrefix(String),

    #[error("invalid CVE year: {0}")]
    InvalidYear(String),

    #[error("invalid CVE identifier: {0}")]
    InvalidSequenceId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no description")]
    NoDescription,

    #[error("template: {0}")]
    TemplateCompile(String),

    /// `partial` holds whatever was rendered before execution stopped.
    #[error("template: {reason}")]
    TemplateExec { reason: String, partial: String },

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CvecatError {
    /// True for failures detected while parsing the identifier, before any
    /// network access.
    pub fn is_identifier_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier(_)
                | Self::InvalidPrefix(_)
                | Self::InvalidYear(_)
                | Self::InvalidSequenceId(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CvecatError>;
