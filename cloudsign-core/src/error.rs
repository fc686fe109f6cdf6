use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("rule {0} not found")]
    RuleNotFound(String),

    #[error("rule {0} is defined more than once")]
    RuleConflict(String),

    #[error("frame cannot have more than 4 lines (got {0})")]
    TooManyLines(usize),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("layout {layout}: {reason}")]
    InvalidLayout { layout: String, reason: String },

    #[error("group {0} not found")]
    GroupNotFound(String),

    #[error("group {0} has no registered signs")]
    GroupNotRegistered(String),

    #[error("location is already registered")]
    AlreadyRegistered,

    #[error("location is not registered")]
    NotRegistered,

    #[error("location could not be mapped: {0}")]
    Mapping(String),

    #[error("controller error: {0}")]
    Controller(#[source] BoxError),

    #[error("location registry error: {0}")]
    Registry(#[source] BoxError),

    #[error("sign manager is already running")]
    AlreadyStarted,
}

impl SignError {
    pub fn controller(err: impl Into<BoxError>) -> Self {
        SignError::Controller(err.into())
    }

    pub fn registry(err: impl Into<BoxError>) -> Self {
        SignError::Registry(err.into())
    }
}

pub type Result<T> = std::result::Result<T, SignError>;
