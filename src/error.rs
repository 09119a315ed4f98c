use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid task ID format: {0}")]
    InvalidTaskId(String),

    #[error("Invalid lane '{0}'. Valid lanes: todo, in_progress, completed")]
    InvalidLane(String),

    #[error("Invalid sort field '{0}'. Valid fields: order, createdAt, updatedAt, dueDate, priority, title, id")]
    InvalidSortField(String),

    #[error("Invalid sort order '{0}'. Valid orders: asc, desc")]
    InvalidSortOrder(String),

    #[error("Invalid priority '{0}'. Valid priorities: low, medium, high")]
    InvalidPriority(String),

    #[error("A move for task {0} is already in flight")]
    MoveInFlight(String),

    #[error("Backend unavailable")]
    WritesDisabled,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl BoardError {
    /// Whether retrying the same request could succeed without user action
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::MoveInFlight(_))
    }

    /// Errors raised before any request or local mutation took place
    pub fn is_rejected_locally(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::MoveInFlight(_) | Self::WritesDisabled
        )
    }
}
