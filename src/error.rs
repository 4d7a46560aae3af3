use thiserror::Error;

/// Failures of the document store backing the red list, roster and submissions.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access document: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("blocking store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Outcomes of moderation and notification operations that are not plain success.
///
/// `Unauthorized`, `InvalidIdentity` and `AlreadyListed` are shown to the invoking
/// user. The remaining variants come from Discord or the store and only reach logs.
#[derive(Error, Debug)]
pub enum ModerationError {
    #[error("requester is not allowed to manage the red list")]
    Unauthorized,

    #[error("'{0}' is not a valid Discord user ID")]
    InvalidIdentity(String),

    #[error("user {0} is already in the red list")]
    AlreadyListed(String),

    #[error("failed to ban user {user}: {source}")]
    EnforcementFailed {
        user: u64,
        #[source]
        source: Box<serenity::Error>,
    },

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("failed to send message to channel {channel}: {source}")]
    SendFailed {
        channel: u64,
        #[source]
        source: Box<serenity::Error>,
    },
}

impl ModerationError {
    /// Whether the error is caused by the invoking user rather than the platform.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::InvalidIdentity(_) | Self::AlreadyListed(_)
        )
    }
}
