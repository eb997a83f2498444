use thiserror::Error;

use crate::task::TaskId;

pub type FunnelResult<T> = Result<T, FunnelError>;

#[derive(Debug, Error)]
pub enum FunnelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("waitlist service error: {0}")]
    Transport(String),
    #[error("profile storage error: {0}")]
    Persistence(#[from] rusqlite::Error),
    #[error("profile encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("failed to acquire lock: {0}")]
    Lock(String),
}

impl From<reqwest::Error> for FunnelError {
    fn from(err: reqwest::Error) -> Self {
        FunnelError::Transport(err.to_string())
    }
}

/// Rejected user input. Raised before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{} is required", .0.input_label())]
    Missing(TaskId),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid EVM wallet address")]
    InvalidWallet,
    #[error("invalid Twitter username")]
    InvalidTwitter,
    #[error("invalid Discord username")]
    InvalidDiscord,
    #[error("complete the email task before verifying {}", .0.input_label())]
    EmailRequired(TaskId),
}

impl ValidationError {
    /// Toast title and body shown for this rejection.
    pub fn notice(&self) -> (&'static str, &'static str) {
        match self {
            ValidationError::Missing(TaskId::Email) => {
                ("Email Required", "Please enter your email address.")
            }
            ValidationError::Missing(TaskId::Wallet) => (
                "Wallet Address Required",
                "Please enter your EVM wallet address.",
            ),
            ValidationError::Missing(TaskId::Twitter) => {
                ("Username Required", "Please enter your Twitter username.")
            }
            ValidationError::Missing(TaskId::Discord) => {
                ("Username Required", "Please enter your Discord username.")
            }
            ValidationError::InvalidEmail => {
                ("Invalid Email", "Please enter a valid email address.")
            }
            ValidationError::InvalidWallet => (
                "Invalid Wallet Address",
                "Please enter a valid Ethereum wallet address.",
            ),
            ValidationError::InvalidTwitter => (
                "Invalid Username",
                "Please enter a valid Twitter username (1-15 characters, alphanumeric and underscores).",
            ),
            ValidationError::InvalidDiscord => {
                ("Invalid Username", "Please enter a valid Discord username.")
            }
            ValidationError::EmailRequired(_) => (
                "Email Required",
                "Please submit your email address before verifying social tasks.",
            ),
        }
    }
}
