use crate::credits::contact::ThreadError;
use crate::credits::domain::UnlockTier;
use crate::credits::provider::{ProviderError, SignatureError};
use crate::credits::store::{CommitError, StorageError};

/// Error raised by the credit engines.
///
/// The first six variants are business-rule or request-level failures meant
/// to be surfaced to the caller; `Storage` covers transaction and
/// connectivity failures. Duplicate or malformed webhook events never reach
/// this enum; they are absorbed as no-ops.
#[derive(Debug, thiserror::Error)]
pub enum CreditsError {
    #[error("insufficient credits: need {required}, have {available}")]
    InsufficientCredits { required: i64, available: i64 },
    #[error("review already unlocked at {held} or above")]
    AlreadyUnlocked { held: UnlockTier },
    #[error("contact request not found")]
    NotFound,
    #[error("only the contacted account can respond")]
    Forbidden,
    #[error("contact request is no longer pending")]
    InvalidState,
    #[error("contact request has expired")]
    Expired,
    #[error(transparent)]
    Thread(#[from] ThreadError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CreditsError {
    /// Fold commit rejections into the caller-facing taxonomy. `required` is
    /// the charge the caller attempted, echoed into the insufficient-credits
    /// variant alongside the commit-time balance.
    pub(crate) fn from_commit(err: CommitError, required: i64) -> Self {
        match err {
            CommitError::InsufficientBalance { available } => CreditsError::InsufficientCredits {
                required,
                available,
            },
            CommitError::DuplicateUnlock { held } => CreditsError::AlreadyUnlocked { held },
            CommitError::StaleRecord => CreditsError::InvalidState,
            CommitError::Storage(err) => CreditsError::Storage(err),
        }
    }
}
