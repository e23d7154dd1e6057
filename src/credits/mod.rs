//! Ledger-backed credit wallet, tiered review unlocks, paid contact
//! requests, and top-up reconciliation against the payment provider.
//!
//! Every wallet mutation travels through a [`store::LedgerBatch`] committed
//! atomically by the backing store, so each movement carries the ledger
//! entry that explains it and the per-account ledger sum always equals the
//! balance.

pub mod contact;
pub mod domain;
pub mod error;
pub mod pricing;
pub mod provider;
pub mod store;
pub mod topup;
pub mod unlock;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use contact::{
    ContactDecision, ContactPurchase, ContactRequestService, NewContactRequest, ThreadError,
    ThreadOpener, CONTACT_REQUEST_TTL_DAYS,
};
pub use domain::{
    AccountId, ContactRequest, ContactRequestStatus, LedgerEntry, LedgerEntryKind, LedgerRefKind,
    ReviewId, TopupIntent, TopupStatus, Unlock, UnlockTier, Wallet,
};
pub use error::CreditsError;
pub use pricing::{PricingTable, TopupPackage, TopupTier};
pub use provider::{
    CheckoutObject, CheckoutParams, CheckoutSession, PaymentProvider, ProviderError,
    SignatureError, WebhookData, WebhookEvent, CHECKOUT_SESSION_COMPLETED, METADATA_TOPUP_ID,
};
pub use store::{
    BatchRecord, CommitError, CreditsStore, LedgerBatch, MemoryCreditsStore, StorageError,
};
pub use topup::{TopupCheckout, TopupOutcome, TopupService};
pub use unlock::{UnlockAccess, UnlockEngine, UnlockPurchase};
pub use wallet::WalletService;
