use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for the account that owns a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

/// Identifier wrapper for a published property review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub Uuid);

/// Access tiers for review content, ordered from cheapest to most complete.
///
/// The derived `Ord` encodes the `summary < detailed < full` hierarchy that
/// the unlock engine prices against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockTier {
    Summary,
    Detailed,
    Full,
}

impl UnlockTier {
    /// All tiers in ascending rank order.
    pub const ALL: [UnlockTier; 3] = [UnlockTier::Summary, UnlockTier::Detailed, UnlockTier::Full];

    pub const fn label(self) -> &'static str {
        match self {
            UnlockTier::Summary => "summary",
            UnlockTier::Detailed => "detailed",
            UnlockTier::Full => "full",
        }
    }
}

impl fmt::Display for UnlockTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Single mutable credit balance per account. Mutated only through
/// [`crate::credits::store::CreditsStore::commit`], always alongside the
/// ledger entries that explain the movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub account_id: AccountId,
    pub balance_credits: i64,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn empty(account_id: AccountId, now: DateTime<Utc>) -> Self {
        Self {
            account_id,
            balance_credits: 0,
            updated_at: now,
        }
    }
}

/// Why a ledger entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Topup,
    Charge,
    Refund,
}

impl LedgerEntryKind {
    pub const fn label(self) -> &'static str {
        match self {
            LedgerEntryKind::Topup => "topup",
            LedgerEntryKind::Charge => "charge",
            LedgerEntryKind::Refund => "refund",
        }
    }
}

/// The record that caused a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerRefKind {
    Unlock,
    ContactRequest,
    StripeTopup,
}

impl LedgerRefKind {
    pub const fn label(self) -> &'static str {
        match self {
            LedgerRefKind::Unlock => "unlock",
            LedgerRefKind::ContactRequest => "contact_request",
            LedgerRefKind::StripeTopup => "stripe_topup",
        }
    }
}

/// Immutable audit record of one credit movement. Positive amounts credit the
/// wallet, negative amounts debit it; the per-account sum always equals the
/// wallet balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: AccountId,
    pub amount: i64,
    pub kind: LedgerEntryKind,
    pub ref_kind: Option<LedgerRefKind>,
    pub ref_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        account_id: AccountId,
        amount: i64,
        kind: LedgerEntryKind,
        ref_kind: LedgerRefKind,
        ref_id: Uuid,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount,
            kind,
            ref_kind: Some(ref_kind),
            ref_id: Some(ref_id),
            description: Some(description.into()),
            created_at: now,
        }
    }
}

/// One purchased tier for one review. Accounts accumulate a row per tier they
/// have paid for; rows are never deleted and the current tier is re-derived
/// from them rather than cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unlock {
    pub id: Uuid,
    pub account_id: AccountId,
    pub review_id: ReviewId,
    pub tier: UnlockTier,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of an external checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopupStatus {
    Pending,
    Completed,
    Failed,
}

impl TopupStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TopupStatus::Pending => "pending",
            TopupStatus::Completed => "completed",
            TopupStatus::Failed => "failed",
        }
    }
}

/// Tracks a hosted-checkout purchase of credits from creation through the
/// webhook that completes it. Transitions pending→completed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopupIntent {
    pub id: Uuid,
    pub account_id: AccountId,
    pub credits_amount: i64,
    pub amount_cents: i64,
    pub currency: String,
    pub checkout_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub status: TopupStatus,
    pub metadata: BTreeMap<String, String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// State machine for a paid contact request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRequestStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl ContactRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ContactRequestStatus::Pending => "pending",
            ContactRequestStatus::Accepted => "accepted",
            ContactRequestStatus::Declined => "declined",
            ContactRequestStatus::Expired => "expired",
        }
    }
}

/// A requester paying to reach the tenant behind a review. The flat charge is
/// taken at creation and refunded if the tenant declines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRequest {
    pub id: Uuid,
    pub requester_id: AccountId,
    pub target_id: AccountId,
    pub property_id: Uuid,
    pub review_id: Option<ReviewId>,
    pub status: ContactRequestStatus,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ContactRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
