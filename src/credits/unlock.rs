use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::credits::domain::{
    AccountId, LedgerEntry, LedgerEntryKind, LedgerRefKind, ReviewId, Unlock, UnlockTier,
};
use crate::credits::error::CreditsError;
use crate::credits::pricing::PricingTable;
use crate::credits::store::{BatchRecord, CreditsStore, LedgerBatch};

/// Result of a successful unlock purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockPurchase {
    pub unlock_id: Uuid,
    pub credits_charged: i64,
    pub new_balance: i64,
}

/// What the review-serving layer may reveal for one (account, review) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockAccess {
    pub has_summary: bool,
    pub has_detailed: bool,
    pub has_full: bool,
    pub highest_tier: Option<UnlockTier>,
}

/// Sells review access tier by tier, charging only the incremental
/// difference when an account upgrades.
pub struct UnlockEngine<S> {
    store: Arc<S>,
    pricing: PricingTable,
}

impl<S: CreditsStore> UnlockEngine<S> {
    pub fn new(store: Arc<S>, pricing: PricingTable) -> Self {
        Self { store, pricing }
    }

    /// Purchase `requested` access to a review.
    ///
    /// Owned tiers are re-derived from the unlock rows on every call. Buying
    /// a tier at or below the highest one held fails with `AlreadyUnlocked`;
    /// upgrading charges `price(requested) - sum(price(owned))`, clamped at
    /// zero. The debit, the unlock row, and the ledger entry commit as one
    /// atomic batch, and a zero charge records the unlock with no entry.
    pub fn purchase(
        &self,
        account_id: AccountId,
        review_id: ReviewId,
        requested: UnlockTier,
    ) -> Result<UnlockPurchase, CreditsError> {
        let owned = self.owned_tiers(account_id, review_id)?;
        if let Some(held) = owned.iter().copied().max() {
            if held >= requested {
                return Err(CreditsError::AlreadyUnlocked { held });
            }
        }

        let charge = self.pricing.upgrade_charge(&owned, requested);
        let now = Utc::now();
        let unlock = Unlock {
            id: Uuid::new_v4(),
            account_id,
            review_id,
            tier: requested,
            created_at: now,
        };
        let unlock_id = unlock.id;

        let mut batch = LedgerBatch::new(account_id).with_record(BatchRecord::Unlock(unlock));
        if charge > 0 {
            batch = batch.with_entry(LedgerEntry::new(
                account_id,
                -charge,
                LedgerEntryKind::Charge,
                LedgerRefKind::Unlock,
                unlock_id,
                format!("Unlock review ({requested}): {charge} credits"),
                now,
            ));
        }

        let wallet = self
            .store
            .commit(batch)
            .map_err(|err| CreditsError::from_commit(err, charge))?;

        tracing::info!(
            account = %account_id.0,
            review = %review_id.0,
            tier = requested.label(),
            charge,
            balance = wallet.balance_credits,
            "review unlock purchased"
        );

        Ok(UnlockPurchase {
            unlock_id,
            credits_charged: charge,
            new_balance: wallet.balance_credits,
        })
    }

    /// Highest tier held across all unlock rows for the pair, if any.
    pub fn highest_tier(
        &self,
        account_id: AccountId,
        review_id: ReviewId,
    ) -> Result<Option<UnlockTier>, CreditsError> {
        Ok(self
            .owned_tiers(account_id, review_id)?
            .into_iter()
            .max())
    }

    /// Expanded access flags consumed by the content reveal policy.
    pub fn access(
        &self,
        account_id: AccountId,
        review_id: ReviewId,
    ) -> Result<UnlockAccess, CreditsError> {
        let highest = self.highest_tier(account_id, review_id)?;
        Ok(UnlockAccess {
            has_summary: highest >= Some(UnlockTier::Summary),
            has_detailed: highest >= Some(UnlockTier::Detailed),
            has_full: highest >= Some(UnlockTier::Full),
            highest_tier: highest,
        })
    }

    fn owned_tiers(
        &self,
        account_id: AccountId,
        review_id: ReviewId,
    ) -> Result<BTreeSet<UnlockTier>, CreditsError> {
        Ok(self
            .store
            .unlocks_for_review(account_id, review_id)?
            .into_iter()
            .map(|unlock| unlock.tier)
            .collect())
    }
}
