use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::credits::domain::{AccountId, LedgerEntry, LedgerEntryKind, LedgerRefKind, Wallet};
use crate::credits::error::CreditsError;
use crate::credits::store::{CreditsStore, LedgerBatch};

/// Read/create access to per-account balances plus the paired credit/debit
/// primitives. There is no raw "set balance": every movement goes through a
/// [`LedgerBatch`] so the audit trail and the balance cannot diverge.
pub struct WalletService<S> {
    store: Arc<S>,
}

impl<S: CreditsStore> WalletService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns the existing wallet or creates one with balance 0.
    pub fn get_or_create(&self, account_id: AccountId) -> Result<Wallet, CreditsError> {
        Ok(self.store.get_or_create_wallet(account_id)?)
    }

    pub fn balance(&self, account_id: AccountId) -> Result<i64, CreditsError> {
        Ok(self.get_or_create(account_id)?.balance_credits)
    }

    /// Movement history for an account, newest first.
    pub fn ledger(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, CreditsError> {
        Ok(self.store.ledger(account_id)?)
    }

    /// Credit `amount` (a positive magnitude) with its ledger entry.
    pub fn credit(
        &self,
        account_id: AccountId,
        amount: i64,
        kind: LedgerEntryKind,
        ref_kind: LedgerRefKind,
        ref_id: Uuid,
        description: impl Into<String>,
    ) -> Result<Wallet, CreditsError> {
        let entry = LedgerEntry::new(
            account_id,
            amount,
            kind,
            ref_kind,
            ref_id,
            description,
            Utc::now(),
        );
        self.store
            .commit(LedgerBatch::new(account_id).with_entry(entry))
            .map_err(|err| CreditsError::from_commit(err, 0))
    }

    /// Debit `amount` (a positive magnitude) with its ledger entry. Fails
    /// with `InsufficientCredits` when the balance cannot cover it; the
    /// check and the debit are one atomic step inside the store commit.
    pub fn debit(
        &self,
        account_id: AccountId,
        amount: i64,
        kind: LedgerEntryKind,
        ref_kind: LedgerRefKind,
        ref_id: Uuid,
        description: impl Into<String>,
    ) -> Result<Wallet, CreditsError> {
        let entry = LedgerEntry::new(
            account_id,
            -amount,
            kind,
            ref_kind,
            ref_id,
            description,
            Utc::now(),
        );
        self.store
            .commit(LedgerBatch::new(account_id).with_entry(entry))
            .map_err(|err| CreditsError::from_commit(err, amount))
    }
}
