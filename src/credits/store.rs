use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::credits::domain::{
    AccountId, ContactRequest, ContactRequestStatus, LedgerEntry, ReviewId, TopupIntent,
    TopupStatus, Unlock, UnlockTier, Wallet,
};

/// Error enumeration for backing-store failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("credits store unavailable: {0}")]
    Unavailable(String),
}

/// Rejections raised while applying a [`LedgerBatch`].
///
/// These are produced under the per-account lock, after the batch guards are
/// re-validated, so callers can trust them over anything they read earlier.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("insufficient balance: {available} credits available")]
    InsufficientBalance { available: i64 },
    #[error("unlock already held at {held} or above")]
    DuplicateUnlock { held: UnlockTier },
    #[error("record is no longer in the expected state")]
    StaleRecord,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Sibling rows and state transitions committed atomically with the batch's
/// ledger entries.
#[derive(Debug, Clone)]
pub enum BatchRecord {
    Unlock(Unlock),
    ContactRequest(ContactRequest),
    ContactTransition {
        request_id: Uuid,
        status: ContactRequestStatus,
        responded_at: Option<DateTime<Utc>>,
    },
    TopupCompleted {
        topup_id: Uuid,
        payment_intent_id: Option<String>,
        completed_at: DateTime<Utc>,
    },
}

/// One atomic unit of wallet mutation.
///
/// The wallet delta is the sum of the entry amounts, so a committed batch can
/// never drift the balance away from the ledger. A batch with no entries
/// (zero-charge unlock) moves no credits but still lands its records.
#[derive(Debug, Clone)]
pub struct LedgerBatch {
    pub account_id: AccountId,
    pub entries: Vec<LedgerEntry>,
    pub records: Vec<BatchRecord>,
}

impl LedgerBatch {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            entries: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: LedgerEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_record(mut self, record: BatchRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn delta(&self) -> i64 {
        self.entries.iter().map(|entry| entry.amount).sum()
    }
}

/// Storage abstraction so the payment engines can be exercised in isolation.
///
/// Implementations must make `commit` atomic and serialized per account: the
/// balance-floor check, the duplicate-unlock guard, and the pending-state
/// guards are re-validated inside the commit, and either every entry and
/// record in the batch lands or none do. A wallet missing at commit time is
/// created with balance 0. Reads carry no such guarantee and may be stale by
/// the time a batch is built; engines rely on the commit-time guards for
/// correctness under concurrency.
pub trait CreditsStore: Send + Sync {
    fn get_or_create_wallet(&self, account_id: AccountId) -> Result<Wallet, StorageError>;
    fn wallet(&self, account_id: AccountId) -> Result<Option<Wallet>, StorageError>;
    /// Ledger entries for an account, newest first.
    fn ledger(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, StorageError>;
    fn unlocks_for_review(
        &self,
        account_id: AccountId,
        review_id: ReviewId,
    ) -> Result<Vec<Unlock>, StorageError>;
    fn insert_topup(&self, intent: TopupIntent) -> Result<(), StorageError>;
    fn topup(&self, id: Uuid) -> Result<Option<TopupIntent>, StorageError>;
    fn set_topup_session(&self, id: Uuid, session_id: &str) -> Result<(), StorageError>;
    fn contact_request(&self, id: Uuid) -> Result<Option<ContactRequest>, StorageError>;
    fn commit(&self, batch: LedgerBatch) -> Result<Wallet, CommitError>;
}

#[derive(Default)]
struct StoreState {
    wallets: HashMap<AccountId, Wallet>,
    ledger: Vec<LedgerEntry>,
    unlocks: Vec<Unlock>,
    topups: HashMap<Uuid, TopupIntent>,
    contact_requests: HashMap<Uuid, ContactRequest>,
}

/// In-process reference implementation backed by a single mutex, which makes
/// every commit trivially serialized across all accounts. Suitable for tests
/// and single-node embedders; a relational implementation would scope the
/// lock to the wallet row instead.
#[derive(Default)]
pub struct MemoryCreditsStore {
    state: Mutex<StoreState>,
}

impl MemoryCreditsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))
    }
}

fn validate(state: &StoreState, batch: &LedgerBatch) -> Result<(), CommitError> {
    for record in &batch.records {
        match record {
            BatchRecord::Unlock(unlock) => {
                let held = state
                    .unlocks
                    .iter()
                    .filter(|existing| {
                        existing.account_id == unlock.account_id
                            && existing.review_id == unlock.review_id
                    })
                    .map(|existing| existing.tier)
                    .max();
                if let Some(held) = held {
                    if held >= unlock.tier {
                        return Err(CommitError::DuplicateUnlock { held });
                    }
                }
            }
            BatchRecord::ContactRequest(request) => {
                if state.contact_requests.contains_key(&request.id) {
                    return Err(CommitError::StaleRecord);
                }
            }
            BatchRecord::ContactTransition { request_id, .. } => {
                match state.contact_requests.get(request_id) {
                    Some(request) if request.status == ContactRequestStatus::Pending => {}
                    _ => return Err(CommitError::StaleRecord),
                }
            }
            BatchRecord::TopupCompleted { topup_id, .. } => match state.topups.get(topup_id) {
                Some(intent) if intent.status == TopupStatus::Pending => {}
                _ => return Err(CommitError::StaleRecord),
            },
        }
    }
    Ok(())
}

impl CreditsStore for MemoryCreditsStore {
    fn get_or_create_wallet(&self, account_id: AccountId) -> Result<Wallet, StorageError> {
        let mut state = self.state()?;
        let wallet = state
            .wallets
            .entry(account_id)
            .or_insert_with(|| Wallet::empty(account_id, Utc::now()));
        Ok(wallet.clone())
    }

    fn wallet(&self, account_id: AccountId) -> Result<Option<Wallet>, StorageError> {
        Ok(self.state()?.wallets.get(&account_id).cloned())
    }

    fn ledger(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, StorageError> {
        let state = self.state()?;
        let mut entries: Vec<LedgerEntry> = state
            .ledger
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect();
        entries.reverse();
        Ok(entries)
    }

    fn unlocks_for_review(
        &self,
        account_id: AccountId,
        review_id: ReviewId,
    ) -> Result<Vec<Unlock>, StorageError> {
        let state = self.state()?;
        Ok(state
            .unlocks
            .iter()
            .filter(|unlock| unlock.account_id == account_id && unlock.review_id == review_id)
            .cloned()
            .collect())
    }

    fn insert_topup(&self, intent: TopupIntent) -> Result<(), StorageError> {
        self.state()?.topups.insert(intent.id, intent);
        Ok(())
    }

    fn topup(&self, id: Uuid) -> Result<Option<TopupIntent>, StorageError> {
        Ok(self.state()?.topups.get(&id).cloned())
    }

    fn set_topup_session(&self, id: Uuid, session_id: &str) -> Result<(), StorageError> {
        if let Some(intent) = self.state()?.topups.get_mut(&id) {
            intent.checkout_session_id = Some(session_id.to_string());
        }
        Ok(())
    }

    fn contact_request(&self, id: Uuid) -> Result<Option<ContactRequest>, StorageError> {
        Ok(self.state()?.contact_requests.get(&id).cloned())
    }

    fn commit(&self, batch: LedgerBatch) -> Result<Wallet, CommitError> {
        let mut state = self.state()?;
        validate(&state, &batch)?;

        let now = Utc::now();
        let balance = state
            .wallets
            .get(&batch.account_id)
            .map(|wallet| wallet.balance_credits)
            .unwrap_or(0);
        let delta = batch.delta();
        if balance + delta < 0 {
            return Err(CommitError::InsufficientBalance { available: balance });
        }

        // Guards passed; everything below is infallible so the batch lands whole.
        for record in batch.records {
            match record {
                BatchRecord::Unlock(unlock) => state.unlocks.push(unlock),
                BatchRecord::ContactRequest(request) => {
                    state.contact_requests.insert(request.id, request);
                }
                BatchRecord::ContactTransition {
                    request_id,
                    status,
                    responded_at,
                } => {
                    if let Some(request) = state.contact_requests.get_mut(&request_id) {
                        request.status = status;
                        request.responded_at = responded_at;
                    }
                }
                BatchRecord::TopupCompleted {
                    topup_id,
                    payment_intent_id,
                    completed_at,
                } => {
                    if let Some(intent) = state.topups.get_mut(&topup_id) {
                        intent.status = TopupStatus::Completed;
                        intent.payment_intent_id = payment_intent_id;
                        intent.completed_at = Some(completed_at);
                    }
                }
            }
        }
        state.ledger.extend(batch.entries);

        let wallet = state
            .wallets
            .entry(batch.account_id)
            .or_insert_with(|| Wallet::empty(batch.account_id, now));
        wallet.balance_credits = balance + delta;
        wallet.updated_at = now;
        Ok(wallet.clone())
    }
}
