use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::credits::contact::{ContactRequestService, ThreadError, ThreadOpener};
use crate::credits::domain::{
    AccountId, ContactRequest, ContactRequestStatus, LedgerEntry, LedgerEntryKind, LedgerRefKind,
    ReviewId,
};
use crate::credits::pricing::PricingTable;
use crate::credits::provider::{
    CheckoutObject, CheckoutParams, CheckoutSession, PaymentProvider, ProviderError,
    SignatureError, WebhookData, WebhookEvent, CHECKOUT_SESSION_COMPLETED, METADATA_TOPUP_ID,
};
use crate::credits::store::{BatchRecord, CreditsStore, LedgerBatch, MemoryCreditsStore};
use crate::credits::topup::TopupService;
use crate::credits::unlock::UnlockEngine;
use crate::credits::wallet::WalletService;

pub(super) const VALID_SIGNATURE: &str = "t=123,v1=valid";

pub(super) fn account() -> AccountId {
    AccountId(Uuid::new_v4())
}

pub(super) fn review() -> ReviewId {
    ReviewId(Uuid::new_v4())
}

pub(super) fn pricing() -> PricingTable {
    PricingTable::default()
}

pub(super) fn store() -> Arc<MemoryCreditsStore> {
    Arc::new(MemoryCreditsStore::new())
}

pub(super) fn wallet_service(store: Arc<MemoryCreditsStore>) -> WalletService<MemoryCreditsStore> {
    WalletService::new(store)
}

pub(super) fn unlock_engine(store: Arc<MemoryCreditsStore>) -> UnlockEngine<MemoryCreditsStore> {
    UnlockEngine::new(store, pricing())
}

pub(super) fn contact_service(
    store: Arc<MemoryCreditsStore>,
    threads: Arc<MemoryThreads>,
) -> ContactRequestService<MemoryCreditsStore, MemoryThreads> {
    ContactRequestService::new(store, threads, pricing())
}

pub(super) fn topup_service(
    store: Arc<MemoryCreditsStore>,
    provider: Arc<MockProvider>,
) -> TopupService<MemoryCreditsStore, MockProvider> {
    TopupService::new(store, provider, pricing())
}

/// Seed a wallet with credits through a top-up-shaped ledger entry.
pub(super) fn fund(store: &MemoryCreditsStore, account_id: AccountId, credits: i64) {
    let batch = LedgerBatch::new(account_id).with_entry(LedgerEntry::new(
        account_id,
        credits,
        LedgerEntryKind::Topup,
        LedgerRefKind::StripeTopup,
        Uuid::new_v4(),
        format!("Test funding: {credits} credits"),
        Utc::now(),
    ));
    store.commit(batch).expect("funding commit succeeds");
}

/// Sum of all ledger entries for the account; must equal the balance.
pub(super) fn ledger_sum(store: &MemoryCreditsStore, account_id: AccountId) -> i64 {
    store
        .ledger(account_id)
        .expect("ledger read succeeds")
        .iter()
        .map(|entry| entry.amount)
        .sum()
}

pub(super) fn assert_conserved(store: &MemoryCreditsStore, account_id: AccountId) {
    let balance = store
        .get_or_create_wallet(account_id)
        .expect("wallet read succeeds")
        .balance_credits;
    assert_eq!(
        ledger_sum(store, account_id),
        balance,
        "ledger sum must equal wallet balance"
    );
}

/// Insert a pending contact request directly, bypassing the purchase charge.
/// Used to stage edge cases like an already-expired request.
pub(super) fn seed_contact_request(
    store: &MemoryCreditsStore,
    requester_id: AccountId,
    target_id: AccountId,
    expires_in: Duration,
) -> ContactRequest {
    let now = Utc::now();
    let request = ContactRequest {
        id: Uuid::new_v4(),
        requester_id,
        target_id,
        property_id: Uuid::new_v4(),
        review_id: None,
        status: ContactRequestStatus::Pending,
        message: Some("Hoping to ask about the landlord".to_string()),
        expires_at: now + expires_in,
        responded_at: None,
        created_at: now,
    };
    let batch = LedgerBatch::new(requester_id)
        .with_record(BatchRecord::ContactRequest(request.clone()));
    store.commit(batch).expect("seed commit succeeds");
    request
}

pub(super) fn completed_event(topup_id: Uuid, payment_intent: &str) -> WebhookEvent {
    let mut metadata = BTreeMap::new();
    metadata.insert(METADATA_TOPUP_ID.to_string(), topup_id.to_string());
    WebhookEvent {
        kind: CHECKOUT_SESSION_COMPLETED.to_string(),
        data: WebhookData {
            object: CheckoutObject {
                metadata,
                payment_intent: Some(payment_intent.to_string()),
            },
        },
    }
}

#[derive(Default)]
pub(super) struct MemoryThreads {
    opened: Mutex<Vec<ContactRequest>>,
}

impl MemoryThreads {
    pub(super) fn opened(&self) -> Vec<ContactRequest> {
        self.opened.lock().expect("threads mutex poisoned").clone()
    }
}

impl ThreadOpener for MemoryThreads {
    fn open_thread(&self, request: &ContactRequest) -> Result<(), ThreadError> {
        self.opened
            .lock()
            .expect("threads mutex poisoned")
            .push(request.clone());
        Ok(())
    }
}

/// Payment provider double: records checkout params and verifies webhook
/// payloads by parsing them as JSON when the signature matches.
#[derive(Default)]
pub(super) struct MockProvider {
    checkouts: Mutex<Vec<CheckoutParams>>,
}

impl MockProvider {
    pub(super) fn checkouts(&self) -> Vec<CheckoutParams> {
        self.checkouts
            .lock()
            .expect("provider mutex poisoned")
            .clone()
    }
}

impl PaymentProvider for MockProvider {
    fn create_checkout(&self, params: CheckoutParams) -> Result<CheckoutSession, ProviderError> {
        let mut guard = self.checkouts.lock().expect("provider mutex poisoned");
        guard.push(params);
        Ok(CheckoutSession {
            url: format!("https://checkout.test/session/{}", guard.len()),
            session_id: format!("cs_test_{}", guard.len()),
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, SignatureError> {
        if signature != VALID_SIGNATURE {
            return Err(SignatureError);
        }
        serde_json::from_slice(payload).map_err(|_| SignatureError)
    }
}

/// Provider that refuses every checkout, for failure-path coverage.
pub(super) struct OfflineProvider;

impl PaymentProvider for OfflineProvider {
    fn create_checkout(&self, _params: CheckoutParams) -> Result<CheckoutSession, ProviderError> {
        Err(ProviderError::Unavailable("gateway offline".to_string()))
    }

    fn verify_webhook(
        &self,
        _payload: &[u8],
        _signature: &str,
    ) -> Result<WebhookEvent, SignatureError> {
        Err(SignatureError)
    }
}
