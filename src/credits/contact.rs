use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::credits::domain::{
    AccountId, ContactRequest, ContactRequestStatus, LedgerEntry, LedgerEntryKind, LedgerRefKind,
    ReviewId, Wallet,
};
use crate::credits::error::CreditsError;
use crate::credits::pricing::PricingTable;
use crate::credits::store::{BatchRecord, CreditsStore, LedgerBatch};

/// Pending contact requests expire this long after creation. Expiry is
/// evaluated lazily when a response arrives; there is no background sweeper.
pub const CONTACT_REQUEST_TTL_DAYS: i64 = 7;

/// Trait describing the messaging collaborator that opens a conversation
/// thread once a contact request is accepted.
pub trait ThreadOpener: Send + Sync {
    fn open_thread(&self, request: &ContactRequest) -> Result<(), ThreadError>;
}

/// Thread-opening dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
    #[error("messaging transport unavailable: {0}")]
    Transport(String),
}

/// Intake parameters for a paid contact request.
#[derive(Debug, Clone)]
pub struct NewContactRequest {
    pub requester_id: AccountId,
    pub target_id: AccountId,
    pub property_id: Uuid,
    pub review_id: Option<ReviewId>,
    pub message: Option<String>,
}

/// Result of a successful contact-request purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactPurchase {
    pub request_id: Uuid,
    pub credits_charged: i64,
    pub new_balance: i64,
}

/// The target's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactDecision {
    Accept,
    Decline,
}

/// Charges the flat contact fee upfront, walks the request state machine,
/// and refunds the requester when the target declines.
pub struct ContactRequestService<S, T> {
    store: Arc<S>,
    threads: Arc<T>,
    pricing: PricingTable,
}

impl<S, T> ContactRequestService<S, T>
where
    S: CreditsStore,
    T: ThreadOpener,
{
    pub fn new(store: Arc<S>, threads: Arc<T>, pricing: PricingTable) -> Self {
        Self {
            store,
            threads,
            pricing,
        }
    }

    /// Create a pending request, debiting the flat price in the same atomic
    /// batch that inserts the request row. An unaffordable charge fails with
    /// `InsufficientCredits` and creates nothing.
    pub fn purchase(&self, intake: NewContactRequest) -> Result<ContactPurchase, CreditsError> {
        let charge = self.pricing.contact_request;
        let now = Utc::now();
        let request = ContactRequest {
            id: Uuid::new_v4(),
            requester_id: intake.requester_id,
            target_id: intake.target_id,
            property_id: intake.property_id,
            review_id: intake.review_id,
            status: ContactRequestStatus::Pending,
            message: intake.message,
            expires_at: now + Duration::days(CONTACT_REQUEST_TTL_DAYS),
            responded_at: None,
            created_at: now,
        };
        let request_id = request.id;

        let batch = LedgerBatch::new(intake.requester_id)
            .with_entry(LedgerEntry::new(
                intake.requester_id,
                -charge,
                LedgerEntryKind::Charge,
                LedgerRefKind::ContactRequest,
                request_id,
                format!("Contact request: {charge} credits"),
                now,
            ))
            .with_record(BatchRecord::ContactRequest(request));

        let wallet = self
            .store
            .commit(batch)
            .map_err(|err| CreditsError::from_commit(err, charge))?;

        Ok(ContactPurchase {
            request_id,
            credits_charged: charge,
            new_balance: wallet.balance_credits,
        })
    }

    /// Apply the target's decision to a pending request.
    ///
    /// A request found past its expiry transitions to `expired` and surfaces
    /// `Expired`; the stale-respond path never refunds. Accepting opens a
    /// messaging thread after the transition commits. Declining commits the
    /// transition and the refund entry as one batch, so a declined request
    /// without its refund is never observable.
    pub fn respond(
        &self,
        request_id: Uuid,
        responder_id: AccountId,
        decision: ContactDecision,
    ) -> Result<ContactRequest, CreditsError> {
        let request = self
            .store
            .contact_request(request_id)?
            .ok_or(CreditsError::NotFound)?;

        if request.target_id != responder_id {
            return Err(CreditsError::Forbidden);
        }
        if request.status != ContactRequestStatus::Pending {
            return Err(CreditsError::InvalidState);
        }

        let now = Utc::now();
        if request.is_expired(now) {
            let batch = LedgerBatch::new(request.requester_id).with_record(
                BatchRecord::ContactTransition {
                    request_id,
                    status: ContactRequestStatus::Expired,
                    responded_at: None,
                },
            );
            self.store
                .commit(batch)
                .map_err(|err| CreditsError::from_commit(err, 0))?;
            return Err(CreditsError::Expired);
        }

        let status = match decision {
            ContactDecision::Accept => ContactRequestStatus::Accepted,
            ContactDecision::Decline => ContactRequestStatus::Declined,
        };
        let mut batch = LedgerBatch::new(request.requester_id).with_record(
            BatchRecord::ContactTransition {
                request_id,
                status,
                responded_at: Some(now),
            },
        );
        if status == ContactRequestStatus::Declined {
            batch = batch.with_entry(refund_entry(
                request.requester_id,
                self.pricing.contact_request,
                request_id,
                now,
            ));
        }

        self.store
            .commit(batch)
            .map_err(|err| CreditsError::from_commit(err, 0))?;

        if status == ContactRequestStatus::Declined {
            tracing::info!(
                request = %request_id,
                requester = %request.requester_id.0,
                refund = self.pricing.contact_request,
                "declined contact request refunded"
            );
        }

        let mut updated = request;
        updated.status = status;
        updated.responded_at = Some(now);

        if status == ContactRequestStatus::Accepted {
            self.threads.open_thread(&updated)?;
        }

        Ok(updated)
    }

    /// Credit the flat price back with a refund ledger entry.
    ///
    /// The decline path of [`respond`](Self::respond) already refunds inside
    /// its own batch; this standalone operation exists for reconciling
    /// silently expired requests and must be invoked at most once per
    /// request.
    pub fn refund_contact_request(
        &self,
        request_id: Uuid,
        account_id: AccountId,
    ) -> Result<Wallet, CreditsError> {
        let amount = self.pricing.contact_request;
        let batch = LedgerBatch::new(account_id).with_entry(refund_entry(
            account_id,
            amount,
            request_id,
            Utc::now(),
        ));
        let wallet = self
            .store
            .commit(batch)
            .map_err(|err| CreditsError::from_commit(err, 0))?;
        tracing::info!(
            request = %request_id,
            account = %account_id.0,
            refund = amount,
            "contact request refunded"
        );
        Ok(wallet)
    }
}

fn refund_entry(
    account_id: AccountId,
    amount: i64,
    request_id: Uuid,
    now: chrono::DateTime<Utc>,
) -> LedgerEntry {
    LedgerEntry::new(
        account_id,
        amount,
        LedgerEntryKind::Refund,
        LedgerRefKind::ContactRequest,
        request_id,
        format!("Refund for declined contact request: {amount} credits"),
        now,
    )
}
