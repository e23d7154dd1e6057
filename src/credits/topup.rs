use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::credits::domain::{
    AccountId, LedgerEntry, LedgerEntryKind, LedgerRefKind, TopupIntent, TopupStatus,
};
use crate::credits::error::CreditsError;
use crate::credits::pricing::{PricingTable, TopupTier};
use crate::credits::provider::{
    CheckoutObject, CheckoutParams, PaymentProvider, WebhookEvent, CHECKOUT_SESSION_COMPLETED,
    METADATA_TOPUP_ID,
};
use crate::credits::store::{BatchRecord, CommitError, CreditsStore, LedgerBatch};

/// Hosted checkout handle returned to the caller for redirecting the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopupCheckout {
    pub checkout_url: String,
    pub topup_id: Uuid,
}

/// Outcome of processing one webhook event. Everything that is not a fresh
/// completion of a pending intent is `Ignored`: unrelated event types,
/// events without a usable `topup_id`, unknown intents, and redeliveries of
/// an already-applied completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopupOutcome {
    Credited {
        account_id: AccountId,
        credits: i64,
        new_balance: i64,
    },
    Ignored,
}

/// Sells credit top-ups through the payment provider's hosted checkout and
/// applies the completion webhook to the wallet exactly once.
pub struct TopupService<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
    pricing: PricingTable,
}

impl<S, P> TopupService<S, P>
where
    S: CreditsStore,
    P: PaymentProvider,
{
    pub fn new(store: Arc<S>, provider: Arc<P>, pricing: PricingTable) -> Self {
        Self {
            store,
            provider,
            pricing,
        }
    }

    /// Record a pending [`TopupIntent`] and obtain a hosted checkout for it.
    ///
    /// The intent is inserted before the provider call and the session id is
    /// attached after it; no wallet mutation happens here. Credits land only
    /// when the completion webhook arrives.
    pub fn create_checkout(
        &self,
        account_id: AccountId,
        tier: TopupTier,
    ) -> Result<TopupCheckout, CreditsError> {
        let package = self.pricing.topup(tier);
        let topup_id = Uuid::new_v4();

        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_TOPUP_ID.to_string(), topup_id.to_string());
        metadata.insert("account_id".to_string(), account_id.0.to_string());
        metadata.insert("credits_amount".to_string(), package.credits.to_string());

        let intent = TopupIntent {
            id: topup_id,
            account_id,
            credits_amount: package.credits,
            amount_cents: package.amount_cents,
            currency: "USD".to_string(),
            checkout_session_id: None,
            payment_intent_id: None,
            status: TopupStatus::Pending,
            metadata: metadata.clone(),
            completed_at: None,
            created_at: Utc::now(),
        };
        self.store.insert_topup(intent)?;

        let session = self.provider.create_checkout(CheckoutParams {
            amount_cents: package.amount_cents,
            currency: "usd".to_string(),
            product_name: format!("Tenant Review Credits ({} credits)", package.credits),
            metadata,
        })?;
        self.store.set_topup_session(topup_id, &session.session_id)?;

        tracing::info!(
            account = %account_id.0,
            tier = tier.label(),
            credits = package.credits,
            "top-up checkout created"
        );

        Ok(TopupCheckout {
            checkout_url: session.url,
            topup_id,
        })
    }

    /// Verify a raw webhook payload and dispatch the parsed event.
    pub fn handle_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<TopupOutcome, CreditsError> {
        let event = self.provider.verify_webhook(payload, signature)?;
        self.handle_event(&event)
    }

    /// Apply one verified event. Only `checkout.session.completed` can move
    /// credits; every other type is acknowledged and ignored.
    pub fn handle_event(&self, event: &WebhookEvent) -> Result<TopupOutcome, CreditsError> {
        if event.kind != CHECKOUT_SESSION_COMPLETED {
            tracing::debug!(kind = %event.kind, "ignoring unrelated webhook event");
            return Ok(TopupOutcome::Ignored);
        }
        self.handle_completed(&event.data.object)
    }

    /// Idempotently complete the pending intent named by the event metadata
    /// and credit the wallet in the same atomic batch.
    pub fn handle_completed(&self, object: &CheckoutObject) -> Result<TopupOutcome, CreditsError> {
        let topup_id = match object
            .metadata
            .get(METADATA_TOPUP_ID)
            .and_then(|raw| Uuid::parse_str(raw).ok())
        {
            Some(id) => id,
            None => {
                tracing::debug!("completed event without usable topup_id metadata");
                return Ok(TopupOutcome::Ignored);
            }
        };

        let intent = match self.store.topup(topup_id)? {
            Some(intent) => intent,
            None => {
                tracing::debug!(topup = %topup_id, "completed event for unknown intent");
                return Ok(TopupOutcome::Ignored);
            }
        };
        if intent.status != TopupStatus::Pending {
            tracing::debug!(topup = %topup_id, "intent already completed, absorbing redelivery");
            return Ok(TopupOutcome::Ignored);
        }

        let now = Utc::now();
        let batch = LedgerBatch::new(intent.account_id)
            .with_record(BatchRecord::TopupCompleted {
                topup_id,
                payment_intent_id: object.payment_intent.clone(),
                completed_at: now,
            })
            .with_entry(LedgerEntry::new(
                intent.account_id,
                intent.credits_amount,
                LedgerEntryKind::Topup,
                LedgerRefKind::StripeTopup,
                topup_id,
                format!("Top-up: {} credits via Stripe", intent.credits_amount),
                now,
            ));

        let wallet = match self.store.commit(batch) {
            Ok(wallet) => wallet,
            // A concurrent delivery won the race to complete the intent.
            Err(CommitError::StaleRecord) => {
                tracing::debug!(topup = %topup_id, "intent completed concurrently, absorbing");
                return Ok(TopupOutcome::Ignored);
            }
            Err(err) => return Err(CreditsError::from_commit(err, 0)),
        };

        tracing::info!(
            topup = %topup_id,
            account = %intent.account_id.0,
            credits = intent.credits_amount,
            balance = wallet.balance_credits,
            "top-up completed, wallet credited"
        );

        Ok(TopupOutcome::Credited {
            account_id: intent.account_id,
            credits: intent.credits_amount,
            new_balance: wallet.balance_credits,
        })
    }
}
