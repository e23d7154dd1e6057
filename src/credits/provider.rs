use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Webhook event type that completes a pending top-up. Every other type is
/// acknowledged and ignored.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Metadata key carrying the top-up intent id through the checkout round-trip.
pub const METADATA_TOPUP_ID: &str = "topup_id";

/// Parameters for a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutParams {
    pub amount_cents: i64,
    pub currency: String,
    pub product_name: String,
    pub metadata: BTreeMap<String, String>,
}

/// Hosted checkout reference returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub url: String,
    pub session_id: String,
}

/// Error raised when a checkout session cannot be created.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
    #[error("checkout rejected: {0}")]
    Rejected(String),
}

/// Inbound event failed its signature check, so it cannot be attributed to
/// the payment provider.
#[derive(Debug, thiserror::Error)]
#[error("webhook signature verification failed")]
pub struct SignatureError;

/// Trait describing the outbound payment-provider boundary.
pub trait PaymentProvider: Send + Sync {
    fn create_checkout(&self, params: CheckoutParams) -> Result<CheckoutSession, ProviderError>;
    /// Verify the raw webhook payload against its signature header and parse
    /// the event. Boundary crypto; the decision to apply or skip the event
    /// stays with the topup service.
    fn verify_webhook(&self, payload: &[u8], signature: &str)
        -> Result<WebhookEvent, SignatureError>;
}

/// Envelope of an inbound provider webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookData {
    pub object: CheckoutObject,
}

/// The checkout-session object inside a completed event. Unknown provider
/// fields are dropped; only the metadata and payment reference matter here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckoutObject {
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
}
