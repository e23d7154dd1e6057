use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PricingConfig;
use crate::credits::domain::UnlockTier;

/// Top-up packages offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopupTier {
    Small,
    Medium,
    Large,
}

impl TopupTier {
    pub const ALL: [TopupTier; 3] = [TopupTier::Small, TopupTier::Medium, TopupTier::Large];

    pub const fn label(self) -> &'static str {
        match self {
            TopupTier::Small => "small",
            TopupTier::Medium => "medium",
            TopupTier::Large => "large",
        }
    }

    /// Boundary parsing for tier names arriving as strings.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => Some(TopupTier::Small),
            "medium" => Some(TopupTier::Medium),
            "large" => Some(TopupTier::Large),
            _ => None,
        }
    }
}

impl fmt::Display for TopupTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Money-to-credits mapping for one top-up tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopupPackage {
    pub amount_cents: i64,
    pub credits: i64,
}

/// Static price table for unlock tiers, contact requests, and top-ups.
///
/// Unlock tiers are priced cumulatively: upgrading charges only the
/// difference between the requested tier's price and what the account has
/// already paid for lower tiers of the same review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingTable {
    unlock_summary: i64,
    unlock_detailed: i64,
    unlock_full: i64,
    pub contact_request: i64,
    topup_small: TopupPackage,
    topup_medium: TopupPackage,
    topup_large: TopupPackage,
}

impl PricingTable {
    pub fn from_config(config: &PricingConfig) -> Self {
        Self {
            unlock_summary: config.unlock_summary,
            unlock_detailed: config.unlock_detailed,
            unlock_full: config.unlock_full,
            contact_request: config.contact_request,
            topup_small: TopupPackage {
                amount_cents: config.topup_small_cents,
                credits: config.topup_small_credits,
            },
            topup_medium: TopupPackage {
                amount_cents: config.topup_medium_cents,
                credits: config.topup_medium_credits,
            },
            topup_large: TopupPackage {
                amount_cents: config.topup_large_cents,
                credits: config.topup_large_credits,
            },
        }
    }

    pub fn unlock_price(&self, tier: UnlockTier) -> i64 {
        match tier {
            UnlockTier::Summary => self.unlock_summary,
            UnlockTier::Detailed => self.unlock_detailed,
            UnlockTier::Full => self.unlock_full,
        }
    }

    /// Credits already spent on a set of owned tiers.
    pub fn already_paid(&self, owned: &BTreeSet<UnlockTier>) -> i64 {
        owned.iter().map(|tier| self.unlock_price(*tier)).sum()
    }

    /// Incremental charge to reach `requested` given the tiers already owned.
    /// Clamped at zero so non-monotonic gaps in the table never refund.
    pub fn upgrade_charge(&self, owned: &BTreeSet<UnlockTier>, requested: UnlockTier) -> i64 {
        (self.unlock_price(requested) - self.already_paid(owned)).max(0)
    }

    pub fn topup(&self, tier: TopupTier) -> TopupPackage {
        match tier {
            TopupTier::Small => self.topup_small,
            TopupTier::Medium => self.topup_medium,
            TopupTier::Large => self.topup_large,
        }
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}
