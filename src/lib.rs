//! Credit wallet and tiered unlock engine for the tenant review platform.
//!
//! Reviews are monetized through a ledger-backed credit wallet: accounts top
//! up credits through a hosted payment checkout, spend them to unlock review
//! content at escalating tiers or to contact a tenant, and get refunded when a
//! contact request is declined. Storage and the payment provider sit behind
//! traits so the engines can be embedded in any transport layer and exercised
//! in isolation.

pub mod config;
pub mod credits;
pub mod telemetry;
