use std::sync::Arc;
use std::thread;

use super::common::*;
use crate::config::PricingConfig;
use crate::credits::domain::{LedgerEntryKind, LedgerRefKind, UnlockTier};
use crate::credits::error::CreditsError;
use crate::credits::pricing::PricingTable;
use crate::credits::store::CreditsStore;
use crate::credits::unlock::UnlockEngine;

#[test]
fn first_purchase_charges_the_tier_price() {
    let store = store();
    let engine = unlock_engine(store.clone());
    let (account, review) = (account(), review());
    fund(&store, account, 20);

    let purchase = engine
        .purchase(account, review, UnlockTier::Summary)
        .expect("summary unlock");
    assert_eq!(purchase.credits_charged, 5);
    assert_eq!(purchase.new_balance, 15);

    let unlocks = store
        .unlocks_for_review(account, review)
        .expect("unlock rows");
    assert_eq!(unlocks.len(), 1);
    assert_eq!(unlocks[0].tier, UnlockTier::Summary);
    assert_eq!(unlocks[0].id, purchase.unlock_id);

    let entries = store.ledger(account).expect("ledger");
    assert_eq!(entries[0].kind, LedgerEntryKind::Charge);
    assert_eq!(entries[0].ref_kind, Some(LedgerRefKind::Unlock));
    assert_eq!(entries[0].ref_id, Some(purchase.unlock_id));
    assert_conserved(&store, account);
}

#[test]
fn upgrades_charge_only_the_difference() {
    let store = store();
    let engine = unlock_engine(store.clone());
    let (account, review) = (account(), review());
    fund(&store, account, 100);

    engine
        .purchase(account, review, UnlockTier::Summary)
        .expect("summary unlock");
    let upgrade = engine
        .purchase(account, review, UnlockTier::Full)
        .expect("full upgrade");

    // summary costs 5, full costs 30: the upgrade is 25, not 30
    assert_eq!(upgrade.credits_charged, 25);
    assert_eq!(upgrade.new_balance, 70);
    assert_eq!(
        store
            .unlocks_for_review(account, review)
            .expect("unlock rows")
            .len(),
        2
    );
    assert_conserved(&store, account);
}

#[test]
fn stepwise_upgrade_matches_the_cumulative_price() {
    let store = store();
    let engine = unlock_engine(store.clone());
    let (account, review) = (account(), review());
    fund(&store, account, 20);

    engine
        .purchase(account, review, UnlockTier::Summary)
        .expect("summary");
    let detailed = engine
        .purchase(account, review, UnlockTier::Detailed)
        .expect("detailed");
    assert_eq!(detailed.credits_charged, 10);
    assert_eq!(detailed.new_balance, 5);
}

#[test]
fn repurchasing_a_held_or_lower_tier_is_rejected() {
    let store = store();
    let engine = unlock_engine(store.clone());
    let (account, review) = (account(), review());
    fund(&store, account, 50);

    engine
        .purchase(account, review, UnlockTier::Detailed)
        .expect("detailed unlock");
    let entries_before = store.ledger(account).expect("ledger").len();

    for tier in [UnlockTier::Summary, UnlockTier::Detailed] {
        match engine.purchase(account, review, tier) {
            Err(CreditsError::AlreadyUnlocked { held }) => {
                assert_eq!(held, UnlockTier::Detailed);
            }
            other => panic!("expected already unlocked for {tier}, got {other:?}"),
        }
    }

    assert_eq!(
        store.ledger(account).expect("ledger").len(),
        entries_before,
        "rejected purchases must not write entries"
    );
    assert_conserved(&store, account);
}

#[test]
fn insufficient_credits_abort_without_side_effects() {
    let store = store();
    let engine = unlock_engine(store.clone());
    let (account, review) = (account(), review());
    fund(&store, account, 4);

    match engine.purchase(account, review, UnlockTier::Summary) {
        Err(CreditsError::InsufficientCredits {
            required,
            available,
        }) => {
            assert_eq!(required, 5);
            assert_eq!(available, 4);
        }
        other => panic!("expected insufficient credits, got {other:?}"),
    }

    assert!(store
        .unlocks_for_review(account, review)
        .expect("unlock rows")
        .is_empty());
    assert_conserved(&store, account);
}

#[test]
fn zero_charge_upgrade_records_the_unlock_without_an_entry() {
    // A table where detailed costs no more than summary leaves a zero-credit
    // upgrade; the unlock must land without a ledger entry.
    let config = PricingConfig {
        unlock_summary: 10,
        unlock_detailed: 10,
        ..PricingConfig::default()
    };
    let store = store();
    let engine = UnlockEngine::new(store.clone(), PricingTable::from_config(&config));
    let (account, review) = (account(), review());
    fund(&store, account, 10);

    engine
        .purchase(account, review, UnlockTier::Summary)
        .expect("summary");
    let upgrade = engine
        .purchase(account, review, UnlockTier::Detailed)
        .expect("free upgrade");

    assert_eq!(upgrade.credits_charged, 0);
    assert_eq!(upgrade.new_balance, 0);
    assert_eq!(
        store.ledger(account).expect("ledger").len(),
        2,
        "funding plus one charge, no zero-amount entry"
    );
    assert_eq!(
        store
            .unlocks_for_review(account, review)
            .expect("unlock rows")
            .len(),
        2
    );
    assert_conserved(&store, account);
}

#[test]
fn highest_tier_is_derived_from_all_rows() {
    let store = store();
    let engine = unlock_engine(store.clone());
    let (account, review) = (account(), review());
    fund(&store, account, 50);

    assert_eq!(engine.highest_tier(account, review).expect("query"), None);

    engine
        .purchase(account, review, UnlockTier::Summary)
        .expect("summary");
    engine
        .purchase(account, review, UnlockTier::Detailed)
        .expect("detailed");

    assert_eq!(
        engine.highest_tier(account, review).expect("query"),
        Some(UnlockTier::Detailed)
    );

    let access = engine.access(account, review).expect("access view");
    assert!(access.has_summary);
    assert!(access.has_detailed);
    assert!(!access.has_full);
    assert_eq!(access.highest_tier, Some(UnlockTier::Detailed));
}

#[test]
fn racing_purchases_cannot_both_spend_the_same_credits() {
    // Balance covers exactly one summary unlock; two threads race to buy it
    // for different reviews. The commit-time balance check must let exactly
    // one through.
    let store = store();
    let engine = Arc::new(unlock_engine(store.clone()));
    let account = account();
    fund(&store, account, 5);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let review = review();
            thread::spawn(move || engine.purchase(account, review, UnlockTier::Summary))
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1, "only one purchase may succeed");
    assert!(results.iter().any(|result| matches!(
        result,
        Err(CreditsError::InsufficientCredits { .. })
    )));
    assert_eq!(
        store
            .get_or_create_wallet(account)
            .expect("wallet")
            .balance_credits,
        0
    );
    assert_conserved(&store, account);
}
