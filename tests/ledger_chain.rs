mod common;

use common::{env, moneyline};
use pickguard::domain::{Actor, PickChanges};
use pickguard::ledger::{hash_snapshot, verify_entries};
use pickguard::persistence::PickStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn concurrent_edits_produce_a_contiguous_chain() {
    let env = env();
    let creator = Uuid::new_v4();
    let pick = env
        .engine
        .create_pick(creator, Uuid::new_v4(), moneyline(-105, dec!(1), dec!(25)))
        .await
        .unwrap();

    let pick_id = pick.id;
    let mut handles = Vec::new();
    for i in 0..8u32 {
        let engine = env.engine.clone();
        handles.push(tokio::spawn(async move {
            let changes = PickChanges {
                units_risked: Some(Decimal::from(2 + i)),
                ..Default::default()
            };
            engine
                .update_pick(pick_id, Actor::creator(creator), changes, None)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let entries = env.store.ledger_entries(pick.id).await.unwrap();
    assert_eq!(entries.len(), 9);
    let sequences: Vec<i64> = entries.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=9).collect::<Vec<i64>>());

    let verification = env.engine.verify_chain(pick.id).await.unwrap();
    assert!(verification.valid);
    assert_eq!(verification.entries, 9);

    let stored = env.engine.get_pick(pick.id).await.unwrap();
    assert_eq!(stored.edits.len(), 8);
}

#[tokio::test]
async fn tampered_snapshot_is_detected() {
    let env = env();
    let creator = Uuid::new_v4();
    let pick = env
        .engine
        .create_pick(creator, Uuid::new_v4(), moneyline(140, dec!(1), dec!(10)))
        .await
        .unwrap();
    env.engine
        .update_pick(
            pick.id,
            Actor::creator(creator),
            PickChanges {
                selection: Some("Bills".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let mut entries = env.store.ledger_entries(pick.id).await.unwrap();
    assert!(verify_entries(&entries).valid);

    entries[0].snapshot["odds_american"] = json!(400);
    let verification = verify_entries(&entries);
    assert!(!verification.valid);
    assert_eq!(verification.first_invalid_sequence, Some(1));
}

#[tokio::test]
async fn relinked_entry_breaks_the_chain() {
    let env = env();
    let creator = Uuid::new_v4();
    let pick = env
        .engine
        .create_pick(creator, Uuid::new_v4(), moneyline(140, dec!(1), dec!(10)))
        .await
        .unwrap();
    env.engine
        .update_pick(
            pick.id,
            Actor::creator(creator),
            PickChanges {
                units_risked: Some(dec!(2)),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let mut entries = env.store.ledger_entries(pick.id).await.unwrap();
    entries[1].previous_hash = Some(hash_snapshot(&json!({"forged": true})).unwrap());
    let verification = verify_entries(&entries);
    assert!(!verification.valid);
    assert_eq!(verification.first_invalid_sequence, Some(2));
}

#[tokio::test]
async fn proof_for_unknown_pick_is_not_found() {
    let env = env();
    let err = env.engine.get_ledger_proof(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, pickguard::PickguardError::NotFound(_)));
}
