use std::sync::{Arc, Mutex};

use chrono::Utc;
use sea_orm::Database;
use uuid::Uuid;

use engine::{
    AttachProofCmd, CommitCmd, CommitItem, EmitError, Engine, EngineError, EventEmitter,
    NewExpenseCmd, RollbackCmd, SettlementEvent, SettlementEventKind, TransferActionCmd,
    TransferStatus,
};
use migration::MigratorTrait;

/// Emitter that records every event for later assertions.
#[derive(Debug, Default)]
struct RecordingEmitter {
    events: Mutex<Vec<SettlementEvent>>,
}

impl RecordingEmitter {
    fn kinds(&self) -> Vec<SettlementEventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, event: &SettlementEvent) -> Result<(), EmitError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Emitter that always fails, to check delivery stays best effort.
#[derive(Debug)]
struct FailingEmitter;

impl EventEmitter for FailingEmitter {
    fn emit(&self, _event: &SettlementEvent) -> Result<(), EmitError> {
        Err("downstream unavailable".into())
    }
}

async fn engine_with_emitter(emitter: Arc<dyn EventEmitter>) -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder()
        .database(db)
        .emitter(emitter)
        .build()
        .await
        .unwrap()
}

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

/// One expense of 240000 paid by m1, split evenly across four members.
async fn seed_trip(engine: &Engine) {
    engine
        .add_expense(
            NewExpenseCmd::new("trip", "Cabin rental", 240_000, "m1", "m1", Utc::now())
                .share("m1", 60_000)
                .share("m2", 60_000)
                .share("m3", 60_000)
                .share("m4", 60_000),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn balances_and_drafts_from_single_expense() {
    let engine = engine_with_db().await;
    seed_trip(&engine).await;

    let balances = engine.balances("trip").await.unwrap();
    assert_eq!(balances.get("m1"), Some(&180_000));
    assert_eq!(balances.get("m2"), Some(&-60_000));
    assert_eq!(balances.get("m3"), Some(&-60_000));
    assert_eq!(balances.get("m4"), Some(&-60_000));
    assert_eq!(balances.values().sum::<i64>(), 0);

    let drafts = engine.drafts("trip").await.unwrap();
    assert_eq!(drafts.len(), 3);
    assert!(drafts.iter().all(|d| d.to_member == "m1"));
    assert!(drafts.iter().all(|d| d.amount_minor == 60_000));
    // The payer's own share never becomes a draft.
    assert!(drafts.iter().all(|d| d.from_member != "m1"));
}

#[tokio::test]
async fn full_settlement_lifecycle() {
    let recorder = Arc::new(RecordingEmitter::default());
    let engine = engine_with_emitter(recorder.clone()).await;
    seed_trip(&engine).await;

    let drafts = engine.drafts("trip").await.unwrap();
    let mut commit = CommitCmd::new("trip", "m1");
    for draft in &drafts {
        commit = commit.item(CommitItem::new(
            draft.from_member.clone(),
            draft.to_member.clone(),
            draft.amount_minor,
        ));
    }
    let created = engine.commit_drafts(commit).await.unwrap();
    assert_eq!(created.len(), 3);
    assert!(created.iter().all(|t| t.status == TransferStatus::Requested));

    let m2_transfer = created
        .iter()
        .find(|t| t.from_member == "m2")
        .unwrap()
        .clone();

    let sent = engine
        .mark_sent(
            TransferActionCmd::new("trip", m2_transfer.id, "m2").memo("paid via bank"),
        )
        .await
        .unwrap();
    assert_eq!(sent.status, TransferStatus::Sent);
    assert_eq!(sent.memo.as_deref(), Some("paid via bank"));

    let confirmed = engine
        .confirm(TransferActionCmd::new("trip", m2_transfer.id, "m1"))
        .await
        .unwrap();
    assert_eq!(confirmed.status, TransferStatus::Confirmed);

    assert_eq!(
        recorder.kinds(),
        vec![
            SettlementEventKind::Requested,
            SettlementEventKind::Requested,
            SettlementEventKind::Requested,
            SettlementEventKind::Sent,
            SettlementEventKind::Confirmed,
        ]
    );
    let events = recorder.events.lock().unwrap();
    let sent_event = &events[3];
    assert_eq!(sent_event.group_id, "trip");
    assert_eq!(sent_event.transfer_id, m2_transfer.id);
    assert_eq!(sent_event.actor_id, "m2");
    assert_eq!(sent_event.amount_minor, 60_000);
}

#[tokio::test]
async fn duplicate_unresolved_pair_rejected() {
    let engine = engine_with_db().await;

    engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();

    let err = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // A different direction for the same pair is allowed.
    engine
        .commit_drafts(CommitCmd::new("trip", "m1").item(CommitItem::new("m1", "m2", 10_000)))
        .await
        .unwrap();
}

#[tokio::test]
async fn pair_reopens_after_resolution() {
    let engine = engine_with_db().await;

    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let first = &created[0];

    engine
        .rollback(RollbackCmd::new("trip", first.id, "m2"))
        .await
        .unwrap();

    // Rolled back resolves the pair, so a fresh commit succeeds.
    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let second = &created[0];

    engine
        .mark_sent(TransferActionCmd::new("trip", second.id, "m2"))
        .await
        .unwrap();
    engine
        .confirm(TransferActionCmd::new("trip", second.id, "m1"))
        .await
        .unwrap();

    // Confirmed resolves it too.
    engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 5_000)))
        .await
        .unwrap();

    assert_eq!(engine.list_transfers("trip").await.unwrap().len(), 3);
}

#[tokio::test]
async fn commit_batch_is_all_or_nothing() {
    let engine = engine_with_db().await;

    engine
        .commit_drafts(CommitCmd::new("trip", "m3").item(CommitItem::new("m3", "m1", 60_000)))
        .await
        .unwrap();

    // Second item collides with the existing unresolved transfer, so the
    // first item must not be created either.
    let err = engine
        .commit_drafts(
            CommitCmd::new("trip", "m1")
                .item(CommitItem::new("m2", "m1", 60_000))
                .item(CommitItem::new("m3", "m1", 60_000)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let transfers = engine.list_transfers("trip").await.unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].from_member, "m3");
}

#[tokio::test]
async fn commit_rejects_empty_and_invalid_items() {
    let engine = engine_with_db().await;

    let err = engine
        .commit_drafts(CommitCmd::new("trip", "m1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m2", 1_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn transitions_enforce_order_and_actor() {
    let engine = engine_with_db().await;
    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let id = created[0].id;

    // Confirm before sent is a state conflict.
    let err = engine
        .confirm(TransferActionCmd::new("trip", id, "m1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // Only the sender may mark sent.
    let err = engine
        .mark_sent(TransferActionCmd::new("trip", id, "m1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .mark_sent(TransferActionCmd::new("trip", id, "m2"))
        .await
        .unwrap();

    // Only the receiver may confirm.
    let err = engine
        .confirm(TransferActionCmd::new("trip", id, "m2"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .confirm(TransferActionCmd::new("trip", id, "m1"))
        .await
        .unwrap();

    // A confirmed transfer accepts no further transitions.
    let err = engine
        .confirm(TransferActionCmd::new("trip", id, "m1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    let err = engine
        .mark_sent(TransferActionCmd::new("trip", id, "m2"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn confirmed_rollback_is_admin_only() {
    let engine = engine_with_db().await;
    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let id = created[0].id;

    engine
        .mark_sent(TransferActionCmd::new("trip", id, "m2"))
        .await
        .unwrap();
    engine
        .confirm(TransferActionCmd::new("trip", id, "m1"))
        .await
        .unwrap();

    let err = engine
        .rollback(RollbackCmd::new("trip", id, "m2"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let rolled = engine
        .rollback(RollbackCmd::new("trip", id, "admin").admin().memo("disputed"))
        .await
        .unwrap();
    assert_eq!(rolled.status, TransferStatus::RolledBack);
    assert_eq!(rolled.memo.as_deref(), Some("disputed"));

    // Terminal state: no further transitions.
    let err = engine
        .rollback(RollbackCmd::new("trip", id, "admin").admin())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn sender_rolls_back_own_sent_transfer() {
    let engine = engine_with_db().await;
    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let id = created[0].id;

    engine
        .mark_sent(TransferActionCmd::new("trip", id, "m2"))
        .await
        .unwrap();

    // The receiver may not roll back the sender's transfer.
    let err = engine
        .rollback(RollbackCmd::new("trip", id, "m1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let rolled = engine
        .rollback(RollbackCmd::new("trip", id, "m2"))
        .await
        .unwrap();
    assert_eq!(rolled.status, TransferStatus::RolledBack);
}

#[tokio::test]
async fn rollback_emits_rolled_back_event() {
    let recorder = Arc::new(RecordingEmitter::default());
    let engine = engine_with_emitter(recorder.clone()).await;
    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let id = created[0].id;

    engine
        .rollback(RollbackCmd::new("trip", id, "m2").memo("wrong amount"))
        .await
        .unwrap();

    assert_eq!(
        recorder.kinds(),
        vec![
            SettlementEventKind::Requested,
            SettlementEventKind::RolledBack,
        ]
    );
    let events = recorder.events.lock().unwrap();
    let rolled = events.last().unwrap();
    assert_eq!(rolled.transfer_id, id);
    assert_eq!(rolled.actor_id, "m2");
    assert_eq!(rolled.status, TransferStatus::RolledBack);
    assert_eq!(rolled.memo.as_deref(), Some("wrong amount"));
}

#[tokio::test]
async fn attach_proof_keeps_status_and_emits_nothing() {
    let recorder = Arc::new(RecordingEmitter::default());
    let engine = engine_with_emitter(recorder.clone()).await;
    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let id = created[0].id;

    let updated = engine
        .attach_proof(AttachProofCmd::new(
            "trip",
            id,
            "m2",
            "https://bank.example/receipt/42",
        ))
        .await
        .unwrap();
    assert_eq!(updated.status, TransferStatus::Requested);
    assert_eq!(
        updated.proof_url.as_deref(),
        Some("https://bank.example/receipt/42")
    );

    // Only the sender may attach proof.
    let err = engine
        .attach_proof(AttachProofCmd::new("trip", id, "m1", "https://x.example"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    // A blank URL is rejected.
    let err = engine
        .attach_proof(AttachProofCmd::new("trip", id, "m2", "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert_eq!(recorder.kinds(), vec![SettlementEventKind::Requested]);
}

#[tokio::test]
async fn nudge_emits_without_mutating() {
    let recorder = Arc::new(RecordingEmitter::default());
    let engine = engine_with_emitter(recorder.clone()).await;
    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let id = created[0].id;

    engine
        .nudge(TransferActionCmd::new("trip", id, "m1").memo("any news?"))
        .await
        .unwrap();

    let fetched = engine.transfer("trip", id).await.unwrap();
    assert_eq!(fetched.status, TransferStatus::Requested);

    let events = recorder.events.lock().unwrap();
    let nudge = events.last().unwrap();
    assert_eq!(nudge.kind, SettlementEventKind::Nudge);
    assert_eq!(nudge.actor_id, "m1");
    assert_eq!(nudge.memo.as_deref(), Some("any news?"));
}

#[tokio::test]
async fn emitter_failure_does_not_fail_the_operation() {
    let engine = engine_with_emitter(Arc::new(FailingEmitter)).await;

    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let id = created[0].id;

    engine
        .mark_sent(TransferActionCmd::new("trip", id, "m2"))
        .await
        .unwrap();
    let fetched = engine.transfer("trip", id).await.unwrap();
    assert_eq!(fetched.status, TransferStatus::Sent);
}

#[tokio::test]
async fn transfers_are_scoped_by_group() {
    let engine = engine_with_db().await;
    let created = engine
        .commit_drafts(CommitCmd::new("trip", "m2").item(CommitItem::new("m2", "m1", 60_000)))
        .await
        .unwrap();
    let id = created[0].id;

    let err = engine.transfer("other-trip", id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = engine
        .mark_sent(TransferActionCmd::new("other-trip", id, "m2"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = engine
        .nudge(TransferActionCmd::new("trip", Uuid::new_v4(), "m1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // The same pair in a different group does not conflict.
    engine
        .commit_drafts(
            CommitCmd::new("other-trip", "m2").item(CommitItem::new("m2", "m1", 60_000)),
        )
        .await
        .unwrap();
}
