mod common;

use common::{setup_offline, setup_online};
use fieldsync::application::ports::{LocalStore, RecordWrite};
use fieldsync::domain::entities::{PassRejection, SyncMetadata, SyncQueueDraft};
use fieldsync::domain::sync::{ConnectionClass, SyncStrategy};
use fieldsync::domain::value_objects::{EntityTable, ErrorKind, SyncAction, SyncPriority};
use serde_json::json;

#[tokio::test]
async fn lot_created_offline_syncs_once_back_online() {
    let ctx = setup_offline().await;
    let repo = &ctx.state.repository;
    let coordinator = &ctx.state.coordinator;

    let id = repo
        .create(EntityTable::Lots, json!({"name": "Lote A", "areaHa": 4.2}))
        .await
        .expect("create lot");
    assert_eq!(coordinator.status().await.unwrap().pending_count, 1);

    let rejected = coordinator.request_sync().await.unwrap();
    assert_eq!(rejected.rejection, Some(PassRejection::Offline));
    assert!(ctx.remote.calls().is_empty());

    let outcome = coordinator.connectivity_restored().await.unwrap();

    assert!(outcome.ran_successfully);
    assert!(outcome.all_items_succeeded);
    assert_eq!(outcome.synced_count, 1);
    assert_eq!(outcome.failed_count, 0);
    let lot = repo.get(EntityTable::Lots, &id).await.unwrap().unwrap();
    assert_eq!(lot.server_id.as_ref().map(|s| s.as_str()), Some("1"));
    assert!(!lot.sync.pending_sync);
    assert_eq!(lot.data.get_str("syncedBy"), Some("mock"));
    assert_eq!(coordinator.status().await.unwrap().pending_count, 0);
}

#[tokio::test]
async fn offline_mutations_reach_the_remote_in_enqueue_order() {
    let ctx = setup_online(ConnectionClass::Unknown, None).await;
    let repo = &ctx.state.repository;
    for n in 1..=5 {
        repo.create(EntityTable::Tasks, json!({"title": format!("Task {n}")}))
            .await
            .unwrap();
    }

    ctx.state.coordinator.request_sync().await.unwrap();

    let titles: Vec<String> = ctx
        .remote
        .calls_to("tasks")
        .into_iter()
        .map(|call| call.body["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Task 1", "Task 2", "Task 3", "Task 4", "Task 5"]);
}

#[tokio::test]
async fn duplicate_notifications_are_sent_once() {
    let ctx = setup_online(ConnectionClass::Wifi, Some(40)).await;
    let repo = &ctx.state.repository;
    for minutes_ago in [20, 10, 1] {
        let created = chrono::Utc::now() - chrono::Duration::minutes(minutes_ago);
        repo.create(
            EntityTable::Notifications,
            json!({
                "type": "pest_alert",
                "agentType": "pest_detection",
                "title": "Aphids in Lote A",
                "createdAt": created.to_rfc3339(),
            }),
        )
        .await
        .unwrap();
    }

    let outcome = ctx.state.coordinator.request_sync().await.unwrap();

    assert_eq!(outcome.synced_count, 1);
    assert_eq!(outcome.expired_count, 2);
    assert_eq!(outcome.failed_count, 0);
    assert_eq!(ctx.remote.calls_to("ai/notifications").len(), 1);
    assert!(ctx.state.store.dequeue_all().await.unwrap().is_empty());
    assert!(
        ctx.state
            .repository
            .pending(EntityTable::Notifications)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn expense_update_failing_with_network_errors_is_purged_and_logged() {
    let ctx = setup_online(ConnectionClass::Unknown, None).await;
    let repo = &ctx.state.repository;
    let id = repo
        .create(EntityTable::Expenses, json!({"amount": 80, "concept": "fuel"}))
        .await
        .unwrap();
    ctx.state.coordinator.request_sync().await.unwrap();

    repo.update(EntityTable::Expenses, &id, json!({"amount": 95}))
        .await
        .unwrap();
    ctx.remote.fail_next("expenses", ErrorKind::Network, 3);
    let outcome = ctx.state.coordinator.request_sync().await.unwrap();

    assert_eq!(outcome.failed_count, 1);
    assert!(outcome.errors[0].purged);
    let puts: Vec<_> = ctx
        .remote
        .calls_to("expenses")
        .into_iter()
        .filter(|call| call.method == "PUT")
        .collect();
    assert_eq!(puts.len(), 3);
    assert!(ctx.state.store.dequeue_all().await.unwrap().is_empty());

    let errors = ctx.state.recorder.recent_errors(10).await.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].category, ErrorKind::Network);
    assert_eq!(errors[0].action, Some(SyncAction::Update));
    let counts = ctx.state.recorder.error_counts_by_category().await.unwrap();
    assert_eq!(counts, vec![(ErrorKind::Network, 1)]);

    let expense = repo.get(EntityTable::Expenses, &id).await.unwrap().unwrap();
    assert!(expense.sync.pending_sync);
    assert_eq!(expense.data.get("amount"), Some(&json!(95)));
}

#[tokio::test]
async fn create_replayed_after_lost_ack_becomes_an_update() {
    let ctx = setup_online(ConnectionClass::Unknown, None).await;
    let repo = &ctx.state.repository;
    let id = repo
        .create(EntityTable::Harvests, json!({"crop": "coffee", "kg": 300}))
        .await
        .unwrap();
    ctx.state.coordinator.request_sync().await.unwrap();

    // Re-queue the original create for a record the remote already knows.
    let mut record = repo.get(EntityTable::Harvests, &id).await.unwrap().unwrap();
    record.sync = SyncMetadata::pending(SyncAction::Create);
    let enqueue = SyncQueueDraft::new(
        EntityTable::Harvests,
        id.clone(),
        SyncAction::Create,
        record.data.clone(),
        SyncPriority::Normal,
    );
    ctx.state
        .store
        .write_record(RecordWrite {
            record,
            enqueue: Some(enqueue),
        })
        .await
        .unwrap();

    let outcome = ctx.state.coordinator.request_sync().await.unwrap();

    assert_eq!(outcome.synced_count, 1);
    let calls = ctx.remote.calls_to("harvests");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, "POST");
    assert_eq!(calls[1].method, "PUT");
    assert_eq!(calls[1].server_id.as_deref(), Some("1"));
    assert!(calls.iter().all(|call| call.body.get("localId").is_none()));
    let harvest = repo.get(EntityTable::Harvests, &id).await.unwrap().unwrap();
    assert_eq!(harvest.server_id.unwrap().as_str(), "1");
}

#[tokio::test]
async fn cellular_pass_defers_routine_work() {
    let ctx = setup_online(ConnectionClass::Cellular, Some(100)).await;
    let repo = &ctx.state.repository;
    repo.create(EntityTable::InventoryItems, json!({"sku": "UREA-50"}))
        .await
        .unwrap();
    let urgent = repo
        .create_with_priority(
            EntityTable::PestObservations,
            json!({"pest": "rust", "severity": "critical"}),
            SyncPriority::Critical,
        )
        .await
        .unwrap();

    let outcome = ctx.state.coordinator.request_sync().await.unwrap();

    assert_eq!(outcome.strategy, Some(SyncStrategy::Conservative));
    assert_eq!(outcome.synced_count, 1);
    assert_eq!(outcome.skipped_count, 1);
    let observation = repo
        .get(EntityTable::PestObservations, &urgent)
        .await
        .unwrap()
        .unwrap();
    assert!(observation.server_id.is_some());
    assert_eq!(ctx.state.coordinator.status().await.unwrap().pending_count, 1);
}

#[tokio::test]
async fn deleting_a_synced_record_removes_it_remotely_then_locally() {
    let ctx = setup_online(ConnectionClass::Unknown, None).await;
    let repo = &ctx.state.repository;
    let id = repo
        .create(EntityTable::Lots, json!({"name": "Lote Z"}))
        .await
        .unwrap();
    ctx.state.coordinator.request_sync().await.unwrap();

    repo.delete(EntityTable::Lots, &id).await.unwrap();
    assert!(repo.get(EntityTable::Lots, &id).await.unwrap().is_none());
    assert!(repo.list(EntityTable::Lots).await.unwrap().is_empty());

    let outcome = ctx.state.coordinator.request_sync().await.unwrap();

    assert_eq!(outcome.synced_count, 1);
    let last = ctx.remote.calls().pop().unwrap();
    assert_eq!(last.method, "DELETE");
    assert_eq!(last.server_id.as_deref(), Some("1"));
    assert!(ctx.state.store.load_record(EntityTable::Lots, &id).await.unwrap().is_none());
}

#[tokio::test]
async fn health_reflects_backlog_and_outcomes() {
    let ctx = setup_online(ConnectionClass::Unknown, None).await;
    for n in 0..3 {
        ctx.state
            .repository
            .create(EntityTable::Tasks, json!({"title": format!("T{n}")}))
            .await
            .unwrap();
    }
    let before = ctx.state.recorder.health().await.unwrap();
    assert_eq!(before.pending_count, 3);

    ctx.state.coordinator.request_sync().await.unwrap();

    let after = ctx.state.recorder.health().await.unwrap();
    assert_eq!(after.pending_count, 0);
    assert_eq!(after.label.as_str(), "excellent");
    let snapshot = ctx.state.recorder.snapshot();
    assert_eq!(snapshot.items_synced, 3);
    assert_eq!(snapshot.passes_succeeded, 1);
}

#[tokio::test]
async fn lot_whose_create_was_purged_is_created_by_a_later_edit() {
    let ctx = setup_online(ConnectionClass::Unknown, None).await;
    let repo = &ctx.state.repository;
    let id = repo
        .create(EntityTable::Lots, json!({"name": "Lote Norte"}))
        .await
        .unwrap();
    ctx.remote.fail_next("lots", ErrorKind::Network, 3);
    let outcome = ctx.state.coordinator.request_sync().await.unwrap();
    assert!(outcome.errors[0].purged);

    let edited = repo
        .update(EntityTable::Lots, &id, json!({"name": "Lote Norte 2"}))
        .await
        .unwrap();
    assert_eq!(edited.sync.action, SyncAction::Create);
    let outcome = ctx.state.coordinator.request_sync().await.unwrap();

    assert_eq!(outcome.synced_count, 1);
    assert_eq!(outcome.failed_count, 0);
    let lot = repo.get(EntityTable::Lots, &id).await.unwrap().unwrap();
    assert!(lot.server_id.is_some());
    assert!(!lot.sync.pending_sync);
    let calls = ctx.remote.calls_to("lots");
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|call| call.method == "POST"));
    assert_eq!(calls[3].body["name"], json!("Lote Norte 2"));
}

#[tokio::test]
async fn prioritizing_a_purged_create_sends_it_as_a_create() {
    let ctx = setup_online(ConnectionClass::Unknown, None).await;
    let repo = &ctx.state.repository;
    let id = repo
        .create(EntityTable::Tasks, json!({"title": "Fumigar"}))
        .await
        .unwrap();
    ctx.remote.fail_next("tasks", ErrorKind::Network, 3);
    ctx.state.coordinator.request_sync().await.unwrap();
    assert!(ctx.state.store.dequeue_all().await.unwrap().is_empty());

    assert!(ctx
        .state
        .coordinator
        .prioritize(EntityTable::Tasks, &id)
        .await
        .unwrap());
    let outcome = ctx.state.coordinator.request_sync().await.unwrap();

    assert_eq!(outcome.synced_count, 1);
    let task = repo.get(EntityTable::Tasks, &id).await.unwrap().unwrap();
    assert!(task.server_id.is_some());
    assert!(!task.sync.pending_sync);
}
