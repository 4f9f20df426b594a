use crate::domain::entities::SyncQueueEntry;
use crate::domain::value_objects::{EntityTable, SyncAction};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Expired,
    /// A newer notification with the same `(type, agentType, title)` is queued.
    Superseded,
}

#[derive(Debug, Default)]
pub struct DedupPlan {
    pub keep: Vec<SyncQueueEntry>,
    pub drop: Vec<(SyncQueueEntry, DropReason)>,
}

type GroupKey = (String, String, String);

fn group_key(entry: &SyncQueueEntry) -> GroupKey {
    let field = |key: &str| {
        entry
            .payload_snapshot
            .get_str(key)
            .unwrap_or_default()
            .trim()
            .to_string()
    };
    (field("type"), field("agentType"), field("title"))
}

fn created_at(entry: &SyncQueueEntry) -> DateTime<Utc> {
    match entry.payload_snapshot.get("createdAt") {
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or(entry.enqueued_at),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(entry.enqueued_at),
        _ => entry.enqueued_at,
    }
}

fn is_candidate(entry: &SyncQueueEntry) -> bool {
    entry.table == EntityTable::Notifications && entry.action == SyncAction::Create
}

/// Splits the queue snapshot into entries to dispatch and notification creates
/// to drop. Order of kept entries is preserved.
pub fn plan(entries: Vec<SyncQueueEntry>, now: DateTime<Utc>, retention_days: i64) -> DedupPlan {
    // An unrepresentable window expires nothing.
    let cutoff = TimeDelta::try_days(retention_days.max(1))
        .and_then(|window| now.checked_sub_signed(window));
    let expired = |at: DateTime<Utc>| cutoff.is_some_and(|cutoff| at < cutoff);

    // Winner per group: newest createdAt, later enqueue on ties.
    let mut winners: HashMap<GroupKey, (DateTime<Utc>, usize)> = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        if !is_candidate(entry) {
            continue;
        }
        let at = created_at(entry);
        if expired(at) {
            continue;
        }
        winners
            .entry(group_key(entry))
            .and_modify(|best| {
                if at >= best.0 {
                    *best = (at, index);
                }
            })
            .or_insert((at, index));
    }

    let mut result = DedupPlan::default();
    for (index, entry) in entries.into_iter().enumerate() {
        if !is_candidate(&entry) {
            result.keep.push(entry);
            continue;
        }
        if expired(created_at(&entry)) {
            result.drop.push((entry, DropReason::Expired));
            continue;
        }
        let winner = winners.get(&group_key(&entry)).map(|(_, i)| *i);
        if winner == Some(index) {
            result.keep.push(entry);
        } else {
            result.drop.push((entry, DropReason::Superseded));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{
        EntityPayload, LocalId, SyncPriority, SyncQueueId,
    };
    use chrono::Duration;
    use serde_json::json;

    fn entry(id: i64, table: EntityTable, payload: Value, enqueued_at: DateTime<Utc>) -> SyncQueueEntry {
        SyncQueueEntry {
            id: SyncQueueId::new(id).unwrap(),
            table,
            record_id: LocalId::generate(),
            action: SyncAction::Create,
            payload_snapshot: EntityPayload::new(payload).unwrap(),
            priority: SyncPriority::Normal,
            enqueued_at,
            retry_count: 0,
            last_error: None,
            revision: 0,
        }
    }

    #[test]
    fn keeps_newest_notification_per_group() {
        let now = Utc::now();
        let alert = |minutes: i64| {
            json!({
                "type": "alert",
                "agentType": "pest_detection",
                "title": "Aphids detected",
                "createdAt": (now - Duration::minutes(minutes)).to_rfc3339(),
            })
        };
        let entries = vec![
            entry(1, EntityTable::Notifications, alert(30), now),
            entry(2, EntityTable::Lots, json!({"name": "Lote A"}), now),
            entry(3, EntityTable::Notifications, alert(5), now),
            entry(4, EntityTable::Notifications, alert(20), now),
        ];

        let plan = plan(entries, now, 30);

        let kept: Vec<i64> = plan.keep.iter().map(|e| e.id.value()).collect();
        assert_eq!(kept, vec![2, 3]);
        assert_eq!(plan.drop.len(), 2);
        assert!(plan.drop.iter().all(|(_, reason)| *reason == DropReason::Superseded));
    }

    #[test]
    fn old_notifications_expire_using_enqueue_time_fallback() {
        let now = Utc::now();
        let stale = now - Duration::days(31);
        let entries = vec![
            entry(1, EntityTable::Notifications, json!({"type": "tip", "title": "Irrigate"}), stale),
            entry(2, EntityTable::Notifications, json!({"type": "tip", "title": "Fertilise"}), now),
        ];

        let plan = plan(entries, now, 30);

        assert_eq!(plan.keep.len(), 1);
        assert_eq!(plan.drop[0].0.id.value(), 1);
        assert_eq!(plan.drop[0].1, DropReason::Expired);
    }

    #[test]
    fn oversized_retention_window_keeps_everything() {
        let now = Utc::now();
        let ancient = now - Duration::days(3650);
        let entries = vec![
            entry(1, EntityTable::Notifications, json!({"type": "tip", "title": "Prune"}), ancient),
            entry(2, EntityTable::Notifications, json!({"type": "tip", "title": "Mulch"}), now),
        ];

        let plan = plan(entries, now, i64::MAX);

        assert_eq!(plan.keep.len(), 2);
        assert!(plan.drop.is_empty());

        let entries = vec![entry(3, EntityTable::Notifications, json!({"type": "tip"}), ancient)];
        let plan = super::plan(entries, now, 200_000_000);
        assert_eq!(plan.keep.len(), 1);
    }
}
