use std::sync::Arc;

use tempfile::TempDir;

use super::*;
use crate::time::FixedClock;

const GUILD: GuildId = GuildId(10);
const OTHER_GUILD: GuildId = GuildId(11);

fn file_store(dir: &TempDir) -> FileSubscriptionStore<FixedClock> {
    FileSubscriptionStore::with_clock(
        dir.path().join("subscriptions.json"),
        FixedClock::at_unix(1_700_000_000),
    )
}

// ==================== AlertType ====================

#[test]
fn alert_type_filters_event_kinds() {
    assert!(AlertType::All.accepts(ChangeKind::HealthDropped));
    assert!(AlertType::All.accepts(ChangeKind::NewItemsListed));
    assert!(AlertType::Health.accepts(ChangeKind::HealthDropped));
    assert!(!AlertType::Health.accepts(ChangeKind::NewItemsListed));
    assert!(AlertType::Items.accepts(ChangeKind::NewItemsListed));
    assert!(!AlertType::Items.accepts(ChangeKind::HealthDropped));
}

#[test]
fn alert_type_parses_case_insensitively() {
    assert_eq!("ALL".parse::<AlertType>(), Ok(AlertType::All));
    assert_eq!(" health ".parse::<AlertType>(), Ok(AlertType::Health));
    assert_eq!("goods".parse::<AlertType>(), Ok(AlertType::Items));
    assert!("weather".parse::<AlertType>().is_err());
}

#[test]
fn subscription_without_alert_type_defaults_to_all() {
    let sub: Subscription = serde_json::from_str(r#"{"guild_id": 1, "channel_id": 2}"#).unwrap();

    assert_eq!(sub.alert_type, AlertType::All);
    assert_eq!(sub.channel_id, ChannelId(2));
    assert_eq!(sub.created_at, 0);
}

// ==================== MemorySubscriptionStore ====================

#[tokio::test]
async fn memory_add_is_idempotent() {
    let store = MemorySubscriptionStore::new();

    assert!(store.add(GUILD, ChannelId(1)).await.unwrap());
    assert!(!store.add(GUILD, ChannelId(1)).await.unwrap());

    assert_eq!(store.list().await.unwrap(), vec![ChannelId(1)]);
}

#[tokio::test]
async fn memory_duplicate_add_keeps_first_alert_type() {
    let store = MemorySubscriptionStore::new();

    store
        .add_with_type(GUILD, ChannelId(1), AlertType::Health)
        .await
        .unwrap();
    store
        .add_with_type(GUILD, ChannelId(1), AlertType::Items)
        .await
        .unwrap();

    let subs = store.subscriptions().await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].alert_type, AlertType::Health);
}

#[tokio::test]
async fn memory_remove_unknown_channel_is_noop() {
    let store = MemorySubscriptionStore::new();
    store.add(GUILD, ChannelId(1)).await.unwrap();

    store.remove(ChannelId(99)).await.unwrap();

    assert_eq!(store.list().await.unwrap(), vec![ChannelId(1)]);
}

#[tokio::test]
async fn memory_remove_drops_channel_from_every_guild() {
    let store = MemorySubscriptionStore::new();
    store.add(GUILD, ChannelId(1)).await.unwrap();
    store.add(OTHER_GUILD, ChannelId(1)).await.unwrap();
    store.add(GUILD, ChannelId(2)).await.unwrap();

    store.remove(ChannelId(1)).await.unwrap();

    assert_eq!(store.list().await.unwrap(), vec![ChannelId(2)]);
}

#[tokio::test]
async fn memory_list_preserves_insertion_order() {
    let store = MemorySubscriptionStore::new();
    for id in [5, 3, 9] {
        store.add(GUILD, ChannelId(id)).await.unwrap();
    }

    assert_eq!(
        store.list().await.unwrap(),
        vec![ChannelId(5), ChannelId(3), ChannelId(9)]
    );
}

#[tokio::test]
async fn memory_records_creation_time_from_clock() {
    let store = MemorySubscriptionStore::with_clock(FixedClock::at_unix(42));
    store.add(GUILD, ChannelId(1)).await.unwrap();

    assert_eq!(store.subscriptions().await.unwrap()[0].created_at, 42);
}

#[tokio::test]
async fn memory_concurrent_adds_keep_one_record_per_channel() {
    let store = Arc::new(MemorySubscriptionStore::new());

    let mut handles = Vec::new();
    for i in 0..20_u64 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.add(GUILD, ChannelId(i % 5)).await.unwrap()
        }));
    }

    let mut added = 0;
    for handle in handles {
        if handle.await.unwrap() {
            added += 1;
        }
    }

    assert_eq!(added, 5);
    assert_eq!(store.list().await.unwrap().len(), 5);
}

// ==================== FileSubscriptionStore ====================

#[tokio::test]
async fn file_missing_is_empty_registry() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    assert!(store.list().await.unwrap().is_empty());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn file_add_persists_across_instances() {
    let dir = TempDir::new().unwrap();

    assert!(file_store(&dir).add(GUILD, ChannelId(7)).await.unwrap());

    let reopened = file_store(&dir);
    let subs = reopened.subscriptions().await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].guild_id, GUILD);
    assert_eq!(subs[0].channel_id, ChannelId(7));
    assert_eq!(subs[0].created_at, 1_700_000_000);
}

#[tokio::test]
async fn file_add_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    assert!(store.add(GUILD, ChannelId(7)).await.unwrap());
    assert!(!store.add(GUILD, ChannelId(7)).await.unwrap());
    assert_eq!(store.list().await.unwrap(), vec![ChannelId(7)]);
}

#[tokio::test]
async fn file_remove_unknown_does_not_create_file() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    store.remove(ChannelId(1)).await.unwrap();

    assert!(!store.path().exists());
}

#[tokio::test]
async fn file_remove_persists() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store.add(GUILD, ChannelId(1)).await.unwrap();
    store.add(GUILD, ChannelId(2)).await.unwrap();

    store.remove(ChannelId(1)).await.unwrap();

    assert_eq!(file_store(&dir).list().await.unwrap(), vec![ChannelId(2)]);
}

#[tokio::test]
async fn file_sees_external_edits() {
    let dir = TempDir::new().unwrap();
    let engine_view = file_store(&dir);
    let cli_view = file_store(&dir);

    assert!(engine_view.list().await.unwrap().is_empty());
    cli_view.add(GUILD, ChannelId(3)).await.unwrap();

    assert_eq!(engine_view.list().await.unwrap(), vec![ChannelId(3)]);
}

#[tokio::test]
async fn file_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let store = FileSubscriptionStore::new(dir.path().join("nested/deeper/subs.json"));

    store.add(GUILD, ChannelId(1)).await.unwrap();

    assert!(store.path().exists());
}

#[tokio::test]
async fn file_leaves_no_temp_file_behind() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    store.add(GUILD, ChannelId(1)).await.unwrap();

    assert!(!dir.path().join("subscriptions.json.tmp").exists());
}

#[tokio::test]
async fn file_corrupted_json_is_reported_and_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    std::fs::write(store.path(), "{ not json").unwrap();

    let list_err = store.list().await.unwrap_err();
    assert!(matches!(list_err, RegistryError::Corrupted { .. }));

    let add_err = store.add(GUILD, ChannelId(1)).await.unwrap_err();
    assert!(matches!(add_err, RegistryError::Corrupted { .. }));

    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ not json");
}

#[tokio::test]
async fn file_wrong_version_is_corrupted() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    std::fs::write(store.path(), r#"{"version": 99, "subscriptions": []}"#).unwrap();

    let err = store.list().await.unwrap_err();

    assert!(err.to_string().contains("Incompatible version"));
}

#[tokio::test]
async fn file_unreadable_path_is_read_error() {
    let dir = TempDir::new().unwrap();
    // A directory at the registry path cannot be read as a file.
    let store = FileSubscriptionStore::new(dir.path());

    let err = store.list().await.unwrap_err();

    assert!(matches!(err, RegistryError::Read { .. }));
}

#[tokio::test]
async fn file_concurrent_adds_are_serialized() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(file_store(&dir));

    let mut handles = Vec::new();
    for i in 0..10_u64 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.add(GUILD, ChannelId(i)).await.unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    assert_eq!(store.list().await.unwrap().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_separate_instances_do_not_lose_updates() {
    let dir = TempDir::new().unwrap();
    // Two stores on one path share nothing in memory, like two processes.
    let adder = Arc::new(file_store(&dir));
    let remover = Arc::new(file_store(&dir));
    for i in 100..110_u64 {
        remover.add(GUILD, ChannelId(i)).await.unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..10_u64 {
        let adder = Arc::clone(&adder);
        handles.push(tokio::spawn(async move {
            adder.add(GUILD, ChannelId(i)).await.unwrap();
        }));
        let remover = Arc::clone(&remover);
        handles.push(tokio::spawn(async move {
            remover.remove(ChannelId(100 + i)).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut channels = file_store(&dir).list().await.unwrap();
    channels.sort_by_key(|channel| channel.0);
    assert_eq!(channels, (0..10).map(ChannelId).collect::<Vec<_>>());
    assert!(dir.path().join("subscriptions.json.lock").exists());
}

#[tokio::test]
async fn file_lock_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    // A directory where the lock file belongs cannot be opened for writing.
    std::fs::create_dir(dir.path().join("subscriptions.json.lock")).unwrap();

    let err = store.add(GUILD, ChannelId(1)).await.unwrap_err();

    assert!(matches!(err, RegistryError::Lock { .. }));
    assert!(!store.path().exists());
}

#[test]
fn stores_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MemorySubscriptionStore>();
    assert_send_sync::<FileSubscriptionStore>();
}
