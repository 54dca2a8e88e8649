//! Schema setup and persistence across reopen

use std::sync::Arc;

use chime_core::repository::{NotificationRepository, PreferenceRepository};
use chime_core::PreferenceProfile;
use chime_storage::{Database, SqliteNotificationRepository, SqlitePreferenceRepository};
use pretty_assertions::assert_eq;
use tests::db::TestDatabase;
use tests::fixtures::{self, ALICE, BOB};
use tokio::sync::Mutex;

#[test]
fn test_fresh_database_is_fully_migrated() {
    let test_db = TestDatabase::new();

    assert!(test_db.db_path().exists());
    assert_eq!(test_db.db.schema_version().unwrap(), 1);
}

#[test]
fn test_in_memory_database_is_fully_migrated() {
    let test_db = TestDatabase::in_memory();

    assert_eq!(test_db.db.schema_version().unwrap(), 1);
}

#[tokio::test]
async fn test_ledger_and_preferences_survive_reopen() {
    let test_db = TestDatabase::new();
    let path = test_db.db_path().to_path_buf();
    let (db, _dir) = test_db.shared();

    let record = fixtures::reply(ALICE, BOB, "see you there").into_record();
    let mut profile = PreferenceProfile::new_default(ALICE);
    profile.set_user_muted(BOB, true);
    profile.set_keyword_muted("spam", true);
    {
        let ledger = SqliteNotificationRepository::new(db.clone());
        let prefs = SqlitePreferenceRepository::new(db.clone());
        ledger.append(&record).await.unwrap();
        let stored = profile.clone();
        prefs
            .modify(
                ALICE,
                Box::new(move |p: &mut PreferenceProfile| {
                    *p = stored;
                    true
                }),
            )
            .await
            .unwrap();
    }
    drop(db);

    let reopened = Database::open(&path).expect("Failed to reopen database");
    assert_eq!(reopened.schema_version().unwrap(), 1);
    let db = Arc::new(Mutex::new(reopened));

    let ledger = SqliteNotificationRepository::new(db.clone());
    let loaded = ledger.get(&record.id).await.unwrap().expect("Record persisted");
    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.content(), Some("see you there"));
    assert_eq!(loaded.target_ref, record.target_ref);

    let prefs = SqlitePreferenceRepository::new(db);
    let loaded = prefs.get(ALICE).await.unwrap().expect("Profile persisted");
    assert_eq!(loaded.muted_user_ids, profile.muted_user_ids);
    assert_eq!(loaded.muted_keywords, profile.muted_keywords);
    assert_eq!(loaded.in_app, profile.in_app);
}
