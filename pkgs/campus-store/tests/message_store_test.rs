// Copyright 2024 Campus Rooms Team.
//
// Comprehensive tests for MessageStore

use campus_store::{MessageStore, PersistenceConfig, StoreError};
use sea_orm::Database;
use tempfile::NamedTempFile;

async fn create_store(temp_file: &NamedTempFile) -> MessageStore {
    MessageStore::new(temp_file.path().to_path_buf())
        .await
        .expect("Failed to create message store")
}

#[tokio::test]
async fn test_message_store_initialization() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    assert_eq!(store.total_messages().await.unwrap(), 0);
    assert_eq!(store.config().max_body_chars, 2000);
}

#[tokio::test]
async fn test_append_and_get_message() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    let msg = store
        .append("L42", "student", "landlord", "Is this room still available?")
        .await
        .expect("Failed to append message");

    assert_eq!(msg.listing_id, "L42");
    assert_eq!(msg.sender_id, "student");
    assert_eq!(msg.receiver_id, "landlord");
    assert!(!msg.read);
    assert!(msg.read_at.is_none());
    assert!(msg.deleted_by.is_empty());

    let retrieved = store
        .get_message(msg.id)
        .await
        .expect("Failed to get message")
        .expect("Message should exist");
    assert_eq!(retrieved, msg);

    assert!(store.get_message(msg.id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn test_append_rejects_invalid_messages() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    let err = store.append("L42", "student", "landlord", "   ").await.unwrap_err();
    assert!(matches!(err, StoreError::EmptyBody));
    assert!(err.is_validation());

    let err = store.append("L42", "student", "student", "hi").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidParticipants));

    let err = store.append("L42", "", "landlord", "hi").await.unwrap_err();
    assert!(err.to_string().contains("sender"));

    // Nothing was persisted
    assert_eq!(store.total_messages().await.unwrap(), 0);
}

#[tokio::test]
async fn test_body_too_long() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = MessageStore::with_config(PersistenceConfig {
        db_path: temp_file.path().to_path_buf(),
        max_body_chars: 10,
        ..Default::default()
    })
    .await
    .unwrap();

    let err = store
        .append("L42", "student", "landlord", "this is far too long")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::BodyTooLong { max: 10, .. }));
    assert!(err.to_string().contains("max 10"));
}

#[tokio::test]
async fn test_history_is_ordered_and_scoped_to_pair() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    let a = store.append("L42", "student", "landlord", "A").await.unwrap();
    let b = store.append("L42", "landlord", "student", "B").await.unwrap();
    let c = store.append("L42", "student", "landlord", "C").await.unwrap();

    // Other listing and other pair must not leak in
    store.append("L7", "student", "landlord", "other listing").await.unwrap();
    store.append("L42", "student", "someone", "other pair").await.unwrap();

    let history = store
        .history("L42", "student", "landlord", "student")
        .await
        .unwrap();
    let ids: Vec<i64> = history.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);

    for pair in history.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
    }

    // Argument order of the participants does not matter
    let reversed = store
        .history("L42", "landlord", "student", "landlord")
        .await
        .unwrap();
    assert_eq!(reversed, history);
}

#[tokio::test]
async fn test_history_for_unknown_pair_is_empty() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    let history = store
        .history("nope", "ghost", "nobody", "ghost")
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_mark_read_only_affects_incoming_messages() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    store.append("L42", "student", "landlord", "one").await.unwrap();
    store.append("L42", "student", "landlord", "two").await.unwrap();
    let reply = store.append("L42", "landlord", "student", "reply").await.unwrap();

    assert_eq!(store.unread_count("landlord").await.unwrap(), 2);
    assert_eq!(store.unread_count("student").await.unwrap(), 1);

    let changed = store.mark_read("L42", "student", "landlord").await.unwrap();
    assert_eq!(changed, 2);

    assert_eq!(store.unread_count("landlord").await.unwrap(), 0);
    assert_eq!(store.unread_count("student").await.unwrap(), 1);

    // Second call has nothing left to change
    assert_eq!(store.mark_read("L42", "student", "landlord").await.unwrap(), 0);

    let reply = store.get_message(reply.id).await.unwrap().unwrap();
    assert!(!reply.read);

    let history = store
        .history("L42", "student", "landlord", "landlord")
        .await
        .unwrap();
    for msg in history.iter().filter(|m| m.receiver_id == "landlord") {
        assert!(msg.read);
        assert!(msg.read_at.is_some());
    }
}

#[tokio::test]
async fn test_soft_delete_is_per_viewer() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    let first = store.append("L42", "student", "landlord", "hello").await.unwrap();
    store.append("L42", "landlord", "student", "hi").await.unwrap();

    let hidden = store
        .mark_deleted_for_user("L42", "student", "landlord", "student")
        .await
        .unwrap();
    assert_eq!(hidden, 2);

    let student_view = store
        .history("L42", "student", "landlord", "student")
        .await
        .unwrap();
    assert!(student_view.is_empty());

    let landlord_view = store
        .history("L42", "student", "landlord", "landlord")
        .await
        .unwrap();
    assert_eq!(landlord_view.len(), 2);
    assert!(landlord_view.iter().all(|m| m.is_deleted_for("student")));
    assert!(landlord_view.iter().all(|m| !m.is_deleted_for("landlord")));

    // Records are still there
    let stored = store.get_message(first.id).await.unwrap().unwrap();
    assert_eq!(stored.body, "hello");
    assert_eq!(store.total_messages().await.unwrap(), 2);
}

#[tokio::test]
async fn test_soft_delete_is_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    store.append("L42", "student", "landlord", "hello").await.unwrap();

    let first = store
        .mark_deleted_for_user("L42", "student", "landlord", "student")
        .await
        .unwrap();
    let second = store
        .mark_deleted_for_user("L42", "student", "landlord", "student")
        .await
        .unwrap();
    assert_eq!(first, 1);
    assert_eq!(second, 0);

    // Messages sent after the delete are visible again
    store.append("L42", "landlord", "student", "still there?").await.unwrap();
    let view = store
        .history("L42", "student", "landlord", "student")
        .await
        .unwrap();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].body, "still there?");
}

#[tokio::test]
async fn test_delete_for_unknown_pair_is_noop() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    let hidden = store
        .mark_deleted_for_user("L42", "student", "landlord", "student")
        .await
        .unwrap();
    assert_eq!(hidden, 0);
}

#[tokio::test]
async fn test_unread_count_excludes_deleted_messages() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    store.append("L42", "student", "landlord", "one").await.unwrap();
    store.append("L9", "student", "landlord", "two").await.unwrap();
    assert_eq!(store.unread_count("landlord").await.unwrap(), 2);

    store
        .mark_deleted_for_user("L42", "student", "landlord", "landlord")
        .await
        .unwrap();
    assert_eq!(store.unread_count("landlord").await.unwrap(), 1);
    assert_eq!(
        store
            .unread_count_in_conversation("L42", "landlord", "student")
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        store
            .unread_count_in_conversation("L9", "landlord", "student")
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_recent_messages_newest_first() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = create_store(&temp_file).await;

    for i in 0..5 {
        store
            .append("L42", "student", "landlord", &format!("message {}", i))
            .await
            .unwrap();
    }

    let recent = store.recent_messages(3).await.unwrap();
    let bodies: Vec<&str> = recent.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["message 4", "message 3", "message 2"]);
    assert_eq!(store.total_messages().await.unwrap(), 5);
}

#[tokio::test]
async fn test_messages_survive_reopen() {
    let temp_file = NamedTempFile::new().unwrap();

    let sent = {
        let store = create_store(&temp_file).await;
        store.append("L42", "student", "landlord", "persisted").await.unwrap()
    };

    let store = create_store(&temp_file).await;
    let history = store
        .history("L42", "student", "landlord", "landlord")
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, sent.id);

    let next = store.append("L42", "landlord", "student", "reply").await.unwrap();
    assert!(next.id > sent.id);
    assert!(next.created_at >= sent.created_at);
}

#[tokio::test]
async fn test_unavailable_storage_surfaces_error() {
    // A connection whose schema was never migrated fails every query
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let store = MessageStore::with_connection(db, PersistenceConfig::default()).await;

    let err = store
        .append("L42", "student", "landlord", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(!err.is_validation());

    // Validation still runs first
    let err = store.append("L42", "student", "landlord", "").await.unwrap_err();
    assert!(matches!(err, StoreError::EmptyBody));
}
