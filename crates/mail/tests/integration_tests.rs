//! Integration tests for the mail crate
//!
//! These tests verify the complete flow from storing synced messages to
//! querying, searching, and assembling streamed reply suggestions.

use chrono::Utc;
use mail::assist::{FrameReader, ReplyAccumulator, ReplyEvent, dispatch_frame};
use mail::models::{Account, EmailAddress, Message, MessageId, SyncState};
use mail::query::{count_mailbox, get_message_detail, list_mailbox};
use mail::search::SearchIndex;
use mail::storage::{InMemoryMailStore, MailStore, SqliteMailStore};
use tempfile::TempDir;

/// Helper to create test messages
fn make_message(id: &str, account_id: i64, subject: &str, age_hours: i64) -> Message {
    let received_at = Utc::now() - chrono::Duration::hours(age_hours);
    Message::builder(MessageId::new(id))
        .account_id(account_id)
        .from(EmailAddress::with_name("Test User", "test@example.com"))
        .to(vec![EmailAddress::new("recipient@example.com")])
        .subject(subject)
        .body_preview(format!("This is the preview for message {}", id))
        .body_text(Some(format!("Full body of message {}", id)))
        .received_at(received_at)
        .internal_date(received_at.timestamp_millis())
        .label_ids(vec!["INBOX".to_string()])
        .build()
}

fn register_account(store: &dyn MailStore, email: &str) -> i64 {
    store.upsert_account(Account::new(0, email)).unwrap()
}

#[test]
fn test_full_sync_simulation() {
    let store = InMemoryMailStore::new();
    let account_id = register_account(&store, "user@example.com");

    // Simulate syncing messages
    for msg in [
        make_message("m1", account_id, "First", 3),
        make_message("m2", account_id, "Second", 2),
        make_message("m3", account_id, "Third", 1),
    ] {
        store.upsert_message(msg).unwrap();
    }

    // Verify the mailbox lists newest first
    let summaries = list_mailbox(&store, account_id, "INBOX", 10, 0).unwrap();
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0].id.as_str(), "m3");
    assert_eq!(summaries[2].id.as_str(), "m1");

    // Verify full message details
    let detail = get_message_detail(&store, &MessageId::new("m1"))
        .unwrap()
        .unwrap();
    assert_eq!(detail.message.subject, "First");
    assert_eq!(
        detail.message.body_text.as_deref(),
        Some("Full body of message m1")
    );
}

#[test]
fn test_idempotent_sync() {
    let store = InMemoryMailStore::new();
    let account_id = register_account(&store, "user@example.com");

    let message = make_message("m1", account_id, "Test", 1);

    // First sync
    store.upsert_message(message.clone()).unwrap();
    // Simulate second sync - same message
    store.upsert_message(message).unwrap();

    assert_eq!(count_mailbox(&store, account_id, "INBOX").unwrap(), 1);
}

#[test]
fn test_mailbox_pagination() {
    let store = InMemoryMailStore::new();
    let account_id = register_account(&store, "user@example.com");

    for i in 0..10 {
        store
            .upsert_message(make_message(
                &format!("m{}", i),
                account_id,
                &format!("Message {}", i),
                (10 - i) as i64,
            ))
            .unwrap();
    }

    let all = list_mailbox(&store, account_id, "INBOX", 100, 0).unwrap();
    assert_eq!(all.len(), 10);
    // m9 is newest
    assert_eq!(all[0].id.as_str(), "m9");
    assert_eq!(all[9].id.as_str(), "m0");

    let page1 = list_mailbox(&store, account_id, "INBOX", 3, 0).unwrap();
    let page2 = list_mailbox(&store, account_id, "INBOX", 3, 3).unwrap();
    assert_eq!(page1.len(), 3);
    assert_eq!(page2.len(), 3);
    assert_eq!(page1[0].id.as_str(), "m9");
    assert_eq!(page2[0].id.as_str(), "m6");
}

#[test]
fn test_accounts_are_isolated() {
    let store = InMemoryMailStore::new();
    let alice = register_account(&store, "alice@example.com");
    let bob = register_account(&store, "bob@example.com");

    store
        .upsert_message(make_message("m1", alice, "For Alice", 1))
        .unwrap();
    store
        .upsert_message(make_message("m2", bob, "For Bob", 1))
        .unwrap();

    let alice_inbox = list_mailbox(&store, alice, "INBOX", 10, 0).unwrap();
    assert_eq!(alice_inbox.len(), 1);
    assert_eq!(alice_inbox[0].subject, "For Alice");

    let bob_inbox = list_mailbox(&store, bob, "INBOX", 10, 0).unwrap();
    assert_eq!(bob_inbox.len(), 1);
    assert_eq!(bob_inbox[0].subject, "For Bob");
}

#[test]
fn test_empty_store() {
    let store = InMemoryMailStore::new();

    let summaries = list_mailbox(&store, 1, "INBOX", 10, 0).unwrap();
    assert!(summaries.is_empty());

    let detail = get_message_detail(&store, &MessageId::new("nonexistent")).unwrap();
    assert!(detail.is_none());
}

#[test]
fn test_clear_store() {
    let store = InMemoryMailStore::new();
    let account_id = register_account(&store, "user@example.com");

    store
        .upsert_message(make_message("m1", account_id, "Test", 1))
        .unwrap();
    assert_eq!(count_mailbox(&store, account_id, "INBOX").unwrap(), 1);

    store.clear().unwrap();

    assert!(!store.has_message(&MessageId::new("m1")).unwrap());
    assert!(store.list_accounts().unwrap().is_empty());
}

// === SQLite Persistence Tests ===

fn create_sqlite_store() -> (SqliteMailStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    // Use .test.sqlite extension to clearly distinguish from production databases
    let db_path = temp_dir.path().join("mail.test.sqlite");
    let store = SqliteMailStore::new(&db_path).unwrap();
    (store, temp_dir)
}

#[test]
fn test_sqlite_message_round_trip() {
    let (store, _temp_dir) = create_sqlite_store();
    let account_id = register_account(&store, "user@example.com");

    store
        .upsert_message(make_message("m1", account_id, "Persisted", 1))
        .unwrap();

    let detail = get_message_detail(&store, &MessageId::new("m1"))
        .unwrap()
        .unwrap();
    assert_eq!(detail.message.subject, "Persisted");
    assert_eq!(detail.message.from.email, "test@example.com");
    assert_eq!(
        detail.message.body_text.as_deref(),
        Some("Full body of message m1")
    );
}

#[test]
fn test_sqlite_sync_state_persistence() {
    let (store, _temp_dir) = create_sqlite_store();
    let account_id = register_account(&store, "user@example.com");

    // Initially no sync state
    assert!(store.get_sync_state(account_id).unwrap().is_none());

    let mut state = SyncState::new(account_id);
    state.mark_synced(Some("history_12345".to_string()));
    store.save_sync_state(state).unwrap();

    let retrieved = store.get_sync_state(account_id).unwrap().unwrap();
    assert_eq!(retrieved.account_id, account_id);
    assert_eq!(retrieved.history_id.as_deref(), Some("history_12345"));
    assert!(retrieved.last_synced_at.is_some());
}

#[test]
fn test_sqlite_state_across_reopens() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("mail.test.sqlite");

    // Open store, save data, close
    let account_id = {
        let store = SqliteMailStore::new(&db_path).unwrap();
        let account_id = register_account(&store, "user@example.com");
        store
            .upsert_message(make_message("m1", account_id, "Survives reopen", 1))
            .unwrap();

        let mut state = SyncState::new(account_id);
        state.mark_synced(Some("history_200".to_string()));
        store.save_sync_state(state).unwrap();
        account_id
    }; // store dropped here, connection closed

    // Reopen store and verify everything persists
    let store = SqliteMailStore::new(&db_path).unwrap();

    let account = store.get_account(account_id).unwrap().unwrap();
    assert_eq!(account.email, "user@example.com");

    let summaries = list_mailbox(&store, account_id, "INBOX", 10, 0).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].subject, "Survives reopen");

    let state = store.get_sync_state(account_id).unwrap().unwrap();
    assert_eq!(state.history_id.as_deref(), Some("history_200"));
}

#[test]
fn test_sqlite_delete_account_cascades() {
    let (store, _temp_dir) = create_sqlite_store();
    let account_id = register_account(&store, "user@example.com");

    store
        .upsert_message(make_message("m1", account_id, "Doomed", 1))
        .unwrap();
    let mut state = SyncState::new(account_id);
    state.mark_synced(None);
    store.save_sync_state(state).unwrap();

    store.delete_account(account_id).unwrap();

    assert!(store.get_account(account_id).unwrap().is_none());
    assert!(!store.has_message(&MessageId::new("m1")).unwrap());
    assert!(store.get_sync_state(account_id).unwrap().is_none());
}

// === Search Integration ===

#[test]
fn test_search_over_stored_messages() {
    let store = InMemoryMailStore::new();
    let account_id = register_account(&store, "user@example.com");

    let mut budget = make_message("m1", account_id, "Quarterly budget review", 2);
    budget.body_text = Some("Numbers for Q3 attached".to_string());
    store.upsert_message(budget).unwrap();
    store
        .upsert_message(make_message("m2", account_id, "Lunch plans", 1))
        .unwrap();

    let index = SearchIndex::in_memory().unwrap();
    let count = index.rebuild(&store).unwrap();
    assert_eq!(count, 2);

    let results = mail::search::search_messages(&index, "budget", 10, None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].message_id.as_str(), "m1");
    assert_eq!(results[0].subject, "Quarterly budget review");

    // Operator query
    let results = mail::search::search_messages(&index, "from:test is:unread", 10, None).unwrap();
    assert_eq!(results.len(), 0); // test messages carry no UNREAD label
}

// === Reply Stream Assembly ===

/// Feed a raw SSE byte stream through the frame reader and dispatcher,
/// the same path the streaming session uses, and assemble the drafts.
#[test]
fn test_reply_stream_assembly_from_raw_sse() {
    let raw = concat!(
        "event: ready\ndata: {}\n\n",
        "event: options\n",
        "data: {\"count\":1,\"items\":[{\"id\":1,\"type\":\"short\",\"title\":\"Accept\"}]}\n\n",
        "event: option.delta\ndata: {\"id\":1,\"seq\":0,\"text\":\"Sounds \"}\n\n",
        ": keep-alive\n\n",
        "event: option.delta\ndata: {\"id\":1,\"seq\":1,\"text\":\"good!\"}\n\n",
        "event: option.done\ndata: {\"id\":1,\"total_seq\":2}\n\n",
        "event: done\ndata: {\"reason\":\"finished\"}\n\n",
    );

    let mut reader = FrameReader::new(raw.as_bytes());
    let mut accumulator = ReplyAccumulator::new();
    let mut events = Vec::new();

    while let Some(frame) = reader.next_frame().unwrap() {
        if let Some(event) = dispatch_frame(&frame) {
            accumulator.apply(&event);
            events.push(event);
        }
    }

    assert_eq!(events.len(), 6);
    assert!(matches!(events[0], ReplyEvent::Ready));
    assert!(matches!(events.last(), Some(ReplyEvent::Done { .. })));

    assert!(accumulator.is_done());
    let draft = accumulator.draft(1).unwrap();
    assert_eq!(draft.text, "Sounds good!");
    assert!(draft.done);
    assert_eq!(draft.title, "Accept");
}
