//! SQLite-based mail storage with zstd-compressed message bodies

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::traits::MailStore;
use crate::models::{Account, Contact, ContactGroup, EmailAddress, Message, MessageId, SyncState};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Connected accounts
            CREATE TABLE accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                display_name TEXT,
                created_at TEXT NOT NULL,
                last_synced_at TEXT
            );

            -- Sync state per account
            CREATE TABLE sync_state (
                account_id INTEGER PRIMARY KEY,
                history_id TEXT,
                last_synced_at TEXT
            );

            -- Message metadata with zstd-compressed bodies
            CREATE TABLE messages (
                id TEXT PRIMARY KEY,
                account_id INTEGER NOT NULL,
                from_name TEXT,
                from_email TEXT NOT NULL,
                subject TEXT NOT NULL,
                body_preview TEXT NOT NULL,
                received_at TEXT NOT NULL,
                internal_date INTEGER NOT NULL,
                body_text BLOB,  -- zstd compressed
                body_html BLOB   -- zstd compressed
            );

            CREATE INDEX idx_messages_account_date
                ON messages(account_id, internal_date DESC);

            -- Recipients (normalized, many-to-many)
            CREATE TABLE message_recipients (
                message_id TEXT NOT NULL,
                recipient_type TEXT NOT NULL,
                name TEXT,
                email TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (message_id, recipient_type, position),
                FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
            );

            -- Labels on messages (many-to-many)
            CREATE TABLE message_labels (
                message_id TEXT NOT NULL,
                label_id TEXT NOT NULL,
                PRIMARY KEY (message_id, label_id),
                FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_message_labels_label ON message_labels(label_id);

            -- Contacts harvested from headers or added by the user
            CREATE TABLE contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                name TEXT,
                email TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (account_id, email)
            );

            CREATE INDEX idx_contacts_account ON contacts(account_id);

            -- Contact groups and membership
            CREATE TABLE contact_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                name TEXT NOT NULL
            );

            CREATE TABLE contact_group_members (
                group_id INTEGER NOT NULL,
                contact_id INTEGER NOT NULL,
                PRIMARY KEY (group_id, contact_id),
                FOREIGN KEY (group_id) REFERENCES contact_groups(id) ON DELETE CASCADE,
                FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE
            );
            "#,
        ),
    ])
}

/// SQLite-based mail storage
pub struct SqliteMailStore {
    conn: Mutex<Connection>,
}

impl SqliteMailStore {
    /// Create a new SQLite mail store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        // Configure SQLite for performance
        //
        // WAL mode allows concurrent readers during writes and gives better
        // crash recovery. SYNCHRONOUS = NORMAL syncs at critical moments
        // only, which is safe under WAL. The 64MB page cache and in-memory
        // temp store keep list queries off the disk. foreign_keys = ON is
        // required for ON DELETE CASCADE to work.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        // Run migrations
        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Load recipients for a message
    fn load_recipients(
        conn: &Connection,
        message_id: &str,
        recipient_type: &str,
    ) -> Result<Vec<EmailAddress>> {
        let mut stmt = conn.prepare(
            "SELECT name, email FROM message_recipients
             WHERE message_id = ? AND recipient_type = ?
             ORDER BY position",
        )?;

        let recipients = stmt
            .query_map(params![message_id, recipient_type], |row| {
                Ok(EmailAddress {
                    name: row.get(0)?,
                    email: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recipients)
    }

    /// Load labels for a message
    fn load_labels(conn: &Connection, message_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT label_id FROM message_labels WHERE message_id = ?")?;

        let labels = stmt
            .query_map([message_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(labels)
    }

    /// Save recipients for a message
    fn save_recipients(
        conn: &Connection,
        message_id: &str,
        recipient_type: &str,
        recipients: &[EmailAddress],
    ) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO message_recipients (message_id, recipient_type, name, email, position)
             VALUES (?, ?, ?, ?, ?)",
        )?;

        for (i, addr) in recipients.iter().enumerate() {
            stmt.execute(params![
                message_id,
                recipient_type,
                addr.name,
                addr.email,
                i as i64
            ])?;
        }

        Ok(())
    }

    /// Save labels for a message
    fn save_labels(conn: &Connection, message_id: &str, labels: &[String]) -> Result<()> {
        let mut stmt =
            conn.prepare("INSERT INTO message_labels (message_id, label_id) VALUES (?, ?)")?;

        for label in labels {
            stmt.execute(params![message_id, label])?;
        }

        Ok(())
    }

    /// Load a full message from a row
    fn load_message(conn: &Connection, message_id: &str) -> Result<Option<Message>> {
        let row: Option<(
            String,
            i64,
            Option<String>,
            String,
            String,
            String,
            String,
            i64,
            Option<Vec<u8>>,
            Option<Vec<u8>>,
        )> = conn
            .query_row(
                "SELECT id, account_id, from_name, from_email, subject, body_preview,
                        received_at, internal_date, body_text, body_html
                 FROM messages WHERE id = ?",
                [message_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            id,
            account_id,
            from_name,
            from_email,
            subject,
            body_preview,
            received_at_str,
            internal_date,
            body_text_compressed,
            body_html_compressed,
        )) = row
        else {
            return Ok(None);
        };

        let to = Self::load_recipients(conn, &id, "to")?;
        let cc = Self::load_recipients(conn, &id, "cc")?;
        let label_ids = Self::load_labels(conn, &id)?;

        let received_at = parse_timestamp(&received_at_str);
        let body_text = decompress_body(body_text_compressed, "body_text")?;
        let body_html = decompress_body(body_html_compressed, "body_html")?;

        Ok(Some(Message {
            id: MessageId::new(id),
            account_id,
            from: EmailAddress {
                name: from_name,
                email: from_email,
            },
            to,
            cc,
            subject,
            body_preview,
            body_text,
            body_html,
            received_at,
            internal_date,
            label_ids,
        }))
    }

    fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
        let created_at_str: String = row.get(3)?;
        let last_synced_at_str: Option<String> = row.get(4)?;
        Ok(Account {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            created_at: parse_timestamp(&created_at_str),
            last_synced_at: last_synced_at_str.as_deref().map(parse_timestamp),
        })
    }
}

/// Parse an RFC 3339 timestamp, falling back to now on corruption
fn parse_timestamp(s: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}

/// Compress a body with zstd (level 3 = good balance of speed vs ratio)
fn compress_body(body: Option<&String>, what: &str) -> Result<Option<Vec<u8>>> {
    body.map(|text| zstd::encode_all(text.as_bytes(), 3))
        .transpose()
        .with_context(|| format!("Failed to compress {}", what))
}

/// Decompress a zstd-compressed body
fn decompress_body(data: Option<Vec<u8>>, what: &str) -> Result<Option<String>> {
    data.map(|bytes| {
        zstd::decode_all(bytes.as_slice())
            .with_context(|| format!("Failed to decompress {}", what))
            .map(|raw| String::from_utf8_lossy(&raw).into_owned())
    })
    .transpose()
}

impl MailStore for SqliteMailStore {
    fn upsert_account(&self, account: Account) -> Result<i64> {
        let conn = self.conn.lock().unwrap();

        if account.id == 0 {
            conn.execute(
                "INSERT INTO accounts (email, display_name, created_at, last_synced_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(email) DO UPDATE SET
                    display_name = excluded.display_name,
                    last_synced_at = excluded.last_synced_at",
                params![
                    account.email,
                    account.display_name,
                    account.created_at.to_rfc3339(),
                    account.last_synced_at.map(|t| t.to_rfc3339()),
                ],
            )?;

            let id: i64 = conn.query_row(
                "SELECT id FROM accounts WHERE email = ?",
                [&account.email],
                |row| row.get(0),
            )?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO accounts (id, email, display_name, created_at, last_synced_at)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    display_name = excluded.display_name,
                    last_synced_at = excluded.last_synced_at",
                params![
                    account.id,
                    account.email,
                    account.display_name,
                    account.created_at.to_rfc3339(),
                    account.last_synced_at.map(|t| t.to_rfc3339()),
                ],
            )?;
            Ok(account.id)
        }
    }

    fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        let account = conn
            .query_row(
                "SELECT id, email, display_name, created_at, last_synced_at
                 FROM accounts WHERE id = ?",
                [id],
                Self::account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        let account = conn
            .query_row(
                "SELECT id, email, display_name, created_at, last_synced_at
                 FROM accounts WHERE email = ?",
                [email],
                Self::account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, display_name, created_at, last_synced_at
             FROM accounts ORDER BY id",
        )?;
        let accounts = stmt
            .query_map([], Self::account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    fn delete_account(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        // Messages cascade to recipients and labels
        conn.execute("DELETE FROM messages WHERE account_id = ?", [id])?;
        conn.execute("DELETE FROM contacts WHERE account_id = ?", [id])?;
        conn.execute("DELETE FROM contact_groups WHERE account_id = ?", [id])?;
        conn.execute("DELETE FROM sync_state WHERE account_id = ?", [id])?;
        conn.execute("DELETE FROM accounts WHERE id = ?", [id])?;
        Ok(())
    }

    fn upsert_message(&self, message: Message) -> Result<()> {
        let body_text_compressed = compress_body(message.body_text.as_ref(), "body_text")?;
        let body_html_compressed = compress_body(message.body_html.as_ref(), "body_html")?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // Delete old recipients and labels first
        tx.execute(
            "DELETE FROM message_recipients WHERE message_id = ?",
            [message.id.as_str()],
        )?;
        tx.execute(
            "DELETE FROM message_labels WHERE message_id = ?",
            [message.id.as_str()],
        )?;

        // Use ON CONFLICT DO UPDATE instead of INSERT OR REPLACE:
        // INSERT OR REPLACE deletes the old row first, which would CASCADE
        // into recipients and labels mid-transaction.
        tx.execute(
            "INSERT INTO messages
             (id, account_id, from_name, from_email, subject, body_preview,
              received_at, internal_date, body_text, body_html)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                account_id = excluded.account_id,
                from_name = excluded.from_name,
                from_email = excluded.from_email,
                subject = excluded.subject,
                body_preview = excluded.body_preview,
                received_at = excluded.received_at,
                internal_date = excluded.internal_date,
                body_text = excluded.body_text,
                body_html = excluded.body_html",
            params![
                message.id.as_str(),
                message.account_id,
                message.from.name,
                message.from.email,
                message.subject,
                message.body_preview,
                message.received_at.to_rfc3339(),
                message.internal_date,
                body_text_compressed,
                body_html_compressed,
            ],
        )?;

        Self::save_recipients(&tx, message.id.as_str(), "to", &message.to)?;
        Self::save_recipients(&tx, message.id.as_str(), "cc", &message.cc)?;
        Self::save_labels(&tx, message.id.as_str(), &message.label_ids)?;

        tx.commit()?;
        Ok(())
    }

    fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let conn = self.conn.lock().unwrap();
        Self::load_message(&conn, id.as_str())
    }

    fn has_message(&self, id: &MessageId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE id = ?",
            [id.as_str()],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn list_messages_by_label(
        &self,
        account_id: i64,
        label: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT m.id FROM messages m
             INNER JOIN message_labels ml ON m.id = ml.message_id
             WHERE m.account_id = ? AND ml.label_id = ?
             ORDER BY m.internal_date DESC
             LIMIT ? OFFSET ?",
        )?;

        let ids: Vec<String> = stmt
            .query_map(
                params![account_id, label, limit as i64, offset as i64],
                |row| row.get(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut messages = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(message) = Self::load_message(&conn, id)? {
                messages.push(message);
            } else {
                log::warn!("[STORE] Failed to load message {}", id);
            }
        }

        Ok(messages)
    }

    fn count_messages_by_label(&self, account_id: i64, label: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages m
             INNER JOIN message_labels ml ON m.id = ml.message_id
             WHERE m.account_id = ? AND ml.label_id = ?",
            params![account_id, label],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn update_message_labels(&self, id: &MessageId, label_ids: Vec<String>) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM message_labels WHERE message_id = ?",
            [id.as_str()],
        )?;
        Self::save_labels(&tx, id.as_str(), &label_ids)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_message(&self, id: &MessageId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        // Recipients and labels are deleted via CASCADE
        conn.execute("DELETE FROM messages WHERE id = ?", [id.as_str()])?;
        Ok(())
    }

    fn upsert_contact(&self, contact: Contact) -> Result<i64> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO contacts (account_id, name, email, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(account_id, email) DO UPDATE SET
                name = COALESCE(excluded.name, contacts.name)",
            params![
                contact.account_id,
                contact.name,
                contact.email,
                contact.created_at.to_rfc3339(),
            ],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM contacts WHERE account_id = ? AND email = ?",
            params![contact.account_id, contact.email],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn list_contacts(&self, account_id: i64) -> Result<Vec<Contact>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, account_id, name, email, created_at
             FROM contacts WHERE account_id = ? ORDER BY email",
        )?;

        let contacts = stmt
            .query_map([account_id], |row| {
                let created_at_str: String = row.get(4)?;
                Ok(Contact {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    name: row.get(2)?,
                    email: row.get(3)?,
                    created_at: parse_timestamp(&created_at_str),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(contacts)
    }

    fn find_contact_by_email(&self, account_id: i64, email: &str) -> Result<Option<Contact>> {
        let conn = self.conn.lock().unwrap();

        let contact = conn
            .query_row(
                "SELECT id, account_id, name, email, created_at
                 FROM contacts WHERE account_id = ? AND email = ?",
                params![account_id, email],
                |row| {
                    let created_at_str: String = row.get(4)?;
                    Ok(Contact {
                        id: row.get(0)?,
                        account_id: row.get(1)?,
                        name: row.get(2)?,
                        email: row.get(3)?,
                        created_at: parse_timestamp(&created_at_str),
                    })
                },
            )
            .optional()?;

        Ok(contact)
    }

    fn delete_contact(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        // Group membership is deleted via CASCADE
        conn.execute("DELETE FROM contacts WHERE id = ?", [id])?;
        Ok(())
    }

    fn upsert_group(&self, group: ContactGroup) -> Result<i64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let group_id = if group.id == 0 {
            tx.execute(
                "INSERT INTO contact_groups (account_id, name) VALUES (?, ?)",
                params![group.account_id, group.name],
            )?;
            tx.last_insert_rowid()
        } else {
            tx.execute(
                "INSERT INTO contact_groups (id, account_id, name)
                 VALUES (?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![group.id, group.account_id, group.name],
            )?;
            group.id
        };

        tx.execute(
            "DELETE FROM contact_group_members WHERE group_id = ?",
            [group_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO contact_group_members (group_id, contact_id) VALUES (?, ?)",
            )?;
            for contact_id in &group.member_ids {
                stmt.execute(params![group_id, contact_id])?;
            }
        }

        tx.commit()?;
        Ok(group_id)
    }

    fn list_groups(&self, account_id: i64) -> Result<Vec<ContactGroup>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, account_id, name FROM contact_groups
             WHERE account_id = ? ORDER BY id",
        )?;

        let mut groups = stmt
            .query_map([account_id], |row| {
                Ok(ContactGroup {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    name: row.get(2)?,
                    member_ids: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut member_stmt = conn.prepare(
            "SELECT contact_id FROM contact_group_members WHERE group_id = ? ORDER BY contact_id",
        )?;
        for group in &mut groups {
            group.member_ids = member_stmt
                .query_map([group.id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(groups)
    }

    fn delete_group(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        // Membership is deleted via CASCADE
        conn.execute("DELETE FROM contact_groups WHERE id = ?", [id])?;
        Ok(())
    }

    fn get_sync_state(&self, account_id: i64) -> Result<Option<SyncState>> {
        let conn = self.conn.lock().unwrap();

        let state = conn
            .query_row(
                "SELECT account_id, history_id, last_synced_at
                 FROM sync_state WHERE account_id = ?",
                [account_id],
                |row| {
                    let last_synced_at_str: Option<String> = row.get(2)?;
                    Ok(SyncState {
                        account_id: row.get(0)?,
                        history_id: row.get(1)?,
                        last_synced_at: last_synced_at_str.as_deref().map(parse_timestamp),
                    })
                },
            )
            .optional()?;

        Ok(state)
    }

    fn save_sync_state(&self, state: SyncState) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR REPLACE INTO sync_state (account_id, history_id, last_synced_at)
             VALUES (?, ?, ?)",
            params![
                state.account_id,
                state.history_id,
                state.last_synced_at.map(|t| t.to_rfc3339()),
            ],
        )?;

        Ok(())
    }

    fn delete_sync_state(&self, account_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sync_state WHERE account_id = ?", [account_id])?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "DELETE FROM contact_group_members;
             DELETE FROM contact_groups;
             DELETE FROM contacts;
             DELETE FROM message_labels;
             DELETE FROM message_recipients;
             DELETE FROM messages;
             DELETE FROM sync_state;
             DELETE FROM accounts;",
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_store() -> (SqliteMailStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        // Use .test.sqlite extension to clearly distinguish from production databases
        let db_path = dir.path().join("mail.test.sqlite");
        let store = SqliteMailStore::new(&db_path).unwrap();
        (store, dir)
    }

    fn make_test_message(id: &str, account_id: i64, internal_date: i64) -> Message {
        Message::builder(MessageId::new(id))
            .account_id(account_id)
            .from(EmailAddress::with_name("Test User", "test@example.com"))
            .to(vec![EmailAddress::new("me@example.com")])
            .subject("Test")
            .body_preview("Test preview")
            .body_text(Some("Test body text".to_string()))
            .body_html(Some("<p>Test body HTML</p>".to_string()))
            .internal_date(internal_date)
            .label_ids(vec!["INBOX".to_string(), "UNREAD".to_string()])
            .build()
    }

    #[test]
    fn test_account_crud() {
        let (store, _dir) = create_test_store();

        let id = store
            .upsert_account(Account::new(0, "alice@example.com"))
            .unwrap();
        assert!(id > 0);

        let retrieved = store.get_account(id).unwrap().unwrap();
        assert_eq!(retrieved.email, "alice@example.com");

        // Upsert with same email keeps the id
        let mut updated = Account::new(0, "alice@example.com");
        updated.display_name = Some("Alice".to_string());
        let id2 = store.upsert_account(updated).unwrap();
        assert_eq!(id, id2);

        let by_email = store.get_account_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.display_name.as_deref(), Some("Alice"));

        store.delete_account(id).unwrap();
        assert!(store.get_account(id).unwrap().is_none());
    }

    #[test]
    fn test_message_round_trip_with_compressed_bodies() {
        let (store, _dir) = create_test_store();

        store.upsert_message(make_test_message("m1", 1, 100)).unwrap();

        let retrieved = store.get_message(&MessageId::new("m1")).unwrap().unwrap();
        assert_eq!(retrieved.subject, "Test");
        assert_eq!(retrieved.body_text, Some("Test body text".to_string()));
        assert_eq!(retrieved.body_html, Some("<p>Test body HTML</p>".to_string()));
        assert_eq!(retrieved.from.name.as_deref(), Some("Test User"));
        assert_eq!(retrieved.to.len(), 1);
        assert!(retrieved.label_ids.contains(&"INBOX".to_string()));

        assert!(store.has_message(&MessageId::new("m1")).unwrap());
        assert!(!store.has_message(&MessageId::new("m2")).unwrap());
    }

    #[test]
    fn test_upsert_message_is_idempotent() {
        let (store, _dir) = create_test_store();

        store.upsert_message(make_test_message("m1", 1, 100)).unwrap();
        store.upsert_message(make_test_message("m1", 1, 100)).unwrap();

        assert_eq!(store.count_messages_by_label(1, "INBOX").unwrap(), 1);
        let retrieved = store.get_message(&MessageId::new("m1")).unwrap().unwrap();
        assert_eq!(retrieved.to.len(), 1);
    }

    #[test]
    fn test_list_messages_newest_first() {
        let (store, _dir) = create_test_store();

        store.upsert_message(make_test_message("old", 1, 100)).unwrap();
        store.upsert_message(make_test_message("new", 1, 300)).unwrap();
        store.upsert_message(make_test_message("mid", 1, 200)).unwrap();

        let messages = store.list_messages_by_label(1, "INBOX", 10, 0).unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let page = store.list_messages_by_label(1, "INBOX", 1, 1).unwrap();
        assert_eq!(page[0].id.as_str(), "mid");
    }

    #[test]
    fn test_update_labels() {
        let (store, _dir) = create_test_store();

        store.upsert_message(make_test_message("m1", 1, 100)).unwrap();

        store
            .update_message_labels(&MessageId::new("m1"), vec!["INBOX".to_string()])
            .unwrap();

        let msg = store.get_message(&MessageId::new("m1")).unwrap().unwrap();
        assert!(!msg.label_ids.contains(&"UNREAD".to_string()));
        assert!(msg.label_ids.contains(&"INBOX".to_string()));
        assert_eq!(store.count_messages_by_label(1, "UNREAD").unwrap(), 0);
    }

    #[test]
    fn test_contacts_and_groups() {
        let (store, _dir) = create_test_store();

        let c1 = store
            .upsert_contact(Contact::new(0, 1, "bob@example.com"))
            .unwrap();

        // Upsert by email keeps the id and merges the name
        let mut named = Contact::new(0, 1, "bob@example.com");
        named.name = Some("Bob".to_string());
        let c1_again = store.upsert_contact(named).unwrap();
        assert_eq!(c1, c1_again);

        let found = store
            .find_contact_by_email(1, "bob@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.name.as_deref(), Some("Bob"));

        let c2 = store
            .upsert_contact(Contact::new(0, 1, "carol@example.com"))
            .unwrap();

        let group_id = store
            .upsert_group(ContactGroup {
                id: 0,
                account_id: 1,
                name: "Team".to_string(),
                member_ids: vec![c1, c2],
            })
            .unwrap();

        let groups = store.list_groups(1).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_ids.len(), 2);

        // Deleting a contact removes it from the group via CASCADE
        store.delete_contact(c1).unwrap();
        let groups = store.list_groups(1).unwrap();
        assert_eq!(groups[0].member_ids, vec![c2]);

        store.delete_group(group_id).unwrap();
        assert!(store.list_groups(1).unwrap().is_empty());
    }

    #[test]
    fn test_sync_state() {
        let (store, _dir) = create_test_store();

        assert!(store.get_sync_state(1).unwrap().is_none());

        let mut state = SyncState::new(1);
        state.mark_synced(Some("12345".to_string()));
        store.save_sync_state(state).unwrap();

        let retrieved = store.get_sync_state(1).unwrap().unwrap();
        assert_eq!(retrieved.history_id.as_deref(), Some("12345"));
        assert!(retrieved.last_synced_at.is_some());

        store.delete_sync_state(1).unwrap();
        assert!(store.get_sync_state(1).unwrap().is_none());
    }

    #[test]
    fn test_delete_account_cascades() {
        let (store, _dir) = create_test_store();

        let id = store
            .upsert_account(Account::new(0, "alice@example.com"))
            .unwrap();
        store.upsert_message(make_test_message("m1", id, 100)).unwrap();
        store
            .upsert_contact(Contact::new(0, id, "bob@example.com"))
            .unwrap();

        store.delete_account(id).unwrap();

        assert!(!store.has_message(&MessageId::new("m1")).unwrap());
        assert!(store.list_contacts(id).unwrap().is_empty());
    }
}
