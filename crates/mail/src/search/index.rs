//! Search index implementation using Tantivy

use std::collections::HashSet;
use std::ops::Bound;
use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, RangeQuery, TermQuery};
use tantivy::schema::{IndexRecordOption, Schema, Term, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};

use crate::models::{LabelId, Message, MessageId};
use crate::storage::MailStore;
use crate::sync::SYNCED_LABELS;

use super::SearchResult;
use super::query_parser::ParsedQuery;
use super::schema::{SchemaFields, build_schema};

/// Default heap size for index writer (50MB)
const DEFAULT_HEAP_SIZE: usize = 50_000_000;

/// Thread-safe search index wrapper
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    #[allow(dead_code)]
    schema: Schema,
    fields: SchemaFields,
    /// Writer is created lazily and wrapped in RwLock for thread-safe access
    writer: RwLock<Option<IndexWriter>>,
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("index", &"<tantivy::Index>")
            .finish()
    }
}

impl SearchIndex {
    /// Open or create index at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).context("Failed to create index directory")?;

        let schema = build_schema();
        let dir = MmapDirectory::open(path).context("Failed to open index directory")?;

        let index =
            Index::open_or_create(dir, schema.clone()).context("Failed to open or create index")?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .context("Failed to create index reader")?;

        let fields = SchemaFields::new(&schema);

        Ok(Self {
            index,
            reader,
            schema,
            fields,
            writer: RwLock::new(None),
        })
    }

    /// Create an in-memory index (for testing)
    pub fn in_memory() -> Result<Self> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        let fields = SchemaFields::new(&schema);

        Ok(Self {
            index,
            reader,
            schema,
            fields,
            writer: RwLock::new(None),
        })
    }

    fn get_writer(&self) -> Result<std::sync::RwLockWriteGuard<'_, Option<IndexWriter>>> {
        let mut guard = self
            .writer
            .write()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {}", e))?;
        if guard.is_none() {
            *guard = Some(self.index.writer(DEFAULT_HEAP_SIZE)?);
        }
        Ok(guard)
    }

    /// Index a single message
    ///
    /// Upsert semantics: an existing document with the same message ID is
    /// replaced.
    pub fn index_message(&self, message: &Message) -> Result<()> {
        let mut writer_guard = self.get_writer()?;
        let writer = writer_guard.as_mut().unwrap();

        writer.delete_term(Term::from_field_text(
            self.fields.message_id,
            message.id.as_str(),
        ));

        let mut doc = TantivyDocument::new();

        doc.add_text(self.fields.message_id, message.id.as_str());
        doc.add_i64(self.fields.account_id, message.account_id);

        doc.add_text(self.fields.subject, &message.subject);
        if let Some(ref body) = message.body_text {
            doc.add_text(self.fields.body_text, body);
        }
        doc.add_text(self.fields.snippet, &message.body_preview);

        if let Some(ref name) = message.from.name {
            doc.add_text(self.fields.from, name);
        }
        doc.add_text(self.fields.from_email, &message.from.email);

        for to in &message.to {
            doc.add_text(self.fields.to, &to.display());
        }
        for cc in &message.cc {
            doc.add_text(self.fields.cc, &cc.display());
        }

        for label in &message.label_ids {
            doc.add_text(self.fields.labels, label);
        }

        doc.add_i64(
            self.fields.received_at_ms,
            message.received_at.timestamp_millis(),
        );
        doc.add_u64(self.fields.is_unread, message.is_unread() as u64);
        doc.add_u64(
            self.fields.is_starred,
            message.label_ids.iter().any(|l| l == LabelId::STARRED) as u64,
        );

        writer.add_document(doc)?;
        Ok(())
    }

    /// Delete a message's document
    pub fn delete_message(&self, id: &MessageId) -> Result<()> {
        let mut writer_guard = self.get_writer()?;
        let writer = writer_guard.as_mut().unwrap();

        writer.delete_term(Term::from_field_text(self.fields.message_id, id.as_str()));
        Ok(())
    }

    /// Commit pending changes
    pub fn commit(&self) -> Result<()> {
        let mut writer_guard = self
            .writer
            .write()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {}", e))?;
        if let Some(ref mut writer) = *writer_guard {
            writer.commit()?;
        }
        self.reader.reload()?;
        Ok(())
    }

    /// Clear all documents from the index
    pub fn clear(&self) -> Result<()> {
        let mut writer_guard = self.get_writer()?;
        let writer = writer_guard.as_mut().unwrap();
        writer.delete_all_documents()?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Search for messages matching the query, sorted by relevance score.
    ///
    /// If `account_id` is Some, only returns results from that account.
    pub fn search(
        &self,
        query: &ParsedQuery,
        limit: usize,
        account_id: Option<i64>,
    ) -> Result<Vec<SearchResult>> {
        let searcher = self.reader.searcher();

        let tantivy_query = self.build_query(query, account_id)?;
        let top_docs = searcher.search(&tantivy_query, &TopDocs::with_limit(limit))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            results.push(self.result_from_doc(&doc, score));
        }

        Ok(results)
    }

    /// Build a result from the document's stored fields
    fn result_from_doc(&self, doc: &TantivyDocument, score: f32) -> SearchResult {
        let str_field = |field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        let received_ms = doc
            .get_first(self.fields.received_at_ms)
            .and_then(|v| v.as_i64())
            .unwrap_or_default();
        let received_at = Utc
            .timestamp_millis_opt(received_ms)
            .single()
            .unwrap_or_else(Utc::now);

        let sender_name = doc
            .get_first(self.fields.from)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        SearchResult {
            message_id: MessageId::new(str_field(self.fields.message_id)),
            account_id: doc
                .get_first(self.fields.account_id)
                .and_then(|v| v.as_i64())
                .unwrap_or_default(),
            subject: str_field(self.fields.subject),
            snippet: str_field(self.fields.snippet),
            sender_name,
            sender_email: str_field(self.fields.from_email),
            received_at,
            is_unread: doc
                .get_first(self.fields.is_unread)
                .and_then(|v| v.as_u64())
                .unwrap_or_default()
                != 0,
            score,
        }
    }

    /// Build a Tantivy query from ParsedQuery
    fn build_query(&self, query: &ParsedQuery, account_id: Option<i64>) -> Result<Box<dyn Query>> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        if let Some(id) = account_id {
            let term = Term::from_field_i64(self.fields.account_id, id);
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }

        // Free-text terms - search across multiple fields
        if !query.terms.is_empty() {
            let query_text = query.terms.join(" ");
            let parser = QueryParser::for_index(
                &self.index,
                vec![
                    self.fields.subject,
                    self.fields.body_text,
                    self.fields.snippet,
                    self.fields.from,
                    self.fields.from_email,
                ],
            );
            if let Ok(text_query) = parser.parse_query(&query_text) {
                clauses.push((Occur::Must, text_query));
            }
        }

        // from: filter - matches both display name and email fields
        for from_val in &query.from {
            let parser =
                QueryParser::for_index(&self.index, vec![self.fields.from, self.fields.from_email]);
            if let Ok(from_query) = parser.parse_query(&from_val.to_lowercase()) {
                clauses.push((Occur::Must, from_query));
            }
        }

        for to_val in &query.to {
            let parser = QueryParser::for_index(&self.index, vec![self.fields.to]);
            if let Ok(to_query) = parser.parse_query(&to_val.to_lowercase()) {
                clauses.push((Occur::Must, to_query));
            }
        }

        for subj_val in &query.subject {
            let parser = QueryParser::for_index(&self.index, vec![self.fields.subject]);
            if let Ok(subj_query) = parser.parse_query(subj_val) {
                clauses.push((Occur::Must, subj_query));
            }
        }

        if let Some(ref label) = query.in_label {
            let term = Term::from_field_text(self.fields.labels, label);
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }

        if let Some(is_unread) = query.is_unread {
            let term = Term::from_field_u64(self.fields.is_unread, is_unread as u64);
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }

        if let Some(is_starred) = query.is_starred {
            let term = Term::from_field_u64(self.fields.is_starred, is_starred as u64);
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }

        // Date range filters (before:/after:)
        if let Some(ref before) = query.before {
            let upper_term =
                Term::from_field_i64(self.fields.received_at_ms, before.timestamp_millis());
            let range = RangeQuery::new(Bound::Unbounded, Bound::Excluded(upper_term));
            clauses.push((Occur::Must, Box::new(range)));
        }

        if let Some(ref after) = query.after {
            let lower_term =
                Term::from_field_i64(self.fields.received_at_ms, after.timestamp_millis());
            let range = RangeQuery::new(Bound::Included(lower_term), Bound::Unbounded);
            clauses.push((Occur::Must, Box::new(range)));
        }

        if clauses.is_empty() {
            // Match all if no constraints
            Ok(Box::new(tantivy::query::AllQuery))
        } else {
            Ok(Box::new(BooleanQuery::new(clauses)))
        }
    }

    /// Rebuild entire index from storage
    ///
    /// Clears the existing index and re-indexes every stored message under
    /// the synced labels across all accounts. Returns the number of
    /// messages indexed.
    pub fn rebuild(&self, store: &dyn MailStore) -> Result<usize> {
        {
            let mut writer_guard = self.get_writer()?;
            let writer = writer_guard.as_mut().unwrap();
            writer.delete_all_documents()?;
            writer.commit()?;
        }

        let mut seen: HashSet<MessageId> = HashSet::new();
        for account in store.list_accounts()? {
            for label in SYNCED_LABELS {
                let messages = store.list_messages_by_label(account.id, label, 100_000, 0)?;
                for message in messages {
                    if seen.insert(message.id.clone()) {
                        self.index_message(&message)?;
                    }
                }
            }
        }

        self.commit()?;
        Ok(seen.len())
    }
}
