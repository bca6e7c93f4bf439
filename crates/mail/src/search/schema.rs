//! Tantivy schema definition for message indexing

use tantivy::schema::{
    FAST, Field, INDEXED, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing,
    TextOptions,
};

/// Build the Tantivy schema for message indexing
///
/// Fields indexed:
/// - message_id: String ID for retrieval and upsert deletes
/// - account_id: Multi-account filtering
/// - subject, body_text, snippet: Full-text searchable content
/// - from, from_email, to, cc: Sender/recipient search
/// - labels: Exact match label filtering
/// - received_at_ms: Date range queries
/// - is_unread, is_starred: Boolean filters
pub fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field("message_id", STRING | STORED);
    // Term-queried by account scoping, so INDEXED in addition to FAST
    builder.add_i64_field("account_id", INDEXED | FAST | STORED);

    // Full-text fields with positions for phrase queries
    let text_opts = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_index_option(IndexRecordOption::WithFreqsAndPositions)
                .set_tokenizer("default"),
        )
        .set_stored();

    builder.add_text_field("subject", text_opts.clone());
    builder.add_text_field("body_text", text_opts.clone());
    builder.add_text_field("snippet", text_opts.clone());

    builder.add_text_field("from", text_opts.clone());
    builder.add_text_field("from_email", text_opts.clone());
    builder.add_text_field("to", text_opts.clone());
    builder.add_text_field("cc", text_opts);

    // Exact match field for label filtering (multi-valued via repeated adds)
    builder.add_text_field("labels", STRING);

    builder.add_i64_field("received_at_ms", FAST | STORED);
    // Both flags back is:unread / is:starred term queries
    builder.add_u64_field("is_unread", INDEXED | FAST | STORED);
    builder.add_u64_field("is_starred", INDEXED | FAST);

    builder.build()
}

/// Field handles for quick access during indexing and searching
pub struct SchemaFields {
    pub message_id: Field,
    pub account_id: Field,
    pub subject: Field,
    pub body_text: Field,
    pub snippet: Field,
    pub from: Field,
    pub from_email: Field,
    pub to: Field,
    pub cc: Field,
    pub labels: Field,
    pub received_at_ms: Field,
    pub is_unread: Field,
    pub is_starred: Field,
}

impl SchemaFields {
    /// Create field handles from a schema
    pub fn new(schema: &Schema) -> Self {
        Self {
            message_id: schema.get_field("message_id").expect("message_id field"),
            account_id: schema.get_field("account_id").expect("account_id field"),
            subject: schema.get_field("subject").expect("subject field"),
            body_text: schema.get_field("body_text").expect("body_text field"),
            snippet: schema.get_field("snippet").expect("snippet field"),
            from: schema.get_field("from").expect("from field"),
            from_email: schema.get_field("from_email").expect("from_email field"),
            to: schema.get_field("to").expect("to field"),
            cc: schema.get_field("cc").expect("cc field"),
            labels: schema.get_field("labels").expect("labels field"),
            received_at_ms: schema
                .get_field("received_at_ms")
                .expect("received_at_ms field"),
            is_unread: schema.get_field("is_unread").expect("is_unread field"),
            is_starred: schema.get_field("is_starred").expect("is_starred field"),
        }
    }
}
