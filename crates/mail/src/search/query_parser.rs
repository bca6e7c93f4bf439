//! Gmail-style query parser
//!
//! Parses search queries with operators like:
//! - `from:alice@example.com` - sender filter
//! - `to:team@company.com` - recipient filter
//! - `subject:meeting` - subject filter
//! - `in:inbox` - label filter
//! - `is:unread`, `is:read`, `is:starred` - boolean filters
//! - `before:2024/12/01`, `after:2024/01/01` - date filters

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

const OPERATORS: &[&str] = &["from", "to", "subject", "in", "is", "before", "after"];

/// Parsed query with structured components
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    /// Free-text search terms
    pub terms: Vec<String>,
    /// from: filter values
    pub from: Vec<String>,
    /// to: filter values
    pub to: Vec<String>,
    /// subject: filter values
    pub subject: Vec<String>,
    /// in: label filter (e.g., "INBOX", "SENT")
    pub in_label: Option<String>,
    /// is:unread / is:read
    pub is_unread: Option<bool>,
    /// is:starred
    pub is_starred: Option<bool>,
    /// before: date filter
    pub before: Option<DateTime<Utc>>,
    /// after: date filter
    pub after: Option<DateTime<Utc>>,
}

impl ParsedQuery {
    /// Check if the query is empty (no terms or filters)
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
            && self.from.is_empty()
            && self.to.is_empty()
            && self.subject.is_empty()
            && self.in_label.is_none()
            && self.is_unread.is_none()
            && self.is_starred.is_none()
            && self.before.is_none()
            && self.after.is_none()
    }
}

/// Parse a search query string into structured components
///
/// Operator values may be quoted: `from:"John Doe"`. Anything that is not
/// a recognized operator is collected as a free-text term.
pub fn parse_query(input: &str) -> ParsedQuery {
    let mut query = ParsedQuery::default();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        if let Some((key, value, remainder)) = take_operator(rest) {
            apply_operator(&mut query, &key, value);
            rest = remainder.trim_start();
        } else {
            let (word, remainder) = take_word(rest);
            if !word.is_empty() {
                query.terms.push(word);
            }
            rest = remainder.trim_start();
        }
    }

    query
}

fn apply_operator(query: &mut ParsedQuery, key: &str, value: String) {
    match key {
        "from" => query.from.push(value),
        "to" => query.to.push(value),
        "subject" => query.subject.push(value),
        "in" => query.in_label = Some(value.to_uppercase()),
        "is" => match value.to_lowercase().as_str() {
            "unread" => query.is_unread = Some(true),
            "read" => query.is_unread = Some(false),
            "starred" => query.is_starred = Some(true),
            _ => {}
        },
        "before" => {
            if let Some(date) = parse_date(&value) {
                query.before = Some(date);
            }
        }
        "after" => {
            if let Some(date) = parse_date(&value) {
                query.after = Some(date);
            }
        }
        _ => {}
    }
}

/// Try to take a `key:value` operator from the start of the input.
///
/// Returns None when the input does not start with a known operator or
/// the value is missing, in which case the caller treats it as a word.
fn take_operator(input: &str) -> Option<(String, String, &str)> {
    let colon = input.find(':')?;
    let key = input[..colon].to_lowercase();

    if !OPERATORS.contains(&key.as_str()) || key.chars().any(char::is_whitespace) {
        return None;
    }

    let (value, remainder) = take_value(&input[colon + 1..]);
    if value.is_empty() {
        return None;
    }

    Some((key, value, remainder))
}

/// Take a value from the start of the input: quoted string or run of
/// non-whitespace characters.
fn take_value(input: &str) -> (String, &str) {
    if let Some(inner) = input.strip_prefix('"') {
        return match inner.find('"') {
            Some(end) => (inner[..end].to_string(), &inner[end + 1..]),
            None => (inner.to_string(), ""),
        };
    }

    let end = input
        .find(char::is_whitespace)
        .unwrap_or(input.len());
    (input[..end].to_string(), &input[end..])
}

/// Take a free-text word or quoted phrase from the start of the input
fn take_word(input: &str) -> (String, &str) {
    take_value(input)
}

/// Parse a date string (YYYY/MM/DD or YYYY-MM-DD) as midnight UTC
fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(input, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .ok()?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt))
}
