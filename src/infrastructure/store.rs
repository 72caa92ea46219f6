// Document Store Interface - collection-oriented CRUD over JSON documents
// Backends: SQLite (sqlite_store) and in-process memory (memory_store)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::error::AppResult;

/// A stored record; always a JSON object carrying a string `id`
pub type Document = Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Organizations,
    Members,
    Events,
    ActivityLogs,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Organizations => "organizations",
            Collection::Members => "members",
            Collection::Events => "events",
            Collection::ActivityLogs => "activity_logs",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality against a top-level string field; a missing or non-string
/// field never equals anything
fn text_equals(value: Option<&Value>, expected: &str) -> bool {
    value.and_then(Value::as_str) == Some(expected)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq { field: String, value: String },
    Ne { field: String, value: String },
    /// Case-insensitive substring match against any of the string fields
    Contains { fields: Vec<String>, needle: String },
}

impl Condition {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::Eq { field, value } => text_equals(doc.get(field), value),
            Condition::Ne { field, value } => !text_equals(doc.get(field), value),
            Condition::Contains { fields, needle } => {
                let needle = needle.to_lowercase();
                fields.iter().any(|field| {
                    doc.get(field)
                        .and_then(Value::as_str)
                        .map(|s| s.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            }
        }
    }
}

/// Conjunction of conditions; the empty filter matches every document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Eq {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn ne(mut self, field: &str, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Ne {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, fields: &[&str], needle: impl Into<String>) -> Self {
        self.conditions.push(Condition::Contains {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            needle: needle.into(),
        });
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted(field: &str, order: SortOrder) -> Self {
        Self {
            sort: Some((field.to_string(), order)),
            ..Default::default()
        }
    }

    pub fn paged(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// Field that orders by insertion time rather than by document content
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Ordering used for sorting on arbitrary JSON fields:
/// missing/null < bool < number < string
pub fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Store interface the services depend on. Every call is atomic per
/// document; multi-document atomicity goes through [`StoreTransaction`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logs
    fn backend(&self) -> &'static str;

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>>;
    async fn find_by_id(&self, collection: Collection, id: &str) -> AppResult<Option<Document>>;
    async fn insert(&self, collection: Collection, id: &str, doc: Document) -> AppResult<()>;
    /// Replace a document; returns false when no document has the id
    async fn update_by_id(&self, collection: Collection, id: &str, doc: Document)
        -> AppResult<bool>;
    /// Replace a document only while it still matches `expected`; returns
    /// false when it is missing or has changed in the meantime
    async fn update_if(
        &self,
        collection: Collection,
        id: &str,
        expected: &Filter,
        doc: Document,
    ) -> AppResult<bool>;
    async fn delete_by_id(&self, collection: Collection, id: &str) -> AppResult<bool>;
    async fn delete_many(&self, collection: Collection, filter: &Filter) -> AppResult<u64>;
    async fn count(&self, collection: Collection, filter: &Filter) -> AppResult<u64>;

    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>>;
}

/// All-or-nothing unit of deletes. Nothing is visible to other callers
/// until `commit`; `abort` (or dropping) discards everything.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn delete_by_id(&mut self, collection: Collection, id: &str) -> AppResult<bool>;
    async fn delete_many(&mut self, collection: Collection, filter: &Filter) -> AppResult<u64>;
    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn abort(self: Box<Self>) -> AppResult<()>;
}
