//! # In-Memory Object Store
//!
//! Backs the test suite and embedded usage with the same [`ObjectStore`]
//! contract as the Postgres implementation: filters are honored, rows come
//! back ordered by object name, and a failure can be injected mid-stream to
//! exercise terminal-error handling.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use futures::StreamExt;

use super::{ObjectStore, RawRow, RowStream, NAME_COLUMN};
use crate::error::{ExportError, Result};
use crate::object_type::ObjectType;
use crate::query::ExportQuery;

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<ObjectType, Vec<RawRow>>>,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a cursor failure after `n` rows have been yielded.
    pub fn failing_after(n: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            fail_after: Some(n),
        }
    }

    pub fn insert(&self, object_type: ObjectType, row: RawRow) {
        self.tables
            .write()
            .expect("memory store lock")
            .entry(object_type)
            .or_default()
            .push(row);
    }

    fn sorted_rows(&self, object_type: ObjectType) -> Vec<RawRow> {
        let tables = self.tables.read().expect("memory store lock");
        let mut rows = tables.get(&object_type).cloned().unwrap_or_default();
        rows.sort_by_key(|row| {
            row.get(NAME_COLUMN)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        });
        rows
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn fetch_all(&self, object_type: ObjectType) -> Result<Vec<RawRow>> {
        Ok(self.sorted_rows(object_type))
    }

    async fn open_cursor(&self, query: &ExportQuery) -> Result<RowStream> {
        let filter = query.filter().cloned();
        let rows = self.sorted_rows(query.object_type());
        let matching: Vec<RawRow> = rows
            .into_iter()
            .filter(|row| filter.as_ref().map_or(true, |f| f.matches(row)))
            .collect();

        let fail_after = self.fail_after;
        let items = matching.into_iter().enumerate().map(move |(i, row)| {
            match fail_after {
                Some(n) if i >= n => Err(ExportError::Store(sqlx::Error::PoolClosed)),
                _ => Ok(row),
            }
        });

        Ok(futures::stream::iter(items).boxed())
    }
}

/// Build a row from key/value pairs; `serde_json::json!` values.
pub fn row(fields: &[(&str, serde_json::Value)]) -> RawRow {
    let mut raw = RawRow::new();
    for (key, value) in fields {
        if !value.is_null() {
            raw.insert((*key).to_string(), value.clone());
        }
    }
    raw
}
