//! # Object Store Interface
//!
//! The pipeline consumes the backing store through one narrow trait:
//! batched full-table reads for the relation cache prefetch, and a
//! forward-only row cursor for the export itself. The Postgres
//! implementation lives in [`postgres`]; [`memory`] backs the test suite
//! and any embedded usage.

pub mod memory;
pub mod postgres;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::object_type::ObjectType;
use crate::query::ExportQuery;

/// One row as returned by the store: column name to JSON scalar.
///
/// Backed by `serde_json::Map`, which keeps keys in sorted order, so the
/// serialized output of any downstream projection is reproducible.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// Forward-only stream of rows. Advancing may block on I/O; a failed
/// advance is terminal and aborts the in-progress emission.
pub type RowStream = Pin<Box<dyn Stream<Item = Result<RawRow>> + Send + 'static>>;

/// Query/row-cursor interface to the backing relational store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch every record of `object_type` in one round-trip. Used by the
    /// relation cache prefetch, never during row resolution.
    async fn fetch_all(&self, object_type: ObjectType) -> Result<Vec<RawRow>>;

    /// Open a streaming cursor over the complete matching set.
    async fn open_cursor(&self, query: &ExportQuery) -> Result<RowStream>;
}

/// Primary identifier column shared by all object tables.
pub const ID_COLUMN: &str = "id";

/// Object name column shared by all object tables.
pub const NAME_COLUMN: &str = "object_name";
