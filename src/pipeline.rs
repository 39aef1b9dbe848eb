//! # Export Pipeline
//!
//! Sequential pull orchestration: prefetch the relation cache, open the
//! streaming cursor, resolve each row against the cache, emit incrementally.
//! One logical worker per export; resolution never touches the store, so
//! the only suspension points are cursor advance (store I/O) and transport
//! flush (client backpressure). A slow client throttles query consumption,
//! bounding memory to the batch size rather than the result size.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};

use crate::benchmark::Benchmark;
use crate::cache::RelationCache;
use crate::emitter::{ExportSink, JsonEmitter, DEFAULT_BATCH_SIZE};
use crate::error::{ExportError, Result};
use crate::filter::Filter;
use crate::object_type::ObjectType;
use crate::query::ExportQuery;
use crate::resolver::{ObjectResolver, ResolutionMode, ResolutionPolicy};
use crate::store::{ObjectStore, NAME_COLUMN};

/// Caller-triggered cancellation. Checked between rows: a cancelled export
/// aborts the cursor and emits nothing further, never a half-written JSON
/// token. The truncated document is the client's signal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub mode: ResolutionMode,
    pub policy: ResolutionPolicy,
    pub benchmark: bool,
    pub batch_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::Raw,
            policy: ResolutionPolicy::default(),
            benchmark: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    pub rows: u64,
}

/// Stream every object of `object_type` matching `filter` into `sink` as
/// one JSON document.
///
/// Pre-stream failures (prefetch, cursor open) surface before any byte is
/// written; mid-stream failures abort the transport with the envelope left
/// open, which the client must detect as a truncated document.
pub async fn run_export<S, K>(
    store: &S,
    object_type: ObjectType,
    filter: Option<Filter>,
    options: &ExportOptions,
    sink: K,
    cancel: &CancelToken,
) -> Result<ExportStats>
where
    S: ObjectStore + ?Sized,
    K: ExportSink,
{
    let mut bench = Benchmark::new();
    let resolver = ObjectResolver::new(object_type, options.policy);

    bench.mark("prefetching related types");
    let cache = RelationCache::initialize(store, object_type).await?;
    bench.mark("ready to query");

    let query = ExportQuery::new(object_type)
        .with_filter(filter)
        .strip_pagination();
    let mut rows = store.open_cursor(&query).await?;

    let mut emitter = JsonEmitter::new(sink, options.batch_size);
    emitter.open().await?;

    let mut first = true;
    while let Some(row) = rows.next().await {
        if cancel.is_cancelled() {
            warn!(object_type = %object_type, "export cancelled mid-stream");
            return Err(ExportError::Cancelled);
        }
        let row = row?;
        if first {
            bench.mark("first row fetched");
        }
        let tree = resolver.resolve(&row, &cache, options.mode)?;
        emitter.emit(&tree).await?;
        if first {
            bench.mark("first object emitted");
            first = false;
        }
    }

    bench.mark("all done");
    let diagnostics = if options.benchmark {
        Some(bench.render())
    } else {
        None
    };
    let rows = emitter.close(diagnostics.as_deref()).await?;

    info!(
        object_type = %object_type,
        rows = rows,
        mode = ?options.mode,
        "export complete"
    );
    Ok(ExportStats { rows })
}

/// Load and resolve a single object by name, for non-streaming callers
/// (detail views, multi-edit) that need the same inheritance-resolution
/// semantics without the streaming envelope.
pub async fn load_object<S>(
    store: &S,
    object_type: ObjectType,
    name: &str,
    mode: ResolutionMode,
    policy: ResolutionPolicy,
) -> Result<Option<serde_json::Value>>
where
    S: ObjectStore + ?Sized,
{
    let cache = RelationCache::initialize(store, object_type).await?;
    let resolver = ObjectResolver::new(object_type, policy);

    let query = ExportQuery::new(object_type)
        .with_filter(Some(Filter::eq(NAME_COLUMN, name)))
        .strip_pagination();
    let mut rows = store.open_cursor(&query).await?;

    match rows.next().await {
        Some(row) => Ok(Some(resolver.resolve(&row?, &cache, mode)?)),
        None => Ok(None),
    }
}
