//! # Relation Cache
//!
//! Request-scoped cache of related-type records, populated once before any
//! row resolution begins and consulted (never re-queried) for the remainder
//! of the export. Read-only after initialization, so it can be shared freely
//! by resolver workers within one request. Never shared across requests:
//! related-type data may change between them.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::Result;
use crate::object_type::ObjectType;
use crate::store::{ObjectStore, RawRow, ID_COLUMN, NAME_COLUMN};

#[derive(Debug, Default)]
pub struct RelationCache {
    by_id: HashMap<ObjectType, HashMap<i64, RawRow>>,
    by_name: HashMap<ObjectType, HashMap<String, RawRow>>,
}

impl RelationCache {
    /// Prefetch every related type `object_type` depends on: one query per
    /// type, full result sets, keyed by primary id and by object name.
    ///
    /// Runs to completion before resolution starts; resolution assumes a
    /// fully populated cache and never triggers lazy loads.
    pub async fn initialize<S>(store: &S, object_type: ObjectType) -> Result<Self>
    where
        S: ObjectStore + ?Sized,
    {
        let mut cache = Self::default();
        for related in object_type.related_types() {
            let rows = store.fetch_all(related).await?;
            debug!(
                related_type = %related,
                records = rows.len(),
                "prefetched related type"
            );
            cache.insert_all(related, rows);
        }
        info!(
            object_type = %object_type,
            related_types = cache.by_id.len(),
            "relation cache initialized"
        );
        Ok(cache)
    }

    fn insert_all(&mut self, object_type: ObjectType, rows: Vec<RawRow>) {
        let by_id = self.by_id.entry(object_type).or_default();
        let by_name = self.by_name.entry(object_type).or_default();
        for row in rows {
            if let Some(id) = row.get(ID_COLUMN).and_then(|v| v.as_i64()) {
                by_id.insert(id, row.clone());
            }
            if let Some(name) = row.get(NAME_COLUMN).and_then(|v| v.as_str()) {
                by_name.insert(name.to_string(), row);
            }
        }
    }

    /// Synchronous in-memory lookup by primary id. A miss is a miss; the
    /// caller decides whether a dangling reference is fatal.
    pub fn lookup(&self, object_type: ObjectType, id: i64) -> Option<&RawRow> {
        self.by_id.get(&object_type)?.get(&id)
    }

    /// Lookup by object name (imports and group references are by name).
    pub fn lookup_name(&self, object_type: ObjectType, name: &str) -> Option<&RawRow> {
        self.by_name.get(&object_type)?.get(name)
    }

    /// Whether `object_type` was part of the prefetch at all. A lookup
    /// against an uncovered type means the prefetch was incomplete, which
    /// is a bug rather than a data-integrity problem.
    pub fn covers(&self, object_type: ObjectType) -> bool {
        self.by_id.contains_key(&object_type)
    }

    pub fn record_count(&self, object_type: ObjectType) -> usize {
        self.by_id.get(&object_type).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{row, MemoryStore};
    use serde_json::json;

    #[tokio::test]
    async fn test_initialize_prefetches_all_related_types() {
        let store = MemoryStore::new();
        store.insert(
            ObjectType::Command,
            row(&[("id", json!(1)), ("object_name", json!("ping"))]),
        );
        store.insert(
            ObjectType::Zone,
            row(&[("id", json!(7)), ("object_name", json!("master"))]),
        );

        let cache = RelationCache::initialize(&store, ObjectType::Host)
            .await
            .unwrap();

        // Covered even when empty: Host prefetches its own templates,
        // commands, periods, endpoints, zones, and host groups.
        assert!(cache.covers(ObjectType::Host));
        assert!(cache.covers(ObjectType::Command));
        assert!(cache.covers(ObjectType::TimePeriod));
        assert!(cache.covers(ObjectType::HostGroup));
        assert!(!cache.covers(ObjectType::User));

        assert_eq!(cache.record_count(ObjectType::Command), 1);
        assert!(cache.lookup(ObjectType::Command, 1).is_some());
        assert!(cache.lookup_name(ObjectType::Zone, "master").is_some());
    }

    #[tokio::test]
    async fn test_miss_is_reported_not_defaulted() {
        let store = MemoryStore::new();
        let cache = RelationCache::initialize(&store, ObjectType::Host)
            .await
            .unwrap();

        assert!(cache.lookup(ObjectType::Command, 99).is_none());
        assert!(cache.lookup_name(ObjectType::Zone, "nowhere").is_none());
    }
}
