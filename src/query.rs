//! # Export Query Builder
//!
//! Builds the select statement the streaming executor runs: always every
//! column of the object's table (resolution needs every stored field), the
//! caller's filter if present, and a deterministic ORDER BY. Whatever
//! pagination a caller or base builder may have applied is stripped before
//! execution; the export always streams the complete matching set.

use crate::filter::Filter;
use crate::object_type::ObjectType;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pagination {
    limit: Option<u32>,
    offset: Option<u32>,
}

/// Select statement for one export run.
#[derive(Debug, Clone)]
pub struct ExportQuery {
    object_type: ObjectType,
    filter: Option<Filter>,
    order_by: Vec<String>,
    pagination: Option<Pagination>,
}

impl ExportQuery {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            filter: None,
            order_by: vec!["object_name ASC".to_string()],
            pagination: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, field: &str, direction: &str) -> Self {
        self.order_by = vec![format!("{field} {direction}")];
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.pagination
            .get_or_insert(Pagination {
                limit: None,
                offset: None,
            })
            .limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.pagination
            .get_or_insert(Pagination {
                limit: None,
                offset: None,
            })
            .offset = Some(offset);
        self
    }

    /// Remove any limit/offset unconditionally. The streaming executor calls
    /// this on every query it runs, regardless of what the base builder set.
    pub fn strip_pagination(mut self) -> Self {
        self.pagination = None;
        self
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Build the complete SQL statement.
    pub fn build_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", self.object_type.table_name());

        if let Some(ref filter) = self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.to_sql());
        }

        if !self.order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", self.order_by.join(", ")));
        }

        if let Some(ref pagination) = self.pagination {
            if let Some(limit) = pagination.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            if let Some(offset) = pagination.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_select_covers_all_columns() {
        let sql = ExportQuery::new(ObjectType::Host).build_sql();
        assert_eq!(
            sql,
            "SELECT * FROM steward_host ORDER BY object_name ASC"
        );
    }

    #[test]
    fn test_filter_is_appended() {
        let filter = Filter::parse("zone=dc1&object_type=object").unwrap();
        let sql = ExportQuery::new(ObjectType::Service)
            .with_filter(Some(filter))
            .build_sql();
        assert_eq!(
            sql,
            "SELECT * FROM steward_service WHERE (zone = 'dc1' AND object_type = 'object') \
             ORDER BY object_name ASC"
        );
    }

    #[test]
    fn test_strip_pagination_removes_limit_and_offset() {
        let sql = ExportQuery::new(ObjectType::Host)
            .limit(25)
            .offset(50)
            .strip_pagination()
            .build_sql();
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("OFFSET"));
    }

    #[test]
    fn test_pagination_renders_when_not_stripped() {
        let sql = ExportQuery::new(ObjectType::Host).limit(10).build_sql();
        assert!(sql.ends_with("LIMIT 10"));
    }
}
