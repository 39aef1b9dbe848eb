//! # PostgreSQL Object Store
//!
//! sqlx-backed implementation of [`ObjectStore`]. Cursor rows are forwarded
//! through a bounded channel, so a slow consumer throttles query consumption
//! instead of buffering the result set.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::StreamExt;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};

use super::{ObjectStore, RawRow, RowStream};
use crate::error::{ExportError, Result};
use crate::object_type::ObjectType;
use crate::query::ExportQuery;

/// Capacity of the row channel between the database cursor and the
/// consumer. Bounds in-flight rows, not result-set size.
const CURSOR_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct PgObjectStore {
    pool: PgPool,
}

impl PgObjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ObjectStore for PgObjectStore {
    async fn fetch_all(&self, object_type: ObjectType) -> Result<Vec<RawRow>> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY object_name",
            object_type.table_name()
        );
        debug!(object_type = %object_type, sql = %sql, "prefetching related type");

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn open_cursor(&self, query: &ExportQuery) -> Result<RowStream> {
        let sql = query.clone().strip_pagination().build_sql();
        debug!(sql = %sql, "opening export cursor");

        let pool = self.pool.clone();
        let (tx, rx) = mpsc::channel::<Result<RawRow>>(CURSOR_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut stream = sqlx::query(&sql).fetch(&pool);
            while let Some(row) = stream.next().await {
                let item = match row {
                    Ok(row) => decode_row(&row),
                    Err(e) => {
                        error!(error = %e, "export cursor advance failed");
                        Err(ExportError::Store(e))
                    }
                };
                let failed = item.is_err();
                if tx.send(item).await.is_err() {
                    // Consumer dropped the stream; stop fetching.
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Decode one database row into a JSON column map.
///
/// NULL columns are omitted: an unset property is absent, not null, in the
/// plain object tree. A column of a type we cannot represent raises
/// [`ExportError::Serialization`], which is fatal to the stream.
pub fn decode_row(row: &PgRow) -> Result<RawRow> {
    let mut raw = RawRow::new();
    for column in row.columns() {
        let name = column.name();
        let value = decode_column(row, column.ordinal(), column.type_info().name(), name)?;
        if let Some(value) = value {
            raw.insert(name.to_string(), value);
        }
    }
    Ok(raw)
}

fn decode_column(
    row: &PgRow,
    ordinal: usize,
    type_name: &str,
    column: &str,
) -> Result<Option<serde_json::Value>> {
    let value = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(serde_json::Value::from),
        "INT2" => row
            .try_get::<Option<i16>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(serde_json::Value::from),
        "INT4" => row
            .try_get::<Option<i32>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(serde_json::Value::from),
        "INT8" => row
            .try_get::<Option<i64>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(serde_json::Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(|v| serde_json::Value::from(f64::from(v))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(serde_json::Value::from),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(serde_json::Value::from),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?,
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(|ts| serde_json::Value::from(ts.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(|ts| serde_json::Value::from(ts.to_string())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(|d| serde_json::Value::from(d.to_string())),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(ordinal)
            .map_err(|e| serialization_error(column, &e))?
            .map(|u| serde_json::Value::from(u.to_string())),
        other => {
            return Err(ExportError::Serialization {
                column: column.to_string(),
                reason: format!("unsupported column type {other}"),
            });
        }
    };
    // JSON null inside a JSONB column counts as unset too.
    Ok(value.filter(|v| !v.is_null()))
}

fn serialization_error(column: &str, error: &sqlx::Error) -> ExportError {
    ExportError::Serialization {
        column: column.to_string(),
        reason: error.to_string(),
    }
}
