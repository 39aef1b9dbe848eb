//! # Object Export Handler
//!
//! The streaming bulk export endpoint: `GET /export/{type}`. Pre-stream
//! errors (unknown type, bad filter) come back as structured JSON error
//! responses; once the body has started, a failure terminates the byte
//! stream and the client must treat the truncated document as a failed
//! export.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::Response;
use serde::Deserialize;
use tracing::{error, info};

use crate::emitter::ChannelSink;
use crate::filter::Filter;
use crate::object_type::ObjectType;
use crate::pipeline::{run_export, CancelToken, ExportOptions};
use crate::resolver::ResolutionMode;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

/// Capacity of the body byte channel. Bounds buffered output so a slow
/// client throttles the pipeline instead of growing memory.
const BODY_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub filter: Option<String>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub benchmark: bool,
}

/// Stream all objects of a type as one JSON document:
/// `GET /export/{type}?filter=<expr>&resolved=<bool>&benchmark=<bool>`
pub async fn export_objects(
    State(state): State<AppState>,
    Path(type_token): Path<String>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    // Everything that can be rejected is rejected before the first body
    // byte; after this point errors can only truncate the stream.
    let object_type = ObjectType::from_request_token(&type_token)?;
    let filter = params.filter.as_deref().map(Filter::parse).transpose()?;

    let options = ExportOptions {
        mode: if params.resolved {
            ResolutionMode::Resolved
        } else {
            ResolutionMode::Raw
        },
        policy: state.config.resolution_policy,
        benchmark: params.benchmark,
        batch_size: state.config.export_batch_size,
    };

    info!(
        object_type = %object_type,
        filtered = filter.is_some(),
        mode = ?options.mode,
        benchmark = options.benchmark,
        "starting object export stream"
    );

    let (mut sink, body_stream) = ChannelSink::new(BODY_CHANNEL_CAPACITY);
    let store = state.store.clone();
    let cancel = CancelToken::new();

    tokio::spawn(async move {
        let result = run_export(
            store.as_ref(),
            object_type,
            filter,
            &options,
            &mut sink,
            &cancel,
        )
        .await;
        if let Err(e) = result {
            error!(
                object_type = %object_type,
                error = %e,
                "export stream aborted"
            );
            // No fixing up partial JSON; terminate the body so the client
            // sees an invalid document.
            sink.abort(e.to_string()).await;
        }
        // Dropping the sink ends the body stream.
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from_stream(body_stream))
        .map_err(|_| ApiError::Internal)
}
