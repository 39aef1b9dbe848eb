#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Steward Core
//!
//! Rust core for the Steward configuration management tool: the bulk object
//! export pipeline. Given a type of configuration object (host, service,
//! command, ...) and an optional filter, every matching object streams from
//! the backing PostgreSQL store to the client as a single large JSON
//! document, with inherited/templated properties resolved on the fly.
//!
//! ## Architecture
//!
//! The pipeline is a sequential pull with four stages:
//!
//! 1. [`cache`] — request-scoped relation cache, prefetched once per export
//!    so row resolution never goes back to the store
//! 2. [`query`] + [`store`] — full-column select with pagination stripped,
//!    streamed row by row through a forward-only cursor
//! 3. [`resolver`] — raw row to plain JSON tree, optionally flattening the
//!    template inheritance chain (locally-set values always win)
//! 4. [`emitter`] — hand-written incremental JSON envelope, flushed in
//!    fixed-size batches so memory stays bounded and the client sees
//!    progress early
//!
//! [`benchmark`] records named checkpoints throughout and is appended as a
//! trailing diagnostics field on request. [`pipeline`] ties the stages
//! together; [`web`] exposes them as `GET /export/{type}`.
//!
//! ## Module Organization
//!
//! - [`object_type`] - Type registry: token normalization, capabilities, relations
//! - [`filter`] - Filter expression trees and SQL translation
//! - [`query`] - Export select builder
//! - [`store`] - Object store trait, Postgres and in-memory implementations
//! - [`cache`] - Request-scoped relation cache
//! - [`resolver`] - Inheritance resolution
//! - [`emitter`] - Incremental JSON emitter
//! - [`benchmark`] - Timing reporter
//! - [`pipeline`] - Export orchestration
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`web`] - Axum API surface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use steward_core::object_type::ObjectType;
//! use steward_core::pipeline::{run_export, CancelToken, ExportOptions};
//! use steward_core::emitter::BufferSink;
//! use steward_core::store::postgres::PgObjectStore;
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let store = PgObjectStore::new(pool);
//! let stats = run_export(
//!     &store,
//!     ObjectType::Host,
//!     None,
//!     &ExportOptions::default(),
//!     BufferSink::new(),
//!     &CancelToken::new(),
//! )
//! .await?;
//! println!("exported {} hosts", stats.rows);
//! # Ok(())
//! # }
//! ```

pub mod benchmark;
pub mod cache;
pub mod config;
pub mod emitter;
pub mod error;
pub mod filter;
pub mod logging;
pub mod object_type;
pub mod pipeline;
pub mod query;
pub mod resolver;
pub mod store;
pub mod web;

pub use benchmark::Benchmark;
pub use cache::RelationCache;
pub use config::StewardConfig;
pub use emitter::{BufferSink, ChannelSink, ExportSink, JsonEmitter, DEFAULT_BATCH_SIZE};
pub use error::{ExportError, Result};
pub use filter::Filter;
pub use object_type::{Feature, ObjectType};
pub use pipeline::{load_object, run_export, CancelToken, ExportOptions, ExportStats};
pub use query::ExportQuery;
pub use resolver::{ObjectResolver, ResolutionMode, ResolutionPolicy};
