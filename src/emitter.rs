//! # Incremental JSON Emitter
//!
//! Writes resolved objects as array elements of a single top-level JSON
//! document, by hand, through incremental writes. Objects accumulate in a
//! batch buffer; at the batch threshold the buffer is comma-joined, written
//! to the transport, and the transport flushed, so the client sees progress
//! long before the full result set is known. The threshold bounds peak
//! memory and chunking in time only; it never affects output content.
//!
//! Invariant: the bytes written between `open()` and `close()` always
//! concatenate to syntactically valid JSON, for any object count
//! including zero.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{ExportError, Result};

/// Documented default batch threshold.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Explicit transport handle the emitter operates on. No ambient output
/// stream or global buffering state is involved.
#[async_trait]
pub trait ExportSink: Send {
    async fn write(&mut self, chunk: Bytes) -> Result<()>;

    /// Push buffered bytes toward the client. May block on backpressure
    /// from a slow consumer; that is the pipeline's only backpressure
    /// point and is intentional.
    async fn flush(&mut self) -> Result<()>;
}

#[async_trait]
impl<S: ExportSink + ?Sized> ExportSink for &mut S {
    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        (**self).write(chunk).await
    }

    async fn flush(&mut self) -> Result<()> {
        (**self).flush().await
    }
}

/// Sink backed by a bounded byte channel, consumed as a body stream by the
/// web layer. Each write is delivered immediately, so `flush` has nothing
/// left to push.
pub struct ChannelSink {
    tx: mpsc::Sender<std::io::Result<Bytes>>,
}

impl ChannelSink {
    /// Create a sink plus the stream the HTTP body is built from.
    pub fn new(capacity: usize) -> (Self, ReceiverStream<std::io::Result<Bytes>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, ReceiverStream::new(rx))
    }

    /// Terminate the body stream with an error, aborting the transport
    /// without attempting to fix up already-sent partial JSON.
    pub async fn abort(&mut self, reason: String) {
        let _ = self
            .tx
            .send(Err(std::io::Error::other(reason)))
            .await;
    }
}

#[async_trait]
impl ExportSink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| ExportError::Transport("client disconnected".to_string()))
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory sink for tests and non-streaming callers.
#[derive(Default)]
pub struct BufferSink {
    buffer: Vec<u8>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buffer).expect("emitter writes UTF-8")
    }
}

#[async_trait]
impl ExportSink for BufferSink {
    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        self.buffer.extend_from_slice(&chunk);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitterState {
    Opened,
    Emitting,
    Closed,
}

/// The `Opened → Emitting → Closed` state machine. Closed is terminal.
pub struct JsonEmitter<S: ExportSink> {
    sink: S,
    state: EmitterState,
    batch: Vec<String>,
    batch_size: usize,
    flushes: usize,
    emitted: u64,
}

impl<S: ExportSink> JsonEmitter<S> {
    pub fn new(sink: S, batch_size: usize) -> Self {
        Self {
            sink,
            state: EmitterState::Opened,
            batch: Vec::new(),
            batch_size: batch_size.max(1),
            flushes: 0,
            emitted: 0,
        }
    }

    /// Write the opening token of the JSON envelope.
    ///
    /// Response headers must already be on the wire at this point; they
    /// cannot follow body bytes.
    pub async fn open(&mut self) -> Result<()> {
        if self.state != EmitterState::Opened {
            return Err(ExportError::EmitterClosed);
        }
        self.sink.write(Bytes::from_static(b"{ \"objects\": [ ")).await?;
        self.state = EmitterState::Emitting;
        Ok(())
    }

    /// Serialize one plain object tree into the current batch, flushing the
    /// batch to the transport when the threshold is reached.
    pub async fn emit(&mut self, tree: &serde_json::Value) -> Result<()> {
        if self.state != EmitterState::Emitting {
            return Err(ExportError::EmitterClosed);
        }
        let rendered =
            serde_json::to_string_pretty(tree).map_err(|e| ExportError::Serialization {
                column: String::new(),
                reason: e.to_string(),
            })?;
        self.batch.push(rendered);
        self.emitted += 1;

        if self.batch.len() >= self.batch_size {
            self.flush_batch().await?;
        }
        Ok(())
    }

    /// Flush any remaining partial batch, close the envelope, optionally
    /// append the trailing diagnostics field, and transition to Closed.
    pub async fn close(&mut self, diagnostics: Option<&str>) -> Result<u64> {
        if self.state != EmitterState::Emitting {
            return Err(ExportError::EmitterClosed);
        }
        self.flush_batch().await?;

        match diagnostics {
            Some(report) => {
                let trailer = format!(
                    "], \"benchmark_string\": {}}}\n",
                    serde_json::Value::String(report.to_string())
                );
                self.sink.write(Bytes::from(trailer)).await?;
            }
            None => {
                self.sink.write(Bytes::from_static(b"] }\n")).await?;
            }
        }
        self.sink.flush().await?;
        self.state = EmitterState::Closed;
        Ok(self.emitted)
    }

    /// Number of objects emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    async fn flush_batch(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let mut chunk = String::new();
        // Leading separator only once a previous flush put objects on
        // the wire.
        if self.flushes > 0 {
            chunk.push_str(", ");
        }
        chunk.push_str(&self.batch.join(", "));
        self.batch.clear();
        self.flushes += 1;

        self.sink.write(Bytes::from(chunk)).await?;
        self.sink.flush().await
    }
}
