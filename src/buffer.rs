//! Threshold-batched buffer of series points.
//!
//! Points accumulate in memory until the bulk size is reached, at which point
//! the whole batch is written in one call. A failed write keeps every pending
//! point so the caller can retry [`SeriesPointBuffer::flush`].

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::MeteringError;
use crate::types::SeriesPoint;

/// Destination for batches of series points.
#[async_trait]
pub trait MetricsWriter: Send + Sync {
    async fn write_points(&self, points: &[SeriesPoint]) -> Result<(), MeteringError>;
}

pub struct SeriesPointBuffer<W: MetricsWriter> {
    writer: W,
    pending: Vec<SeriesPoint>,
    threshold: usize,
}

impl<W: MetricsWriter> SeriesPointBuffer<W> {
    /// A threshold of zero is treated as one.
    pub fn new(writer: W, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            writer,
            pending: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Queue a point, flushing once the threshold is reached.
    ///
    /// At most `threshold` points stay pending only while writes succeed; a
    /// failed flush keeps them, so each further append grows the backlog until
    /// a later flush goes through.
    pub async fn append(&mut self, point: SeriesPoint) -> Result<(), MeteringError> {
        self.pending.push(point);
        if self.pending.len() >= self.threshold {
            debug!("bulk size {} reached, flushing", self.threshold);
            self.flush().await?;
        }
        Ok(())
    }

    /// Write all pending points as one batch.
    pub async fn flush(&mut self) -> Result<(), MeteringError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        match self.writer.write_points(&self.pending).await {
            Ok(()) => {
                info!("wrote {} points", self.pending.len());
                self.pending.clear();
                Ok(())
            }
            Err(e) => {
                warn!("flush of {} points failed: {}", self.pending.len(), e);
                Err(e)
            }
        }
    }

    /// JSON body of the points not yet written.
    pub fn peek_pending_body(&self) -> serde_json::Value {
        serde_json::to_value(&self.pending).unwrap_or(serde_json::Value::Array(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}
