use crate::classifier::Classifier;
use crate::collectors::source::ByteStreamSource;
use crate::error::FollowerError;
use crate::forwarder::{forward, Forwarder};
use log::{debug, info};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

/// Default read buffer size, and so the maximum chunk size
pub const DEFAULT_READ_BUFFER_BYTES: usize = 1024;

/// Why a follower stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerExit {
    /// The source closed its stream; monitoring of it has ended for good
    EndOfStream,
    /// The supervisor asked the follower to stop
    Cancelled,
}

/// Follows one log source and forwards the chunks that classify as errors
///
/// Reads fixed-size chunks with no line reassembly, so a chunk may hold a
/// partial line or several lines. Each qualifying chunk is forwarded before
/// the next read, which keeps chunks of one source in read order. A failed
/// delivery drops that chunk and reading carries on.
pub struct Follower {
    source: Arc<dyn ByteStreamSource>,
    classifier: Arc<Classifier>,
    forwarder: Arc<dyn Forwarder>,
    buffer_size: usize,
}

impl Follower {
    pub fn new(
        source: Arc<dyn ByteStreamSource>,
        classifier: Arc<Classifier>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            source,
            classifier,
            forwarder,
            buffer_size: DEFAULT_READ_BUFFER_BYTES,
        }
    }

    /// Override the read buffer size; zero is raised to one byte
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Human-readable description used in diagnostics
    pub fn label(&self) -> String {
        format!("{} {}", self.source.kind(), self.source.service_name())
    }

    /// Run until the stream ends, a read fails, or `cancel` fires
    ///
    /// The opened stream, and any subprocess behind it, is released on
    /// every return path.
    ///
    /// # Errors
    ///
    /// Returns `FollowerError::Spawn` or `FollowerError::MissingStdout` if the
    /// source cannot be opened, and `FollowerError::Read` if a read fails.
    pub async fn run(self, cancel: CancellationToken) -> Result<FollowerExit, FollowerError> {
        let service_name = self.source.service_name();
        let kind = self.source.kind();

        let mut stream = self.source.open()?;
        info!("Monitoring {} source: {}", kind, service_name);

        let mut buffer = vec![0u8; self.buffer_size];
        let mut chunks_read: u64 = 0;
        let mut chunks_dropped: u64 = 0;

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(FollowerExit::Cancelled),
                read = stream.reader().read(&mut buffer) => read?,
            };

            if read == 0 {
                debug!(
                    "{} {} closed after {} chunk(s), {} dropped",
                    kind, service_name, chunks_read, chunks_dropped
                );
                return Ok(FollowerExit::EndOfStream);
            }
            chunks_read += 1;

            let chunk = String::from_utf8_lossy(&buffer[..read]);
            if !self.classifier.classify(&chunk) {
                continue;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(FollowerExit::Cancelled),
                result = forward(self.forwarder.as_ref(), &chunk, &service_name, kind) => {
                    if result.is_err() {
                        chunks_dropped += 1;
                    }
                }
            }
        }
    }
}
