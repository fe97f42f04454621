/// Forwarder implementations (HTTP analyzer endpoint, in-memory mock)
pub mod backends;

pub use backends::{HttpForwarder, MockForwarder};

use crate::error::DeliveryError;
use crate::events::{ForwardingRecord, SourceKind};
use log::{info, warn};
use std::future::Future;
use std::pin::Pin;

/// Trait for sinks that accept forwarding records
pub trait Forwarder: Send + Sync {
    /// Deliver one record. Implementations must not resend a request that
    /// may have reached the sink.
    fn send<'a>(
        &'a self,
        record: &'a ForwardingRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;
}

/// Build a record for one chunk and hand it to the forwarder
///
/// The outcome is logged here; callers only need the result to count drops.
/// A failed chunk is gone: nothing is buffered for a later attempt.
pub async fn forward(
    forwarder: &dyn Forwarder,
    chunk: &str,
    service_name: &str,
    source: SourceKind,
) -> Result<(), DeliveryError> {
    let record = ForwardingRecord::new(chunk, service_name, source);

    match forwarder.send(&record).await {
        Ok(()) => {
            info!("Analysis sent for {}", service_name);
            Ok(())
        }
        Err(e) => {
            warn!("Failed to send analysis for {} ({}): {}", service_name, source, e);
            Err(e)
        }
    }
}
