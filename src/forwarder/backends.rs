use crate::config::DeliveryConfig;
use crate::error::DeliveryError;
use crate::events::ForwardingRecord;
use crate::forwarder::Forwarder;
use log::debug;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Posts records as JSON to `<endpoint>/api/analyze`
///
/// A request is resent only when the connection could not be established,
/// so the analyzer never sees the same chunk twice.
pub struct HttpForwarder {
    client: Client,
    url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpForwarder {
    /// Create a forwarder for the given analyzer base URL
    ///
    /// # Example
    /// ```
    /// use logship::config::DeliveryConfig;
    /// use logship::forwarder::HttpForwarder;
    ///
    /// let delivery = DeliveryConfig::default();
    /// let forwarder = HttpForwarder::new("http://localhost:3000", &delivery).unwrap();
    /// assert_eq!(forwarder.url(), "http://localhost:3000/api/analyze");
    /// ```
    pub fn new(endpoint: &str, delivery: &DeliveryConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(delivery.timeout()).build()?;

        Ok(Self {
            client,
            url: Self::analyze_url(endpoint),
            max_retries: delivery.max_retries,
            retry_delay: delivery.retry_delay(),
        })
    }

    /// Format the analyze URL for an endpoint, tolerating a trailing slash
    pub fn analyze_url(endpoint: &str) -> String {
        format!("{}/api/analyze", endpoint.trim_end_matches('/'))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send_once(&self, record: &ForwardingRecord) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::Http(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status))
        }
    }
}

impl Forwarder for HttpForwarder {
    fn send<'a>(
        &'a self,
        record: &'a ForwardingRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut delay = self.retry_delay;
            let mut attempt = 0;

            loop {
                match self.send_once(record).await {
                    Err(e) if e.is_connect() && attempt < self.max_retries => {
                        attempt += 1;
                        debug!(
                            "Analyzer unreachable, retrying in {:?} (attempt {}/{}): {}",
                            delay, attempt, self.max_retries, e
                        );
                        tokio::time::sleep(delay).await;
                        delay = delay.saturating_mul(2);
                    }
                    result => return result,
                }
            }
        })
    }
}

/// In-memory forwarder for tests
///
/// Records every call and fails the first `failures` calls (or every call)
/// with `DeliveryError::Rejected`.
#[derive(Clone, Default)]
pub struct MockForwarder {
    calls: Arc<Mutex<Vec<ForwardingRecord>>>,
    delivered: Arc<Mutex<Vec<ForwardingRecord>>>,
    failures: Option<usize>,
    failure_message: String,
    delay: Option<Duration>,
}

impl MockForwarder {
    /// Accept every record
    pub fn success() -> Self {
        Self::default()
    }

    /// Reject every record
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failures: Some(usize::MAX),
            failure_message: message.into(),
            ..Self::default()
        }
    }

    /// Reject the first `count` records, then accept the rest
    pub fn failing_first(count: usize) -> Self {
        Self {
            failures: Some(count),
            failure_message: "simulated transport failure".to_string(),
            ..Self::default()
        }
    }

    /// Delay every call, simulating a slow analyzer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every record passed to `send`, in call order
    pub fn calls(&self) -> Vec<ForwardingRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Records that were accepted, in call order
    pub fn delivered(&self) -> Vec<ForwardingRecord> {
        self.delivered.lock().unwrap().clone()
    }
}

impl Forwarder for MockForwarder {
    fn send<'a>(
        &'a self,
        record: &'a ForwardingRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let call_index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(record.clone());
                calls.len()
            };

            match self.failures {
                Some(failures) if call_index <= failures => {
                    Err(DeliveryError::Rejected(self.failure_message.clone()))
                }
                _ => {
                    self.delivered.lock().unwrap().push(record.clone());
                    Ok(())
                }
            }
        })
    }
}
