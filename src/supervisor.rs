//! Agent lifecycle: discovery, one follower task per source, graceful stop
//!
//! The supervisor runs discovery and log file enumeration once, spawns a
//! follower for every service and file found, and keeps a cancellation
//! handle for each. On shutdown it cancels all followers and joins them,
//! which kills the follow subprocesses they own.

use crate::classifier::Classifier;
use crate::collectors::{ByteStreamSource, Follower, FollowerExit, LogSource};
use crate::config::AgentConfig;
use crate::discovery::{enumerate_log_files, Discovery};
use crate::error::{DeliveryError, FollowerError};
use crate::forwarder::{Forwarder, HttpForwarder};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running follower and the handle to stop it
struct FollowerHandle {
    label: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns every follower task for the lifetime of the process
pub struct Supervisor {
    config: Arc<AgentConfig>,
    discovery: Discovery,
    classifier: Arc<Classifier>,
    forwarder: Arc<dyn Forwarder>,
    shutdown: CancellationToken,
    followers: Vec<FollowerHandle>,
}

impl Supervisor {
    /// Create a supervisor with the backends and analyzer from configuration
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Http` if the HTTP client cannot be built.
    pub fn new(config: AgentConfig) -> Result<Self, DeliveryError> {
        let forwarder = HttpForwarder::new(&config.analyzer.endpoint, &config.delivery)?;
        let discovery = Discovery::from_config(&config.services);
        Ok(Self::with_components(config, discovery, Arc::new(forwarder)))
    }

    /// Create a supervisor with explicit discovery and forwarder
    pub fn with_components(
        config: AgentConfig,
        discovery: Discovery,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            discovery,
            classifier: Arc::new(Classifier::new()),
            forwarder,
            shutdown: CancellationToken::new(),
            followers: Vec::new(),
        }
    }

    /// Token that stops the whole agent when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }

    /// Labels of the launched followers, in launch order
    pub fn follower_labels(&self) -> Vec<String> {
        self.followers.iter().map(|f| f.label.clone()).collect()
    }

    /// Discover services and log files once and start a follower for each
    ///
    /// Returns the number of followers launched.
    pub async fn start(&mut self) -> usize {
        self.log_unapplied_settings();

        let services = self.discovery.discover().await;
        info!("Discovered {} service(s)", services.len());

        let files = enumerate_log_files(&self.config.monitoring.log_paths);
        info!("Matched {} log file(s)", files.len());

        for service in &services {
            self.spawn_follower(Arc::new(LogSource::for_service(service)));
        }
        for file in files {
            self.spawn_follower(Arc::new(LogSource::FileFollow(file)));
        }

        if self.followers.is_empty() {
            warn!("No services or log files to monitor");
        }

        self.followers.len()
    }

    /// Launch one follower task for a source
    pub fn spawn_follower(&mut self, source: Arc<dyn ByteStreamSource>) {
        let follower = Follower::new(
            source,
            Arc::clone(&self.classifier),
            Arc::clone(&self.forwarder),
        )
        .with_buffer_size(self.config.monitoring.read_buffer_bytes);
        let label = follower.label();
        let cancel = self.shutdown.child_token();

        let task_label = label.clone();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            match follower.run(task_cancel).await {
                Ok(FollowerExit::EndOfStream) => {
                    warn!("Stopped monitoring {}: stream ended", task_label)
                }
                Ok(FollowerExit::Cancelled) => debug!("Follower for {} cancelled", task_label),
                Err(FollowerError::Read(e)) => {
                    warn!("Stopped monitoring {}: {}", task_label, e)
                }
                Err(e) => warn!("Could not monitor {}: {}", task_label, e),
            }
        });

        self.followers.push(FollowerHandle {
            label,
            cancel,
            handle,
        });
    }

    /// Block until the shutdown token is cancelled
    pub async fn wait_for_shutdown(&self) {
        self.shutdown.cancelled().await;
        info!("Shutdown signal received");
    }

    /// Cancel every follower and wait for them to finish
    ///
    /// Followers still running after `shutdown.timeout_seconds` are aborted.
    pub async fn stop(&mut self) {
        info!("Stopping {} follower(s)", self.followers.len());
        self.shutdown.cancel();

        let deadline = tokio::time::Instant::now() + self.config.shutdown.timeout();
        for mut follower in self.followers.drain(..) {
            follower.cancel.cancel();
            match tokio::time::timeout_at(deadline, &mut follower.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Follower for {} panicked: {}", follower.label, e),
                Err(_) => {
                    warn!("Follower for {} did not stop in time, aborting", follower.label);
                    follower.handle.abort();
                }
            }
        }

        info!("All followers stopped");
    }

    /// Full lifecycle: start, wait for the shutdown signal, stop
    pub async fn run(mut self) {
        self.start().await;
        self.wait_for_shutdown().await;
        self.stop().await;
    }

    /// Report settings that are accepted but have no effect
    fn log_unapplied_settings(&self) {
        if let Some(interval) = self.config.scan_interval() {
            debug!(
                "Discovery runs once at startup; scan_interval of {:?} is not applied",
                interval
            );
        }
        if !self.config.monitoring.exclude_patterns.is_empty() {
            info!(
                "{} exclude pattern(s) configured but not applied",
                self.config.monitoring.exclude_patterns.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::ByteStream;
    use crate::config::{MonitoringConfig, ServicesConfig};
    use crate::events::SourceKind;
    use crate::forwarder::MockForwarder;
    use std::time::Duration;

    const TEST_WAIT: Duration = Duration::from_secs(5);

    /// Source that never produces output until the agent stops
    struct IdleSource(&'static str);

    impl ByteStreamSource for IdleSource {
        fn service_name(&self) -> String {
            self.0.to_string()
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Container
        }

        fn open(&self) -> Result<ByteStream, FollowerError> {
            let (reader, writer) = tokio::io::duplex(16);
            // Leak the writer so the stream never reaches end of file
            std::mem::forget(writer);
            Ok(ByteStream::from_reader(reader))
        }
    }

    fn offline_config() -> AgentConfig {
        AgentConfig {
            services: ServicesConfig {
                auto_detect: false,
                docker: false,
                systemd: false,
            },
            ..AgentConfig::default()
        }
    }

    fn supervisor(config: AgentConfig, forwarder: &MockForwarder) -> Supervisor {
        let discovery = Discovery::from_config(&config.services);
        Supervisor::with_components(config, discovery, Arc::new(forwarder.clone()))
    }

    #[tokio::test]
    async fn test_nothing_to_monitor() {
        let mut supervisor = supervisor(offline_config(), &MockForwarder::success());
        assert_eq!(supervisor.start().await, 0);
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_one_follower_per_matched_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("api.log"), "").unwrap();
        std::fs::write(dir.path().join("worker.log"), "").unwrap();

        let config = AgentConfig {
            monitoring: MonitoringConfig {
                log_paths: vec![format!("{}/*.log", dir.path().display())],
                ..MonitoringConfig::default()
            },
            ..offline_config()
        };
        let mut supervisor = supervisor(config, &MockForwarder::success());

        assert_eq!(supervisor.start().await, 2);
        let mut labels = supervisor.follower_labels();
        labels.sort();
        assert_eq!(labels, vec!["file api", "file worker"]);

        tokio::time::timeout(TEST_WAIT, supervisor.stop())
            .await
            .expect("stop timed out");
        assert_eq!(supervisor.follower_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_run() {
        let mut supervisor = supervisor(offline_config(), &MockForwarder::success());
        supervisor.spawn_follower(Arc::new(IdleSource("web")));
        supervisor.spawn_follower(Arc::new(IdleSource("db")));
        assert_eq!(supervisor.follower_count(), 2);

        let token = supervisor.shutdown_token();
        let run = tokio::spawn(supervisor.run());
        token.cancel();

        tokio::time::timeout(TEST_WAIT, run)
            .await
            .expect("agent did not shut down")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_cancels_followers() {
        let mut supervisor = supervisor(offline_config(), &MockForwarder::success());
        supervisor.spawn_follower(Arc::new(IdleSource("web")));

        tokio::time::timeout(TEST_WAIT, supervisor.stop())
            .await
            .expect("stop timed out");
        assert!(supervisor.shutdown_token().is_cancelled());
    }
}
