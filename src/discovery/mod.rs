/// Service-management backends (container runtime, service manager)
pub mod backends;

/// Glob expansion of configured log file patterns
pub mod log_files;

pub use backends::{normalize_unit_name, DiscoveryBackend, DockerBackend, SystemdBackend};
pub use log_files::enumerate_log_files;

use crate::config::ServicesConfig;
use crate::events::Service;
use log::{info, warn};
use std::sync::Arc;

/// Queries every enabled backend once and merges the results
///
/// A backend that is missing or fails contributes no services; the failure
/// is logged and the remaining backends are still queried.
pub struct Discovery {
    backends: Vec<Arc<dyn DiscoveryBackend>>,
}

impl Discovery {
    /// Build discovery with the backends enabled in configuration
    pub fn from_config(services: &ServicesConfig) -> Self {
        let mut backends: Vec<Arc<dyn DiscoveryBackend>> = Vec::new();
        if services.docker {
            backends.push(Arc::new(DockerBackend::new()));
        }
        if services.systemd {
            backends.push(Arc::new(SystemdBackend::new()));
        }
        Self::with_backends(backends)
    }

    pub fn with_backends(backends: Vec<Arc<dyn DiscoveryBackend>>) -> Self {
        Self { backends }
    }

    /// Number of backends that will be queried
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Union of the services reported by each backend
    pub async fn discover(&self) -> Vec<Service> {
        let mut services = Vec::new();

        for backend in &self.backends {
            match backend.discover().await {
                Ok(found) => {
                    info!("{} reported {} service(s)", backend.name(), found.len());
                    services.extend(found);
                }
                Err(e) => {
                    warn!("Skipping {} discovery: {}", backend.name(), e);
                }
            }
        }

        services
    }
}
