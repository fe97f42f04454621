//! Core data types shared by discovery, followers and the forwarder
//!
//! Services are produced once by discovery; forwarding records are built
//! fresh for every chunk that is sent to the analyzer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which service-management backend a service was discovered through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// A running container reported by the container runtime
    Container,
    /// An active unit reported by the init/service manager
    SystemUnit,
}

impl ServiceKind {
    /// The wire source tag for chunks read from a service of this kind
    pub fn source(self) -> SourceKind {
        match self {
            ServiceKind::Container => SourceKind::Container,
            ServiceKind::SystemUnit => SourceKind::ServiceUnit,
        }
    }
}

/// A service discovered on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Container name or unit name without its type suffix
    pub name: String,
    /// Backend the service came from; selects how it is followed
    pub kind: ServiceKind,
    /// Status reported by the backend at discovery time
    pub status: String,
}

impl Service {
    pub fn new(name: impl Into<String>, kind: ServiceKind, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            status: status.into(),
        }
    }
}

/// Source tag carried in every forwarding record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    File,
    Container,
    ServiceUnit,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Container => "container",
            SourceKind::ServiceUnit => "service-unit",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload posted to `<endpoint>/api/analyze`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingRecord {
    /// Raw chunk text, not split into lines
    pub logs: String,
    pub service_name: String,
    pub source: SourceKind,
}

impl ForwardingRecord {
    pub fn new(
        logs: impl Into<String>,
        service_name: impl Into<String>,
        source: SourceKind,
    ) -> Self {
        Self {
            logs: logs.into(),
            service_name: service_name.into(),
            source,
        }
    }
}

/// Service name used for a followed log file: the base name without extension
///
/// Falls back to the whole path when the file has no usable stem.
pub fn file_service_name(path: &Path) -> String {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => path.to_string_lossy().into_owned(),
    }
}
