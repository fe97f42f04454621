use crate::error::DiscoveryError;
use crate::events::{Service, ServiceKind};
use log::debug;
use std::future::Future;
use std::pin::Pin;
use tokio::process::Command;

/// Unit type suffixes systemd appends to unit names
const UNIT_SUFFIXES: [&str; 11] = [
    "service",
    "socket",
    "target",
    "timer",
    "mount",
    "automount",
    "path",
    "slice",
    "scope",
    "swap",
    "device",
];

/// Trait for service-management backends queried during discovery
pub trait DiscoveryBackend: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    fn discover<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Service>, DiscoveryError>> + Send + 'a>>;
}

/// Lists running containers through the docker CLI
#[derive(Debug, Clone)]
pub struct DockerBackend {
    program: String,
}

impl Default for DockerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerBackend {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Use a different executable, e.g. `podman`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Parse `docker ps --format {{.Names}}` output, one container per line
    pub fn parse_container_list(output: &str) -> Vec<Service> {
        output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|name| Service::new(name, ServiceKind::Container, "running"))
            .collect()
    }
}

impl DiscoveryBackend for DockerBackend {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn discover<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Service>, DiscoveryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut command = Command::new(&self.program);
            command.args(["ps", "--format", "{{.Names}}"]);
            let stdout = run_listing(self.name(), &mut command).await?;
            Ok(Self::parse_container_list(&stdout))
        })
    }
}

/// Lists active service units through systemctl
#[derive(Debug, Clone)]
pub struct SystemdBackend {
    program: String,
}

impl Default for SystemdBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemdBackend {
    pub fn new() -> Self {
        Self::with_program("systemctl")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Parse `systemctl list-units --no-legend --plain` output
    ///
    /// The unit name is the first column; its type suffix is stripped.
    pub fn parse_unit_list(output: &str) -> Vec<Service> {
        output
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(normalize_unit_name)
            .filter(|name| !name.is_empty())
            .map(|name| Service::new(name, ServiceKind::SystemUnit, "active"))
            .collect()
    }
}

impl DiscoveryBackend for SystemdBackend {
    fn name(&self) -> &'static str {
        "systemd"
    }

    fn discover<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Service>, DiscoveryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut command = Command::new(&self.program);
            command.args([
                "list-units",
                "--type=service",
                "--state=active",
                "--no-legend",
                "--plain",
            ]);
            let stdout = run_listing(self.name(), &mut command).await?;
            Ok(Self::parse_unit_list(&stdout))
        })
    }
}

/// Strip exactly one trailing unit-type suffix from a unit name
///
/// `nginx.service` becomes `nginx`; `nginx` is returned unchanged. A name
/// consisting only of a suffix (`.service`) is left as is.
pub fn normalize_unit_name(unit: &str) -> String {
    if let Some((stem, suffix)) = unit.rsplit_once('.') {
        if !stem.is_empty() && UNIT_SUFFIXES.contains(&suffix) {
            return stem.to_string();
        }
    }
    unit.to_string()
}

/// Run a listing command and return its stdout
async fn run_listing(
    backend: &'static str,
    command: &mut Command,
) -> Result<String, DiscoveryError> {
    debug!("Querying {} for services", backend);

    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| DiscoveryError::Unavailable {
            backend,
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(DiscoveryError::CommandFailed {
            backend,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// A plausible unit name, with or without one type suffix
    #[derive(Debug, Clone)]
    struct UnitName(String);

    impl Arbitrary for UnitName {
        fn arbitrary(g: &mut Gen) -> Self {
            let alphabet: Vec<char> = "abcdefghijklmnopqrstuvwxyz0123456789-_@".chars().collect();
            let len = 1 + usize::arbitrary(g) % 20;
            let stem: String = (0..len).map(|_| *g.choose(&alphabet).unwrap()).collect();
            if bool::arbitrary(g) {
                let suffix = g.choose(&UNIT_SUFFIXES).unwrap();
                UnitName(format!("{}.{}", stem, suffix))
            } else {
                UnitName(stem)
            }
        }
    }

    #[quickcheck]
    fn prop_normalize_is_idempotent(unit: UnitName) -> bool {
        let once = normalize_unit_name(&unit.0);
        normalize_unit_name(&once) == once
    }

    #[quickcheck]
    fn prop_normalize_never_empties_a_name(unit: UnitName) -> bool {
        !normalize_unit_name(&unit.0).is_empty()
    }
}
