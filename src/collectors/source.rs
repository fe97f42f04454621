use crate::error::FollowerError;
use crate::events::{file_service_name, Service, ServiceKind, SourceKind};
use log::debug;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

/// Capability to open one readable byte stream of log output
///
/// Followers depend only on this trait, so tests can hand them an in-memory
/// stream instead of a subprocess.
pub trait ByteStreamSource: Send + Sync {
    /// Name reported as `serviceName` for chunks read from this source
    fn service_name(&self) -> String;

    /// Source tag reported for chunks read from this source
    fn kind(&self) -> SourceKind;

    /// Open the stream; each call starts a fresh one
    fn open(&self) -> Result<ByteStream, FollowerError>;
}

/// An open stream of log bytes
///
/// Owns the subprocess producing the bytes, if any. Dropping the stream
/// kills and reaps that subprocess.
pub struct ByteStream {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    _child: Option<Child>,
}

impl ByteStream {
    /// Wrap an in-process reader with no subprocess behind it
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            _child: None,
        }
    }

    pub fn reader(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        self.reader.as_mut()
    }
}

/// The log sources the agent knows how to follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// Bytes appended to a file from its current end
    FileFollow(PathBuf),
    /// Live output of a running container
    ContainerLogFollow(String),
    /// Live journal entries of a service unit
    UnitLogFollow(String),
}

impl LogSource {
    pub fn for_service(service: &Service) -> Self {
        match service.kind {
            ServiceKind::Container => LogSource::ContainerLogFollow(service.name.clone()),
            ServiceKind::SystemUnit => LogSource::UnitLogFollow(service.name.clone()),
        }
    }

    /// The external command whose stdout carries this source's log output
    pub fn command(&self) -> Command {
        let mut command = match self {
            LogSource::FileFollow(path) => {
                let mut command = Command::new("tail");
                command.args(["-n", "0", "-F"]).arg(path);
                command
            }
            LogSource::ContainerLogFollow(name) => {
                let mut command = Command::new("docker");
                command.args(["logs", "-f", "--tail", "0", name.as_str()]);
                command
            }
            LogSource::UnitLogFollow(name) => {
                let mut command = Command::new("journalctl");
                command.args(["-u", name.as_str(), "-f", "-n", "0", "--no-pager"]);
                command
            }
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::FileFollow(path) => write!(f, "file {}", path.display()),
            LogSource::ContainerLogFollow(name) => write!(f, "container {}", name),
            LogSource::UnitLogFollow(name) => write!(f, "unit {}", name),
        }
    }
}

impl ByteStreamSource for LogSource {
    fn service_name(&self) -> String {
        match self {
            LogSource::FileFollow(path) => file_service_name(path),
            LogSource::ContainerLogFollow(name) | LogSource::UnitLogFollow(name) => name.clone(),
        }
    }

    fn kind(&self) -> SourceKind {
        match self {
            LogSource::FileFollow(_) => SourceKind::File,
            LogSource::ContainerLogFollow(_) => SourceKind::Container,
            LogSource::UnitLogFollow(_) => SourceKind::ServiceUnit,
        }
    }

    fn open(&self) -> Result<ByteStream, FollowerError> {
        debug!("Spawning follow command for {}", self);

        let mut child = self
            .command()
            .spawn()
            .map_err(|e| FollowerError::Spawn(format!("{}: {}", self, e)))?;

        // Dropping the child here kills it
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FollowerError::MissingStdout(self.to_string()))?;

        Ok(ByteStream {
            reader: Box::new(stdout),
            _child: Some(child),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn args(source: &LogSource) -> Vec<String> {
        source
            .command()
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn program(source: &LogSource) -> String {
        source
            .command()
            .as_std()
            .get_program()
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_file_follow_starts_at_end_of_file() {
        let source = LogSource::FileFollow(PathBuf::from("/var/log/app.log"));
        assert_eq!(program(&source), "tail");
        assert_eq!(args(&source), vec!["-n", "0", "-F", "/var/log/app.log"]);
        assert_eq!(source.service_name(), "app");
        assert_eq!(source.kind(), SourceKind::File);
    }

    #[test]
    fn test_container_follow() {
        let service = Service::new("web", ServiceKind::Container, "running");
        let source = LogSource::for_service(&service);
        assert_eq!(source, LogSource::ContainerLogFollow("web".to_string()));
        assert_eq!(program(&source), "docker");
        assert_eq!(args(&source), vec!["logs", "-f", "--tail", "0", "web"]);
        assert_eq!(source.service_name(), "web");
        assert_eq!(source.kind(), SourceKind::Container);
    }

    #[test]
    fn test_unit_follow() {
        let service = Service::new("nginx", ServiceKind::SystemUnit, "active");
        let source = LogSource::for_service(&service);
        assert_eq!(source, LogSource::UnitLogFollow("nginx".to_string()));
        assert_eq!(program(&source), "journalctl");
        assert_eq!(args(&source), vec!["-u", "nginx", "-f", "-n", "0", "--no-pager"]);
        assert_eq!(source.kind(), SourceKind::ServiceUnit);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            LogSource::FileFollow(PathBuf::from("/tmp/x.log")).to_string(),
            "file /tmp/x.log"
        );
        assert_eq!(
            LogSource::UnitLogFollow("cron".to_string()).to_string(),
            "unit cron"
        );
    }

    #[tokio::test]
    async fn test_from_reader_streams_bytes() {
        let mut stream = ByteStream::from_reader(std::io::Cursor::new(b"hello".to_vec()));
        let mut out = Vec::new();
        stream.reader().read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }
}
