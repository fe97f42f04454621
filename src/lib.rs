/// Error types for the agent
pub mod error;

/// Services, source tags and forwarding records
pub mod events;

/// Configuration management
pub mod config;

/// Service discovery and log file enumeration
pub mod discovery;

/// Byte stream sources and per-source followers
pub mod collectors;

/// Severity marker classification of log chunks
pub mod classifier;

/// Delivery of forwarding records to the analyzer
pub mod forwarder;

/// Follower lifecycle and graceful shutdown
pub mod supervisor;

// Re-export commonly used types
pub use classifier::Classifier;
pub use config::AgentConfig;
pub use error::{ConfigError, DeliveryError, DiscoveryError, FollowerError};
pub use supervisor::Supervisor;
