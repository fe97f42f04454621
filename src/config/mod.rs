/// YAML agent configuration
pub mod agent;

pub use agent::{
    AgentConfig, AnalyzerConfig, DeliveryConfig, DiscoveryConfig, MonitoringConfig,
    ServicesConfig, ShutdownConfig, DEFAULT_CONFIG_PATH,
};
