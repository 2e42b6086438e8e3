//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `environment` - Environment detection and logging configuration
//! - `provider` - Authentication provider and bot-check configuration
//! - `server` - HTTP server and CORS configuration
//! - `storage` - Durable key-value storage backend
//! - `verification` - Phone verification flow tuning

pub mod environment;
pub mod provider;
pub mod server;
pub mod storage;
pub mod verification;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use provider::{BotCheckConfig, ProviderConfig, ProviderKind};
pub use server::{CorsConfig, ServerConfig};
pub use storage::{StorageBackend, StorageConfig};
pub use verification::VerificationConfig;

/// Prefix for environment variable overrides (`DRIVESYNC__SERVER__PORT=9090`)
pub const ENV_PREFIX: &str = "DRIVESYNC";

/// Error raised while assembling the layered configuration
pub type ConfigError = config::ConfigError;

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Verification flow configuration
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Authentication provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Durable storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            verification: VerificationConfig::default(),
            provider: ProviderConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::new("127.0.0.1", 8080),
            cors: CorsConfig::development(),
            verification: VerificationConfig::default(),
            provider: ProviderConfig::test_numbers(),
            storage: StorageConfig::memory(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig::new("0.0.0.0", 8080),
            cors: CorsConfig::default(),
            verification: VerificationConfig::default(),
            provider: ProviderConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Baseline configuration for an environment, before file and env overrides
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Staging => {
                let mut config = Self::production();
                config.environment = Environment::Staging;
                config.logging = LoggingConfig::for_environment(Environment::Staging);
                config
            }
        }
    }

    /// Load layered configuration
    ///
    /// Layers, lowest priority first:
    /// 1. Built-in defaults for the detected environment
    /// 2. Optional `config.<environment>.toml` in the working directory
    /// 3. `DRIVESYNC__*` environment variables (double underscore separates sections)
    pub fn load() -> Result<Self, ConfigError> {
        let env = Environment::from_env();
        let baseline = Self::for_environment(env);

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&baseline)?)
            .add_source(config::File::with_name(env.config_file()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
