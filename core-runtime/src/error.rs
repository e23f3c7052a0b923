use thiserror::Error;

/// Failures while assembling the runtime: configuration and logging setup.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration value or logging setup failure.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host collaborator was not provided to the builder.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
