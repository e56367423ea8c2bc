use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerifyError {
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("timeout waiting for sensor")]
    SensorTimeout,
    #[error("classification failed: {0}")]
    Classification(String),
    #[error("printer control error: {0}")]
    Printer(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("sensor stream already running")]
    AlreadyRunning,
    #[error("no filament detected")]
    NoFilamentDetected,
    #[error("io error: {0}")]
    Io(String),
}

impl VerifyError {
    /// True for failures that originate in the sensor head (bus, range, timeout).
    pub fn is_sensor(&self) -> bool {
        matches!(self, VerifyError::Sensor(_) | VerifyError::SensorTimeout)
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing sensor gateway")]
    MissingGateway,
    #[error("missing material classifier")]
    MissingClassifier,
    #[error("missing printer control")]
    MissingPrinter,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
