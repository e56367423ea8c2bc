use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("sensor bus error: {0}")]
    Bus(String),
    #[error("sensor timeout")]
    Timeout,
    #[error("invalid led bank {0}")]
    InvalidBank(u8),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
