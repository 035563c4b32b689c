use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("motor driver error: {0}")]
    Motor(String),
    #[error("sensor timeout")]
    Timeout,
    #[error("frequency sensor fault: {0}")]
    SensorFault(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
