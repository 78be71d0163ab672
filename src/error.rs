use thiserror::Error;

/// Static domain set error types
#[derive(Error, Debug)]
pub enum DomainSetError {
    #[error("no patterns supplied")]
    NoPatterns,

    #[error("bad value: {0}")]
    BadValue(String),

    #[error("top-level domain is not supported: {0}")]
    TopLevelDomain(String),

    #[error("too many popular suffixes: {0} (max 256)")]
    TooManyPopular(usize),

    #[error("failed to calibrate seed and bucket count")]
    FailedToCalibrate,

    #[error("buffer too small: need {need} bytes, got {got}")]
    SmallPlace { need: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, DomainSetError>;
