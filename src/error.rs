use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PageSceneError>;

#[derive(Debug, Error)]
pub enum PageSceneError {
    /// The content host never signalled layout completion.
    #[error("layout did not complete within {waited:?}")]
    Timeout { waited: Duration },
    #[error("render request was cancelled")]
    Cancelled,
    #[error("content host error: {0}")]
    Host(String),
    #[error("document writer error: {0}")]
    Writer(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PageSceneError {
    pub(crate) fn writer(err: impl std::fmt::Display) -> Self {
        PageSceneError::Writer(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_errors_keep_their_source() {
        let err = PageSceneError::from(std::io::Error::other("disk full"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "io error: disk full");
    }

    #[test]
    fn timeout_reports_the_waited_duration() {
        let err = PageSceneError::Timeout {
            waited: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "layout did not complete within 250ms");
    }
}
