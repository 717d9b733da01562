use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeanstalkError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout error after {0}ms")]
    Timeout(u64),

    #[error("Server does not recognize the command")]
    UnknownCommand,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Reserve timed out with no job available")]
    ReserveTimedOut,

    #[error("Reserve refused: a reserved job deadline is near")]
    DeadlineSoon,

    #[error("Job too large: {size} bytes (max: 65536)")]
    JobTooBig { size: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Client is closed")]
    ClientClosed,
}

pub type Result<T> = std::result::Result<T, BeanstalkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_connection_error_display() {
        let error = BeanstalkError::Connection("Connection refused".to_string());
        assert_eq!(
            format!("{}", error),
            "Connection error: Connection refused"
        );
    }

    #[test]
    fn test_timeout_error_display() {
        let error = BeanstalkError::Timeout(1000);
        assert_eq!(format!("{}", error), "Timeout error after 1000ms");
    }

    #[test]
    fn test_unknown_command_display() {
        let error = BeanstalkError::UnknownCommand;
        assert_eq!(
            format!("{}", error),
            "Server does not recognize the command"
        );
    }

    #[test]
    fn test_invalid_config_display() {
        let error = BeanstalkError::InvalidConfig("host must not be empty".to_string());
        assert_eq!(
            format!("{}", error),
            "Invalid configuration: host must not be empty"
        );
    }

    #[test]
    fn test_job_too_big_display() {
        let error = BeanstalkError::JobTooBig { size: 70000 };
        assert_eq!(
            format!("{}", error),
            "Job too large: 70000 bytes (max: 65536)"
        );
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = IoError::new(ErrorKind::ConnectionReset, "reset by peer");
        let error: BeanstalkError = io_error.into();

        assert!(matches!(error, BeanstalkError::Io(_)));
        let message = format!("{}", error);
        assert!(message.contains("IO error:"));
        assert!(message.contains("reset by peer"));
    }

    #[test]
    fn test_result_type_alias() {
        let success: Result<u64> = Ok(17);
        assert!(success.is_ok());

        let failure: Result<u64> = Err(BeanstalkError::ClientClosed);
        assert!(matches!(failure, Err(BeanstalkError::ClientClosed)));
    }

    #[test]
    fn test_error_debug_formatting() {
        let error = BeanstalkError::Protocol("BAD_FORMAT".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Protocol"));
        assert!(debug_str.contains("BAD_FORMAT"));
    }
}
