use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BeanstalkError, Result};

/// Connection settings for a beanstalkd server.
///
/// `Config` doubles as the sharing key for the process-wide
/// [`ConnectionFactory`](crate::ConnectionFactory): two clients built from
/// equal configs end up on the same underlying connection. That is why it
/// derives `Eq` and `Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Upper bound on every blocking wait for an operation reply.
    pub operation_timeout: Duration,
    /// Upper bound on establishing the TCP connection.
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 11300,
            operation_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(BeanstalkError::InvalidConfig(
                "host must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(BeanstalkError::InvalidConfig(
                "port must not be zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    pub fn operation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.operation_timeout = Duration::from_secs(secs);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout = Duration::from_secs(secs);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 11300);
        assert_eq!(config.operation_timeout, Duration::from_secs(1));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .host("queue.example.com")
            .port(11301)
            .operation_timeout(Duration::from_millis(250))
            .connect_timeout(Duration::from_secs(2))
            .build();

        assert_eq!(config.host, "queue.example.com");
        assert_eq!(config.port, 11301);
        assert_eq!(config.operation_timeout, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_config_builder_secs_helpers() {
        let config = ConfigBuilder::new()
            .operation_timeout_secs(3)
            .connect_timeout_secs(10)
            .build();

        assert_eq!(config.operation_timeout, Duration::from_secs(3));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_addr() {
        let config = ConfigBuilder::new().host("10.0.0.5").port(11300).build();
        assert_eq!(config.addr(), "10.0.0.5:11300");
    }

    #[test]
    fn test_validate_empty_host() {
        let config = ConfigBuilder::new().host("").build();
        let result = config.validate();

        match result {
            Err(BeanstalkError::InvalidConfig(msg)) => {
                assert_eq!(msg, "host must not be empty");
            }
            _ => panic!("Expected InvalidConfig error"),
        }
    }

    #[test]
    fn test_validate_zero_port() {
        let config = ConfigBuilder::new().port(0).build();
        assert!(matches!(
            config.validate(),
            Err(BeanstalkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_equal_configs_are_one_key() {
        use std::collections::HashMap;

        let a = ConfigBuilder::new().host("h").port(11300).build();
        let b = ConfigBuilder::new().host("h").port(11300).build();
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1);
        map.insert(b, 2);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_different_timeouts_are_different_keys() {
        let a = ConfigBuilder::new().operation_timeout_secs(1).build();
        let b = ConfigBuilder::new().operation_timeout_secs(2).build();
        assert_ne!(a, b);
    }
}
