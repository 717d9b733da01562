use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::connection::Connection;
use crate::error::Result;

struct SharedEntry {
    connection: Arc<Connection>,
    claims: usize,
}

/// Process-wide registry mapping a [`Config`] to one shared [`Connection`].
///
/// Clients built from equal configs acquire the same connection; each acquire
/// takes a claim, each release drops one, and the connection is closed only
/// when the last claim goes away. A single mutex guards the whole registry,
/// including connection creation, so equal configs can never race into two
/// live connections.
pub struct ConnectionFactory {
    registry: Mutex<HashMap<Config, SharedEntry>>,
}

static INSTANCE: OnceLock<ConnectionFactory> = OnceLock::new();

impl ConnectionFactory {
    /// The process-wide factory instance.
    pub fn instance() -> &'static ConnectionFactory {
        INSTANCE.get_or_init(|| ConnectionFactory {
            registry: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the shared connection for `config`, opening one if no client
    /// holds it yet.
    pub async fn acquire(&self, config: &Config) -> Result<Arc<Connection>> {
        let mut registry = self.registry.lock().await;

        if let Some(entry) = registry.get_mut(config) {
            entry.claims += 1;
            debug!(addr = %config.addr(), claims = entry.claims, "sharing existing connection");
            return Ok(entry.connection.clone());
        }

        let connection = Arc::new(Connection::open(config).await?);
        registry.insert(
            config.clone(),
            SharedEntry {
                connection: connection.clone(),
                claims: 1,
            },
        );
        debug!(addr = %config.addr(), "opened new connection");
        Ok(connection)
    }

    /// Drops one claim on the connection for `config`; closes and evicts it
    /// when no claims remain. Releasing a config with no entry is a no-op.
    pub async fn release(&self, config: &Config) {
        let mut registry = self.registry.lock().await;

        let Some(entry) = registry.get_mut(config) else {
            return;
        };
        entry.claims -= 1;
        if entry.claims == 0 {
            if let Some(entry) = registry.remove(config) {
                entry.connection.close();
                debug!(addr = %config.addr(), "last claim released, connection closed");
            }
        } else {
            debug!(addr = %config.addr(), claims = entry.claims, "claim released");
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn accept_counting_listener() -> (u16, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepts = Arc::new(AtomicUsize::new(0));
        let counter = accepts.clone();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                // Keep the socket alive until the test ends.
                tokio::spawn(async move {
                    let _socket = socket;
                    std::future::pending::<()>().await;
                });
            }
        });
        (port, accepts)
    }

    fn config_for(port: u16) -> crate::config::Config {
        ConfigBuilder::new()
            .host("127.0.0.1")
            .port(port)
            .operation_timeout(Duration::from_millis(200))
            .build()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_equal_configs_share_one_connection() {
        let (port, accepts) = accept_counting_listener().await;
        let config = config_for(port);
        let factory = ConnectionFactory::instance();

        let first = factory.acquire(&config).await.unwrap();
        let second = factory.acquire(&config).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(accepts.load(Ordering::SeqCst), 1);

        factory.release(&config).await;
        factory.release(&config).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_release_keeps_connection_until_last_claim() {
        let (port, _accepts) = accept_counting_listener().await;
        let config = config_for(port);
        let factory = ConnectionFactory::instance();

        let first = factory.acquire(&config).await.unwrap();
        let _second = factory.acquire(&config).await.unwrap();

        factory.release(&config).await;
        // One claim remains, so a further acquire still shares.
        let third = factory.acquire(&config).await.unwrap();
        assert!(Arc::ptr_eq(&first, &third));

        factory.release(&config).await;
        factory.release(&config).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_release_after_eviction_is_noop() {
        let (port, _accepts) = accept_counting_listener().await;
        let config = config_for(port);
        let factory = ConnectionFactory::instance();

        let _connection = factory.acquire(&config).await.unwrap();
        factory.release(&config).await;
        // Entry is gone; further releases must not disturb the registry.
        factory.release(&config).await;
        factory.release(&config).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_distinct_configs_get_distinct_connections() {
        let (port_a, accepts_a) = accept_counting_listener().await;
        let (port_b, accepts_b) = accept_counting_listener().await;
        let config_a = config_for(port_a);
        let config_b = config_for(port_b);
        let factory = ConnectionFactory::instance();

        let a = factory.acquire(&config_a).await.unwrap();
        let b = factory.acquire(&config_b).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(accepts_a.load(Ordering::SeqCst), 1);
        assert_eq!(accepts_b.load(Ordering::SeqCst), 1);

        factory.release(&config_a).await;
        factory.release(&config_b).await;
    }
}
