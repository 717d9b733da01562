use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::config::{Config, ConfigBuilder};
use crate::connection::Connection;
use crate::error::{BeanstalkError, Result};
use crate::factory::ConnectionFactory;
use crate::operation::{self, Job, Operation, Reply, MAX_JOB_SIZE};

/// The client for a beanstalkd work-queue server.
///
/// `BeanstalkClient` is the blocking-from-the-caller's-perspective facade over
/// an asynchronous connection: every method builds an [`Operation`], submits
/// it, and waits up to the configured operation timeout for the reply.
///
/// Two failure policies coexist, matching the two kinds of return values:
///
/// - The boolean family (`use_tube`, `watch_tube`, `ignore_tube`,
///   `delete_job`, `touch_job`, `release_job`, `bury_job`) never fails. Any
///   error — timeout, transport loss, protocol error, unknown command —
///   degrades to `false`, indistinguishable from a definitive negative reply.
/// - `put_job` and `reserve_job` have no safe fallback value, so every
///   failure propagates; the caller must learn that the outcome is unknown.
///
/// Clients built from equal [`Config`]s share one underlying connection via
/// the process-wide [`ConnectionFactory`]; [`close`](Self::close) releases
/// this client's claim without tearing the connection out from under others.
///
/// # Examples
///
/// ```no_run
/// use beanstalk_client::BeanstalkClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), beanstalk_client::BeanstalkError> {
///     let client = BeanstalkClient::new("localhost", 11300).await?;
///
///     client.use_tube("jobs").await;
///     let id = client.put_job(1, 0, 60, &b"payload"[..]).await?;
///     println!("queued job {id}");
///
///     client.close().await;
///     Ok(())
/// }
/// ```
pub struct BeanstalkClient {
    config: Config,
    connection: Arc<Connection>,
    operation_timeout: Duration,
    closed: AtomicBool,
}

impl BeanstalkClient {
    /// Creates a client for `host:port` with default settings (1 second
    /// operation timeout).
    pub async fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::with_config(ConfigBuilder::new().host(host).port(port).build()).await
    }

    /// Creates a client from an explicit [`Config`].
    ///
    /// The config is validated before anything touches the network; a
    /// degenerate config (empty host, zero port) fails with
    /// [`BeanstalkError::InvalidConfig`] and no connection is created.
    /// Otherwise the client acquires the shared connection for this config
    /// from the [`ConnectionFactory`].
    pub async fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let operation_timeout = config.operation_timeout;
        let connection = ConnectionFactory::instance().acquire(&config).await?;
        Ok(Self {
            config,
            connection,
            operation_timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Returns a [`ConfigBuilder`], equivalent to [`ConfigBuilder::new()`].
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Selects the tube new jobs are put into. Returns `false` on any
    /// failure as well as on a negative reply.
    pub async fn use_tube(&self, tube: impl Into<String>) -> bool {
        let tube = tube.into();
        if tube.is_empty() {
            return false;
        }
        self.get_boolean(Operation::Use { tube }, operation::decode_use)
            .await
    }

    /// Adds a tube to the watch list consulted by reserve.
    pub async fn watch_tube(&self, tube: impl Into<String>) -> bool {
        let tube = tube.into();
        if tube.is_empty() {
            return false;
        }
        self.get_boolean(Operation::Watch { tube }, operation::decode_watch)
            .await
    }

    /// Removes a tube from the watch list. Returns `false` when the server
    /// refuses to ignore the last watched tube.
    pub async fn ignore_tube(&self, tube: impl Into<String>) -> bool {
        let tube = tube.into();
        if tube.is_empty() {
            return false;
        }
        self.get_boolean(Operation::Ignore { tube }, operation::decode_ignore)
            .await
    }

    /// Queues a job and returns its server-assigned id.
    ///
    /// Unlike the boolean family, every failure propagates — a put that may
    /// or may not have landed must never look like a quiet `false`.
    pub async fn put_job(
        &self,
        priority: u32,
        delay: u32,
        ttr: u32,
        data: impl Into<Bytes>,
    ) -> Result<u64> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BeanstalkError::ClientClosed);
        }
        let data = data.into();
        if data.len() > MAX_JOB_SIZE {
            return Err(BeanstalkError::JobTooBig { size: data.len() });
        }
        let operation = Operation::Put {
            priority,
            delay,
            ttr,
            data,
        };
        self.connection
            .handle(operation, operation::decode_put)
            .wait(self.operation_timeout)
            .await
    }

    /// Deletes a job. `false` covers both "not found" and any failure.
    pub async fn delete_job(&self, id: u64) -> bool {
        self.get_boolean(Operation::Delete { id }, operation::decode_delete)
            .await
    }

    /// Refreshes the time-to-run of a reserved job.
    pub async fn touch_job(&self, id: u64) -> bool {
        self.get_boolean(Operation::Touch { id }, operation::decode_touch)
            .await
    }

    /// Reserves the next available job, asking the server to hold the
    /// reservation open for up to `timeout` seconds.
    ///
    /// Two independent budgets apply: the server-side wait carried by the
    /// operation, and this client's own operation timeout bounding the local
    /// wait. The shorter one dominates — a 5 second server budget under a
    /// 1 second operation timeout fails locally after about 1 second.
    pub async fn reserve_job(&self, timeout: u64) -> Result<Job> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BeanstalkError::ClientClosed);
        }
        let operation = Operation::Reserve { timeout };
        self.connection
            .handle(operation, operation::decode_reserve)
            .wait(self.operation_timeout)
            .await
    }

    /// Puts a reserved job back onto the ready (or delayed) queue.
    pub async fn release_job(&self, id: u64, priority: u32, delay: u32) -> bool {
        self.get_boolean(
            Operation::Release {
                id,
                priority,
                delay,
            },
            operation::decode_release,
        )
        .await
    }

    /// Sets a reserved job aside until it is kicked.
    pub async fn bury_job(&self, id: u64, priority: u32) -> bool {
        self.get_boolean(Operation::Bury { id, priority }, operation::decode_bury)
            .await
    }

    /// Advises the server that this session is done. The outcome is
    /// discarded; this does not release the client's connection claim.
    pub async fn quit(&self) {
        let _ = self
            .get_boolean(Operation::Quit, operation::decode_quit)
            .await;
    }

    /// Releases this client's claim on the shared connection. Terminal:
    /// afterwards the boolean family returns `false` and `put_job` /
    /// `reserve_job` fail with [`BeanstalkError::ClientClosed`]. Safe to call
    /// more than once; only the first call touches the factory bookkeeping.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        ConnectionFactory::instance().release(&self.config).await;
    }

    /// The uniform boolean dispatch path: submit, wait out the budget, and
    /// collapse every failure to `false`. Callers of the boolean family
    /// cannot tell "server said no" from "we never found out"; the swallowed
    /// error is logged for diagnostics.
    async fn get_boolean(&self, operation: Operation, decode: fn(Reply) -> Result<bool>) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        match self
            .connection
            .handle(operation, decode)
            .wait(self.operation_timeout)
            .await
        {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "operation failed, reporting false");
                false
            }
        }
    }
}
