//! # Beanstalk Rust Client
//!
//! A Rust client library for the [beanstalkd](https://beanstalkd.github.io/)
//! work-queue server.
//!
//! The crate centers on [`BeanstalkClient`], a facade that turns each queue
//! operation (put, reserve, delete, release, bury, touch, tube selection)
//! into a serialized protocol command, submits it over a shared asynchronous
//! connection, and waits a bounded amount of time for the reply. Connections
//! are shared: clients built from equal [`Config`]s multiplex one TCP
//! connection through the process-wide [`ConnectionFactory`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use beanstalk_client::BeanstalkClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Producer: pick a tube and queue a job.
//!     let producer = BeanstalkClient::new("localhost", 11300).await?;
//!     producer.use_tube("emails").await;
//!     let id = producer.put_job(1024, 0, 60, &b"send welcome mail"[..]).await?;
//!     println!("queued job {id}");
//!
//!     // Consumer: watch the tube and work jobs.
//!     let consumer = BeanstalkClient::new("localhost", 11300).await?;
//!     consumer.watch_tube("emails").await;
//!     let job = consumer.reserve_job(0).await?;
//!     println!("reserved job {} ({} bytes)", job.id, job.data.len());
//!     consumer.delete_job(job.id).await;
//!
//!     producer.close().await;
//!     consumer.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! Methods returning `bool` never fail: any error — local timeout, transport
//! loss, protocol error, an `UNKNOWN_COMMAND` reply — collapses to `false`,
//! the same value a definitive negative reply produces. [`put_job`] and
//! [`reserve_job`] have no safe fallback, so they propagate every failure as
//! a [`BeanstalkError`] instead.
//!
//! ## Configuration
//!
//! Use [`ConfigBuilder`] to tune timeouts:
//!
//! ```no_run
//! use beanstalk_client::BeanstalkClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), beanstalk_client::BeanstalkError> {
//! let client = BeanstalkClient::with_config(
//!     BeanstalkClient::builder()
//!         .host("queue.example.com")
//!         .port(11300)
//!         .operation_timeout(Duration::from_millis(500))
//!         .connect_timeout(Duration::from_secs(2))
//!         .build(),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`put_job`]: BeanstalkClient::put_job
//! [`reserve_job`]: BeanstalkClient::reserve_job

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod factory;
pub mod future;
pub mod operation;

pub use client::BeanstalkClient;
pub use config::{Config, ConfigBuilder};
pub use connection::Connection;
pub use error::{BeanstalkError, Result};
pub use factory::ConnectionFactory;
pub use future::OperationFuture;
pub use operation::{Job, Operation, Reply};
