use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::error::{BeanstalkError, Result};
use crate::operation::Reply;

/// Single-assignment result cell for one submitted operation.
///
/// The connection's I/O task resolves the cell at most once, when the matching
/// reply arrives. [`wait`](Self::wait) consumes the future; a wait that
/// expires leaves any late resolution unobserved, and the I/O task discards it
/// silently.
pub struct OperationFuture<T> {
    receiver: oneshot::Receiver<Result<Reply>>,
    decode: fn(Reply) -> Result<T>,
}

impl<T> OperationFuture<T> {
    pub(crate) fn new(
        receiver: oneshot::Receiver<Result<Reply>>,
        decode: fn(Reply) -> Result<T>,
    ) -> Self {
        Self { receiver, decode }
    }

    /// An already-failed future, for submissions rejected before reaching the
    /// transport.
    pub(crate) fn failed(error: BeanstalkError, decode: fn(Reply) -> Result<T>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(Err(error));
        Self { receiver, decode }
    }

    /// Waits up to `budget` for the reply and decodes it into the operation's
    /// result type.
    pub async fn wait(self, budget: Duration) -> Result<T> {
        match timeout(budget, self.receiver).await {
            Err(_) => Err(BeanstalkError::Timeout(budget.as_millis() as u64)),
            Ok(Err(_)) => Err(BeanstalkError::Connection(
                "connection dropped before replying".to_string(),
            )),
            Ok(Ok(reply)) => (self.decode)(reply?),
        }
    }
}
