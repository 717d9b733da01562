use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{BeanstalkError, Result};
use crate::future::OperationFuture;
use crate::operation::{Job, Operation, Reply, ReplyLine, MAX_JOB_SIZE};

/// One submitted operation, paired with the cell its reply resolves.
struct Submission {
    operation: Operation,
    reply_sender: oneshot::Sender<Result<Reply>>,
}

enum Request {
    Submit(Submission),
    Shutdown,
}

/// A shared connection to one beanstalkd server.
///
/// Submission is non-blocking: [`handle`](Self::handle) queues the operation
/// and returns a pending [`OperationFuture`]. A background I/O task owns the
/// socket, writes commands, and reads replies in order — beanstalkd answers
/// requests in submission order on a single connection, which is what lets
/// one reader demultiplex replies back to their futures.
pub struct Connection {
    submit_sender: mpsc::UnboundedSender<Request>,
}

impl Connection {
    /// Opens a TCP connection bounded by the config's connect timeout and
    /// starts the I/O task.
    pub async fn open(config: &Config) -> Result<Self> {
        let addr = config.addr();
        let stream = timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| BeanstalkError::Timeout(config.connect_timeout.as_millis() as u64))?
            .map_err(|e| BeanstalkError::Connection(format!("connect to {addr}: {e}")))?;
        stream.set_nodelay(true)?;

        let (submit_sender, submit_receiver) = mpsc::unbounded_channel();
        tokio::spawn(io_task(stream, submit_receiver, addr));

        Ok(Self { submit_sender })
    }

    /// Submits an operation and returns the future for its reply.
    ///
    /// Never blocks; if the I/O task is gone the returned future is already
    /// failed.
    pub fn handle<T>(
        &self,
        operation: Operation,
        decode: fn(Reply) -> Result<T>,
    ) -> OperationFuture<T> {
        let (reply_sender, reply_receiver) = oneshot::channel();
        let submission = Submission {
            operation,
            reply_sender,
        };
        if self
            .submit_sender
            .send(Request::Submit(submission))
            .is_err()
        {
            return OperationFuture::failed(
                BeanstalkError::Connection("connection is closed".to_string()),
                decode,
            );
        }
        OperationFuture::new(reply_receiver, decode)
    }

    /// Asks the I/O task to stop. Idempotent; operations still queued behind
    /// the shutdown fail with a connection error.
    pub fn close(&self) {
        let _ = self.submit_sender.send(Request::Shutdown);
    }
}

async fn io_task(
    stream: TcpStream,
    mut submit_receiver: mpsc::UnboundedReceiver<Request>,
    peer: String,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut write_buf = BytesMut::with_capacity(256);
    let mut line = String::new();

    debug!(peer = %peer, "connection I/O task started");

    while let Some(request) = submit_receiver.recv().await {
        let Request::Submit(Submission {
            operation,
            reply_sender,
        }) = request
        else {
            debug!(peer = %peer, "connection shutdown requested");
            break;
        };

        write_buf.clear();
        operation.encode(&mut write_buf);
        if let Err(err) = write_half.write_all(&write_buf).await {
            warn!(peer = %peer, error = %err, "write failed, closing connection");
            let _ = reply_sender.send(Err(BeanstalkError::Connection(format!(
                "write failed: {err}"
            ))));
            break;
        }

        if matches!(operation, Operation::Quit) {
            // The server closes the session without replying.
            let _ = reply_sender.send(Ok(Reply::Closed));
            break;
        }

        let reply = read_reply(&mut reader, &mut line).await;
        // An oversized payload announcement is fatal too: the payload was
        // never read, so the stream is no longer in sync.
        let fatal = matches!(
            reply,
            Err(BeanstalkError::Io(_))
                | Err(BeanstalkError::Connection(_))
                | Err(BeanstalkError::JobTooBig { .. })
        );
        // The waiter may have timed out and gone away; a late resolution is
        // discarded here.
        let _ = reply_sender.send(reply);
        if fatal {
            warn!(peer = %peer, "read failed, closing connection");
            break;
        }
    }

    // Fail whatever was queued behind the exit so no future waits out its
    // full budget for a reply that cannot come.
    submit_receiver.close();
    while let Ok(request) = submit_receiver.try_recv() {
        if let Request::Submit(submission) = request {
            let _ = submission.reply_sender.send(Err(BeanstalkError::Connection(
                "connection is closed".to_string(),
            )));
        }
    }

    let _ = write_half.shutdown().await;
    debug!(peer = %peer, "connection I/O task finished");
}

async fn read_reply(reader: &mut BufReader<OwnedReadHalf>, line: &mut String) -> Result<Reply> {
    line.clear();
    let n = reader.read_line(line).await?;
    if n == 0 {
        return Err(BeanstalkError::Connection(
            "server closed the connection".to_string(),
        ));
    }

    match ReplyLine::parse(line.trim_end())? {
        ReplyLine::Complete(reply) => Ok(reply),
        ReplyLine::Data { id, len } => {
            // The announced length is server-controlled; refuse anything
            // beyond the protocol's job size limit before allocating.
            if len > MAX_JOB_SIZE {
                return Err(BeanstalkError::JobTooBig { size: len });
            }
            // Payload plus the trailing CRLF.
            let mut data = vec![0u8; len + 2];
            reader.read_exact(&mut data).await?;
            data.truncate(len);
            Ok(Reply::Reserved(Job {
                id,
                data: Bytes::from(data),
            }))
        }
    }
}
