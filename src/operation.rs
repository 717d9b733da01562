use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BeanstalkError, Result};

/// Largest job payload the server accepts, and the largest payload this
/// client will read back from a RESERVED reply.
pub(crate) const MAX_JOB_SIZE: usize = 65536;

/// A unit of work handed out by reserve: the server-assigned id plus the
/// opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: u64,
    pub data: Bytes,
}

/// One protocol request, immutable once constructed.
///
/// An operation carries only the arguments needed to serialize itself; the
/// matching reply is interpreted by the per-kind decoders below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Put {
        priority: u32,
        delay: u32,
        ttr: u32,
        data: Bytes,
    },
    Reserve {
        /// Server-side wait budget in seconds (`reserve-with-timeout`).
        timeout: u64,
    },
    Delete {
        id: u64,
    },
    Release {
        id: u64,
        priority: u32,
        delay: u32,
    },
    Bury {
        id: u64,
        priority: u32,
    },
    Touch {
        id: u64,
    },
    Use {
        tube: String,
    },
    Watch {
        tube: String,
    },
    Ignore {
        tube: String,
    },
    Quit,
}

impl Operation {
    /// Serializes the command into `buf` using the beanstalkd text grammar.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Operation::Put {
                priority,
                delay,
                ttr,
                data,
            } => {
                buf.put_slice(
                    format!("put {priority} {delay} {ttr} {}\r\n", data.len()).as_bytes(),
                );
                buf.put_slice(data);
                buf.put_slice(b"\r\n");
            }
            Operation::Reserve { timeout } => {
                buf.put_slice(format!("reserve-with-timeout {timeout}\r\n").as_bytes());
            }
            Operation::Delete { id } => {
                buf.put_slice(format!("delete {id}\r\n").as_bytes());
            }
            Operation::Release {
                id,
                priority,
                delay,
            } => {
                buf.put_slice(format!("release {id} {priority} {delay}\r\n").as_bytes());
            }
            Operation::Bury { id, priority } => {
                buf.put_slice(format!("bury {id} {priority}\r\n").as_bytes());
            }
            Operation::Touch { id } => {
                buf.put_slice(format!("touch {id}\r\n").as_bytes());
            }
            Operation::Use { tube } => {
                buf.put_slice(format!("use {tube}\r\n").as_bytes());
            }
            Operation::Watch { tube } => {
                buf.put_slice(format!("watch {tube}\r\n").as_bytes());
            }
            Operation::Ignore { tube } => {
                buf.put_slice(format!("ignore {tube}\r\n").as_bytes());
            }
            Operation::Quit => {
                buf.put_slice(b"quit\r\n");
            }
        }
    }
}

/// A parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Inserted(u64),
    /// `BURIED` with an id is a put that landed buried; without one it is a
    /// bury/release outcome.
    Buried(Option<u64>),
    Using(String),
    Watching(u32),
    NotIgnored,
    Reserved(Job),
    Deleted,
    Released,
    Touched,
    NotFound,
    TimedOut,
    DeadlineSoon,
    /// Local acknowledgement of a quit; the server sends nothing back.
    Closed,
}

/// First phase of reply parsing: a reply line is either complete or announces
/// a data chunk that still has to be read off the stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReplyLine {
    Complete(Reply),
    /// `RESERVED <id> <bytes>`; the payload plus trailing CRLF follows.
    Data { id: u64, len: usize },
}

impl ReplyLine {
    pub(crate) fn parse(line: &str) -> Result<ReplyLine> {
        let mut parts = line.split_whitespace();
        let word = parts
            .next()
            .ok_or_else(|| BeanstalkError::Protocol("empty reply line".to_string()))?;

        let reply = match word {
            "INSERTED" => Reply::Inserted(parse_number(parts.next(), line)?),
            "BURIED" => match parts.next() {
                Some(id) => Reply::Buried(Some(parse_field(id, line)?)),
                None => Reply::Buried(None),
            },
            "USING" => {
                let tube = parts
                    .next()
                    .ok_or_else(|| unexpected_line(line))?
                    .to_string();
                Reply::Using(tube)
            }
            "WATCHING" => Reply::Watching(parse_number(parts.next(), line)?),
            "NOT_IGNORED" => Reply::NotIgnored,
            "RESERVED" => {
                let id = parse_number(parts.next(), line)?;
                let len = parse_number(parts.next(), line)?;
                return Ok(ReplyLine::Data { id, len });
            }
            "DELETED" => Reply::Deleted,
            "RELEASED" => Reply::Released,
            "TOUCHED" => Reply::Touched,
            "NOT_FOUND" => Reply::NotFound,
            "TIMED_OUT" => Reply::TimedOut,
            "DEADLINE_SOON" => Reply::DeadlineSoon,
            "UNKNOWN_COMMAND" => return Err(BeanstalkError::UnknownCommand),
            "OUT_OF_MEMORY" | "INTERNAL_ERROR" | "BAD_FORMAT" | "DRAINING" | "EXPECTED_CRLF"
            | "JOB_TOO_BIG" => {
                return Err(BeanstalkError::Protocol(line.to_string()));
            }
            _ => return Err(unexpected_line(line)),
        };

        Ok(ReplyLine::Complete(reply))
    }
}

fn parse_number<T: std::str::FromStr>(field: Option<&str>, line: &str) -> Result<T> {
    parse_field(field.ok_or_else(|| unexpected_line(line))?, line)
}

fn parse_field<T: std::str::FromStr>(field: &str, line: &str) -> Result<T> {
    field.parse().map_err(|_| unexpected_line(line))
}

fn unexpected_line(line: &str) -> BeanstalkError {
    BeanstalkError::Protocol(format!("unexpected reply: {line}"))
}

fn unexpected_reply(reply: Reply) -> BeanstalkError {
    BeanstalkError::Protocol(format!("unexpected reply: {reply:?}"))
}

// Per-kind reply decoders, attached to futures at submission time. The
// boolean decoders map definitive negative replies (NOT_FOUND, NOT_IGNORED)
// to false; everything off-script is an error.

pub(crate) fn decode_put(reply: Reply) -> Result<u64> {
    match reply {
        Reply::Inserted(id) => Ok(id),
        // A put that landed buried still created the job.
        Reply::Buried(Some(id)) => Ok(id),
        other => Err(unexpected_reply(other)),
    }
}

pub(crate) fn decode_reserve(reply: Reply) -> Result<Job> {
    match reply {
        Reply::Reserved(job) => Ok(job),
        Reply::TimedOut => Err(BeanstalkError::ReserveTimedOut),
        Reply::DeadlineSoon => Err(BeanstalkError::DeadlineSoon),
        other => Err(unexpected_reply(other)),
    }
}

pub(crate) fn decode_use(reply: Reply) -> Result<bool> {
    match reply {
        Reply::Using(_) => Ok(true),
        other => Err(unexpected_reply(other)),
    }
}

pub(crate) fn decode_watch(reply: Reply) -> Result<bool> {
    match reply {
        Reply::Watching(_) => Ok(true),
        other => Err(unexpected_reply(other)),
    }
}

pub(crate) fn decode_ignore(reply: Reply) -> Result<bool> {
    match reply {
        Reply::Watching(_) => Ok(true),
        Reply::NotIgnored => Ok(false),
        other => Err(unexpected_reply(other)),
    }
}

pub(crate) fn decode_delete(reply: Reply) -> Result<bool> {
    match reply {
        Reply::Deleted => Ok(true),
        Reply::NotFound => Ok(false),
        other => Err(unexpected_reply(other)),
    }
}

pub(crate) fn decode_touch(reply: Reply) -> Result<bool> {
    match reply {
        Reply::Touched => Ok(true),
        Reply::NotFound => Ok(false),
        other => Err(unexpected_reply(other)),
    }
}

pub(crate) fn decode_release(reply: Reply) -> Result<bool> {
    match reply {
        Reply::Released => Ok(true),
        // The server buried the job instead of releasing it.
        Reply::Buried(_) => Ok(false),
        Reply::NotFound => Ok(false),
        other => Err(unexpected_reply(other)),
    }
}

pub(crate) fn decode_bury(reply: Reply) -> Result<bool> {
    match reply {
        Reply::Buried(_) => Ok(true),
        Reply::NotFound => Ok(false),
        other => Err(unexpected_reply(other)),
    }
}

pub(crate) fn decode_quit(reply: Reply) -> Result<bool> {
    match reply {
        Reply::Closed => Ok(true),
        other => Err(unexpected_reply(other)),
    }
}
