//! Pooled client for a Redis-protocol server
//!
//! Connections are plain blocking `TcpStream`s. Idle connections wait in a
//! bounded lock-free queue; a caller pops one (or dials a fresh one when the
//! queue is empty), runs a single request/reply round trip and pushes it
//! back. A connection that saw an I/O or framing error is dropped instead
//! of being returned, so the next caller starts from a clean stream.
//!
//! Store calls are synchronous, so the client is blocking too. Async callers
//! run repository work on blocking threads (`spawn_blocking` in the binary).

use super::resp::{ParseError, RespParser, RespValue};
use super::SummaryStore;
use crate::error::{Result, SummaryError};
use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;
use std::io::{Error as IoError, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings for [`RedisStore`]
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// `host:port` of the server
    pub addr: String,
    /// Maximum number of idle connections kept for reuse
    pub pool_size: usize,
    /// Timeout for establishing a new connection
    pub connect_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        RedisStoreConfig {
            addr: "127.0.0.1:6379".to_string(),
            pool_size: 16,
            connect_timeout: Duration::from_millis(1000),
        }
    }
}

struct Connection {
    stream: TcpStream,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl Connection {
    fn connect(config: &RedisStoreConfig) -> Result<Self> {
        let mut last_err =
            IoError::new(ErrorKind::AddrNotAvailable, format!("no address for {}", config.addr));
        for addr in config.addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, config.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    debug!(addr = %addr, "opened store connection");
                    return Ok(Connection {
                        stream,
                        read_buf: BytesMut::with_capacity(4096),
                        write_buf: BytesMut::with_capacity(256),
                    });
                }
                Err(e) => last_err = e,
            }
        }
        Err(SummaryError::Io(last_err))
    }

    fn request(&mut self, parts: &[&str]) -> Result<RespValue> {
        self.write_buf.clear();
        RespParser::encode_command(parts, &mut self.write_buf);
        self.stream.write_all(&self.write_buf)?;

        let mut chunk = [0u8; 4096];
        loop {
            match RespParser::parse(&self.read_buf) {
                Ok((value, consumed)) => {
                    let _ = self.read_buf.split_to(consumed);
                    return Ok(value);
                }
                Err(ParseError::Incomplete) => {
                    let n = self.stream.read(&mut chunk)?;
                    if n == 0 {
                        return Err(SummaryError::Io(IoError::new(
                            ErrorKind::UnexpectedEof,
                            "store closed the connection",
                        )));
                    }
                    self.read_buf.extend_from_slice(&chunk[..n]);
                }
                Err(ParseError::Invalid(msg)) => return Err(SummaryError::Protocol(msg)),
            }
        }
    }
}

/// [`SummaryStore`] backed by a Redis-protocol server
pub struct RedisStore {
    config: RedisStoreConfig,
    idle: ArrayQueue<Connection>,
}

impl RedisStore {
    /// Create a client. No connection is opened until the first request.
    pub fn new(config: RedisStoreConfig) -> Self {
        let idle = ArrayQueue::new(config.pool_size.max(1));
        RedisStore { config, idle }
    }

    /// Open one connection eagerly so misconfiguration surfaces at startup
    pub fn connect(config: RedisStoreConfig) -> Result<Self> {
        let store = Self::new(config);
        let conn = Connection::connect(&store.config)?;
        let _ = store.idle.push(conn);
        Ok(store)
    }

    /// Number of idle pooled connections
    pub fn idle_connections(&self) -> usize {
        self.idle.len()
    }

    fn execute(&self, parts: &[&str]) -> Result<RespValue> {
        let mut conn = match self.idle.pop() {
            Some(conn) => conn,
            None => Connection::connect(&self.config)?,
        };

        match conn.request(parts) {
            Ok(reply) => {
                // Full pool: the connection is simply closed.
                let _ = self.idle.push(conn);
                match reply {
                    RespValue::Error(msg) => Err(SummaryError::Store(msg)),
                    other => Ok(other),
                }
            }
            Err(e) => {
                warn!(command = parts[0], error = %e, "discarding store connection");
                Err(e)
            }
        }
    }

    fn execute_integer(&self, parts: &[&str]) -> Result<i64> {
        match self.execute(parts)? {
            RespValue::Integer(n) => Ok(n),
            other => Err(unexpected(parts[0], &other)),
        }
    }

    fn execute_bulk(&self, parts: &[&str]) -> Result<Option<String>> {
        match self.execute(parts)? {
            RespValue::BulkString(None) => Ok(None),
            RespValue::BulkString(Some(data)) => String::from_utf8(data)
                .map(Some)
                .map_err(|_| SummaryError::Protocol(format!("{} reply is not UTF-8", parts[0]))),
            other => Err(unexpected(parts[0], &other)),
        }
    }
}

fn unexpected(command: &str, reply: &RespValue) -> SummaryError {
    SummaryError::Protocol(format!("unexpected reply to {}: {:?}", command, reply))
}

impl SummaryStore for RedisStore {
    fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self.execute_integer(&["SISMEMBER", key, member])? == 1)
    }

    fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self.execute_integer(&["SADD", key, member])? > 0)
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.execute_bulk(&["HGET", key, field])
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        Ok(self.execute_integer(&["HSET", key, field, value])? > 0)
    }

    fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        self.execute_integer(&["HINCRBY", key, field, &delta.to_string()])
    }

    fn hincrbyfloat(&self, key: &str, field: &str, delta: f64) -> Result<f64> {
        let reply = self
            .execute_bulk(&["HINCRBYFLOAT", key, field, &delta.to_string()])?
            .ok_or_else(|| SummaryError::Protocol("HINCRBYFLOAT returned nil".into()))?;
        reply
            .parse()
            .map_err(|_| SummaryError::Protocol(format!("HINCRBYFLOAT returned {:?}", reply)))
    }
}
