//! TCP client for the cabinet's SpiceAPI-style control endpoint.
//!
//! Framing: every request is one compact JSON object followed by a NUL byte;
//! every response is one JSON object followed by a NUL byte. When a password
//! is configured the whole byte stream (both directions) is RC4-encrypted
//! with the password as key, using one continuous keystream per connection.
//!
//! Request:  `{"id":7,"module":"iidx","function":"ticker_get","params":[]}`
//! Response: `{"id":7,"errors":[],"data":["  WELCOME  "]}`

#![allow(missing_docs)]

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{Result, SegError};
use crate::remote::rc4::Rc4;
use crate::remote::{TickerConnection, TickerConnector};

/// Upper bound on a single response frame.
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
const READ_CHUNK: usize = 4096;

const TICKER_MODULE: &str = "iidx";
const TICKER_FUNCTION: &str = "ticker_get";

/// Endpoint and timeout settings for one cabinet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiceApiConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
}

impl SpiceApiConfig {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn fresh_cipher(&self) -> Option<Rc4> {
        (!self.password.is_empty()).then(|| Rc4::new(self.password.as_bytes()))
    }
}

/// Produces [`SpiceApiConnection`]s.
#[derive(Debug, Clone)]
pub struct SpiceApiConnector {
    config: SpiceApiConfig,
}

impl SpiceApiConnector {
    #[must_use]
    pub const fn new(config: SpiceApiConfig) -> Self {
        Self { config }
    }
}

impl TickerConnector for SpiceApiConnector {
    type Connection = SpiceApiConnection;

    fn connect(&mut self) -> Result<Self::Connection> {
        SpiceApiConnection::open(self.config.clone())
    }

    fn endpoint(&self) -> String {
        self.config.endpoint()
    }
}

/// A live, possibly encrypted, request/response session.
#[derive(Debug)]
pub struct SpiceApiConnection {
    config: SpiceApiConfig,
    stream: TcpStream,
    cipher: Option<Rc4>,
    next_id: u64,
    pending: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    module: &'a str,
    function: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    errors: Vec<Value>,
    #[serde(default)]
    data: Vec<Value>,
}

impl SpiceApiConnection {
    /// Resolve and connect, trying every resolved address within the timeout.
    pub fn open(config: SpiceApiConfig) -> Result<Self> {
        let stream = open_stream(&config)?;
        let cipher = config.fresh_cipher();
        Ok(Self {
            config,
            stream,
            cipher,
            next_id: 1,
            pending: Vec::new(),
        })
    }

    fn request(&mut self, module: &str, function: &str) -> Result<Vec<Value>> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let frame = encode_request(
            &Request {
                id,
                module,
                function,
                params: Vec::new(),
            },
            self.cipher.as_mut(),
        )?;
        self.stream
            .write_all(&frame)
            .and_then(|()| self.stream.flush())
            .map_err(|e| SegError::Fetch {
                details: format!("send failed: {e}"),
            })?;

        let raw = self.read_frame()?;
        parse_response(&raw, id)
    }

    fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(pos) = memchr::memchr(0, &self.pending) {
                let mut frame: Vec<u8> = self.pending.drain(..=pos).collect();
                frame.pop();
                return Ok(frame);
            }
            if self.pending.len() > MAX_RESPONSE_BYTES {
                self.pending.clear();
                return Err(SegError::Protocol {
                    details: format!("response exceeds {MAX_RESPONSE_BYTES} bytes"),
                });
            }

            let n = match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(SegError::Fetch {
                        details: "connection closed by peer".to_string(),
                    });
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(SegError::Fetch {
                        details: format!("receive failed: {e}"),
                    });
                }
            };
            let received = &mut chunk[..n];
            if let Some(cipher) = self.cipher.as_mut() {
                cipher.apply(received);
            }
            self.pending.extend_from_slice(received);
        }
    }
}

impl TickerConnection for SpiceApiConnection {
    fn fetch_ticker_text(&mut self) -> Result<String> {
        let data = self.request(TICKER_MODULE, TICKER_FUNCTION)?;
        match data.into_iter().next() {
            Some(Value::String(text)) => Ok(text),
            Some(other) => Err(SegError::Protocol {
                details: format!("ticker payload is not a string: {other}"),
            }),
            None => Err(SegError::Protocol {
                details: "ticker response carried no data".to_string(),
            }),
        }
    }

    fn reconnect(&mut self) -> Result<()> {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        self.stream = open_stream(&self.config)?;
        self.cipher = self.config.fresh_cipher();
        self.pending.clear();
        Ok(())
    }
}

fn open_stream(config: &SpiceApiConfig) -> Result<TcpStream> {
    let endpoint = config.endpoint();
    let addrs: Vec<SocketAddr> = (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map_err(|e| SegError::Connect {
            endpoint: endpoint.clone(),
            details: format!("resolve failed: {e}"),
        })?
        .collect();

    let mut last_err = None;
    for addr in &addrs {
        match TcpStream::connect_timeout(addr, config.connect_timeout) {
            Ok(stream) => {
                let configure = stream
                    .set_read_timeout(Some(config.io_timeout))
                    .and_then(|()| stream.set_write_timeout(Some(config.io_timeout)))
                    .and_then(|()| stream.set_nodelay(true));
                if let Err(e) = configure {
                    last_err = Some(e);
                    continue;
                }
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(SegError::Connect {
        endpoint,
        details: last_err.map_or_else(
            || "host resolved to no addresses".to_string(),
            |e| e.to_string(),
        ),
    })
}

fn encode_request(request: &Request<'_>, cipher: Option<&mut Rc4>) -> Result<Vec<u8>> {
    let mut frame = serde_json::to_vec(request)?;
    frame.push(0);
    if let Some(cipher) = cipher {
        cipher.apply(&mut frame);
    }
    Ok(frame)
}

fn parse_response(raw: &[u8], expected_id: u64) -> Result<Vec<Value>> {
    let response: Response = serde_json::from_slice(raw).map_err(|e| SegError::Protocol {
        details: format!("malformed response: {e}"),
    })?;
    if response.id != expected_id {
        return Err(SegError::Protocol {
            details: format!(
                "response id {} does not match request id {expected_id}",
                response.id
            ),
        });
    }
    if !response.errors.is_empty() {
        let joined = response
            .errors
            .iter()
            .map(|e| e.as_str().map_or_else(|| e.to_string(), str::to_string))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SegError::Fetch { details: joined });
    }
    Ok(response.data)
}
