//! One-shot registration with the cloud relay.
//!
//! The device reports its GUID, PIN and listening port so the companion app
//! can find it. The request is sent once; the response is read only up to the
//! end of its headers. There is no retry: pairing can be repeated by going
//! back through the portal.

use core::fmt::Write as _;

use alloc::string::String;
use embedded_io::{Read, Write};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use super::identity::{Guid, Pin};
use crate::config::RelayConfig;

/// Upper bound on response header bytes read before giving up
pub const MAX_HEADER_LEN: usize = 2048;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    #[error("could not connect to the relay")]
    Connect,
    #[error("relay connection failed mid-request")]
    Io,
    #[error("device identity is not usable for registration")]
    InvalidIdentity,
    #[error("relay response was not valid HTTP")]
    MalformedResponse,
}

/// Opens the secure transport to the relay (TLS on the device).
pub trait RelayConnector {
    type Connection: Read + Write;

    fn connect(&mut self, host: &str, port: u16) -> Result<Self::Connection, RelayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayResponse {
    /// Status code from the status line, if it parsed
    pub status: Option<u16>,
    /// Bytes read up to and including the blank line
    pub header_bytes: usize,
}

pub struct RelayClient<'a> {
    config: RelayConfig<'a>,
}

impl<'a> RelayClient<'a> {
    pub fn new(config: RelayConfig<'a>) -> Self {
        Self { config }
    }

    pub fn register<C: RelayConnector>(
        &self,
        connector: &mut C,
        guid: &Guid,
        pin: &Pin,
        listen_port: u16,
    ) -> Result<RelayResponse, RelayError> {
        let request = self.request(guid, pin, listen_port)?;

        info!("Registering with relay {}:{}", self.config.host, self.config.port);
        let mut connection = connector.connect(self.config.host, self.config.port)?;

        send_all(&mut connection, request.as_bytes())?;
        let response = read_headers(&mut connection)?;

        match response.status {
            Some(status) => info!("Relay answered {}", status),
            None => warn!("Relay answered with an unparsable status line"),
        }
        Ok(response)
    }

    fn request(&self, guid: &Guid, pin: &Pin, listen_port: u16) -> Result<String, RelayError> {
        let guid_ok = guid.as_bytes().iter().all(u8::is_ascii_hexdigit);
        let pin_ok = pin.as_bytes().iter().all(u8::is_ascii_digit);
        if !guid_ok || !pin_ok {
            return Err(RelayError::InvalidIdentity);
        }

        let mut request = String::new();
        write!(
            request,
            "GET {}?guid={}&pin={}&port={} HTTP/1.1\r\n\
             Host: {}\r\n\
             User-Agent: {}\r\n\
             Connection: close\r\n\r\n",
            self.config.path,
            guid.as_str(),
            pin.as_str(),
            listen_port,
            self.config.host,
            self.config.user_agent,
        )
        .map_err(|_| RelayError::Io)?;

        Ok(request)
    }
}

fn send_all<W: Write>(connection: &mut W, mut data: &[u8]) -> Result<(), RelayError> {
    while !data.is_empty() {
        match connection.write(data) {
            Ok(0) => {
                warn!("Relay connection closed while sending");
                return Err(RelayError::Io);
            }
            Ok(written) => data = &data[written..],
            Err(e) => {
                warn!("Relay write failed: {:?}", e);
                return Err(RelayError::Io);
            }
        }
    }

    connection.flush().map_err(|e| {
        warn!("Relay flush failed: {:?}", e);
        RelayError::Io
    })
}

fn read_headers<R: Read>(connection: &mut R) -> Result<RelayResponse, RelayError> {
    let mut buf = [0u8; MAX_HEADER_LEN];
    let mut filled = 0;

    loop {
        if filled == buf.len() {
            warn!("Relay headers exceed {} bytes", MAX_HEADER_LEN);
            return Err(RelayError::MalformedResponse);
        }

        let read = connection.read(&mut buf[filled..]).map_err(|e| {
            warn!("Relay read failed: {:?}", e);
            RelayError::Io
        })?;
        if read == 0 {
            warn!("Relay closed the connection before the end of headers");
            return Err(RelayError::MalformedResponse);
        }

        // Search from slightly before the new bytes in case the marker straddles reads.
        let from = filled.saturating_sub(3);
        filled += read;

        if let Some(at) = buf[from..filled].windows(4).position(|w| w == b"\r\n\r\n") {
            let header_bytes = from + at + 4;
            debug!("Read {} header bytes from relay", header_bytes);
            return Ok(RelayResponse {
                status: parse_status(&buf[..header_bytes]),
                header_bytes,
            });
        }
    }
}

/// `HTTP/1.1 200 OK` gives `Some(200)`.
fn parse_status(headers: &[u8]) -> Option<u16> {
    let line_end = headers.iter().position(|&b| b == b'\r')?;
    let line = core::str::from_utf8(&headers[..line_end]).ok()?;

    let mut parts = line.split(' ');
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}
