//! Request/response exchange over a [`Port`].
//!
//! Every command is one blocking exchange: the encoded frame is written, then
//! exactly one reply frame is read within the configured timeout. Only the
//! hello handshake is retried; a failed read or write of any other command
//! surfaces immediately.

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::error::{FrameError, Result, TransportError};
use crate::port::{DEFAULT_TIMEOUT, Port};
use crate::protocol::command::CommandFrame;
use crate::protocol::frame::{self, HEADER_LEN, REPLY_FOOTER_LEN};
use crate::protocol::obfuscation;

/// Number of hello frames sent before giving up.
pub const MAX_HELLO_ATTEMPTS: usize = 5;

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransportConfig {
    /// Deadline for one reply frame, measured from the end of the write.
    pub timeout: Duration,
    /// Hello attempts before reporting [`TransportError::NoResponse`].
    pub hello_attempts: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            hello_attempts: MAX_HELLO_ATTEMPTS,
        }
    }
}

/// Framed request/response channel to the radio.
pub struct Transport<P: Port> {
    port: P,
    config: TransportConfig,
}

impl<P: Port> Transport<P> {
    /// Wrap an opened port and apply the configured timeout to it.
    pub fn new(mut port: P, config: TransportConfig) -> Result<Self> {
        port.set_timeout(config.timeout)?;
        Ok(Self { port, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Borrow the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mutably borrow the underlying port.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Give back the underlying port.
    pub fn into_inner(self) -> P {
        self.port
    }

    /// Send one request body and return the clear reply payload.
    ///
    /// Bytes left in the input buffer by an earlier exchange are discarded
    /// before the request goes out.
    pub fn exchange(&mut self, body: &[u8]) -> std::result::Result<Vec<u8>, TransportError> {
        if let Err(e) = self.port.clear_buffers() {
            debug!("Could not clear buffers before request: {e}");
        }
        self.write_frame(body)?;
        let deadline = Instant::now() + self.config.timeout;
        let reply = self.read_reply(deadline)?;
        trace!("<- {reply:02X?}");
        Ok(reply)
    }

    /// Send one request body without waiting for a reply.
    pub fn send(&mut self, body: &[u8]) -> std::result::Result<(), TransportError> {
        self.write_frame(body)
    }

    /// Send `frame`, waiting for a reply only if its command has one.
    pub fn request(
        &mut self,
        frame: &CommandFrame,
    ) -> std::result::Result<Option<Vec<u8>>, TransportError> {
        let body = frame.build();
        if frame.command().expects_reply() {
            self.exchange(&body).map(Some)
        } else {
            self.send(&body).map(|()| None)
        }
    }

    /// Run the handshake and return the raw hello reply payload.
    ///
    /// Empty replies, timeouts and malformed frames are retried up to
    /// [`TransportConfig::hello_attempts`] times. Channel failures are not.
    pub fn hello(&mut self) -> std::result::Result<Vec<u8>, TransportError> {
        let body = CommandFrame::hello().build();
        let attempts = self.config.hello_attempts.max(1);

        for attempt in 1..=attempts {
            match self.exchange(&body) {
                Ok(reply) if !reply.is_empty() => return Ok(reply),
                Ok(_) => {
                    warn!("Empty hello reply (attempt {attempt}/{attempts})");
                },
                Err(e @ (TransportError::Timeout(_) | TransportError::Protocol(_))) => {
                    warn!("Hello failed (attempt {attempt}/{attempts}): {e}");
                },
                Err(e) => return Err(e),
            }
        }

        Err(TransportError::NoResponse { attempts })
    }

    fn write_frame(&mut self, body: &[u8]) -> std::result::Result<(), TransportError> {
        let frame = frame::encode_request(body)?;
        trace!("-> {body:02X?}");
        self.port.write_all_bytes(&frame)?;
        Ok(())
    }

    fn read_reply(&mut self, deadline: Instant) -> std::result::Result<Vec<u8>, TransportError> {
        let mut header = [0u8; HEADER_LEN];
        let got = self.fill(&mut header, deadline)?;
        if got == 0 {
            return Err(TransportError::Timeout(self.config.timeout));
        }
        if got < HEADER_LEN {
            return Err(FrameError::ShortRead {
                expected: HEADER_LEN,
                actual: got,
            }
            .into());
        }
        let len = frame::parse_header(&header)?;
        let expected = HEADER_LEN + len + REPLY_FOOTER_LEN;

        let mut payload = vec![0u8; len];
        let got = self.fill(&mut payload, deadline)?;
        if got < len {
            return Err(FrameError::ShortRead {
                expected,
                actual: HEADER_LEN + got,
            }
            .into());
        }

        let mut footer = [0u8; REPLY_FOOTER_LEN];
        let got = self.fill(&mut footer, deadline)?;
        if got < REPLY_FOOTER_LEN {
            return Err(FrameError::ShortRead {
                expected,
                actual: HEADER_LEN + len + got,
            }
            .into());
        }
        frame::check_footer(&footer)?;

        obfuscation::apply_in_place(&mut payload);
        Ok(payload)
    }

    /// Read into `buf` until it is full, the port times out or the deadline
    /// passes. Returns the number of bytes read.
    fn fill(&mut self, buf: &mut [u8], deadline: Instant) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() && Instant::now() < deadline {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    break;
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}
