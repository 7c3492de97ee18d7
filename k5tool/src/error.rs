//! Error types for k5tool.
//!
//! Each layer has its own error enum so callers can tell a recoverable
//! precondition ([`CapabilityError`]) apart from a hard fault on the wire
//! ([`TransportError`], [`TransferError`]). [`Error`] gathers all of them
//! for code that does not care.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::device::FirmwareVariant;
use crate::memory::CapacityTier;

/// Result type for k5tool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed frame envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Start marker or reserved header byte did not match.
    #[error("bad frame header: {0:02X?}")]
    BadHeader([u8; 4]),

    /// End marker did not match.
    #[error("bad frame footer: {0:02X?}")]
    BadFooter([u8; 4]),

    /// Fewer bytes than the envelope declares.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes the envelope requires.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Request body does not fit the one-byte length field.
    #[error("payload too large for a frame: {0} bytes")]
    PayloadTooLarge(usize),
}

/// Failure of a single request/response exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The serial channel failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No reply arrived within the exchange timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// A reply arrived but its envelope was malformed.
    #[error("protocol error: {0}")]
    Protocol(#[from] FrameError),

    /// The device never answered the handshake.
    #[error("no response from radio after {attempts} hello attempts")]
    NoResponse {
        /// Number of hello frames sent.
        attempts: usize,
    },
}

/// An operation needs more than the connected device offers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Firmware variant too weak for the operation.
    #[error("requires {required} firmware, device runs {actual}")]
    WrongVariant {
        /// Minimum variant needed.
        required: FirmwareVariant,
        /// Variant detected on the device.
        actual: FirmwareVariant,
    },

    /// EEPROM too small for the operation.
    #[error("requires {required} of EEPROM, device has {actual}")]
    InsufficientCapacity {
        /// Minimum tier needed.
        required: CapacityTier,
        /// Tier detected on the device.
        actual: CapacityTier,
    },
}

/// Failure while moving a buffer page by page.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Exchange for one page failed.
    #[error("page {page}: {source}")]
    Transport {
        /// Zero-based page index.
        page: usize,
        /// Underlying exchange failure.
        #[source]
        source: TransportError,
    },

    /// Write acknowledgement did not match the request.
    #[error(
        "page {page} not acknowledged: expected opcode 0x{expected_opcode:02X} echoing 0x{expected_echo:04X}, got {reply:02X?}"
    )]
    Unacknowledged {
        /// Zero-based page index.
        page: usize,
        /// Opcode the ack must carry.
        expected_opcode: u8,
        /// Address field the ack must echo.
        expected_echo: u16,
        /// First bytes of the actual reply.
        reply: Vec<u8>,
    },

    /// Read reply carried fewer data bytes than requested.
    #[error("page {page} returned {actual} of {expected} bytes")]
    ShortPage {
        /// Zero-based page index.
        page: usize,
        /// Bytes requested.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// Range does not fit the detected EEPROM.
    #[error("range 0x{start:05X}+0x{len:X} exceeds EEPROM capacity 0x{capacity:05X}")]
    OutOfRange {
        /// Logical start address.
        start: u32,
        /// Length in bytes.
        len: usize,
        /// Capacity of the address space.
        capacity: u32,
    },

    /// The progress callback asked to stop.
    #[error("cancelled after {completed_pages} page(s)")]
    Cancelled {
        /// Pages fully transferred before stopping.
        completed_pages: usize,
    },
}

impl TransferError {
    /// Underlying transport error, if the failure came from the wire.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A program sequence stopped at a failing step.
#[derive(Debug, Error)]
#[error("step {index} ({step}) failed after {completed} completed step(s): {source}")]
pub struct SequenceError {
    /// Zero-based index of the failing step.
    pub index: usize,
    /// Name of the failing step.
    pub step: String,
    /// Steps that finished before the failure.
    pub completed: usize,
    /// Why the step failed.
    #[source]
    pub source: Box<Error>,
}

/// Error type for k5tool operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error outside of an exchange (opening, closing, clearing).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Malformed frame.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Exchange failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Capability gate failure.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Page transfer failure.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Program sequence failure.
    #[error(transparent)]
    Sequence(#[from] Box<SequenceError>),

    /// Caller-supplied payload is unusable.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<SequenceError> for Error {
    fn from(err: SequenceError) -> Self {
        Self::Sequence(Box::new(err))
    }
}
