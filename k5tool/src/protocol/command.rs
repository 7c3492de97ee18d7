//! Command bodies.
//!
//! Every body opens with a little-endian opcode followed by a little-endian
//! length constant taken from the radio's command table. Most commands then
//! carry a parameter block and the fixed session timestamp:
//!
//! ```text
//! +--------+----------+-----------------------+-------------+-----------+
//! | opcode | constant | params                | timestamp   | data      |
//! +--------+----------+-----------------------+-------------+-----------+
//! | 2      | 2        | addr:u16 len:u8 flag  | 6A 39 57 64 | variable  |
//! +--------+----------+-----------------------+-------------+-----------+
//! ```
//!
//! Banked commands put the bank number in the `addr` field and prefix the
//! data with the 16-bit offset inside the bank.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::FrameError;

/// Session timestamp sent with every command.
pub const TIMESTAMP: [u8; 4] = [0x6A, 0x39, 0x57, 0x64];

/// Offset of the version string in the hello reply.
pub const HELLO_VERSION_OFFSET: usize = 4;

/// Offset of the data in a read reply.
pub const READ_DATA_OFFSET: usize = 8;

/// Opcode carried by write acknowledgements.
pub const WRITE_ACK_OPCODE: u8 = 0x1E;

/// Request opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Command {
    /// Handshake (0x0514).
    Hello = 0x0514,

    /// Read from the flat 8 KiB region (0x051B).
    ReadEeprom = 0x051B,

    /// Write to the flat 8 KiB region (0x051D).
    WriteEeprom = 0x051D,

    /// Read from the banked region (0x052B).
    ReadExtraEeprom = 0x052B,

    /// Write to the banked region (0x0538).
    WriteExtraEeprom = 0x0538,

    /// Reboot the radio (0x05DD).
    Reset = 0x05DD,
}

impl Command {
    /// Whether the radio answers this command.
    pub fn expects_reply(self) -> bool {
        self != Self::Reset
    }
}

/// Command body builder.
#[derive(Debug, Clone)]
pub struct CommandFrame {
    command: Command,
    length: u16,
    data: Vec<u8>,
}

impl CommandFrame {
    fn new(command: Command, length: u16) -> Self {
        Self {
            command,
            length,
            data: Vec::new(),
        }
    }

    /// Build the hello frame.
    pub fn hello() -> Self {
        let mut frame = Self::new(Command::Hello, 0x0004);
        frame.data.extend_from_slice(&TIMESTAMP);
        frame
    }

    /// Build a flat read of `len` bytes at `offset`.
    #[allow(clippy::unwrap_used)] // Writing to Vec<u8> cannot fail
    pub fn read_eeprom(offset: u16, len: u8) -> Self {
        let mut frame = Self::new(Command::ReadEeprom, 0x0008);
        frame.data.write_u16::<LittleEndian>(offset).unwrap();
        frame.data.push(len);
        frame.data.push(0x00);
        frame.data.extend_from_slice(&TIMESTAMP);
        frame
    }

    /// Build a flat write of `data` at `offset`.
    #[allow(clippy::unwrap_used)] // Writing to Vec<u8> cannot fail
    pub fn write_eeprom(offset: u16, data: &[u8]) -> Result<Self, FrameError> {
        let len = u8::try_from(data.len())
            .ok()
            .filter(|len| len.checked_add(8).is_some())
            .ok_or(FrameError::PayloadTooLarge(data.len()))?;
        let mut frame = Self::new(Command::WriteEeprom, u16::from(len) + 8);
        frame.data.write_u16::<LittleEndian>(offset).unwrap();
        frame.data.push(len);
        frame.data.push(0x01);
        frame.data.extend_from_slice(&TIMESTAMP);
        frame.data.extend_from_slice(data);
        Ok(frame)
    }

    /// Build a banked read of `len` bytes at `offset` inside `bank`.
    #[allow(clippy::unwrap_used)] // Writing to Vec<u8> cannot fail
    pub fn read_extra_eeprom(bank: u16, offset: u16, len: u8) -> Self {
        let mut frame = Self::new(Command::ReadExtraEeprom, 0x0008);
        frame.data.write_u16::<LittleEndian>(bank).unwrap();
        frame.data.push(len);
        frame.data.push(0x00);
        frame.data.extend_from_slice(&TIMESTAMP);
        frame.data.write_u16::<LittleEndian>(offset).unwrap();
        frame
    }

    /// Build a banked write of `data` at `offset` inside `bank`.
    ///
    /// The length field counts the two offset bytes as well.
    #[allow(clippy::unwrap_used)] // Writing to Vec<u8> cannot fail
    pub fn write_extra_eeprom(bank: u16, offset: u16, data: &[u8]) -> Result<Self, FrameError> {
        let len = u8::try_from(data.len() + 2).map_err(|_| FrameError::PayloadTooLarge(data.len()))?;
        let mut frame = Self::new(Command::WriteExtraEeprom, 0x001C);
        frame.data.write_u16::<LittleEndian>(bank).unwrap();
        frame.data.push(len);
        frame.data.push(0x00);
        frame.data.extend_from_slice(&TIMESTAMP);
        frame.data.write_u16::<LittleEndian>(offset).unwrap();
        frame.data.extend_from_slice(data);
        Ok(frame)
    }

    /// Build the reset frame.
    pub fn reset() -> Self {
        Self::new(Command::Reset, 0x0000)
    }

    /// Build the body bytes.
    #[allow(clippy::unwrap_used)] // Writing to Vec<u8> cannot fail
    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.data.len());
        buf.write_u16::<LittleEndian>(self.command as u16).unwrap();
        buf.write_u16::<LittleEndian>(self.length).unwrap();
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Get the command.
    pub fn command(&self) -> Command {
        self.command
    }
}

/// Check a write acknowledgement: opcode `0x1E` with `echo` at bytes 4..6.
pub fn is_write_ack(reply: &[u8], echo: u16) -> bool {
    let [lo, hi] = echo.to_le_bytes();
    reply.first() == Some(&WRITE_ACK_OPCODE) && reply.get(4) == Some(&lo) && reply.get(5) == Some(&hi)
}
