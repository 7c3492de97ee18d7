//! Wire protocol of the radio's programming interface.

pub mod command;
pub mod crc;
pub mod frame;
pub mod obfuscation;

// Re-export common types
pub use command::{Command, CommandFrame, TIMESTAMP};
pub use frame::{decode_reply, encode_request};
