//! Payload obfuscation.
//!
//! Frame bodies are XORed with a fixed 16-byte key that repeats from the
//! first byte of the body. The operation is its own inverse.

/// Repeating XOR key.
pub const XOR_KEY: [u8; 16] = [
    0x16, 0x6C, 0x14, 0xE6, 0x2E, 0x91, 0x0D, 0x40, 0x21, 0x35, 0xD5, 0x40, 0x13, 0x03, 0xE9, 0x80,
];

/// XOR `data` in place with the repeating key.
pub fn apply_in_place(data: &mut [u8]) {
    for (byte, key) in data.iter_mut().zip(XOR_KEY.iter().cycle()) {
        *byte ^= key;
    }
}

/// Obfuscate a buffer.
pub fn obfuscate(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    apply_in_place(&mut out);
    out
}

/// Undo [`obfuscate`].
pub fn deobfuscate(data: &[u8]) -> Vec<u8> {
    obfuscate(data)
}
