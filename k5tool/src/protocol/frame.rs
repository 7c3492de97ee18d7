//! Frame envelope.
//!
//! ## Request
//!
//! ```text
//! +-------+--------+------+-------------------------------+-------+
//! | AB CD | length | 0x00 | xor(body || crc16_le(body))   | DC BA |
//! +-------+--------+------+-------------------------------+-------+
//! | 2     | 1      | 1    | length + 2                    | 2     |
//! +-------+--------+------+-------------------------------+-------+
//! ```
//!
//! ## Reply
//!
//! ```text
//! +-------+--------+------+------------------+----------+-------+
//! | AB CD | length | 0x00 | xor(payload)     | crc (2)  | DC BA |
//! +-------+--------+------+------------------+----------+-------+
//! ```
//!
//! The reply checksum bytes are not verified.

use crate::error::FrameError;
use crate::protocol::crc::crc16_xmodem;
use crate::protocol::obfuscation;

/// Start-of-frame marker.
pub const FRAME_START: [u8; 2] = [0xAB, 0xCD];

/// End-of-frame marker.
pub const FRAME_END: [u8; 2] = [0xDC, 0xBA];

/// Header length (marker, length, reserved).
pub const HEADER_LEN: usize = 4;

/// Reply footer length (checksum plus end marker).
pub const REPLY_FOOTER_LEN: usize = 4;

/// Largest body the one-byte length field can describe.
pub const MAX_BODY_LEN: usize = u8::MAX as usize;

/// Encode a request body into a complete wire frame.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_request(body: &[u8]) -> Result<Vec<u8>, FrameError> {
    if body.len() > MAX_BODY_LEN {
        return Err(FrameError::PayloadTooLarge(body.len()));
    }

    let mut buf = Vec::with_capacity(HEADER_LEN + body.len() + 2 + FRAME_END.len());
    buf.extend_from_slice(&FRAME_START);
    buf.push(body.len() as u8);
    buf.push(0x00);

    let crc = crc16_xmodem(body);
    let start = buf.len();
    buf.extend_from_slice(body);
    buf.extend_from_slice(&crc.to_le_bytes());
    obfuscation::apply_in_place(&mut buf[start..]);

    buf.extend_from_slice(&FRAME_END);
    Ok(buf)
}

/// Validate a reply header and return the declared payload length.
pub fn parse_header(header: &[u8; HEADER_LEN]) -> Result<usize, FrameError> {
    if header[..2] != FRAME_START || header[3] != 0x00 {
        return Err(FrameError::BadHeader(*header));
    }
    Ok(usize::from(header[2]))
}

/// Validate a reply footer.
pub fn check_footer(footer: &[u8; REPLY_FOOTER_LEN]) -> Result<(), FrameError> {
    if footer[2..] != FRAME_END {
        return Err(FrameError::BadFooter(*footer));
    }
    Ok(())
}

/// Decode a complete reply frame and return the clear payload.
///
/// Bytes after the footer are ignored.
pub fn decode_reply(bytes: &[u8]) -> Result<Vec<u8>, FrameError> {
    let header: &[u8; HEADER_LEN] =
        bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or(FrameError::ShortRead {
                expected: HEADER_LEN,
                actual: bytes.len(),
            })?;
    let len = parse_header(header)?;

    let total = HEADER_LEN + len + REPLY_FOOTER_LEN;
    if bytes.len() < total {
        return Err(FrameError::ShortRead {
            expected: total,
            actual: bytes.len(),
        });
    }

    let footer: &[u8; REPLY_FOOTER_LEN] = bytes[HEADER_LEN + len..total]
        .try_into()
        .map_err(|_| FrameError::ShortRead {
            expected: total,
            actual: bytes.len(),
        })?;
    check_footer(footer)?;

    Ok(obfuscation::deobfuscate(&bytes[HEADER_LEN..HEADER_LEN + len]))
}

/// Encode a reply the way the radio does. Used by the simulated radio.
#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn encode_reply(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len() + REPLY_FOOTER_LEN);
    buf.extend_from_slice(&FRAME_START);
    buf.push(payload.len() as u8);
    buf.push(0x00);
    let start = buf.len();
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&crc16_xmodem(payload).to_le_bytes());
    obfuscation::apply_in_place(&mut buf[start..]);
    buf.extend_from_slice(&FRAME_END);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_BODY: [u8; 8] = [0x14, 0x05, 0x04, 0x00, 0x6A, 0x39, 0x57, 0x64];

    #[test]
    fn test_encode_hello() {
        let frame = encode_request(&HELLO_BODY).unwrap();
        assert_eq!(
            frame,
            vec![
                0xAB, 0xCD, 0x08, 0x00, 0x02, 0x69, 0x10, 0xE6, 0x44, 0xA8, 0x5A, 0x24, 0xB9, 0xA9,
                0xDC, 0xBA,
            ]
        );
    }

    #[test]
    fn test_encode_length_excludes_crc() {
        let frame = encode_request(&[1, 2, 3]).unwrap();
        assert_eq!(frame[2], 3);
        assert_eq!(frame.len(), HEADER_LEN + 3 + 2 + 2);
    }

    #[test]
    fn test_encode_too_large() {
        let body = vec![0u8; 256];
        assert_eq!(
            encode_request(&body),
            Err(FrameError::PayloadTooLarge(256))
        );
        assert!(encode_request(&[0u8; 255]).is_ok());
    }

    #[test]
    fn test_decode_reply() {
        let payload = b"\x15\x05\x10\x00LOSEHU118K\0\0\0\0\0\0".to_vec();
        let frame = encode_reply(&payload);
        assert_eq!(decode_reply(&frame).unwrap(), payload);
    }

    #[test]
    fn test_decode_ignores_checksum() {
        let mut frame = encode_reply(&[0x1E, 0x05, 0x00, 0x00, 0x10, 0x00]);
        let crc_pos = frame.len() - 4;
        frame[crc_pos] ^= 0xFF;
        assert!(decode_reply(&frame).is_ok());
    }

    #[test]
    fn test_decode_bad_header() {
        let mut frame = encode_reply(&[1, 2, 3]);
        frame[0] = 0xAA;
        assert!(matches!(decode_reply(&frame), Err(FrameError::BadHeader(_))));

        let mut frame = encode_reply(&[1, 2, 3]);
        frame[3] = 0x01;
        assert!(matches!(decode_reply(&frame), Err(FrameError::BadHeader(_))));
    }

    #[test]
    fn test_decode_bad_footer() {
        let mut frame = encode_reply(&[1, 2, 3]);
        let last = frame.len() - 1;
        frame[last] = 0x00;
        assert!(matches!(decode_reply(&frame), Err(FrameError::BadFooter(_))));
    }

    #[test]
    fn test_decode_short() {
        let frame = encode_reply(&[1, 2, 3, 4]);
        assert_eq!(
            decode_reply(&frame[..6]),
            Err(FrameError::ShortRead {
                expected: 12,
                actual: 6,
            })
        );
        assert!(matches!(
            decode_reply(&frame[..2]),
            Err(FrameError::ShortRead { .. })
        ));
    }

    #[test]
    fn test_decode_empty_payload() {
        let frame = encode_reply(&[]);
        assert!(decode_reply(&frame).unwrap().is_empty());
    }
}
