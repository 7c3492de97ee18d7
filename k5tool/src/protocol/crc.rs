//! CRC16-XMODEM checksum.

/// CRC16-XMODEM (polynomial 0x1021, initial value 0, no reflection).
pub fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc16_xmodem(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_empty() {
        assert_eq!(crc16_xmodem(&[]), 0);
    }

    #[test]
    fn test_hello_body() {
        let body = [0x14, 0x05, 0x04, 0x00, 0x6A, 0x39, 0x57, 0x64];
        assert_eq!(crc16_xmodem(&body), 0x9C98);
    }
}
