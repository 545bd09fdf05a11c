//! Fingerprint module checksum algorithm
//!
//! From the module datasheet:
//! 1. Take every byte after the device address: packet identifier,
//!    length field and package contents
//! 2. Sum them as unsigned bytes
//! 3. Overflowing bits are dropped; the result is sent high byte first

use tracing::trace;

/// Calculate the 16-bit wraparound sum of `bytes`
///
/// # Examples
///
/// ```
/// use fingerlink_core::checksum;
///
/// // Packet identifier, length and VerifyPassword instruction
/// assert_eq!(checksum::sum16(&[0x01, 0x00, 0x07, 0x13]), 0x001B);
/// ```
pub fn sum16(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, byte| sum.wrapping_add(u16::from(*byte)))
}

/// Calculate the checksum field of an outgoing command frame
///
/// Command frames are short enough that only the low byte of the sum is
/// significant, so the high byte is always `0x00`.
///
/// # Algorithm
///
/// ```text
/// 1. sum = Σ bytes (mod 256)
/// 2. return [0x00, sum]
/// ```
pub fn calculate(bytes: &[u8]) -> [u8; 2] {
    let sum = bytes
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));

    trace!(
        len = bytes.len(),
        checksum = %format_args!("0x00{:02X}", sum),
        "Calculated checksum"
    );

    [0x00, sum]
}

/// Calculate the full big-endian 16-bit checksum field
///
/// Used for data frames, whose payload routinely sums past one byte, and for
/// checking frames sent by the module.
pub fn calculate_wide(bytes: &[u8]) -> [u8; 2] {
    sum16(bytes).to_be_bytes()
}

/// Verify a received checksum field against the covered bytes
pub fn verify(bytes: &[u8], expected: u16) -> bool {
    sum16(bytes) == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checksum_verify_password_command() {
        // PID, length 0x0007, VerifyPassword, password 0
        let covered = [0x01, 0x00, 0x07, 0x13, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(calculate(&covered), [0x00, 0x1B]);
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(calculate(&[]), [0x00, 0x00]);
        assert_eq!(sum16(&[]), 0);
    }

    #[test]
    fn test_checksum_wraps_low_byte() {
        // 0xFF + 0x02 = 0x101, low byte 0x01
        assert_eq!(calculate(&[0xFF, 0x02]), [0x00, 0x01]);
        assert_eq!(calculate_wide(&[0xFF, 0x02]), [0x01, 0x01]);
    }

    #[test]
    fn test_checksum_verify() {
        let covered = [0x07, 0x00, 0x03, 0x00];
        assert!(verify(&covered, 0x000A));
        assert!(!verify(&covered, 0x000B));
    }

    #[test]
    fn test_checksum_large_payload() {
        let payload = vec![0xFF; 1000];
        assert_eq!(sum16(&payload), (0xFFu32 * 1000 % 0x1_0000) as u16);
    }

    proptest! {
        #[test]
        fn prop_narrow_is_low_byte_of_wide(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let narrow = calculate(&bytes);
            let wide = calculate_wide(&bytes);
            prop_assert_eq!(narrow[0], 0x00);
            prop_assert_eq!(narrow[1], wide[1]);
        }
    }
}
