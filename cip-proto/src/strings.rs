//! Encoding and decoding of the Rockwell STRING structure (`LEN:DINT` + `DATA:SINT[size]`).
//!
//! `DATA` is transmitted as signed bytes even though it holds character codes, so values above
//! 127 round-trip through a two's-complement reinterpretation rather than truncation.

/// Default `DATA` member size for the built-in `STRING` type.
pub const DEFAULT_SIZE: usize = 82;
/// The `DATA` member sizes Logix actually uses for its string family.
pub const VALID_SIZES: [usize; 6] = [8, 12, 16, 20, 40, 82];

/// Splits `value` into the `(LEN, DATA)` pair to write, truncating to `size` characters if it
/// doesn't fit.
pub fn encode(value: &str, size: usize) -> (i32, Vec<i8>) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(size);
    let data = bytes[..len].iter().map(|&b| b as i8).collect();
    (len as i32, data)
}

/// Reassembles a string from a `LEN` value and the `DATA` member's signed bytes.
pub fn decode(len: i32, data: &[i8]) -> String {
    let len = (len.max(0) as usize).min(data.len());
    let bytes: Vec<u8> = data[..len].iter().map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii() {
        let (len, data) = encode("hello", DEFAULT_SIZE);
        assert_eq!(len, 5);
        assert_eq!(decode(len, &data), "hello");
    }

    #[test]
    fn truncates_to_size() {
        let (len, data) = encode("0123456789", 8);
        assert_eq!(len, 8);
        assert_eq!(data.len(), 8);
    }

    #[test]
    fn high_byte_values_round_trip_through_signed_reinterpretation() {
        // A raw byte of 0xFF is stored as the SINT -1, and must come back out as 0xFF, not be
        // lost to truncation.
        let raw: u8 = 0xFF;
        let signed = raw as i8;
        assert_eq!(signed, -1);
        assert_eq!(signed as u8, raw);
    }
}
