//! Argument encoding used on the bus.
//!
//! Integers travel as 4 bytes, big-endian (two's complement for signed
//! deltas). Strings are the raw bytes with neither length prefix nor
//! terminator: the payload length is the string length.

use std::fmt;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_u32(arg: u32) -> Self {
        Self(arg.to_be_bytes().to_vec())
    }

    pub fn from_i32(arg: i32) -> Self {
        Self(arg.to_be_bytes().to_vec())
    }

    pub fn from_bool(arg: bool) -> Self {
        Self::from_u32(u32::from(arg))
    }

    pub fn from_string(arg: &str) -> Self {
        Self(arg.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First argument as an unsigned integer.
    ///
    /// Payloads shorter than 4 bytes decode to 0; trailing bytes are ignored.
    pub fn as_u32(&self) -> u32 {
        match self.0.get(..4) {
            Some(&[a, b, c, d]) => u32::from_be_bytes([a, b, c, d]),
            _ => 0,
        }
    }

    pub fn as_i32(&self) -> i32 {
        self.as_u32() as i32
    }

    pub fn as_bool(&self) -> bool {
        self.as_u32() != 0
    }

    /// Whole payload as text, invalid UTF-8 sequences replaced.
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_is_big_endian() {
        assert_eq!(Payload::from_u32(0x0102_0304).as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(Payload::from_u32(50).as_bytes(), &[0, 0, 0, 50]);
    }

    #[test]
    fn test_negative_delta_is_twos_complement() {
        let payload = Payload::from_i32(-10);
        assert_eq!(payload.as_bytes(), &[0xff, 0xff, 0xff, 0xf6]);
        assert_eq!(payload.as_i32(), -10);
        assert_eq!(payload.as_u32(), 0xffff_fff6);
    }

    #[test]
    fn test_short_payload_decodes_to_zero() {
        assert_eq!(Payload::empty().as_u32(), 0);
        assert_eq!(Payload::from_bytes(vec![0xff, 0xff, 0xff]).as_u32(), 0);
        assert!(!Payload::from_bytes(vec![1]).as_bool());
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let payload = Payload::from_bytes(vec![0, 0, 0, 7, 9, 9]);
        assert_eq!(payload.as_u32(), 7);
    }

    #[test]
    fn test_bool_encoding() {
        assert_eq!(Payload::from_bool(true).as_bytes(), &[0, 0, 0, 1]);
        assert!(Payload::from_u32(42).as_bool());
        assert!(!Payload::from_bool(false).as_bool());
    }

    #[test]
    fn test_string_has_no_prefix_or_terminator() {
        let payload = Payload::from_string("-off-");
        assert_eq!(payload.as_bytes(), b"-off-");
        assert_eq!(payload.len(), 5);
        assert_eq!(payload.as_string(), "-off-");

        assert!(Payload::from_string("").is_empty());
        assert_eq!(Payload::from_string("").as_string(), "");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let payload = Payload::from_bytes(vec![b'a', 0xff, b'b']);
        assert_eq!(payload.as_string(), "a\u{fffd}b");
    }
}
