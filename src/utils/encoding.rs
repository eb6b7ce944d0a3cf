//! Text transcoding at the native boundary
//!
//! Host-side strings are UTF-8. The window system and browser engine speak
//! UTF-16 code units, the same representation as Win32 wide strings.

use std::fmt;

/// Text in the platform's native representation
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct NativeString(Vec<u16>);

impl NativeString {
    /// Transcode a host string into native form
    pub fn from_host(text: &str) -> Self {
        Self(text.encode_utf16().collect())
    }

    /// Transcode back to a host string. Unpaired surrogates, which only a
    /// misbehaving platform can produce, become U+FFFD.
    pub fn to_host(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    /// Raw code units
    pub fn units(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for NativeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeString({:?})", self.to_host())
    }
}

/// Transcode a host string to native code units
pub fn to_native(text: &str) -> NativeString {
    NativeString::from_host(text)
}

/// Transcode native code units to a host string
pub fn from_native(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_one_unit_per_char() {
        let native = to_native("hello");
        assert_eq!(native.len(), 5);
        assert_eq!(native.units()[0], u16::from(b'h'));
    }

    #[test]
    fn test_astral_characters_use_surrogate_pairs() {
        let native = to_native("🚀");
        assert_eq!(native.units(), &[0xD83D, 0xDE80]);
        assert_eq!(native.to_host(), "🚀");
    }

    #[test]
    fn test_interior_nul_survives() {
        let native = to_native("a\0b");
        assert_eq!(native.len(), 3);
        assert_eq!(native.to_host(), "a\0b");
    }

    #[test]
    fn test_unpaired_surrogate_is_replaced() {
        assert_eq!(from_native(&[0x61, 0xD800]), "a\u{FFFD}");
    }
}
