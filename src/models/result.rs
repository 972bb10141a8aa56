use std::borrow::Cow;

use super::CodePosition;

/// One decoded code: its payload and where it was found
///
/// Immutable value once constructed, structurally comparable. The payload is
/// a raw byte string: matrix codes routinely carry control characters such
/// as CR/LF, so no text encoding is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecodeResult {
    /// Decoded payload bytes
    pub text: Vec<u8>,
    /// Quadrilateral boundary in unified image space
    pub position: CodePosition,
}

impl DecodeResult {
    /// Create a result from a payload and its position
    pub fn new(text: impl Into<Vec<u8>>, position: CodePosition) -> Self {
        Self {
            text: text.into(),
            position,
        }
    }

    /// The payload as UTF-8, with invalid sequences replaced
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }
}
