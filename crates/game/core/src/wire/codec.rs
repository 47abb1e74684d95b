//! Primitive readers and writers for the binary wire format.
//!
//! Primitives are bincode encoded (fixint, little endian): strings carry a
//! `u64` length prefix and `Option<T>` is a flag byte followed by the value.
//! Collection counts inside records are single bytes.

use bincode::Options;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ErrorSeverity, GameError};

/// Decoding or encoding failure. Always fatal for the message being handled.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed primitive: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("unknown wire type `{0}`")]
    UnknownType(String),

    #[error("`{type_name}` refers to `{id}`, which is not in the compendium")]
    UnknownContent { type_name: String, id: String },

    #[error("unknown stat modifier kind {0}")]
    UnknownModifierKind(u8),

    #[error("unknown {what} discriminant {value}")]
    UnknownDiscriminant { what: &'static str, value: u8 },

    #[error("{what} has {len} entries, at most 255 fit a record")]
    TooLong { what: &'static str, len: usize },

    #[error("invalid {what}: {reason}")]
    Invalid { what: &'static str, reason: String },

    #[error("{0} trailing bytes after record")]
    Trailing(usize),
}

impl GameError for WireError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Bincode(_) => "WIRE_BINCODE",
            Self::UnknownType(_) => "WIRE_UNKNOWN_TYPE",
            Self::UnknownContent { .. } => "WIRE_UNKNOWN_CONTENT",
            Self::UnknownModifierKind(_) => "WIRE_UNKNOWN_MODIFIER_KIND",
            Self::UnknownDiscriminant { .. } => "WIRE_UNKNOWN_DISCRIMINANT",
            Self::TooLong { .. } => "WIRE_TOO_LONG",
            Self::Invalid { .. } => "WIRE_INVALID",
            Self::Trailing(_) => "WIRE_TRAILING",
        }
    }
}

/// Append-only record writer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), WireError> {
        bincode::serialize_into(&mut self.buf, value)?;
        Ok(())
    }

    pub fn put_str(&mut self, value: &str) -> Result<(), WireError> {
        self.put(value)
    }

    pub fn put_opt_str(&mut self, value: Option<&str>) -> Result<(), WireError> {
        self.put(&value)
    }

    /// Writes a single-byte collection count.
    pub fn put_count(&mut self, what: &'static str, len: usize) -> Result<(), WireError> {
        let count = u8::try_from(len).map_err(|_| WireError::TooLong { what, len })?;
        self.put(&count)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an encoded record.
#[derive(Debug)]
pub struct WireReader<'a> {
    input: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    /// Reads one primitive. Declared lengths may not exceed the bytes left.
    pub fn take<T: DeserializeOwned>(&mut self) -> Result<T, WireError> {
        let options = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .with_limit(self.input.len() as u64);
        Ok(options.deserialize_from(&mut self.input)?)
    }

    pub fn take_string(&mut self) -> Result<String, WireError> {
        self.take()
    }

    pub fn take_opt_string(&mut self) -> Result<Option<String>, WireError> {
        self.take()
    }

    pub fn take_count(&mut self) -> Result<usize, WireError> {
        Ok(self.take::<u8>()? as usize)
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Fails unless the whole input was consumed.
    pub fn finish(self) -> Result<(), WireError> {
        match self.input.len() {
            0 => Ok(()),
            n => Err(WireError::Trailing(n)),
        }
    }
}

/// Values with a self-contained wire form.
///
/// Polymorphic content (features, skills) needs the compendium to decode and
/// goes through [`WireRegistry`](super::WireRegistry) instead.
pub trait WireCodec: Sized {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError>;

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError>;

    fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        let mut w = WireWriter::new();
        self.encode(&mut w)?;
        Ok(w.finish())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = WireReader::new(bytes);
        let value = Self::decode(&mut r)?;
        r.finish()?;
        Ok(value)
    }
}

/// Encodes a list with a single-byte count prefix.
pub fn put_list<T: WireCodec>(
    w: &mut WireWriter,
    what: &'static str,
    items: &[T],
) -> Result<(), WireError> {
    w.put_count(what, items.len())?;
    items.iter().try_for_each(|item| item.encode(w))
}

pub fn take_list<T: WireCodec>(r: &mut WireReader<'_>) -> Result<Vec<T>, WireError> {
    let count = r.take_count()?;
    (0..count).map(|_| T::decode(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_strings_use_a_flag_byte() {
        let mut w = WireWriter::new();
        w.put_opt_str(None).expect("none");
        w.put_opt_str(Some("ab")).expect("some");
        let bytes = w.finish();
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 1);
        assert_eq!(bytes.len(), 1 + 1 + 8 + 2);

        let mut r = WireReader::new(&bytes);
        assert_eq!(r.take_opt_string().expect("none"), None);
        assert_eq!(r.take_opt_string().expect("some").as_deref(), Some("ab"));
        r.finish().expect("consumed");
    }

    #[test]
    fn truncated_input_fails() {
        let mut w = WireWriter::new();
        w.put_str("hello").expect("encode");
        let bytes = w.finish();
        let mut r = WireReader::new(&bytes[..6]);
        assert!(matches!(r.take_string(), Err(WireError::Bincode(_))));
    }

    #[test]
    fn oversized_length_prefix_is_an_error() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0x0f, 0, 0, b'a', b'b', b'c'];
        let mut r = WireReader::new(&bytes);
        assert!(matches!(r.take_string(), Err(WireError::Bincode(_))));
    }

    #[test]
    fn counts_above_a_byte_are_rejected() {
        let mut w = WireWriter::new();
        assert!(matches!(
            w.put_count("tags", 300),
            Err(WireError::TooLong { len: 300, .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_reported() {
        let r = WireReader::new(&[1, 2, 3]);
        assert!(matches!(r.finish(), Err(WireError::Trailing(3))));
    }
}
