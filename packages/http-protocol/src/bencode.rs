//! Bencode values, encoding and decoding (BEP 3).
//!
//! Dictionaries are kept in a sorted map, so encoding is deterministic and
//! strictly BEP 3 compliant (keys in lexicographical byte order). Decoding
//! rejects dictionaries whose keys are not byte strings.
use std::collections::BTreeMap;

use thiserror::Error;

/// A bencoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(BTreeMap<Vec<u8>, Value>),
}

impl Value {
    /// Encodes the value, appending to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Value::Integer(value) => {
                out.push(b'i');
                out.extend_from_slice(value.to_string().as_bytes());
                out.push(b'e');
            }
            Value::Bytes(bytes) => {
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(bytes);
            }
            Value::List(items) => {
                out.push(b'l');
                for item in items {
                    item.encode(out);
                }
                out.push(b'e');
            }
            Value::Dict(entries) => {
                out.push(b'd');
                for (key, value) in entries {
                    Value::Bytes(key.clone()).encode(out);
                    value.encode(out);
                }
                out.push(b'e');
            }
        }
    }

    /// Encodes the value into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }

    /// Decodes one value, requiring the whole input to be consumed.
    ///
    /// # Errors
    ///
    /// Will return an error if the input is not a single well-formed
    /// bencoded value, including dictionaries with non-string keys.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = Decoder { bytes, position: 0 };

        let value = decoder.decode_value()?;

        if decoder.position != bytes.len() {
            return Err(DecodeError::TrailingData {
                position: decoder.position,
            });
        }

        Ok(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Bytes(value.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

/// Errors raised while decoding bencoded data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected byte {byte:#04x} at position {position}")]
    UnexpectedByte { byte: u8, position: usize },

    #[error("invalid integer at position {position}")]
    InvalidInteger { position: usize },

    #[error("invalid string length at position {position}")]
    InvalidLength { position: usize },

    #[error("dictionary key is not a byte string at position {position}")]
    NonStringDictKey { position: usize },

    #[error("trailing data after position {position}")]
    TrailingData { position: usize },
}

struct Decoder<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl Decoder<'_> {
    fn peek(&self) -> Result<u8, DecodeError> {
        self.bytes.get(self.position).copied().ok_or(DecodeError::UnexpectedEof)
    }

    fn advance(&mut self) -> Result<u8, DecodeError> {
        let byte = self.peek()?;
        self.position += 1;
        Ok(byte)
    }

    fn decode_value(&mut self) -> Result<Value, DecodeError> {
        match self.peek()? {
            b'i' => self.decode_integer(),
            b'l' => self.decode_list(),
            b'd' => self.decode_dict(),
            b'0'..=b'9' => Ok(Value::Bytes(self.decode_bytes()?)),
            byte => Err(DecodeError::UnexpectedByte {
                byte,
                position: self.position,
            }),
        }
    }

    fn decode_integer(&mut self) -> Result<Value, DecodeError> {
        let start = self.position;
        self.advance()?; // 'i'

        let digits_start = self.position;
        while self.peek()? != b'e' {
            self.position += 1;
        }

        let digits = &self.bytes[digits_start..self.position];
        self.advance()?; // 'e'

        let text = std::str::from_utf8(digits).map_err(|_| DecodeError::InvalidInteger { position: start })?;
        let value: i64 = text.parse().map_err(|_| DecodeError::InvalidInteger { position: start })?;

        Ok(Value::Integer(value))
    }

    fn decode_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let start = self.position;

        let mut length: usize = 0;
        loop {
            match self.advance()? {
                b':' => break,
                digit @ b'0'..=b'9' => {
                    length = length
                        .checked_mul(10)
                        .and_then(|length| length.checked_add(usize::from(digit - b'0')))
                        .ok_or(DecodeError::InvalidLength { position: start })?;
                }
                _ => return Err(DecodeError::InvalidLength { position: start }),
            }
        }

        let end = self
            .position
            .checked_add(length)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DecodeError::UnexpectedEof)?;

        let bytes = self.bytes[self.position..end].to_vec();
        self.position = end;

        Ok(bytes)
    }

    fn decode_list(&mut self) -> Result<Value, DecodeError> {
        self.advance()?; // 'l'

        let mut items = Vec::new();

        while self.peek()? != b'e' {
            items.push(self.decode_value()?);
        }
        self.advance()?; // 'e'

        Ok(Value::List(items))
    }

    fn decode_dict(&mut self) -> Result<Value, DecodeError> {
        self.advance()?; // 'd'

        let mut entries = BTreeMap::new();

        while self.peek()? != b'e' {
            if !self.peek()?.is_ascii_digit() {
                return Err(DecodeError::NonStringDictKey { position: self.position });
            }

            let key = self.decode_bytes()?;
            let value = self.decode_value()?;
            entries.insert(key, value);
        }
        self.advance()?; // 'e'

        Ok(Value::Dict(entries))
    }
}
