//! Canonical CBOR decoder.

use crate::encoder::cmp_encoded;
use crate::error::{CodecError, CodecResult};
use crate::limits::{MAX_BYTES_LENGTH, MAX_CONTAINER_ELEMENTS, MAX_DEPTH};
use crate::value::Value;
use std::cmp::Ordering;

/// Decodes exactly one value from `bytes`.
///
/// # Errors
///
/// Fails on malformed or non-canonical input, and when bytes remain after
/// the value.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// Streaming canonical CBOR reader.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Returns true once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The unconsumed input.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Decodes the next value.
    ///
    /// # Errors
    ///
    /// See [`from_cbor`].
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode(&mut self) -> CodecResult<Value> {
        let initial = self.read_byte()?;
        let major = initial >> 5;
        let info = initial & 0x1f;

        match major {
            0 => {
                let n = self.read_arg(info)?;
                i64::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| CodecError::unsupported("unsigned integer above i64::MAX"))
            }
            1 => {
                let n = self.read_arg(info)?;
                if n > i64::MAX as u64 {
                    return Err(CodecError::unsupported("negative integer below i64::MIN"));
                }
                Ok(Value::Integer(-1 - n as i64))
            }
            2 => {
                let len = self.read_len(info, MAX_BYTES_LENGTH)?;
                Ok(Value::Bytes(self.read_slice(len)?.to_vec()))
            }
            3 => {
                let len = self.read_len(info, MAX_BYTES_LENGTH)?;
                let raw = self.read_slice(len)?;
                let text = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Value::Text(text.to_string()))
            }
            4 => {
                let len = self.read_len(info, MAX_CONTAINER_ELEMENTS)?;
                self.nested(|d| {
                    let mut items = Vec::with_capacity(len.min(1024));
                    for _ in 0..len {
                        items.push(d.decode()?);
                    }
                    Ok(Value::Array(items))
                })
            }
            5 => {
                let len = self.read_len(info, MAX_CONTAINER_ELEMENTS)?;
                self.nested(|d| {
                    let pairs = d.decode_map_body(len)?;
                    Ok(Value::Map(pairs.into_iter().collect()))
                })
            }
            6 => Err(CodecError::unsupported("tagged item")),
            _ => self.decode_simple(info),
        }
    }

    /// Decodes `len` key/value pairs, enforcing strictly increasing keys.
    ///
    /// Strict ordering also rules out duplicate keys.
    pub(crate) fn decode_map_body(&mut self, len: usize) -> CodecResult<Vec<(Value, Value)>> {
        let mut pairs = Vec::with_capacity(len.min(1024));
        let mut prev_key: Option<&'a [u8]> = None;

        for _ in 0..len {
            let start = self.pos;
            let key = self.decode()?;
            let data = self.data;
            let key_bytes = &data[start..self.pos];

            if let Some(prev) = prev_key {
                match cmp_encoded(prev, key_bytes) {
                    Ordering::Less => {}
                    Ordering::Equal => {
                        return Err(CodecError::NonCanonical {
                            reason: "duplicate map key",
                        })
                    }
                    Ordering::Greater => {
                        return Err(CodecError::NonCanonical {
                            reason: "map keys out of order",
                        })
                    }
                }
            }
            prev_key = Some(key_bytes);

            let value = self.decode()?;
            pairs.push((key, value));
        }

        Ok(pairs)
    }

    /// Reads a map head and returns its pair count.
    pub(crate) fn read_map_head(&mut self) -> CodecResult<usize> {
        let initial = self.read_byte()?;
        let major = initial >> 5;
        if major != 5 {
            return Err(CodecError::NotAMap {
                found: major_name(major, initial & 0x1f),
            });
        }
        self.read_len(initial & 0x1f, MAX_CONTAINER_ELEMENTS)
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> CodecResult<T>) -> CodecResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn decode_simple(&mut self, info: u8) -> CodecResult<Value> {
        match info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 => Ok(Value::Null),
            25..=27 => Err(CodecError::FloatForbidden),
            31 => Err(CodecError::IndefiniteLength),
            other => Err(CodecError::unsupported(format!("simple value {other}"))),
        }
    }

    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(CodecError::UnexpectedEof { position: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(CodecError::UnexpectedEof {
                position: self.data.len(),
            })?;
        let data = self.data;
        let slice = &data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_len(&mut self, info: u8, limit: u64) -> CodecResult<usize> {
        let claimed = self.read_arg(info)?;
        if claimed > limit {
            return Err(CodecError::SizeLimitExceeded { claimed, limit });
        }
        usize::try_from(claimed).map_err(|_| CodecError::SizeLimitExceeded { claimed, limit })
    }

    fn read_arg(&mut self, info: u8) -> CodecResult<u64> {
        let (value, min) = match info {
            0..=23 => return Ok(u64::from(info)),
            24 => (u64::from(self.read_byte()?), 24),
            25 => {
                let b = self.read_slice(2)?;
                (u64::from(u16::from_be_bytes([b[0], b[1]])), 0x100)
            }
            26 => {
                let b = self.read_slice(4)?;
                (u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])), 0x1_0000)
            }
            27 => {
                let b = self.read_slice(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                (u64::from_be_bytes(raw), 0x1_0000_0000)
            }
            31 => return Err(CodecError::IndefiniteLength),
            _ => return Err(CodecError::unsupported("reserved additional info")),
        };
        if value < min {
            return Err(CodecError::NonCanonical {
                reason: "integer head not in shortest form",
            });
        }
        Ok(value)
    }
}

fn major_name(major: u8, info: u8) -> &'static str {
    match (major, info) {
        (0 | 1, _) => "integer",
        (2, _) => "bytes",
        (3, _) => "text",
        (4, _) => "array",
        (5, _) => "map",
        (6, _) => "tag",
        (_, 20 | 21) => "bool",
        (_, 22) => "null",
        _ => "simple value",
    }
}
