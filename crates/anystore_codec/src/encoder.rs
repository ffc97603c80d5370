//! Canonical CBOR encoder.

use crate::error::{CodecError, CodecResult};
use crate::limits::{MAX_BYTES_LENGTH, MAX_CONTAINER_ELEMENTS, MAX_DEPTH};
use crate::value::Value;
use std::cmp::Ordering;

/// Encodes a value to canonical CBOR bytes.
///
/// Output is deterministic (RFC 8949 §4.2.1): shortest-form heads, no
/// indefinite lengths, map keys sorted by their encoded bytes, shorter first.
///
/// # Errors
///
/// Fails if the value is nested deeper, or holds longer strings or larger
/// containers, than the decoder accepts.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// Orders two encoded items the way canonical maps require.
pub(crate) fn cmp_encoded(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Incremental canonical CBOR writer.
///
/// On error the buffer holds a partial item and should be discarded.
#[derive(Debug, Default)]
pub struct Encoder {
    buffer: Vec<u8>,
    depth: usize,
}

impl Encoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder with a preallocated buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            depth: 0,
        }
    }

    /// Appends one value.
    ///
    /// # Errors
    ///
    /// See [`to_canonical_cbor`].
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => self.buffer.push(0xf6),
            Value::Bool(false) => self.buffer.push(0xf4),
            Value::Bool(true) => self.buffer.push(0xf5),
            Value::Integer(n) => self.encode_integer(*n),
            Value::Bytes(b) => {
                self.write_len(2, b.len(), MAX_BYTES_LENGTH)?;
                self.buffer.extend_from_slice(b);
            }
            Value::Text(s) => {
                self.write_len(3, s.len(), MAX_BYTES_LENGTH)?;
                self.buffer.extend_from_slice(s.as_bytes());
            }
            Value::Array(items) => self.nested(|e| {
                e.write_len(4, items.len(), MAX_CONTAINER_ELEMENTS)?;
                items.iter().try_for_each(|item| e.encode(item))
            })?,
            Value::Map(pairs) => self.nested(|e| e.encode_map(pairs))?,
        }
        Ok(())
    }

    /// Appends a map from borrowed pairs, sorting keys canonically.
    ///
    /// Keys must be distinct; a snapshot or [`Value::Map`] guarantees that.
    ///
    /// # Errors
    ///
    /// See [`to_canonical_cbor`].
    pub fn encode_map<'a, I>(&mut self, pairs: I) -> CodecResult<()>
    where
        I: IntoIterator<Item = (&'a Value, &'a Value)>,
    {
        let mut entries: Vec<(Vec<u8>, &Value)> = Vec::new();
        for (key, value) in pairs {
            let mut key_encoder = Encoder {
                buffer: Vec::new(),
                depth: self.depth,
            };
            key_encoder.encode(key)?;
            entries.push((key_encoder.into_bytes(), value));
        }
        entries.sort_by(|a, b| cmp_encoded(&a.0, &b.0));
        debug_assert!(entries.windows(2).all(|w| w[0].0 != w[1].0));

        self.write_len(5, entries.len(), MAX_CONTAINER_ELEMENTS)?;
        for (key, value) in entries {
            self.buffer.extend_from_slice(&key);
            self.encode(value)?;
        }
        Ok(())
    }

    /// Consumes the encoder, returning the bytes written so far.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Same bookkeeping as the decoder, so both reject the same depth.
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> CodecResult<()>) -> CodecResult<()> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.write_head(0, n as u64);
        } else {
            // -1 - n never overflows for negative n.
            self.write_head(1, (-1 - n) as u64);
        }
    }

    fn write_len(&mut self, major: u8, len: usize, limit: u64) -> CodecResult<()> {
        let claimed = len as u64;
        if claimed > limit {
            return Err(CodecError::SizeLimitExceeded { claimed, limit });
        }
        self.write_head(major, claimed);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_head(&mut self, major: u8, arg: u64) {
        let mt = major << 5;
        match arg {
            0..=23 => self.buffer.push(mt | arg as u8),
            24..=0xff => {
                self.buffer.push(mt | 24);
                self.buffer.push(arg as u8);
            }
            0x100..=0xffff => {
                self.buffer.push(mt | 25);
                self.buffer.extend_from_slice(&(arg as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.buffer.push(mt | 26);
                self.buffer.extend_from_slice(&(arg as u32).to_be_bytes());
            }
            _ => {
                self.buffer.push(mt | 27);
                self.buffer.extend_from_slice(&arg.to_be_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::from_cbor;

    fn encode(value: &Value) -> Vec<u8> {
        to_canonical_cbor(value).unwrap()
    }

    fn nested_arrays(depth: usize) -> Value {
        (0..depth).fold(Value::Null, |inner, _| Value::Array(vec![inner]))
    }

    #[test]
    fn simple_values() {
        assert_eq!(encode(&Value::Null), vec![0xf6]);
        assert_eq!(encode(&Value::Bool(false)), vec![0xf4]);
        assert_eq!(encode(&Value::Bool(true)), vec![0xf5]);
    }

    #[test]
    fn integers_use_shortest_head() {
        assert_eq!(encode(&Value::Integer(23)), vec![0x17]);
        assert_eq!(encode(&Value::Integer(24)), vec![0x18, 24]);
        assert_eq!(encode(&Value::Integer(256)), vec![0x19, 0x01, 0x00]);
        assert_eq!(
            encode(&Value::Integer(65536)),
            vec![0x1a, 0x00, 0x01, 0x00, 0x00]
        );
        assert_eq!(encode(&Value::Integer(-1)), vec![0x20]);
        assert_eq!(encode(&Value::Integer(-100)), vec![0x38, 99]);
        assert_eq!(
            encode(&Value::Integer(i64::MIN)),
            vec![0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn strings_and_bytes() {
        assert_eq!(encode(&Value::Bytes(vec![])), vec![0x40]);
        assert_eq!(encode(&Value::Bytes(vec![9, 8])), vec![0x42, 9, 8]);
        assert_eq!(
            encode(&Value::from("hello")),
            vec![0x65, b'h', b'e', b'l', b'l', b'o']
        );
    }

    #[test]
    fn map_keys_sorted_by_encoding() {
        let map = Value::map(vec![
            (Value::from("bb"), Value::Integer(2)),
            (Value::from("a"), Value::Integer(1)),
            (Value::Integer(1), Value::Null),
        ]);
        assert_eq!(
            encode(&map),
            vec![0xa3, 0x01, 0xf6, 0x61, b'a', 0x01, 0x62, b'b', b'b', 0x02]
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = Value::map(vec![
            (Value::from("x"), Value::from(1)),
            (Value::from("y"), Value::from(2)),
        ]);
        let b = Value::map(vec![
            (Value::from("y"), Value::from(2)),
            (Value::from("x"), Value::from(1)),
        ]);
        assert_eq!(a, b);
        assert_eq!(encode(&a), encode(&b));
    }

    #[test]
    fn duplicate_map_keys_encode_once() {
        let map = Value::map(vec![
            (Value::from("a"), Value::from(1)),
            (Value::from("a"), Value::from(2)),
        ]);
        let bytes = encode(&map);
        assert_eq!(bytes, vec![0xa1, 0x61, b'a', 0x02]);
        assert_eq!(from_cbor(&bytes).unwrap(), map);
    }

    #[test]
    fn depth_limit_matches_decoder() {
        let deepest = nested_arrays(MAX_DEPTH);
        assert_eq!(from_cbor(&encode(&deepest)).unwrap(), deepest);

        assert_eq!(
            to_canonical_cbor(&nested_arrays(MAX_DEPTH + 1)),
            Err(CodecError::TooDeep { limit: MAX_DEPTH })
        );
    }

    #[test]
    fn depth_counts_map_keys() {
        let deep_key = Value::map(vec![(nested_arrays(MAX_DEPTH), Value::Null)]);
        assert_eq!(
            to_canonical_cbor(&deep_key),
            Err(CodecError::TooDeep { limit: MAX_DEPTH })
        );

        let within = Value::map(vec![(nested_arrays(MAX_DEPTH - 1), Value::Null)]);
        assert_eq!(from_cbor(&encode(&within)).unwrap(), within);
    }

    #[test]
    fn top_level_map_does_not_count_toward_depth() {
        let deepest = nested_arrays(MAX_DEPTH);
        let mut encoder = Encoder::new();
        encoder
            .encode_map([(&Value::from("k"), &deepest)])
            .unwrap();
        assert!(!encoder.into_bytes().is_empty());
    }
}
