//! Whole-snapshot serialization: a key/value mapping as one CBOR map.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::collections::HashMap;

/// The mapping every snapshot is made of.
pub type ValueMap = HashMap<Value, Value>;

/// Encodes a mapping as a single canonical CBOR map.
///
/// Equal mappings always produce identical bytes, whatever their hash order.
///
/// # Errors
///
/// Fails if a key or value exceeds the limits [`deserialize_map`] enforces,
/// so a mapping that encodes always decodes.
pub fn serialize_map(map: &ValueMap) -> CodecResult<Vec<u8>> {
    let mut encoder = Encoder::with_capacity(64 + map.len() * 16);
    encoder.encode_map(map.iter())?;
    Ok(encoder.into_bytes())
}

/// Decodes bytes produced by [`serialize_map`].
///
/// An empty input is an empty mapping.
///
/// # Errors
///
/// Fails if the input is not exactly one canonical CBOR map.
pub fn deserialize_map(bytes: &[u8]) -> CodecResult<ValueMap> {
    if bytes.is_empty() {
        return Ok(ValueMap::new());
    }

    let mut decoder = Decoder::new(bytes);
    let len = decoder.read_map_head()?;
    let pairs = decoder.decode_map_body(len)?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: decoder.remaining().len(),
        });
    }

    Ok(pairs.into_iter().collect())
}
