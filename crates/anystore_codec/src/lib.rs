//! # AnyStore Codec
//!
//! The value model and byte encoding of AnyStore snapshots.
//!
//! A snapshot is a mapping from [`Value`] to [`Value`]. It is serialized as a
//! single canonical CBOR map, so that:
//! - identical mappings produce identical bytes
//! - decoding is strict (no floats, no indefinite lengths, sorted unique keys)
//! - the encoder and decoder share one set of limits, so whatever encodes
//!   also decodes
//! - an empty byte sequence stands for an empty mapping
//!
//! ## Usage
//!
//! ```
//! use anystore_codec::{deserialize_map, serialize_map, Value, ValueMap};
//!
//! let mut map = ValueMap::new();
//! map.insert(Value::from("hello"), Value::from("world"));
//!
//! let bytes = serialize_map(&map).unwrap();
//! assert_eq!(deserialize_map(&bytes).unwrap(), map);
//! assert!(deserialize_map(&[]).unwrap().is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
pub mod limits;
mod map;
mod value;

pub use decoder::{from_cbor, Decoder};
pub use encoder::{to_canonical_cbor, Encoder};
pub use error::{CodecError, CodecResult};
pub use map::{deserialize_map, serialize_map, ValueMap};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
            "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Text),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec((inner.clone(), inner), 0..4).prop_map(|pairs| Value::map(pairs)),
            ]
        })
    }

    proptest! {
        #[test]
        fn any_value_decodes_to_itself(v in value()) {
            let bytes = to_canonical_cbor(&v).unwrap();
            prop_assert_eq!(from_cbor(&bytes).unwrap(), v);
        }

        #[test]
        fn any_mapping_decodes_to_itself(
            map in prop::collection::hash_map(value(), value(), 0..8)
        ) {
            let bytes = serialize_map(&map).unwrap();
            prop_assert_eq!(deserialize_map(&bytes).unwrap(), map);
        }
    }
}
