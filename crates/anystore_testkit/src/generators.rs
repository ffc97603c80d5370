//! Property-based test generators using proptest.

use anystore_codec::limits::MAX_DEPTH;
use anystore_codec::{Value, ValueMap};
use anystore_storage::{EncryptionKey, KEY_SIZES};
use proptest::prelude::*;

/// Strategy for scalar values.
pub fn leaf_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
        ".{0,24}".prop_map(Value::Text),
    ]
}

/// Strategy for arbitrary values, nested up to three levels.
///
/// Maps are built from raw pair lists in generation order, with keys drawn
/// from a small pool so duplicates are common.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_value_strategy().prop_recursive(3, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((map_key_strategy(), inner.clone()), 0..6)
                .prop_map(|pairs| Value::map(pairs)),
            prop::collection::vec((inner.clone(), inner), 0..4).prop_map(|pairs| Value::map(pairs)),
        ]
    })
}

fn map_key_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-c]".prop_map(Value::Text),
        (0..3i64).prop_map(Value::Integer),
        Just(Value::Null),
    ]
}

/// Strategy for values nested close to, at, or just past the codec's depth
/// limit. Past the limit, stores must refuse the value.
pub fn nested_value_strategy() -> impl Strategy<Value = (usize, Value)> {
    (MAX_DEPTH - 2..=MAX_DEPTH + 2, any::<bool>(), leaf_value_strategy()).prop_map(
        |(depth, as_maps, leaf)| {
            let value = (0..depth).fold(leaf, |inner, i| {
                if as_maps {
                    Value::map(vec![(Value::Integer(i as i64), inner)])
                } else {
                    Value::Array(vec![inner])
                }
            });
            (depth, value)
        },
    )
}

/// Strategy for keys: mostly text, sometimes integers or composite values.
pub fn key_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => "[a-z][a-z0-9_.-]{0,15}".prop_map(Value::Text),
        1 => any::<i64>().prop_map(Value::Integer),
        1 => value_strategy(),
    ]
}

/// Strategy for whole store contents.
pub fn entries_strategy(max: usize) -> impl Strategy<Value = ValueMap> {
    prop::collection::hash_map(key_strategy(), value_strategy(), 0..max)
}

/// Strategy for encryption keys of every accepted size.
pub fn encryption_key_strategy() -> impl Strategy<Value = EncryptionKey> {
    prop::sample::select(KEY_SIZES.to_vec())
        .prop_flat_map(|len| prop::collection::vec(any::<u8>(), len))
        .prop_map(|bytes| EncryptionKey::from_bytes(&bytes).expect("accepted key size"))
}
