use cfgsync_store::{Codec, ConfigStore, MemoryStore, Record};
use proptest::prelude::*;
use serde_json::Value;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "s[a-z0-9_]{0,10}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn record() -> impl Strategy<Value = Record> {
    prop::collection::btree_map("[a-z_]{1,8}", value(), 0..6)
        .prop_map(|map| map.into_iter().collect())
}

proptest! {
    #[test]
    fn yaml_decode_inverts_encode(data in record()) {
        let encoded = Codec::Yml.encode(&data).unwrap();
        prop_assert_eq!(Codec::Yml.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn json_decode_inverts_encode(data in record()) {
        let encoded = Codec::Json.encode(&data).unwrap();
        prop_assert_eq!(Codec::Json.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn store_encode_round_trips(data in record()) {
        let store = MemoryStore::new();
        let encoded = store.encode(&data).unwrap();
        prop_assert_eq!(store.decode(&encoded).unwrap(), data);
    }
}
