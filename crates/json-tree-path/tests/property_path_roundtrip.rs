use json_tree_path::{format_path, get, parse_path, set, PathExpression, PathToken};
use proptest::prelude::*;
use serde_json::{json, Value};

fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,8}".prop_map(Value::String),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn token() -> impl Strategy<Value = PathToken> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,6}".prop_map(PathToken::Field),
        (0usize..5).prop_map(PathToken::Index),
    ]
}

fn path() -> impl Strategy<Value = PathExpression> {
    (
        "[a-z][a-z0-9_]{0,6}",
        prop::collection::vec(token(), 0..5),
    )
        .prop_map(|(first, rest)| {
            let mut tokens = vec![PathToken::Field(first)];
            tokens.extend(rest);
            PathExpression::new(tokens)
        })
}

proptest! {
    #[test]
    fn set_then_get_returns_value(path in path(), value in json_value()) {
        let mut doc = json!({});
        set(&mut doc, &path, value.clone()).unwrap();
        prop_assert_eq!(get(&doc, &path).unwrap(), &value);
    }

    #[test]
    fn second_set_overwrites_first(path in path(), a in json_value(), b in json_value()) {
        let mut doc = json!({});
        set(&mut doc, &path, a.clone()).unwrap();
        let previous = set(&mut doc, &path, b.clone()).unwrap();
        prop_assert_eq!(previous, Some(a));
        prop_assert_eq!(get(&doc, &path).unwrap(), &b);
    }

    #[test]
    fn format_then_parse_is_identity(path in path()) {
        let text = format_path(&path);
        prop_assert_eq!(parse_path(&text).unwrap(), path);
    }
}
