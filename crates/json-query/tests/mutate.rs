//! Mutation tests: `selector = mutator` queries produce an edited copy of
//! the input, with the mutator evaluated against each selected node.

use json_query::Error;
use serde_json::{json, Value};

fn check(query: &str, input: Value, expected: Value) {
    let result = json_query::eval(query, &input)
        .unwrap_or_else(|e| panic!("eval({query}) failed: {e}"));
    assert_eq!(result, expected, "query: {query}");
}

#[test]
fn test_overwrite_scalar() {
    check("@.a[0] = 9", json!({"a": [1, 2]}), json!({"a": [9, 2]}));
    check("@.a = 'x'", json!({"a": 1, "b": 2}), json!({"a": "x", "b": 2}));
}

#[test]
fn test_mutator_sees_selected_node() {
    check("@.n = @ * 10", json!({"n": 4}), json!({"n": 40}));
    check(
        "@.a = sum(@)",
        json!({"a": [1, 2, 3]}),
        json!({"a": 6}),
    );
}

#[test]
fn test_slice_targets() {
    check("@[1:] = 0", json!([1, 2, 3]), json!([1, 0, 0]));
}

#[test]
fn test_filter_targets() {
    check("@[@ > 2] = 0", json!([1, 5, 2, 7]), json!([1, 0, 2, 0]));
}

#[test]
fn test_star_targets() {
    check(
        "@[*].price = @ * 2",
        json!([{"price": 1}, {"price": 3}]),
        json!([{"price": 2}, {"price": 6}]),
    );
}

#[test]
fn test_recursive_targets() {
    check(
        "@..z = @ + 1",
        json!({"x": {"z": 1}, "y": [{"z": 2}]}),
        json!({"x": {"z": 2}, "y": [{"z": 3}]}),
    );
}

#[test]
fn test_mutator_can_change_shape() {
    check(
        "@.a = @{min: @[0], max: @[-1]}",
        json!({"a": [1, 2, 3]}),
        json!({"a": {"min": 1, "max": 3}}),
    );
}

#[test]
fn test_no_match_leaves_input_unchanged() {
    check("@.missing = 1", json!({"a": 2}), json!({"a": 2}));
}

#[test]
fn test_unaddressable_selector_rejected() {
    let err = json_query::compile("@.a + 1 = 5").unwrap_err();
    assert!(matches!(err, Error::InvalidMutation(_)));
    let err = json_query::compile("len(@) = 5").unwrap_err();
    assert!(matches!(err, Error::InvalidMutation(_)));
}

#[test]
fn test_projection_selector_rejected_at_eval() {
    let q = json_query::compile("@{@.a} = 1").unwrap();
    let err = q.eval(&json!({"a": 2})).unwrap_err();
    assert!(matches!(err, Error::InvalidMutation(_)));
}

#[test]
fn test_select_is_untouched_by_mutator() {
    let q = json_query::compile("@.a[0] = 9").unwrap();
    let input = json!({"a": [1, 2]});
    assert_eq!(q.select(&input).unwrap(), json!(1));
}
