//! End-to-end query evaluation tests: compile a query, run it against a
//! `serde_json` input, compare the result.

use json_query::Error;
use serde_json::{json, Value};

fn check(query: &str, input: Value, expected: Value) {
    let result = json_query::eval(query, &input)
        .unwrap_or_else(|e| panic!("eval({query}) failed: {e}"));
    assert_eq!(result, expected, "query: {query}, input: {input}");
}

fn check_err(query: &str, input: Value) -> Error {
    match json_query::compile(query) {
        Err(e) => e,
        Ok(q) => q
            .eval(&input)
            .err()
            .unwrap_or_else(|| panic!("expected error for {query}")),
    }
}

// ------------------------------------------------------------------ Scalars

#[test]
fn test_identity() {
    check("@", json!({"a": 1}), json!({"a": 1}));
    check("@", json!(null), json!(null));
}

#[test]
fn test_literals_pass_through() {
    check("42", json!(null), json!(42));
    check("2.5", json!(null), json!(2.5));
    check("'hello'", json!(null), json!("hello"));
    check("true", json!(null), json!(true));
    check("null", json!(null), json!(null));
}

// ----------------------------------------------------------------- Indexers

#[test]
fn test_name_indexer_unwraps() {
    check("@.a[1]", json!({"a": [1, 2, 3]}), json!(2));
    check("@.a", json!({"a": {"b": 1}}), json!({"b": 1}));
    check("@['k']", json!({"k": 7, "other": 8}), json!(7));
}

#[test]
fn test_missing_name_yields_empty_object() {
    check("@.missing", json!({"a": 1}), json!({}));
}

#[test]
fn test_name_list_keeps_object_shape() {
    check(
        "@['a', 'b']",
        json!({"a": 1, "b": 2, "c": 3}),
        json!({"a": 1, "b": 2}),
    );
}

#[test]
fn test_name_list_follows_entry_order() {
    let out = json_query::eval("@['b', 'a']", &json!({"a": 1, "b": 2})).unwrap();
    assert_eq!(serde_json::to_string(&out).unwrap(), r#"{"b":2,"a":1}"#);
}

#[test]
fn test_regex_names() {
    check(
        "@[`^a`]",
        json!({"ab": 1, "b": 2, "a1": 3}),
        json!({"ab": 1, "a1": 3}),
    );
}

#[test]
fn test_integer_indexing() {
    check("@[0]", json!([7, 8, 9]), json!(7));
    check("@[-1]", json!([7, 8, 9]), json!(9));
    // Out-of-range indices are skipped, not errors.
    check("@[10]", json!([7, 8, 9]), json!([]));
}

#[test]
fn test_slicing() {
    check("@[1:3]", json!([0, 1, 2, 3, 4]), json!([1, 2]));
    check("@[::2]", json!([0, 1, 2, 3, 4]), json!([0, 2, 4]));
    check("@[::-1]", json!([1, 2, 3]), json!([3, 2, 1]));
    check("@[-2:]", json!([0, 1, 2, 3]), json!([2, 3]));
    check("@[3:100]", json!([0, 1, 2, 3, 4]), json!([3, 4]));
}

#[test]
fn test_mixed_index_and_slice_entries() {
    check("@[0, 2:4, -1]", json!([0, 1, 2, 3, 4]), json!([0, 2, 3, 4]));
}

#[test]
fn test_star() {
    check("@.*", json!({"a": 1, "b": 2}), json!({"a": 1, "b": 2}));
    check("@[*]", json!([1, 2]), json!([1, 2]));
}

#[test]
fn test_star_projects_through_children() {
    check(
        "@.*.n",
        json!({"x": {"n": 1}, "y": {"n": 2}}),
        json!({"x": 1, "y": 2}),
    );
    // Children without the key contribute empty results, which are dropped.
    check(
        "@.*.n",
        json!({"x": {"n": 1}, "y": {"m": 2}}),
        json!({"x": 1}),
    );
}

#[test]
fn test_recursive_name() {
    check("@..z", json!({"x": {"y": {"z": 5}}}), json!([5]));
    check(
        "@..z",
        json!({"rows": [{"z": 1}, {"w": {"z": 2}}]}),
        json!([1, 2]),
    );
}

#[test]
fn test_recursive_name_emits_each_node_once() {
    check("@..a", json!({"a": {"a": 1}}), json!([{"a": 1}]));
}

#[test]
fn test_recursive_list_order_is_per_entry() {
    let input = json!({"a": 1, "c": {"b": 2}});
    check("@..['b', 'a']", input.clone(), json!([2, 1]));
    check("@..['a', 'b']", input, json!([1, 2]));
}

#[test]
fn test_recursive_star_yields_scalar_leaves() {
    check(
        "@..*",
        json!({"a": {"b": 1, "c": [2, 3]}, "d": 4}),
        json!([1, 2, 3, 4]),
    );
}

#[test]
fn test_chained_indexers() {
    check(
        "@.a.b[0].c",
        json!({"a": {"b": [{"c": 42}]}}),
        json!(42),
    );
}

// ------------------------------------------------------------------ Filters

#[test]
fn test_boolean_filter_on_array() {
    check("@[@ > 2]", json!([1, 2, 3, 4]), json!([3, 4]));
    check("@[@ % 2 == 0]", json!([1, 2, 3, 4]), json!([2, 4]));
}

#[test]
fn test_boolean_filter_on_object() {
    check(
        "@[@ > 10]",
        json!({"a": 5, "b": 20, "c": 30}),
        json!({"b": 20, "c": 30}),
    );
}

#[test]
fn test_scalar_mask_keeps_all_or_none() {
    check("@[len(@) > 2]", json!([1, 2, 3]), json!([1, 2, 3]));
    check("@[len(@) > 2]", json!([1]), json!([]));
}

#[test]
fn test_combined_masks() {
    check("@[@ > 1 & @ < 4]", json!([1, 2, 3, 4]), json!([2, 3]));
    check("@[@ < 2 | @ > 3]", json!([1, 2, 3, 4]), json!([1, 4]));
}

#[test]
fn test_filter_then_project() {
    let store = json!({
        "books": [
            {"title": "Sayings of the Century", "price": 9},
            {"title": "Sword of Honour", "price": 13},
            {"title": "Moby Dick", "price": 8}
        ]
    });
    check(
        "@.books[@[*].price < 10].title",
        store,
        json!(["Sayings of the Century", "Moby Dick"]),
    );
}

// ---------------------------------------------------------------- Operators

#[test]
fn test_vectorized_addition() {
    check(
        "@.a + @.b",
        json!({"a": [1, 2, 3], "b": [10, 20, 30]}),
        json!([11, 22, 33]),
    );
}

#[test]
fn test_container_scalar_symmetry() {
    check("@ * 2", json!([1, 2, 3]), json!([2, 4, 6]));
    check("2 * @", json!([1, 2, 3]), json!([2, 4, 6]));
    check("@ + 1", json!({"x": 1, "y": 2}), json!({"x": 2, "y": 3}));
}

#[test]
fn test_object_object_arithmetic() {
    check(
        "@.a + @.b",
        json!({"a": {"x": 1, "y": 2}, "b": {"x": 10, "y": 20}}),
        json!({"x": 11, "y": 22}),
    );
}

#[test]
fn test_nested_vectorization() {
    check("@ * 10", json!([[1, 2], [3]]), json!([[10, 20], [30]]));
}

#[test]
fn test_precedence() {
    check("1 + 2 * 3", json!(null), json!(7));
    check("(1 + 2) * 3", json!(null), json!(9));
    check("2 ** 3 ** 2", json!(null), json!(512));
    check("10 - 4 - 3", json!(null), json!(3));
    check("1 + 2 * 3 * 4", json!(null), json!(25));
}

#[test]
fn test_unary_minus_binds_looser_than_exponent() {
    check("-2 ** 2", json!(null), json!(-4));
    check("(-2) ** 2", json!(null), json!(4));
    check("-@ ** 2", json!([1, 2, 3]), json!([-1, -4, -9]));
}

#[test]
fn test_division_kinds() {
    check("@ / 2", json!(5), json!(2.5));
    check("@ // 2", json!(5), json!(2));
    check("7 % 3", json!(null), json!(1));
    check("-7 % 3", json!(null), json!(2));
}

#[test]
fn test_string_concat() {
    check(
        "@.first + ' ' + @.last",
        json!({"first": "Ada", "last": "Lovelace"}),
        json!("Ada Lovelace"),
    );
}

#[test]
fn test_comparisons() {
    check("@ == 2", json!(2), json!(true));
    check("@ != 2", json!([1, 2]), json!([true, false]));
    check("@.a <= @.b", json!({"a": 3, "b": 3}), json!(true));
    check("'abc' < 'abd'", json!(null), json!(true));
}

#[test]
fn test_bitwise_and_logical() {
    check("6 & 3", json!(null), json!(2));
    check("6 | 1", json!(null), json!(7));
    check("6 ^ 3", json!(null), json!(5));
    check("true & false", json!(null), json!(false));
    check("true ^ true", json!(null), json!(false));
}

// ---------------------------------------------------------------- Functions

#[test]
fn test_len() {
    check("len(@)", json!([1, 2, 3]), json!(3));
    check("len(@)", json!({"a": 1}), json!(1));
    check("len(@.name)", json!({"name": "Ada"}), json!(3));
}

#[test]
fn test_sum_avg() {
    check("sum(@)", json!([1, 2, 3]), json!(6));
    check("sum(@)", json!({"a": 1.5, "b": 2.5}), json!(4.0));
    check("avg(@)", json!([1, 2, 3]), json!(2.0));
}

#[test]
fn test_min_max() {
    check("min(@)", json!([3, 1, 2]), json!(1));
    check("max(@)", json!([3, 1, 2]), json!(3));
    check("min(@, 0)", json!(5), json!(0));
    check("max(@.a, @.b, 10)", json!({"a": 3, "b": 7}), json!(10));
}

#[test]
fn test_vectorized_functions() {
    check("abs(@)", json!([-1, 2, -3]), json!([1, 2, 3]));
    check("abs(@)", json!({"a": -1.5}), json!({"a": 1.5}));
    check("str(@)", json!([1, 2]), json!(["1", "2"]));
    check("s_mul(@, 3)", json!(["a", "b"]), json!(["aaa", "bbb"]));
}

#[test]
fn test_rounding() {
    check("round(@)", json!(2.6), json!(3));
    check("round(@, 1)", json!(2.25), json!(2.3));
    check("floor(@)", json!(2.9), json!(2));
    check("ceil(@)", json!(2.1), json!(3));
}

#[test]
fn test_conversions() {
    check("int(@)", json!("42"), json!(42));
    check("int(@)", json!(2.9), json!(2));
    check("float(@)", json!("2.5"), json!(2.5));
    check("str(@)", json!(42), json!("42"));
}

#[test]
fn test_string_functions() {
    check("upper(@)", json!("ada"), json!("ADA"));
    check("lower(@)", json!("ADA"), json!("ada"));
    check("s_mul(@, 3)", json!("ab"), json!("ababab"));
    check("split(@)", json!("a b  c"), json!(["a", "b", "c"]));
    check("split(@, ',')", json!("a,b"), json!(["a", "b"]));
    check("join(@, '-')", json!(["a", "b"]), json!("a-b"));
}

#[test]
fn test_container_functions() {
    check("keys(@)", json!({"a": 1, "b": 2}), json!(["a", "b"]));
    check("values(@)", json!({"a": 1, "b": 2}), json!([1, 2]));
    check("rev(@)", json!([1, 2, 3]), json!([3, 2, 1]));
    check("sort(@)", json!([3, 1, 2]), json!([1, 2, 3]));
    check("contains(@, 2)", json!([1, 2]), json!(true));
    check("contains(@, 'x')", json!({"x": 1}), json!(true));
    check("contains(@, 'ell')", json!("hello"), json!(true));
}

#[test]
fn test_nested_calls() {
    check("len(split(@, ','))", json!("a,b,c"), json!(3));
    check("sum(@) / len(@)", json!([1, 2, 3, 4]), json!(2.5));
}

#[test]
fn test_rand_draws_fresh_values() {
    let q = json_query::compile("rand()").unwrap();
    for _ in 0..4 {
        let v = q.eval(&serde_json::json!(null)).unwrap();
        let f = v.as_f64().expect("rand() yields a float");
        assert!((0.0..1.0).contains(&f));
    }
}

// -------------------------------------------------------------- Projections

#[test]
fn test_array_projection() {
    check(
        "@{@.a + @.b, @.a * @.b}",
        json!({"a": 1, "b": 2}),
        json!([3, 2]),
    );
}

#[test]
fn test_object_projection() {
    check(
        "@{sum: @.a + @.b, diff: @.a - @.b}",
        json!({"a": 5, "b": 3}),
        json!({"sum": 8, "diff": 2}),
    );
}

#[test]
fn test_projection_mixes_functions_and_indexers() {
    check(
        "@{n: len(@), first: @[0]}",
        json!([5, 6]),
        json!({"n": 2, "first": 5}),
    );
}

#[test]
fn test_projection_output_can_be_indexed() {
    check("@{@.a, @.b}[0]", json!({"a": 5, "b": 3}), json!(5));
}

// ------------------------------------------------------------------- Errors

#[test]
fn test_mixed_bracket_entries() {
    assert!(matches!(
        check_err("@['a', 0]", json!({})),
        Error::MixedBracket
    ));
}

#[test]
fn test_recursive_slice_throws() {
    assert!(matches!(
        check_err("@..[0]", json!([])),
        Error::RecursiveKind(_)
    ));
}

#[test]
fn test_length_mismatch_throws() {
    assert!(matches!(
        check_err("@.a + @.b", json!({"a": [1], "b": [1, 2]})),
        Error::VectorizedArithmetic(_)
    ));
}

#[test]
fn test_key_set_mismatch_throws() {
    assert!(matches!(
        check_err("@.a + @.b", json!({"a": {"x": 1}, "b": {"y": 1}})),
        Error::VectorizedArithmetic(_)
    ));
}

#[test]
fn test_object_array_mix_throws() {
    assert!(matches!(
        check_err("@.a + @.b", json!({"a": {"x": 1}, "b": [1]})),
        Error::Type(_)
    ));
}

#[test]
fn test_non_boolean_mask_throws() {
    assert!(matches!(
        check_err("@[@ * 1]", json!([1, 2])),
        Error::VectorizedArithmetic(_)
    ));
}

#[test]
fn test_mask_shape_mismatch_throws() {
    assert!(matches!(
        check_err("@[@.flags]", json!({"flags": [true]})),
        Error::VectorizedArithmetic(_)
    ));
}

#[test]
fn test_operand_type_errors() {
    assert!(matches!(check_err("'a' + 1", json!(null)), Error::Type(_)));
    assert!(matches!(check_err("@ + 'x'", json!(1)), Error::Type(_)));
    assert!(matches!(check_err("1.5 & 2.5", json!(null)), Error::Type(_)));
    assert!(matches!(check_err("1 / 0", json!(null)), Error::Type(_)));
}

#[test]
fn test_indexing_wrong_container_throws() {
    assert!(matches!(check_err("@.a", json!([1, 2])), Error::Type(_)));
    assert!(matches!(check_err("@[0]", json!({"a": 1})), Error::Type(_)));
}

#[test]
fn test_unknown_function_and_arity() {
    assert!(matches!(
        check_err("nope(@)", json!(null)),
        Error::UnknownFunction(_)
    ));
    assert!(matches!(
        check_err("len(@, @)", json!([1])),
        Error::Arity { .. }
    ));
    assert!(matches!(
        check_err("abs('x')", json!(null)),
        Error::ArgType { .. }
    ));
}

#[test]
fn test_errors_render_single_line() {
    let err = check_err("@['a', 0]", json!({}));
    let msg = err.to_string();
    assert!(!msg.is_empty());
    assert!(!msg.contains('\n'));
}

// ---------------------------------------------------------------- Reuse

#[test]
fn test_compiled_queries_are_pure() {
    let q = json_query::compile("sum(@) + len(@)").unwrap();
    let input = json!([1, 2, 3]);
    assert_eq!(q.eval(&input).unwrap(), q.eval(&input).unwrap());
    assert_eq!(q.eval(&input).unwrap(), json!(9));
}
