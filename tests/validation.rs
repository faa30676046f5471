//! End-to-end validation behavior through the public API.
use jsonschema_tree::{Schema, ValidationOptions};
use serde_json::{json, Value};
use test_case::test_case;

// The boolean verdict and the collected error list always agree.
#[test_case(&json!({"type": "integer", "multipleOf": 3}), &json!(9))]
#[test_case(&json!({"type": "integer", "multipleOf": 3}), &json!(10))]
#[test_case(&json!({"allOf": [{"minimum": 0}, {"maximum": 10}]}), &json!(5))]
#[test_case(&json!({"allOf": [{"minimum": 0}, {"maximum": 10}]}), &json!(11))]
#[test_case(&json!({"if": {"type": "integer"}, "then": {"minimum": 0}, "else": {"type": "string"}}), &json!(-1))]
#[test_case(&json!({"if": {"type": "integer"}, "then": {"minimum": 0}, "else": {"type": "string"}}), &json!("foo"))]
#[test_case(&json!({"if": {"type": "integer"}, "then": {"minimum": 0}, "else": {"type": "string"}}), &json!(1.5))]
#[test_case(&json!({"items": [{"type": "integer"}, {"type": "string"}], "additionalItems": false}), &json!([1, "a", true]))]
#[test_case(&json!({"properties": {"a": {"oneOf": [{"type": "null"}, {"minimum": 3}]}}}), &json!({"a": 1}))]
fn verdict_matches_error_list(schema: &Value, instance: &Value) {
    let compiled = Schema::compile(schema).unwrap();
    assert_eq!(
        compiled.is_valid(instance),
        compiled.validate(instance).is_ok()
    );
}

#[test]
fn conditional_scenarios() {
    let schema = json!({
        "if": {"type": "integer"},
        "then": {"minimum": 0},
        "else": {"type": "string"}
    });
    let compiled = Schema::compile(&schema).unwrap();
    assert!(!compiled.is_valid(&json!(-1)));
    assert!(compiled.is_valid(&json!("foo")));
    assert!(!compiled.is_valid(&json!(1.5)));
}

#[test]
fn error_fields_and_display() {
    let schema = json!({"properties": {"a": {"type": "integer"}}});
    let compiled = Schema::compile(&schema).unwrap();
    let errors = compiled.validate(&json!({"a": "x"})).unwrap_err();
    assert_eq!(errors.len(), 1);
    let error = &errors[0];
    assert_eq!(error.instance_path, "/a");
    assert_eq!(error.schema_path, "/properties/a/type");
    assert_eq!(error.to_string(), format!("/a: {}", error.message));

    let errors = compiled
        .validate(&json!("not even an object"))
        .err()
        .unwrap_or_default();
    assert!(errors.is_empty(), "no type constraint at the root");
}

#[test]
fn root_errors_display_as_root() {
    let compiled = Schema::compile(&json!({"type": "integer"})).unwrap();
    let errors = compiled.validate(&json!("x")).unwrap_err();
    assert!(errors[0].to_string().starts_with("# (root): "));
    assert_eq!(errors[0].instance_path, "");
}

#[test]
fn fast_fail_mode_is_the_default_option() {
    let options = ValidationOptions::default();
    assert!(!options.report_multiple_errors);
    assert!(!options.parse_json);
    assert_eq!(options.validate_formats, None);
}

// `required` only accepts objects carrying every listed key.
#[test_case(&json!({"name": "a", "age": 1}), true)]
#[test_case(&json!({"name": "a"}), false)]
#[test_case(&json!({"age": 1}), false)]
#[test_case(&json!({}), false)]
fn required_needs_every_key(instance: &Value, expected: bool) {
    let compiled = Schema::compile(&json!({"required": ["name", "age"]})).unwrap();
    assert_eq!(compiled.is_valid(instance), expected);
}

// {type: integer, multipleOf: k} accepts exactly the multiples of k.
#[test_case(0, true; "zero")]
#[test_case(7, true; "positive_multiple")]
#[test_case(-14, true; "negative_multiple")]
#[test_case(5, false; "positive_non_multiple")]
#[test_case(-5, false; "negative_non_multiple")]
fn integer_multiples(n: i64, expected: bool) {
    let compiled = Schema::compile(&json!({"type": "integer", "multipleOf": 7})).unwrap();
    assert_eq!(compiled.is_valid(&json!(n)), expected);
}

// Codepoint-based length bounds.
#[test_case("ab", true)]
#[test_case("日本語", true)]
#[test_case("a", false)]
#[test_case("日本語です!", false)]
fn length_bounds(instance: &str, expected: bool) {
    let compiled = Schema::compile(&json!({
        "type": "string", "minLength": 2, "maxLength": 4
    }))
    .unwrap();
    assert_eq!(compiled.is_valid(&json!(instance)), expected);
}

#[test]
fn unique_items_rejects_exactly_duplicate_pairs() {
    let compiled = Schema::compile(&json!({"uniqueItems": true})).unwrap();
    assert!(compiled.is_valid(&json!([])));
    assert!(compiled.is_valid(&json!([1, 2, 3])));
    assert!(compiled.is_valid(&json!([{"a": 1}, {"a": 2}])));
    assert!(!compiled.is_valid(&json!([{"a": 1}, {"a": 1.0}])));
    assert!(!compiled.is_valid(&json!([[1, 2], [1.0, 2.0]])));
}

#[test]
fn not_acceptance_round_trip() {
    // not(not(S)) matches S in acceptance, not in error output.
    let plain = Schema::compile(&json!({"type": "integer"})).unwrap();
    let doubled = Schema::compile(&json!({"not": {"not": {"type": "integer"}}})).unwrap();
    for instance in [json!(1), json!(1.5), json!("x"), json!(null)] {
        assert_eq!(plain.is_valid(&instance), doubled.is_valid(&instance));
    }
    let plain_errors = plain.validate(&json!("x")).unwrap_err();
    let doubled_errors = doubled.validate(&json!("x")).unwrap_err();
    assert_ne!(plain_errors, doubled_errors);
}

#[test]
fn validation_does_not_mutate_the_schema() {
    // Repeated and interleaved calls over one compiled schema are stable.
    let compiled = Schema::compile(&json!({
        "properties": {"a": {"$ref": "#/definitions/n"}},
        "definitions": {"n": {"minimum": 3}}
    }))
    .unwrap();
    for _ in 0..3 {
        assert!(compiled.is_valid(&json!({"a": 4})));
        assert!(!compiled.is_valid(&json!({"a": 1})));
        assert_eq!(compiled.validate(&json!({"a": 1})).unwrap_err().len(), 1);
    }
}

#[test]
fn shared_across_threads() {
    let compiled = Schema::compile(&json!({"type": "integer"})).unwrap();
    let other = compiled.clone();
    let handle = std::thread::spawn(move || other.is_valid(&json!(3)));
    assert!(compiled.is_valid(&json!(4)));
    assert!(handle.join().unwrap());
}
