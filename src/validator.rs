//! The validation interpreter: executes a compiled node tree against an
//! instance, accumulating errors with instance and schema JSON Pointers.
//!
//! Fast-fail mode unwinds through the dedicated [`FastFail`] signal instead
//! of threading a flag through every call, so the single-error path costs
//! only the depth of the first failure.
use serde_json::{Map, Value};

use crate::{
    error::{FastFail, SchemaError, ValidationError, ValidationStep},
    helpers::{equal, join_index, join_key},
    schema::{
        node::{BoolOrNode, Dependency, Form, Items, NodeId, ObjectSchema},
        RootSchema, Schema,
    },
};

/// Options for a single validation call.
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Collect every violation instead of stopping at the first one.
    pub report_multiple_errors: bool,
    /// Decode string instances as JSON before validating.
    pub parse_json: bool,
    /// Override whether `format` is an assertion; `None` follows the
    /// compiled schema's default.
    pub validate_formats: Option<bool>,
}

impl ValidationOptions {
    pub(crate) fn collect_all() -> ValidationOptions {
        ValidationOptions {
            report_multiple_errors: true,
            ..ValidationOptions::default()
        }
    }
}

pub(crate) fn is_valid(schema: &Schema, instance: &Value) -> bool {
    let mut validator = Validator {
        root: &schema.root,
        errors: Vec::new(),
        report_multiple_errors: false,
        validate_formats: schema.root.validate_formats,
    };
    validator.validate_node(schema.node, instance, "").is_ok()
}

pub(crate) fn validate(
    schema: &Schema,
    instance: &Value,
    options: &ValidationOptions,
) -> Result<Vec<ValidationError>, SchemaError> {
    let decoded;
    let instance = if options.parse_json {
        if let Value::String(text) = instance {
            decoded = serde_json::from_str(text).map_err(SchemaError::InvalidJsonInput)?;
            &decoded
        } else {
            instance
        }
    } else {
        instance
    };
    let mut validator = Validator {
        root: &schema.root,
        errors: Vec::new(),
        report_multiple_errors: options.report_multiple_errors,
        validate_formats: options
            .validate_formats
            .unwrap_or(schema.root.validate_formats),
    };
    let _ = validator.validate_node(schema.node, instance, "");
    Ok(validator.errors)
}

struct Validator<'a> {
    root: &'a RootSchema,
    errors: Vec<ValidationError>,
    report_multiple_errors: bool,
    validate_formats: bool,
}

impl<'a> Validator<'a> {
    /// Record one violation. In fast-fail mode the recorded error unwinds
    /// the traversal.
    fn error(
        &mut self,
        instance_path: &str,
        schema_path: String,
        message: String,
    ) -> ValidationStep {
        self.errors
            .push(ValidationError::new(instance_path, schema_path, message));
        if self.report_multiple_errors {
            Ok(())
        } else {
            Err(FastFail)
        }
    }

    /// Evaluate a sub-schema in a scratch validator whose errors are
    /// discarded.
    fn branch_is_valid(&self, node: NodeId, instance: &Value) -> bool {
        let mut scratch = Validator {
            root: self.root,
            errors: Vec::new(),
            report_multiple_errors: false,
            validate_formats: self.validate_formats,
        };
        scratch.validate_node(node, instance, "").is_ok()
    }

    /// Evaluate a sub-schema in a scratch validator, returning everything it
    /// collected.
    fn branch_errors(
        &self,
        node: NodeId,
        instance: &Value,
        instance_path: &str,
    ) -> Vec<ValidationError> {
        let mut scratch = Validator {
            root: self.root,
            errors: Vec::new(),
            report_multiple_errors: true,
            validate_formats: self.validate_formats,
        };
        let _ = scratch.validate_node(node, instance, instance_path);
        scratch.errors
    }

    fn validate_node(
        &mut self,
        id: NodeId,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let node = &self.root.nodes[id.0];
        let object = match &node.form {
            Form::Boolean(true) => return Ok(()),
            Form::Boolean(false) => {
                let path = node.path.clone();
                return self.error(instance_path, path, "schema never validates".to_string());
            }
            Form::Object(object) => object,
        };
        if object.ref_target.is_some() {
            // Compilation proved the chain resolvable and acyclic.
            let target = object.ref_resolved.expect("Resolved during compilation");
            return self.validate_node(target, instance, instance_path);
        }
        let schema_path = &node.path;

        self.check_conditional(object, instance, instance_path)?;
        self.check_types(object, schema_path, instance, instance_path)?;
        self.check_const(object, schema_path, instance, instance_path)?;
        self.check_enum(object, schema_path, instance, instance_path)?;
        match instance {
            Value::Array(items) => {
                self.check_array(object, schema_path, items, instance, instance_path)?;
            }
            Value::String(string) => {
                self.check_string(object, schema_path, string, instance, instance_path)?;
            }
            Value::Number(_) => {
                self.check_number(object, schema_path, instance, instance_path)?;
            }
            _ => {}
        }
        self.check_all_of(object, schema_path, instance, instance_path)?;
        self.check_any_of(object, schema_path, instance, instance_path)?;
        self.check_one_of(object, schema_path, instance, instance_path)?;
        self.check_not(object, schema_path, instance, instance_path)?;
        self.check_format(object, schema_path, instance, instance_path)?;
        if let Value::Object(map) = instance {
            self.check_object(object, schema_path, map, instance, instance_path)?;
        }
        Ok(())
    }

    /// `if`/`then`/`else`: the condition runs in a scratch validator; the
    /// applied branch contributes its errors to the outer list.
    fn check_conditional(
        &mut self,
        object: &ObjectSchema,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let Some(condition) = object.if_ else {
            return Ok(());
        };
        if self.branch_is_valid(condition, instance) {
            if let Some(then) = object.then {
                self.validate_node(then, instance, instance_path)?;
            }
        } else if let Some(otherwise) = object.else_ {
            self.validate_node(otherwise, instance, instance_path)?;
        }
        Ok(())
    }

    fn check_types(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let Some(types) = &object.types else {
            return Ok(());
        };
        if types
            .iter()
            .any(|expected| expected.contains(self.root.draft, instance))
        {
            return Ok(());
        }
        let message = if let [expected] = types.as_slice() {
            format!("{} is not of type '{}'", instance, expected)
        } else {
            format!(
                "{} is not of types {}",
                instance,
                types
                    .iter()
                    .map(|expected| format!("'{}'", expected))
                    .collect::<Vec<String>>()
                    .join(", ")
            )
        };
        self.error(instance_path, join_key(schema_path, "type"), message)
    }

    fn check_const(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let Some(expected) = &object.const_ else {
            return Ok(());
        };
        if equal(expected, instance) {
            return Ok(());
        }
        self.error(
            instance_path,
            join_key(schema_path, "const"),
            format!("{} was expected", expected),
        )
    }

    fn check_enum(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let Some(members) = &object.enum_ else {
            return Ok(());
        };
        if members.iter().any(|member| equal(member, instance)) {
            return Ok(());
        }
        self.error(
            instance_path,
            join_key(schema_path, "enum"),
            format!(
                "{} is not one of {}",
                instance,
                Value::Array(members.clone())
            ),
        )
    }

    fn check_array(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        items: &[Value],
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        match &object.items {
            Some(Items::Single(node)) => {
                for (index, item) in items.iter().enumerate() {
                    self.validate_node(*node, item, &join_index(instance_path, index))?;
                }
            }
            Some(Items::Tuple(nodes)) => {
                for (index, (node, item)) in nodes.iter().zip(items).enumerate() {
                    self.validate_node(*node, item, &join_index(instance_path, index))?;
                }
                if items.len() > nodes.len() {
                    match &object.additional_items {
                        Some(BoolOrNode::Node(node)) => {
                            for (index, item) in items.iter().enumerate().skip(nodes.len()) {
                                self.validate_node(*node, item, &join_index(instance_path, index))?;
                            }
                        }
                        Some(BoolOrNode::Bool(false)) => {
                            let extras = items
                                .iter()
                                .skip(nodes.len())
                                .map(Value::to_string)
                                .collect::<Vec<String>>()
                                .join(", ");
                            let verb = if items.len() - nodes.len() == 1 {
                                "was"
                            } else {
                                "were"
                            };
                            self.error(
                                instance_path,
                                join_key(schema_path, "additionalItems"),
                                format!("additional items are not allowed ({} {} unexpected)", extras, verb),
                            )?;
                        }
                        Some(BoolOrNode::Bool(true)) | None => {}
                    }
                }
            }
            None => {}
        }
        if let Some(limit) = object.max_items {
            if items.len() as u64 > limit {
                self.error(
                    instance_path,
                    join_key(schema_path, "maxItems"),
                    format!(
                        "{} has more than {} item{}",
                        instance,
                        limit,
                        if limit == 1 { "" } else { "s" }
                    ),
                )?;
            }
        }
        if let Some(limit) = object.min_items {
            if (items.len() as u64) < limit {
                self.error(
                    instance_path,
                    join_key(schema_path, "minItems"),
                    format!(
                        "{} has less than {} item{}",
                        instance,
                        limit,
                        if limit == 1 { "" } else { "s" }
                    ),
                )?;
            }
        }
        if object.unique_items {
            if let Some((first, second)) = first_equal_pair(items) {
                self.error(
                    instance_path,
                    join_key(schema_path, "uniqueItems"),
                    format!("elements at positions {} and {} are equal", first, second),
                )?;
            }
        }
        if let Some(node) = object.contains {
            // Errors from unsatisfying elements are not surfaced.
            if !items.iter().any(|item| self.branch_is_valid(node, item)) {
                self.error(
                    instance_path,
                    join_key(schema_path, "contains"),
                    format!("none of {} are valid under the given schema", instance),
                )?;
            }
        }
        Ok(())
    }

    fn check_string(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        string: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        if object.min_length.is_some() || object.max_length.is_some() {
            // Unicode scalar values, not UTF-16 code units.
            let length = string.chars().count() as u64;
            if let Some(limit) = object.max_length {
                if length > limit {
                    self.error(
                        instance_path,
                        join_key(schema_path, "maxLength"),
                        format!(
                            "{} is longer than {} character{}",
                            instance,
                            limit,
                            if limit == 1 { "" } else { "s" }
                        ),
                    )?;
                }
            }
            if let Some(limit) = object.min_length {
                if length < limit {
                    self.error(
                        instance_path,
                        join_key(schema_path, "minLength"),
                        format!(
                            "{} is shorter than {} character{}",
                            instance,
                            limit,
                            if limit == 1 { "" } else { "s" }
                        ),
                    )?;
                }
            }
        }
        if let Some(pattern) = &object.pattern {
            if !pattern.is_match(string) {
                self.error(
                    instance_path,
                    join_key(schema_path, "pattern"),
                    format!("{} does not match '{}'", instance, pattern.as_str()),
                )?;
            }
        }
        Ok(())
    }

    fn check_number(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let value = instance.as_f64().expect("Always a number");
        // The exclusive bound wins when both are present.
        if let Some(limit) = object.exclusive_maximum {
            if value >= limit {
                self.error(
                    instance_path,
                    join_key(schema_path, "exclusiveMaximum"),
                    format!(
                        "{} is greater than or equal to the maximum of {}",
                        instance, limit
                    ),
                )?;
            }
        } else if let Some(limit) = object.maximum {
            if value > limit {
                self.error(
                    instance_path,
                    join_key(schema_path, "maximum"),
                    format!("{} is greater than the maximum of {}", instance, limit),
                )?;
            }
        }
        if let Some(limit) = object.exclusive_minimum {
            if value <= limit {
                self.error(
                    instance_path,
                    join_key(schema_path, "exclusiveMinimum"),
                    format!(
                        "{} is less than or equal to the minimum of {}",
                        instance, limit
                    ),
                )?;
            }
        } else if let Some(limit) = object.minimum {
            if value < limit {
                self.error(
                    instance_path,
                    join_key(schema_path, "minimum"),
                    format!("{} is less than the minimum of {}", instance, limit),
                )?;
            }
        }
        if let Some(factor) = &object.multiple_of {
            let divisible = match (integral(instance), integral_number(factor)) {
                (Some(value), Some(factor)) => value % factor == 0,
                _ => {
                    let factor = factor.as_f64().expect("Always a number");
                    (value / factor).fract() == 0.
                }
            };
            if !divisible {
                self.error(
                    instance_path,
                    join_key(schema_path, "multipleOf"),
                    format!("{} is not a multiple of {}", instance, factor),
                )?;
            }
        }
        Ok(())
    }

    fn check_all_of(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let Some(branches) = &object.all_of else {
            return Ok(());
        };
        let mut violated = false;
        for branch in branches {
            let before = self.errors.len();
            self.validate_node(*branch, instance, instance_path)?;
            if self.errors.len() > before {
                violated = true;
            }
        }
        if violated {
            self.error(
                instance_path,
                join_key(schema_path, "allOf"),
                format!("{} is not valid under all of the given schemas", instance),
            )?;
        }
        Ok(())
    }

    fn check_any_of(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let Some(branches) = &object.any_of else {
            return Ok(());
        };
        let mut inner = Vec::new();
        for branch in branches {
            if self.report_multiple_errors {
                let errors = self.branch_errors(*branch, instance, instance_path);
                if errors.is_empty() {
                    return Ok(());
                }
                inner.extend(errors);
            } else if self.branch_is_valid(*branch, instance) {
                return Ok(());
            }
        }
        self.errors.append(&mut inner);
        self.error(
            instance_path,
            join_key(schema_path, "anyOf"),
            format!("{} is not valid under any of the given schemas", instance),
        )
    }

    fn check_one_of(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let Some(branches) = &object.one_of else {
            return Ok(());
        };
        let mut matched = 0usize;
        let mut inner = Vec::new();
        for branch in branches {
            if self.report_multiple_errors {
                let errors = self.branch_errors(*branch, instance, instance_path);
                if errors.is_empty() {
                    matched += 1;
                } else {
                    inner.extend(errors);
                }
            } else if self.branch_is_valid(*branch, instance) {
                matched += 1;
                if matched > 1 {
                    break;
                }
            }
        }
        if matched == 1 {
            return Ok(());
        }
        let message = if matched == 0 {
            self.errors.append(&mut inner);
            format!("{} is not valid under any of the given schemas", instance)
        } else {
            format!(
                "{} is valid under more than one of the given schemas",
                instance
            )
        };
        self.error(instance_path, join_key(schema_path, "oneOf"), message)
    }

    fn check_not(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        let Some(negated) = object.not else {
            return Ok(());
        };
        if self.branch_is_valid(negated, instance) {
            self.error(
                instance_path,
                join_key(schema_path, "not"),
                format!("{} is valid under the schema it must not match", instance),
            )?;
        }
        Ok(())
    }

    fn check_format(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        if !self.validate_formats {
            return Ok(());
        }
        let (Some(format), Value::String(string)) = (&object.format, instance) else {
            return Ok(());
        };
        // Unknown formats are ignored.
        if let Some(false) = self.root.formats.check(self.root.draft, format, string) {
            self.error(
                instance_path,
                join_key(schema_path, "format"),
                format!("{} is not a '{}'", instance, format),
            )?;
        }
        Ok(())
    }

    fn check_object(
        &mut self,
        object: &ObjectSchema,
        schema_path: &str,
        map: &Map<String, Value>,
        instance: &Value,
        instance_path: &str,
    ) -> ValidationStep {
        if let Some(limit) = object.max_properties {
            if map.len() as u64 > limit {
                self.error(
                    instance_path,
                    join_key(schema_path, "maxProperties"),
                    format!(
                        "{} has more than {} propert{}",
                        instance,
                        limit,
                        if limit == 1 { "y" } else { "ies" }
                    ),
                )?;
            }
        }
        if let Some(limit) = object.min_properties {
            if (map.len() as u64) < limit {
                self.error(
                    instance_path,
                    join_key(schema_path, "minProperties"),
                    format!(
                        "{} has less than {} propert{}",
                        instance,
                        limit,
                        if limit == 1 { "y" } else { "ies" }
                    ),
                )?;
            }
        }
        if let Some(required) = &object.required {
            for name in required {
                if !map.contains_key(name) {
                    self.error(
                        instance_path,
                        join_key(schema_path, "required"),
                        format!("'{}' is a required property", name),
                    )?;
                }
            }
        }
        for (key, value) in map {
            let child_path = join_key(instance_path, key);
            if let Some(names) = object.property_names {
                let name = Value::String(key.clone());
                self.validate_node(names, &name, &child_path)?;
            }
            let mut covered = false;
            if let Some(node) = object.property(key) {
                self.validate_node(node, value, &child_path)?;
                covered = true;
            }
            if let Some(patterns) = &object.pattern_properties {
                for (pattern, node) in patterns {
                    if pattern.is_match(key) {
                        self.validate_node(*node, value, &child_path)?;
                        covered = true;
                    }
                }
            }
            if !covered {
                match &object.additional_properties {
                    Some(BoolOrNode::Node(node)) => {
                        self.validate_node(*node, value, &child_path)?;
                    }
                    Some(BoolOrNode::Bool(false)) => {
                        self.error(
                            &child_path,
                            join_key(schema_path, "additionalProperties"),
                            format!("additional properties are not allowed ('{}' was unexpected)", key),
                        )?;
                    }
                    Some(BoolOrNode::Bool(true)) | None => {}
                }
            }
        }
        if let Some(dependencies) = &object.dependencies {
            for (key, dependency) in dependencies {
                if !map.contains_key(key) {
                    continue;
                }
                match dependency {
                    Dependency::Keys(keys) => {
                        for needed in keys {
                            if !map.contains_key(needed) {
                                self.error(
                                    instance_path,
                                    join_key(schema_path, "dependencies"),
                                    format!(
                                        "'{}' must be present when '{}' is present",
                                        needed, key
                                    ),
                                )?;
                            }
                        }
                    }
                    Dependency::Node(node) => {
                        // The entire instance must additionally validate.
                        self.validate_node(*node, instance, instance_path)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn first_equal_pair(items: &[Value]) -> Option<(usize, usize)> {
    for (first, left) in items.iter().enumerate() {
        for (offset, right) in items[first + 1..].iter().enumerate() {
            if equal(left, right) {
                return Some((first, first + 1 + offset));
            }
        }
    }
    None
}

fn integral(instance: &Value) -> Option<i128> {
    match instance {
        Value::Number(number) => integral_number(number),
        _ => None,
    }
}

fn integral_number(number: &serde_json::Number) -> Option<i128> {
    if let Some(value) = number.as_i64() {
        Some(i128::from(value))
    } else if let Some(value) = number.as_u64() {
        Some(i128::from(value))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::{tests_util, Draft, Schema, ValidationOptions};
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"type": "string"}), &json!("foo"))]
    #[test_case(&json!({"type": ["integer", "null"]}), &json!(null))]
    #[test_case(&json!({"type": "integer"}), &json!(3.0); "integral float is an integer")]
    #[test_case(&json!({"type": "number"}), &json!(42))]
    #[test_case(&json!({"const": null}), &json!(null))]
    #[test_case(&json!({"const": 0.0}), &json!(0))]
    #[test_case(&json!({"enum": [1, "two"]}), &json!("two"))]
    #[test_case(&json!({"enum": [[1.0]]}), &json!([1]))]
    #[test_case(&json!({"minimum": 2}), &json!(2))]
    #[test_case(&json!({"maximum": 2, "exclusiveMaximum": 3}), &json!(2.5); "exclusive bound wins")]
    #[test_case(&json!({"multipleOf": 2}), &json!(-4))]
    #[test_case(&json!({"multipleOf": 1.5}), &json!(4.5))]
    #[test_case(&json!({"minLength": 2, "maxLength": 2}), &json!("日本"); "length in scalar values")]
    #[test_case(&json!({"pattern": "a+"}), &json!("xxaxx"); "pattern is unanchored")]
    #[test_case(&json!({"items": {"type": "integer"}}), &json!([1, 2]))]
    #[test_case(&json!({"items": [{"type": "integer"}], "additionalItems": {"type": "string"}}), &json!([1, "a"]))]
    #[test_case(&json!({"uniqueItems": true}), &json!([1, "1", [1], {"a": 1}]))]
    #[test_case(&json!({"contains": {"minimum": 5}}), &json!([1, 7]))]
    #[test_case(&json!({"required": []}), &json!({}))]
    #[test_case(&json!({"properties": {"a": {"type": "integer"}}}), &json!({"a": 3}))]
    #[test_case(&json!({"patternProperties": {"^x": {"type": "integer"}}}), &json!({"x1": 3, "y": "s"}))]
    #[test_case(&json!({"propertyNames": {"maxLength": 3}}), &json!({"abc": 1}))]
    #[test_case(&json!({"dependencies": {"a": ["b"]}}), &json!({"b": 1}))]
    #[test_case(&json!({"dependencies": {"a": {"required": ["b"]}}}), &json!({"a": 1, "b": 2}))]
    #[test_case(&json!({"allOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(3))]
    #[test_case(&json!({"anyOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(1))]
    #[test_case(&json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(1))]
    #[test_case(&json!({"not": {"type": "integer"}}), &json!("x"))]
    #[test_case(&json!({"not": {"not": {"type": "integer"}}}), &json!(3); "double negation accepts")]
    #[test_case(&json!({"if": {"type": "integer"}, "then": {"minimum": 0}}), &json!(1))]
    #[test_case(&json!({"if": {"type": "integer"}, "else": {"type": "string"}}), &json!("foo"))]
    #[test_case(&json!({"if": {"type": "integer"}}), &json!(-1.5); "bare if does nothing")]
    #[test_case(&json!({"format": "ipv4"}), &json!(17); "formats skip non-strings")]
    #[test_case(&json!({"format": "no-such-format"}), &json!("anything"); "unknown formats are ignored")]
    #[test_case(&json!({"format": "idn-email"}), &json!("not an email"); "idn-email is unchecked")]
    #[test_case(&json!(true), &json!({"anything": "goes"}))]
    fn accepted(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance)
    }

    #[test_case(&json!({"type": "integer"}), &json!(1.1))]
    #[test_case(&json!({"type": ["integer", "string"]}), &json!(null))]
    #[test_case(&json!({"const": null}), &json!(0))]
    #[test_case(&json!({"enum": [1, "two"]}), &json!(2))]
    #[test_case(&json!({"minimum": 2}), &json!(1.9))]
    #[test_case(&json!({"exclusiveMinimum": 2}), &json!(2))]
    #[test_case(&json!({"exclusiveMaximum": 3.0}), &json!(3.0))]
    #[test_case(&json!({"multipleOf": 2}), &json!(7))]
    #[test_case(&json!({"multipleOf": 1.5}), &json!(4))]
    #[test_case(&json!({"minLength": 2}), &json!("f"))]
    #[test_case(&json!({"maxLength": 2}), &json!("foo"))]
    #[test_case(&json!({"pattern": "^a*$"}), &json!("abc"))]
    #[test_case(&json!({"items": {"type": "integer"}}), &json!([1, "x"]))]
    #[test_case(&json!({"items": [{}, {}], "additionalItems": false}), &json!([1, 2, 3]))]
    #[test_case(&json!({"maxItems": 2}), &json!([1, 2, 3]))]
    #[test_case(&json!({"minItems": 1}), &json!([]))]
    #[test_case(&json!({"uniqueItems": true}), &json!([1, 2, 1.0]))]
    #[test_case(&json!({"contains": {"minimum": 5}}), &json!([1, 2]))]
    #[test_case(&json!({"maxProperties": 1}), &json!({"a": 1, "b": 2}))]
    #[test_case(&json!({"minProperties": 1}), &json!({}))]
    #[test_case(&json!({"required": ["a"]}), &json!({"b": 1}))]
    #[test_case(&json!({"properties": {"a": {"type": "integer"}}}), &json!({"a": "x"}))]
    #[test_case(&json!({"patternProperties": {"^x": {"type": "integer"}}}), &json!({"x1": "s"}))]
    #[test_case(&json!({"properties": {"a": {}}, "additionalProperties": false}), &json!({"b": 1}))]
    #[test_case(&json!({"propertyNames": {"maxLength": 3}}), &json!({"abcd": 1}))]
    #[test_case(&json!({"dependencies": {"a": ["b"]}}), &json!({"a": 1}))]
    #[test_case(&json!({"dependencies": {"a": {"required": ["b"]}}}), &json!({"a": 1}))]
    #[test_case(&json!({"allOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(1))]
    #[test_case(&json!({"anyOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(1.5))]
    #[test_case(&json!({"oneOf": [{"type": "string"}, {"maxLength": 3}]}), &json!("hi"); "oneOf with two matches")]
    #[test_case(&json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(1.1))]
    #[test_case(&json!({"not": {"type": "integer"}}), &json!(1))]
    #[test_case(&json!({"if": {"type": "integer"}, "then": {"minimum": 0}}), &json!(-1))]
    #[test_case(&json!({"if": {"type": "integer"}, "else": {"type": "string"}}), &json!(1.5))]
    #[test_case(&json!({"format": "ipv4"}), &json!("2001:db8::1"))]
    #[test_case(&json!({"format": "email"}), &json!("not an email"))]
    #[test_case(&json!(false), &json!(null))]
    fn rejected(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance)
    }

    // The verdict and the collected error list always agree.
    #[test_case(&json!({"type": "integer"}), &json!(1))]
    #[test_case(&json!({"type": "integer"}), &json!(1.1))]
    #[test_case(&json!({"minProperties": 2, "propertyNames": {"minLength": 3}}), &json!({"a": 3}))]
    #[test_case(&json!({"oneOf": [{"type": "string"}, {"maxLength": 3}]}), &json!("hi"))]
    fn verdict_matches_error_list(schema: &Value, instance: &Value) {
        let compiled = Schema::compile(schema).unwrap();
        let errors = compiled
            .validate_with_options(instance, &ValidationOptions::collect_all())
            .unwrap();
        assert_eq!(compiled.is_valid(instance), errors.is_empty());
    }

    #[test]
    fn draft4_integer_is_strict() {
        let schema = json!({"type": "integer"});
        let instance = json!(3.0);
        let compiled = Schema::options()
            .with_draft(Draft::Draft4)
            .compile(&schema)
            .unwrap();
        assert!(!compiled.is_valid(&instance));
        let compiled = Schema::options()
            .with_draft(Draft::Draft6)
            .compile(&schema)
            .unwrap();
        assert!(compiled.is_valid(&instance));
    }

    #[test]
    fn multiple_errors() {
        tests_util::expect_errors(
            &json!({"minProperties": 2, "propertyNames": {"minLength": 3}}),
            &json!({"a": 3}),
            &[
                r#"# (root): {"a":3} has less than 2 properties"#,
                r#"/a: "a" is shorter than 3 characters"#,
            ],
        )
    }

    #[test]
    fn fast_fail_keeps_one_error() {
        let schema = json!({"minProperties": 2, "propertyNames": {"minLength": 3}});
        let instance = json!({"a": 3});
        let compiled = Schema::compile(&schema).unwrap();
        let errors = compiled
            .validate_with_options(&instance, &ValidationOptions::default())
            .unwrap();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn error_paths() {
        let schema = json!({"properties": {"a": {"items": {"type": "integer"}}}});
        let instance = json!({"a": [1, "x"]});
        let compiled = Schema::compile(&schema).unwrap();
        let errors = compiled.validate(&instance).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, "/a/1");
        assert_eq!(errors[0].schema_path, "/properties/a/items/type");
    }

    #[test]
    fn combinator_envelope_and_inner_errors() {
        let schema = json!({"anyOf": [{"type": "integer"}, {"minimum": 2}]});
        let instance = json!(1.5);
        let compiled = Schema::compile(&schema).unwrap();
        let errors = compiled.validate(&instance).unwrap_err();
        // Two inner errors, then the envelope.
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].schema_path, "/anyOf/0/type");
        assert_eq!(errors[1].schema_path, "/anyOf/1/minimum");
        assert_eq!(errors[2].schema_path, "/anyOf");
    }

    #[test]
    fn one_of_multiple_valid_message() {
        let schema = json!({"oneOf": [{"type": "string"}, {"maxLength": 3}]});
        let instance = json!("hi");
        let compiled = Schema::compile(&schema).unwrap();
        let errors = compiled.validate(&instance).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            r#"# (root): "hi" is valid under more than one of the given schemas"#
        );
    }

    #[test]
    fn additional_items_scenario() {
        let schema = json!({
            "type": "array",
            "items": [{"type": "integer"}, {"type": "string"}],
            "additionalItems": false
        });
        let compiled = Schema::compile(&schema).unwrap();
        assert!(compiled.is_valid(&json!([1, "a"])));
        let errors = compiled.validate(&json!([1, "a", true])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].schema_path, "/additionalItems");
    }

    #[test]
    fn unique_items_reports_first_pair() {
        let schema = json!({"uniqueItems": true});
        let compiled = Schema::compile(&schema).unwrap();
        let errors = compiled.validate(&json!([1, 2, 1, 2])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "elements at positions 0 and 2 are equal"
        );
    }

    #[test]
    fn parse_json_input() {
        let schema = json!({"type": "object", "required": ["a"]});
        let compiled = Schema::compile(&schema).unwrap();
        let options = ValidationOptions {
            parse_json: true,
            ..ValidationOptions::default()
        };
        let errors = compiled
            .validate_with_options(&json!(r#"{"a": 1}"#), &options)
            .unwrap();
        assert!(errors.is_empty());
        let errors = compiled
            .validate_with_options(&json!(r#"{}"#), &options)
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            compiled.validate_with_options(&json!("{not json"), &options),
            Err(crate::SchemaError::InvalidJsonInput(_))
        ));
    }

    #[test]
    fn formats_can_be_disabled() {
        let schema = json!({"format": "ipv4"});
        let instance = json!("999.999.999.999");
        let compiled = Schema::compile(&schema).unwrap();
        assert!(!compiled.is_valid(&instance));
        let options = ValidationOptions {
            validate_formats: Some(false),
            ..ValidationOptions::default()
        };
        assert!(compiled
            .validate_with_options(&instance, &options)
            .unwrap()
            .is_empty());

        let compiled = Schema::options()
            .should_validate_formats(false)
            .compile(&schema)
            .unwrap();
        assert!(compiled.is_valid(&instance));
    }

    #[test]
    fn schema_dependency_validates_whole_instance() {
        let schema = json!({"dependencies": {"a": {"properties": {"b": {"type": "integer"}}}}});
        let compiled = Schema::compile(&schema).unwrap();
        assert!(compiled.is_valid(&json!({"a": 1, "b": 2})));
        let errors = compiled.validate(&json!({"a": 1, "b": "x"})).unwrap_err();
        assert_eq!(errors[0].instance_path, "/b");
        assert_eq!(errors[0].schema_path, "/dependencies/a/properties/b/type");
    }
}
