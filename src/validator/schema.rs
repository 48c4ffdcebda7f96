//! Validate-and-cast of raw values against schema nodes.
//!
//! Casting is lossless: a raw string is accepted for a numeric or boolean
//! schema only when the whole string parses, and a JSON value is accepted
//! only when it already has the declared shape. The output of a successful
//! cast is the normalized, typed value.

use crate::error::ValidationFailure;
use crate::spec::schema::{Schema, SchemaId, SchemaStore, SchemaType};
use crate::types::path::ValuePath;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;

/// Casts raw values against the schema nodes of one [`SchemaStore`].
///
/// Failures are collected, not short-circuited: an object with three bad
/// properties reports all three.
pub struct SchemaCaster<'s> {
    store: &'s SchemaStore,
}

impl<'s> SchemaCaster<'s> {
    pub fn new(store: &'s SchemaStore) -> Self {
        Self { store }
    }

    pub fn cast(
        &self,
        id: SchemaId,
        raw: &Value,
        path: &ValuePath,
    ) -> Result<Value, Vec<ValidationFailure>> {
        let mut in_flight = HashSet::new();
        self.cast_guarded(id, raw, path, &mut in_flight)
    }

    /// Guards against zero-progress cycles: re-entering the same schema id
    /// at the same value depth means a combinator loop that consumes no
    /// input, which only a broken contract can produce. Recursion through
    /// object properties or array items advances the depth and passes.
    fn cast_guarded(
        &self,
        id: SchemaId,
        raw: &Value,
        path: &ValuePath,
        in_flight: &mut HashSet<(SchemaId, usize)>,
    ) -> Result<Value, Vec<ValidationFailure>> {
        let key = (id, path.depth());
        if !in_flight.insert(key) {
            return Err(vec![ValidationFailure::inconsistent_contract(
                path,
                "cyclic schema makes no progress on the value",
            )]);
        }
        let result = self.cast_node(id, raw, path, in_flight);
        in_flight.remove(&key);
        result
    }

    fn cast_node(
        &self,
        id: SchemaId,
        raw: &Value,
        path: &ValuePath,
        in_flight: &mut HashSet<(SchemaId, usize)>,
    ) -> Result<Value, Vec<ValidationFailure>> {
        let schema = self.store.get(id);

        if raw.is_null() && schema.nullable {
            return Ok(Value::Null);
        }

        let cast = if schema.has_combinators() {
            // A type tag alongside combinators acts as a normalizing filter
            // before the alternatives are tried.
            let normalized = match schema.type_tag {
                Some(type_tag) => self.cast_plain(schema, type_tag, raw, path, in_flight)?,
                None => raw.clone(),
            };
            self.cast_combinators(schema, &normalized, path, in_flight)?
        } else {
            match schema.type_tag {
                Some(type_tag) => self.cast_plain(schema, type_tag, raw, path, in_flight)?,
                None => self.cast_untyped(schema, raw, path, in_flight)?,
            }
        };

        if !schema.enum_values.is_empty() && !schema.enum_values.contains(&cast) {
            return Err(vec![ValidationFailure::InvalidEnumValue {
                path: path.clone(),
                value: cast,
            }]);
        }

        Ok(cast)
    }

    /// A schema without a type tag still constrains the value when it
    /// declares object or array facets; otherwise it accepts anything.
    fn cast_untyped(
        &self,
        schema: &Schema,
        raw: &Value,
        path: &ValuePath,
        in_flight: &mut HashSet<(SchemaId, usize)>,
    ) -> Result<Value, Vec<ValidationFailure>> {
        if !schema.properties.is_empty()
            || !schema.required.is_empty()
            || !schema.additional_properties_allowed
        {
            return self.cast_plain(schema, SchemaType::Object, raw, path, in_flight);
        }
        if schema.items.is_some() {
            return self.cast_plain(schema, SchemaType::Array, raw, path, in_flight);
        }
        Ok(raw.clone())
    }

    fn cast_plain(
        &self,
        schema: &Schema,
        type_tag: SchemaType,
        raw: &Value,
        path: &ValuePath,
        in_flight: &mut HashSet<(SchemaId, usize)>,
    ) -> Result<Value, Vec<ValidationFailure>> {
        match type_tag {
            SchemaType::String => cast_string(schema, raw, path).map_err(|failure| vec![failure]),
            SchemaType::Integer => {
                cast_integer(schema, raw, path).map_err(|failure| vec![failure])
            }
            SchemaType::Number => cast_number(raw, path).map_err(|failure| vec![failure]),
            SchemaType::Boolean => cast_boolean(raw, path).map_err(|failure| vec![failure]),
            SchemaType::Array => self.cast_array(schema, raw, path, in_flight),
            SchemaType::Object => self.cast_object(schema, raw, path, in_flight),
        }
    }

    fn cast_array(
        &self,
        schema: &Schema,
        raw: &Value,
        path: &ValuePath,
        in_flight: &mut HashSet<(SchemaId, usize)>,
    ) -> Result<Value, Vec<ValidationFailure>> {
        let Value::Array(elements) = raw else {
            return Err(vec![ValidationFailure::invalid_type(
                path,
                SchemaType::Array,
                raw,
            )]);
        };

        let Some(items) = schema.items else {
            return Ok(raw.clone());
        };

        let mut cast_elements = Vec::with_capacity(elements.len());
        let mut failures = Vec::new();
        for (idx, element) in elements.iter().enumerate() {
            match self.cast_guarded(items, element, &path.index(idx), in_flight) {
                Ok(element) => cast_elements.push(element),
                Err(element_failures) => failures.extend(element_failures),
            }
        }

        if failures.is_empty() {
            Ok(Value::Array(cast_elements))
        } else {
            Err(failures)
        }
    }

    fn cast_object(
        &self,
        schema: &Schema,
        raw: &Value,
        path: &ValuePath,
        in_flight: &mut HashSet<(SchemaId, usize)>,
    ) -> Result<Value, Vec<ValidationFailure>> {
        let Value::Object(entries) = raw else {
            return Err(vec![ValidationFailure::invalid_type(
                path,
                SchemaType::Object,
                raw,
            )]);
        };

        let mut cast_entries = Map::new();
        let mut failures = Vec::new();

        for name in &schema.required {
            if !entries.contains_key(name) {
                failures.push(ValidationFailure::missing_property(path, name));
            }
        }

        for (name, child) in &schema.properties {
            match entries.get(name) {
                Some(value) => {
                    match self.cast_guarded(*child, value, &path.child(name), in_flight) {
                        Ok(value) => {
                            cast_entries.insert(name.clone(), value);
                        }
                        Err(child_failures) => failures.extend(child_failures),
                    }
                }
                None => {
                    // Absent optional properties take the declared default.
                    if let Some(default) = &self.store.get(*child).default {
                        cast_entries.insert(name.clone(), default.clone());
                    }
                }
            }
        }

        for (name, value) in entries {
            if schema.property(name).is_some() {
                continue;
            }
            if schema.additional_properties_allowed {
                cast_entries.insert(name.clone(), value.clone());
            } else {
                failures.push(ValidationFailure::UnexpectedProperty {
                    path: path.clone(),
                    name: name.clone(),
                });
            }
        }

        if failures.is_empty() {
            Ok(Value::Object(cast_entries))
        } else {
            Err(failures)
        }
    }

    fn cast_combinators(
        &self,
        schema: &Schema,
        raw: &Value,
        path: &ValuePath,
        in_flight: &mut HashSet<(SchemaId, usize)>,
    ) -> Result<Value, Vec<ValidationFailure>> {
        if !schema.all_of.is_empty() {
            return self.cast_all_of(&schema.all_of, raw, path, in_flight);
        }

        if !schema.one_of.is_empty() {
            let mut successes = Vec::new();
            for alternative in &schema.one_of {
                if let Ok(cast) = self.cast_guarded(*alternative, raw, path, in_flight) {
                    successes.push(cast);
                }
            }
            if successes.len() > 1 {
                return Err(vec![ValidationFailure::AmbiguousSchema {
                    path: path.clone(),
                    matches: successes.len(),
                }]);
            }
            return match successes.pop() {
                Some(cast) => Ok(cast),
                None => Err(vec![ValidationFailure::NoMatchingSchema {
                    path: path.clone(),
                }]),
            };
        }

        // anyOf: first matching alternative wins.
        for alternative in &schema.any_of {
            if let Ok(cast) = self.cast_guarded(*alternative, raw, path, in_flight) {
                return Ok(cast);
            }
        }
        Err(vec![ValidationFailure::NoMatchingSchema {
            path: path.clone(),
        }])
    }

    /// Every alternative must accept the value; object results are merged
    /// property-wise, and anything else must cast identically everywhere.
    fn cast_all_of(
        &self,
        alternatives: &[SchemaId],
        raw: &Value,
        path: &ValuePath,
        in_flight: &mut HashSet<(SchemaId, usize)>,
    ) -> Result<Value, Vec<ValidationFailure>> {
        let mut merged: Option<Value> = None;
        for alternative in alternatives {
            let cast = self.cast_guarded(*alternative, raw, path, in_flight)?;
            merged = Some(match merged {
                None => cast,
                Some(Value::Object(mut entries)) => {
                    let Value::Object(cast_entries) = cast else {
                        return Err(vec![ValidationFailure::inconsistent_contract(
                            path,
                            "allOf alternatives disagree on the value's shape",
                        )]);
                    };
                    for (name, value) in cast_entries {
                        match entries.get(&name) {
                            Some(existing) if *existing != value => {
                                return Err(vec![ValidationFailure::inconsistent_contract(
                                    &path.child(&name),
                                    "allOf alternatives cast the property to conflicting values",
                                )]);
                            }
                            _ => {
                                entries.insert(name, value);
                            }
                        }
                    }
                    Value::Object(entries)
                }
                Some(existing) => {
                    if existing != cast {
                        return Err(vec![ValidationFailure::inconsistent_contract(
                            path,
                            "allOf alternatives cast the value to conflicting results",
                        )]);
                    }
                    existing
                }
            });
        }
        // The builder guarantees a non-empty alternative list.
        Ok(merged.unwrap_or(Value::Null))
    }
}

fn cast_string(
    schema: &Schema,
    raw: &Value,
    path: &ValuePath,
) -> Result<Value, ValidationFailure> {
    let Value::String(text) = raw else {
        return Err(ValidationFailure::invalid_type(
            path,
            SchemaType::String,
            raw,
        ));
    };

    if let Some(format) = &schema.format {
        let satisfied = match format.as_str() {
            "date" => is_date(text),
            "date-time" => is_date_time(text),
            "uuid" => is_uuid(text),
            "byte" | "binary" | "password" => true,
            other => {
                log::debug!("Skipping unknown string format '{}'", other);
                true
            }
        };
        if !satisfied {
            return Err(ValidationFailure::invalid_format(path, format, raw));
        }
    }

    Ok(raw.clone())
}

fn cast_integer(
    schema: &Schema,
    raw: &Value,
    path: &ValuePath,
) -> Result<Value, ValidationFailure> {
    let out_of_range = |value: &Value| ValidationFailure::invalid_format(path, "int32", value);

    match raw {
        Value::String(text) => {
            let parsed: i64 = text
                .parse()
                .map_err(|_| ValidationFailure::invalid_type(path, SchemaType::Integer, raw))?;
            if schema.format.as_deref() == Some("int32") && i32::try_from(parsed).is_err() {
                return Err(out_of_range(raw));
            }
            Ok(Value::Number(Number::from(parsed)))
        }
        Value::Number(number) => {
            if let Some(parsed) = number.as_i64() {
                if schema.format.as_deref() == Some("int32") && i32::try_from(parsed).is_err() {
                    return Err(out_of_range(raw));
                }
                Ok(raw.clone())
            } else if number.as_u64().is_some() {
                if schema.format.as_deref() == Some("int32") {
                    return Err(out_of_range(raw));
                }
                Ok(raw.clone())
            } else {
                Err(ValidationFailure::invalid_type(
                    path,
                    SchemaType::Integer,
                    raw,
                ))
            }
        }
        _ => Err(ValidationFailure::invalid_type(
            path,
            SchemaType::Integer,
            raw,
        )),
    }
}

fn cast_number(raw: &Value, path: &ValuePath) -> Result<Value, ValidationFailure> {
    let invalid = || ValidationFailure::invalid_type(path, SchemaType::Number, raw);

    match raw {
        Value::String(text) => {
            let parsed: f64 = text.parse().map_err(|_| invalid())?;
            let number = Number::from_f64(parsed).ok_or_else(invalid)?;
            Ok(Value::Number(number))
        }
        Value::Number(_) => Ok(raw.clone()),
        _ => Err(invalid()),
    }
}

fn cast_boolean(raw: &Value, path: &ValuePath) -> Result<Value, ValidationFailure> {
    match raw {
        Value::String(text) => match text.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ValidationFailure::invalid_type(
                path,
                SchemaType::Boolean,
                raw,
            )),
        },
        Value::Bool(_) => Ok(raw.clone()),
        _ => Err(ValidationFailure::invalid_type(
            path,
            SchemaType::Boolean,
            raw,
        )),
    }
}

/// `full-date` per RFC 3339: `YYYY-MM-DD` with sane month/day ranges.
fn is_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| {
        bytes[range].iter().all(|byte| byte.is_ascii_digit())
    };
    if !digits(0..4) || !digits(5..7) || !digits(8..10) {
        return false;
    }
    let month: u8 = text[5..7].parse().unwrap_or(0);
    let day: u8 = text[8..10].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

/// `date-time` per RFC 3339: a full date, `T`, a time, and an optional
/// fractional second and offset.
fn is_date_time(text: &str) -> bool {
    let Some((date, time)) = text.split_once(['T', 't']) else {
        return false;
    };
    if !is_date(date) {
        return false;
    }

    let bytes = time.as_bytes();
    if bytes.len() < 8 || bytes[2] != b':' || bytes[5] != b':' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| {
        bytes[range].iter().all(|byte| byte.is_ascii_digit())
    };
    if !digits(0..2) || !digits(3..5) || !digits(6..8) {
        return false;
    }
    let hour: u8 = time[0..2].parse().unwrap_or(99);
    let minute: u8 = time[3..5].parse().unwrap_or(99);
    let second: u8 = time[6..8].parse().unwrap_or(99);
    if hour > 23 || minute > 59 || second > 60 {
        return false;
    }

    // Anything after the seconds must be fraction/offset characters.
    time[8..]
        .bytes()
        .all(|byte| byte.is_ascii_digit() || matches!(byte, b'.' | b':' | b'+' | b'-' | b'Z' | b'z'))
}

/// Canonical 8-4-4-4-12 hex form.
fn is_uuid(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(idx, byte)| match idx {
        8 | 13 | 18 | 23 => *byte == b'-',
        _ => byte.is_ascii_hexdigit(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolver::Resolver;
    use crate::spec::schema::SchemaBuilder;
    use serde_json::json;
    use std::sync::Arc;

    fn store_for(node: Value) -> (SchemaStore, SchemaId) {
        let resolver = Resolver::new(Arc::new(json!({})));
        let mut builder = SchemaBuilder::new(&resolver);
        let id = builder.build(&node, &ValuePath::new()).unwrap();
        (builder.finish(), id)
    }

    fn cast(node: Value, raw: Value) -> Result<Value, Vec<ValidationFailure>> {
        let (store, id) = store_for(node);
        SchemaCaster::new(&store).cast(id, &raw, &ValuePath::new())
    }

    #[test]
    fn test_cast_string_to_integer() {
        assert_eq!(cast(json!({ "type": "integer" }), json!("42")), Ok(json!(42)));
        assert_eq!(cast(json!({ "type": "integer" }), json!(42)), Ok(json!(42)));
    }

    #[test]
    fn test_cast_rejects_non_numeric_string() {
        let failures = cast(json!({ "type": "integer" }), json!("seven")).unwrap_err();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            ValidationFailure::InvalidType {
                expected: SchemaType::Integer,
                ..
            }
        ));
    }

    #[test]
    fn test_cast_rejects_fractional_value_for_integer() {
        assert!(cast(json!({ "type": "integer" }), json!(4.5)).is_err());
    }

    #[test]
    fn test_cast_int32_range() {
        let schema = json!({ "type": "integer", "format": "int32" });
        assert!(cast(schema.clone(), json!("2147483647")).is_ok());
        let failures = cast(schema, json!("2147483648")).unwrap_err();
        assert!(matches!(
            failures[0],
            ValidationFailure::InvalidFormat { .. }
        ));
    }

    #[test]
    fn test_cast_string_to_number_and_boolean() {
        assert_eq!(cast(json!({ "type": "number" }), json!("2.5")), Ok(json!(2.5)));
        assert_eq!(
            cast(json!({ "type": "boolean" }), json!("true")),
            Ok(json!(true))
        );
        assert!(cast(json!({ "type": "boolean" }), json!("yes")).is_err());
    }

    #[test]
    fn test_cast_number_is_not_a_string() {
        assert!(cast(json!({ "type": "string" }), json!(42)).is_err());
    }

    #[test]
    fn test_string_formats() {
        let date = json!({ "type": "string", "format": "date" });
        assert!(cast(date.clone(), json!("2024-02-29")).is_ok());
        assert!(cast(date, json!("2024-13-01")).is_err());

        let date_time = json!({ "type": "string", "format": "date-time" });
        assert!(cast(date_time.clone(), json!("2024-02-29T10:00:00Z")).is_ok());
        assert!(cast(date_time.clone(), json!("2024-02-29T10:00:00.123+02:00")).is_ok());
        assert!(cast(date_time, json!("2024-02-29")).is_err());

        let uuid = json!({ "type": "string", "format": "uuid" });
        assert!(cast(uuid.clone(), json!("123e4567-e89b-12d3-a456-426614174000")).is_ok());
        assert!(cast(uuid, json!("not-a-uuid")).is_err());
    }

    #[test]
    fn test_unknown_format_passes() {
        let schema = json!({ "type": "string", "format": "hostname" });
        assert!(cast(schema, json!("whatever")).is_ok());
    }

    #[test]
    fn test_enum_is_checked_after_the_cast() {
        let schema = json!({ "type": "integer", "enum": [1, 2] });
        assert_eq!(cast(schema.clone(), json!("1")), Ok(json!(1)));
        let failures = cast(schema, json!("3")).unwrap_err();
        assert!(matches!(
            failures[0],
            ValidationFailure::InvalidEnumValue { .. }
        ));
    }

    #[test]
    fn test_nullable_accepts_null() {
        assert_eq!(
            cast(json!({ "type": "string", "nullable": true }), json!(null)),
            Ok(json!(null))
        );
        assert!(cast(json!({ "type": "string" }), json!(null)).is_err());
    }

    #[test]
    fn test_object_collects_every_failure() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer" },
                "active": { "type": "boolean" }
            }
        });
        let failures = cast(schema, json!({ "age": "old", "active": "maybe" })).unwrap_err();
        assert_eq!(failures.len(), 3);
    }

    #[test]
    fn test_object_rejects_unexpected_property_when_closed() {
        let schema = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": { "name": { "type": "string" } }
        });
        let failures = cast(schema, json!({ "name": "a", "extra": 1 })).unwrap_err();
        assert!(matches!(
            failures[0],
            ValidationFailure::UnexpectedProperty { ref name, .. } if name == "extra"
        ));
    }

    #[test]
    fn test_object_is_open_by_default() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        });
        let cast_value = cast(schema, json!({ "name": "a", "extra": 1 })).unwrap();
        assert_eq!(cast_value["extra"], json!(1));
    }

    #[test]
    fn test_absent_property_takes_declared_default() {
        let schema = json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "default": 20 }
            }
        });
        assert_eq!(cast(schema, json!({})), Ok(json!({ "limit": 20 })));
    }

    #[test]
    fn test_array_failure_paths_carry_indices() {
        let schema = json!({
            "type": "array",
            "items": { "type": "integer" }
        });
        let failures = cast(schema, json!(["1", "x", "3"])).unwrap_err();
        assert_eq!(failures.len(), 1);
        match &failures[0] {
            ValidationFailure::InvalidType { path, .. } => {
                assert_eq!(path.format_path(), "1");
            }
            other => panic!("unexpected failure {:?}", other),
        }
    }

    #[test]
    fn test_one_of_requires_exactly_one_match() {
        let schema = json!({
            "oneOf": [
                { "type": "object", "required": ["bark"], "properties": { "bark": { "type": "boolean" } } },
                { "type": "object", "required": ["meow"], "properties": { "meow": { "type": "boolean" } } }
            ]
        });
        assert!(cast(schema.clone(), json!({ "bark": true })).is_ok());

        let failures = cast(schema.clone(), json!({})).unwrap_err();
        assert!(matches!(
            failures[0],
            ValidationFailure::MissingProperty { .. } | ValidationFailure::NoMatchingSchema { .. }
        ));

        let ambiguous = json!({
            "oneOf": [
                { "type": "object" },
                { "type": "object" }
            ]
        });
        let failures = cast(ambiguous, json!({})).unwrap_err();
        assert_eq!(
            failures[0],
            ValidationFailure::AmbiguousSchema {
                path: ValuePath::new(),
                matches: 2
            }
        );
    }

    #[test]
    fn test_any_of_takes_the_first_match() {
        let schema = json!({
            "anyOf": [
                { "type": "integer" },
                { "type": "string" }
            ]
        });
        assert_eq!(cast(schema.clone(), json!("7")), Ok(json!(7)));
        assert!(cast(schema, json!([])).is_err());
    }

    #[test]
    fn test_all_of_merges_object_alternatives() {
        let schema = json!({
            "allOf": [
                { "type": "object", "required": ["id"], "properties": { "id": { "type": "integer" } } },
                { "type": "object", "required": ["name"], "properties": { "name": { "type": "string" } } }
            ]
        });
        assert_eq!(
            cast(schema.clone(), json!({ "id": "7", "name": "rex" })),
            Ok(json!({ "id": 7, "name": "rex" }))
        );
        assert!(cast(schema, json!({ "id": "7" })).is_err());
    }

    #[test]
    fn test_untyped_schema_passes_value_through() {
        assert_eq!(cast(json!({}), json!([1, "a"])), Ok(json!([1, "a"])));
    }
}
