//! Extraction and casting of declared parameters from their carriers.

use crate::error::ValidationFailure;
use crate::spec::schema::{SchemaStore, SchemaType};
use crate::spec::Parameter;
use crate::types::path::ValuePath;
use crate::types::{ParameterLocation, ValidationRequest};
use crate::validator::schema::SchemaCaster;
use serde_json::Value;
use std::collections::HashMap;

/// Cast parameter values grouped by carrier location.
///
/// Only declared parameters appear here; undeclared carriers pass through
/// validation untouched.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TypedParameters {
    pub path: HashMap<String, Value>,
    pub query: HashMap<String, Value>,
    pub header: HashMap<String, Value>,
    pub cookie: HashMap<String, Value>,
}

impl TypedParameters {
    fn slot(&mut self, location: ParameterLocation) -> &mut HashMap<String, Value> {
        match location {
            ParameterLocation::Path => &mut self.path,
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::Header => &mut self.header,
            ParameterLocation::Cookie => &mut self.cookie,
        }
    }
}

/// Casts every declared parameter of an operation against the request's
/// carriers, collecting all failures instead of stopping at the first.
pub(crate) fn cast_parameters(
    store: &SchemaStore,
    parameters: &[Parameter],
    request: &ValidationRequest,
    path_values: &HashMap<String, String>,
) -> (TypedParameters, Vec<ValidationFailure>) {
    let caster = SchemaCaster::new(store);
    let mut typed = TypedParameters::default();
    let mut failures = Vec::new();

    for parameter in parameters {
        let values = raw_values(parameter, request, path_values);
        match cast_parameter(store, &caster, parameter, values.as_deref()) {
            Ok(Some(value)) => {
                typed.slot(parameter.location).insert(parameter.name.clone(), value);
            }
            Ok(None) => {}
            Err(parameter_failures) => failures.extend(parameter_failures),
        }
    }

    (typed, failures)
}

/// Casts one declared parameter from its raw carrier values.
///
/// `Ok(None)` means the parameter is absent and optional with no default.
/// Also used for declared response headers, which share the Parameter
/// shape.
pub(crate) fn cast_parameter(
    store: &SchemaStore,
    caster: &SchemaCaster<'_>,
    parameter: &Parameter,
    values: Option<&[String]>,
) -> Result<Option<Value>, Vec<ValidationFailure>> {
    let Some(values) = values.filter(|values| !values.is_empty()) else {
        if parameter.required {
            return Err(vec![ValidationFailure::MissingRequiredParameter {
                name: parameter.name.clone(),
                location: parameter.location,
            }]);
        }
        let default = parameter
            .schema
            .and_then(|schema| store.get(schema).default.clone());
        return Ok(default);
    };

    let raw = shape_raw_value(store, parameter, values);
    match parameter.schema {
        Some(schema) => {
            let path = ValuePath::new().child(&parameter.name);
            caster.cast(schema, &raw, &path).map(Some)
        }
        None => Ok(Some(raw)),
    }
}

fn raw_values(
    parameter: &Parameter,
    request: &ValidationRequest,
    path_values: &HashMap<String, String>,
) -> Option<Vec<String>> {
    match parameter.location {
        ParameterLocation::Path => path_values
            .get(&parameter.name)
            .map(|value| vec![value.clone()]),
        ParameterLocation::Query => request.parameters.query.get(&parameter.name).cloned(),
        ParameterLocation::Header => request
            .parameters
            .header
            .get(&parameter.name.to_lowercase())
            .cloned(),
        ParameterLocation::Cookie => request
            .parameters
            .cookie
            .get(&parameter.name)
            .map(|value| vec![value.clone()]),
    }
}

/// Shapes raw carrier strings into the value handed to the caster.
///
/// Array-typed parameters take either exploded repeats (`tag=a&tag=b`) or a
/// single delimited occurrence split on the declared style's delimiter.
/// Repeated occurrences against a non-array schema keep their sequence
/// shape so the caster reports the type mismatch.
fn shape_raw_value(store: &SchemaStore, parameter: &Parameter, values: &[String]) -> Value {
    let declares_array = parameter
        .schema
        .map(|schema| store.get(schema).type_tag == Some(SchemaType::Array))
        .unwrap_or(false);

    if declares_array {
        let elements: Vec<Value> = if values.len() > 1 {
            values.iter().cloned().map(Value::String).collect()
        } else {
            values[0]
                .split(parameter.style.delimiter())
                .map(|element| Value::String(element.to_owned()))
                .collect()
        };
        return Value::Array(elements);
    }

    if values.len() > 1 {
        return Value::Array(values.iter().cloned().map(Value::String).collect());
    }
    Value::String(values[0].clone())
}
