use crate::spec::schema::SchemaType;
use crate::types::path::ValuePath;
use crate::types::ParameterLocation;
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Errors raised while building a [`crate::spec::Spec`] from a raw document.
///
/// Build-time errors are fatal: the first one found aborts the build and no
/// partially-constructed model is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecError {
    /// The contract document is malformed. Carries a pointer path to the
    /// offending node and the structural assumption that was violated.
    InvalidSpecification { pointer: String, reason: String },

    /// A `$ref` string does not address an existing node in the document.
    UnresolvableReference(String),

    /// The document declares an `openapi` version outside the 3.x family.
    UnsupportedVersion(String),
}

impl SpecError {
    #[inline]
    pub(crate) fn invalid(pointer: &ValuePath, reason: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            pointer: pointer.format_path(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub(crate) fn unresolvable(ref_string: impl Into<String>) -> Self {
        Self::UnresolvableReference(ref_string.into())
    }

    #[inline]
    pub(crate) fn unsupported_version(version: impl Into<String>) -> Self {
        Self::UnsupportedVersion(version.into())
    }
}

impl Display for SpecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecError::InvalidSpecification { pointer, reason } => {
                write!(f, "Invalid specification at '{}': {}", pointer, reason)
            }
            SpecError::UnresolvableReference(ref_string) => {
                write!(f, "Unresolvable reference: '{}'", ref_string)
            }
            SpecError::UnsupportedVersion(version) => {
                write!(f, "Unsupported OpenAPI version: '{}'", version)
            }
        }
    }
}

impl std::error::Error for SpecError {}

/// A single validation failure for a request or response.
///
/// Every variant carries enough context (carrier location, value path,
/// expected vs. actual) to be rendered directly to an API consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    /// No registered path template matches the request path.
    PathNotFound { path: String },

    /// A template matches the path, but the path declares no operation for
    /// the requested HTTP method.
    OperationNotFound { path: String, method: String },

    /// A parameter marked required has no value in its carrier.
    MissingRequiredParameter {
        name: String,
        location: ParameterLocation,
    },

    /// The operation requires a request body and none was supplied.
    MissingRequestBody,

    /// The request/response mimetype has no matching media-type entry.
    UnsupportedMediaType { mimetype: String },

    /// The body bytes could not be decoded for the declared mimetype.
    MalformedBody { mimetype: String, reason: String },

    /// A raw value is not losslessly castable to the declared type.
    InvalidType {
        path: ValuePath,
        expected: SchemaType,
        value: Value,
    },

    /// A cast value fails the declared `format` check.
    InvalidFormat {
        path: ValuePath,
        format: String,
        value: Value,
    },

    /// A cast value is not one of the declared enum entries.
    InvalidEnumValue { path: ValuePath, value: Value },

    /// A name declared in an object schema's `required` set is absent.
    MissingProperty { path: ValuePath, name: String },

    /// A property is present but the schema forbids additional properties.
    UnexpectedProperty { path: ValuePath, name: String },

    /// A value matched none of the alternatives of a oneOf/anyOf schema.
    NoMatchingSchema { path: ValuePath },

    /// A value matched more than one alternative of a oneOf schema.
    AmbiguousSchema { path: ValuePath, matches: usize },

    /// The operation declares security requirements and none is satisfiable
    /// from the request's credential carriers.
    SecurityNotSatisfied { schemes: Vec<String> },

    /// Neither an exact status entry nor a "default" entry exists for the
    /// response status code.
    ResponseNotFound { status: u16 },

    /// The contract itself is inconsistent for the supplied value, e.g. an
    /// allOf merge casting the same property to conflicting values.
    InvalidSpecification { path: ValuePath, reason: String },
}

impl ValidationFailure {
    #[inline]
    pub(crate) fn invalid_type(path: &ValuePath, expected: SchemaType, value: &Value) -> Self {
        Self::InvalidType {
            path: path.clone(),
            expected,
            value: value.clone(),
        }
    }

    #[inline]
    pub(crate) fn invalid_format(path: &ValuePath, format: &str, value: &Value) -> Self {
        Self::InvalidFormat {
            path: path.clone(),
            format: format.to_owned(),
            value: value.clone(),
        }
    }

    #[inline]
    pub(crate) fn missing_property(path: &ValuePath, name: &str) -> Self {
        Self::MissingProperty {
            path: path.clone(),
            name: name.to_owned(),
        }
    }

    #[inline]
    pub(crate) fn inconsistent_contract(path: &ValuePath, reason: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

impl Display for ValidationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationFailure::PathNotFound { path } => {
                write!(f, "No path template matches '{}'", path)
            }
            ValidationFailure::OperationNotFound { path, method } => {
                write!(f, "Path '{}' has no operation for method '{}'", path, method)
            }
            ValidationFailure::MissingRequiredParameter { name, location } => {
                write!(f, "Missing required {} parameter '{}'", location, name)
            }
            ValidationFailure::MissingRequestBody => {
                write!(f, "Request body is required but missing")
            }
            ValidationFailure::UnsupportedMediaType { mimetype } => {
                write!(f, "No media type entry for mimetype '{}'", mimetype)
            }
            ValidationFailure::MalformedBody { mimetype, reason } => {
                write!(f, "Body is not decodable as '{}': {}", mimetype, reason)
            }
            ValidationFailure::InvalidType {
                path,
                expected,
                value,
            } => {
                write!(
                    f,
                    "Value {} at '{}' is not castable to {}",
                    value, path, expected
                )
            }
            ValidationFailure::InvalidFormat {
                path,
                format,
                value,
            } => {
                write!(
                    f,
                    "Value {} at '{}' does not satisfy format '{}'",
                    value, path, format
                )
            }
            ValidationFailure::InvalidEnumValue { path, value } => {
                write!(f, "Value {} at '{}' is not a declared enum entry", value, path)
            }
            ValidationFailure::MissingProperty { path, name } => {
                write!(f, "Required property '{}' is missing at '{}'", name, path)
            }
            ValidationFailure::UnexpectedProperty { path, name } => {
                write!(
                    f,
                    "Property '{}' at '{}' is not allowed by the schema",
                    name, path
                )
            }
            ValidationFailure::NoMatchingSchema { path } => {
                write!(f, "Value at '{}' matches no schema alternative", path)
            }
            ValidationFailure::AmbiguousSchema { path, matches } => {
                write!(
                    f,
                    "Value at '{}' matches {} oneOf alternatives, expected exactly one",
                    path, matches
                )
            }
            ValidationFailure::SecurityNotSatisfied { schemes } => {
                write!(
                    f,
                    "No security requirement satisfied (declared schemes: {})",
                    schemes.join(", ")
                )
            }
            ValidationFailure::ResponseNotFound { status } => {
                write!(
                    f,
                    "No response entry for status {} and no default entry",
                    status
                )
            }
            ValidationFailure::InvalidSpecification { path, reason } => {
                write!(f, "Inconsistent contract at '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ValidationFailure {}

/// An ordered, non-empty list of validation failures for one exchange.
///
/// Validation does not stop at the first error: every independent failure
/// across all parameters and the body is collected before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<ValidationFailure>);

impl ValidationErrors {
    pub(crate) fn new(failures: Vec<ValidationFailure>) -> Self {
        debug_assert!(!failures.is_empty());
        Self(failures)
    }

    pub(crate) fn single(failure: ValidationFailure) -> Self {
        Self(vec![failure])
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationFailure> {
        self.0.iter()
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationFailure;
    type IntoIter = std::vec::IntoIter<ValidationFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} validation failure(s):", self.0.len())?;
        for failure in &self.0 {
            write!(f, " [{}]", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
