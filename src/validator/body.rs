//! Decoding and casting of request and response bodies.
//!
//! Media-type lookup is an exact match against the declared content map.
//! JSON bodies (including `+json` suffixes) are parsed and cast against the
//! declared schema; `text/*` bodies become strings; any other mimetype is
//! accepted opaque and skips schema validation.

use crate::error::ValidationFailure;
use crate::spec::schema::SchemaStore;
use crate::spec::{MediaType, Operation, Response};
use crate::types::path::ValuePath;
use crate::types::{ValidationRequest, ValidationResponse};
use crate::validator::schema::SchemaCaster;
use serde_json::Value;

enum DecodedBody {
    Structured(Value),
    Opaque,
}

/// Casts the request body against the operation's declared request body.
///
/// An operation that declares no request body skips body validation even
/// when body bytes are present.
pub(crate) fn cast_request_body(
    store: &SchemaStore,
    operation: &Operation,
    request: &ValidationRequest,
) -> (Option<Value>, Vec<ValidationFailure>) {
    let Some(declared) = &operation.request_body else {
        if !request.body.is_empty() {
            log::debug!(
                "Operation '{} {}' declares no request body, skipping body validation",
                operation.method,
                operation.path_template
            );
        }
        return (None, Vec::new());
    };

    if request.body.is_empty() {
        if declared.required {
            return (None, vec![ValidationFailure::MissingRequestBody]);
        }
        return (None, Vec::new());
    }

    let mimetype = request.mimetype.clone().unwrap_or_default();
    let Some(media) = declared.media_type(&mimetype) else {
        return (
            None,
            vec![ValidationFailure::UnsupportedMediaType { mimetype }],
        );
    };

    cast_body(store, media, &request.body, &mimetype)
}

/// Casts the response body against a matched response entry.
///
/// An empty response body is never an error at this layer; a declared
/// entry constrains the body only when one is present.
pub(crate) fn cast_response_body(
    store: &SchemaStore,
    response: &Response,
    shape: &ValidationResponse,
) -> (Option<Value>, Vec<ValidationFailure>) {
    if shape.body.is_empty() || response.content().is_empty() {
        return (None, Vec::new());
    }

    let mimetype = shape.mimetype.clone().unwrap_or_default();
    let Some(media) = response.media_type(&mimetype) else {
        return (
            None,
            vec![ValidationFailure::UnsupportedMediaType { mimetype }],
        );
    };

    cast_body(store, media, &shape.body, &mimetype)
}

fn cast_body(
    store: &SchemaStore,
    media: &MediaType,
    body: &[u8],
    mimetype: &str,
) -> (Option<Value>, Vec<ValidationFailure>) {
    let decoded = match decode_body(body, mimetype) {
        Ok(decoded) => decoded,
        Err(failure) => return (None, vec![failure]),
    };

    let DecodedBody::Structured(decoded) = decoded else {
        return (None, Vec::new());
    };

    match media.schema {
        Some(schema) => {
            let caster = SchemaCaster::new(store);
            match caster.cast(schema, &decoded, &ValuePath::new()) {
                Ok(cast) => (Some(cast), Vec::new()),
                Err(failures) => (None, failures),
            }
        }
        None => (Some(decoded), Vec::new()),
    }
}

fn decode_body(body: &[u8], mimetype: &str) -> Result<DecodedBody, ValidationFailure> {
    if mimetype == "application/json" || mimetype.ends_with("+json") {
        return serde_json::from_slice(body)
            .map(DecodedBody::Structured)
            .map_err(|error| ValidationFailure::MalformedBody {
                mimetype: mimetype.to_owned(),
                reason: error.to_string(),
            });
    }

    if mimetype.starts_with("text/") {
        return std::str::from_utf8(body)
            .map(|text| DecodedBody::Structured(Value::String(text.to_owned())))
            .map_err(|error| ValidationFailure::MalformedBody {
                mimetype: mimetype.to_owned(),
                reason: error.to_string(),
            });
    }

    Ok(DecodedBody::Opaque)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::spec::Spec;
    use bytes::Bytes;
    use serde_json::json;

    fn spec_with_body(required: bool) -> Spec {
        Spec::from_document(json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets": {
                    "post": {
                        "requestBody": {
                            "required": required,
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "required": ["name"],
                                        "properties": {
                                            "name": { "type": "string" },
                                            "age": { "type": "integer" }
                                        }
                                    }
                                },
                                "text/plain": {
                                    "schema": { "type": "string" }
                                },
                                "application/octet-stream": {}
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "ok",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "required": ["id"],
                                            "properties": { "id": { "type": "integer" } }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "get": {
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            }
        }))
        .unwrap()
    }

    fn json_request(body: &str) -> ValidationRequest {
        let mut request = ValidationRequest::new("post", "/pets");
        request.body = Bytes::copy_from_slice(body.as_bytes());
        request.mimetype = Some("application/json".to_string());
        request
    }

    #[test]
    fn test_json_body_is_cast_against_the_declared_schema() {
        let spec = spec_with_body(true);
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();

        let request = json_request(r#"{ "name": "rex", "age": 3 }"#);
        let (body, failures) = cast_request_body(spec.schemas(), operation, &request);
        assert!(failures.is_empty());
        assert_eq!(body, Some(json!({ "name": "rex", "age": 3 })));
    }

    #[test]
    fn test_schema_failures_inside_the_body_are_collected() {
        let spec = spec_with_body(true);
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();

        let request = json_request(r#"{ "age": "old" }"#);
        let (body, failures) = cast_request_body(spec.schemas(), operation, &request);
        assert!(body.is_none());
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn test_undecodable_json_is_malformed() {
        let spec = spec_with_body(true);
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();

        let request = json_request("{ not json");
        let (_, failures) = cast_request_body(spec.schemas(), operation, &request);
        assert!(matches!(
            failures[0],
            ValidationFailure::MalformedBody { ref mimetype, .. }
                if mimetype == "application/json"
        ));
    }

    #[test]
    fn test_missing_required_body_is_reported() {
        let spec = spec_with_body(true);
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();

        let request = ValidationRequest::new("post", "/pets");
        let (_, failures) = cast_request_body(spec.schemas(), operation, &request);
        assert_eq!(failures, vec![ValidationFailure::MissingRequestBody]);
    }

    #[test]
    fn test_missing_optional_body_is_skipped() {
        let spec = spec_with_body(false);
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();

        let request = ValidationRequest::new("post", "/pets");
        let (body, failures) = cast_request_body(spec.schemas(), operation, &request);
        assert!(body.is_none());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_unknown_mimetype_is_unsupported() {
        let spec = spec_with_body(true);
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();

        let mut request = ValidationRequest::new("post", "/pets");
        request.body = Bytes::from_static(b"<pet/>");
        request.mimetype = Some("application/xml".to_string());

        let (_, failures) = cast_request_body(spec.schemas(), operation, &request);
        assert_eq!(
            failures,
            vec![ValidationFailure::UnsupportedMediaType {
                mimetype: "application/xml".to_string()
            }]
        );
    }

    #[test]
    fn test_undeclared_body_passes_untouched() {
        let spec = spec_with_body(true);
        let operation = spec.path("/pets").unwrap().operation("get").unwrap();

        let mut request = ValidationRequest::new("get", "/pets");
        request.body = Bytes::from_static(b"ignored");
        let (body, failures) = cast_request_body(spec.schemas(), operation, &request);
        assert!(body.is_none());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_text_body_becomes_a_string() {
        let spec = spec_with_body(true);
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();

        let mut request = ValidationRequest::new("post", "/pets");
        request.body = Bytes::from_static(b"hello");
        request.mimetype = Some("text/plain".to_string());

        let (body, failures) = cast_request_body(spec.schemas(), operation, &request);
        assert!(failures.is_empty());
        assert_eq!(body, Some(json!("hello")));
    }

    #[test]
    fn test_opaque_mimetype_skips_schema_validation() {
        let spec = spec_with_body(true);
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();

        let mut request = ValidationRequest::new("post", "/pets");
        request.body = Bytes::from_static(&[0xff, 0xfe]);
        request.mimetype = Some("application/octet-stream".to_string());

        let (body, failures) = cast_request_body(spec.schemas(), operation, &request);
        assert!(body.is_none());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_response_body_is_cast() {
        let spec = spec_with_body(true);
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();
        let declared = operation.response_for_status(200).unwrap();

        let mut shape = ValidationResponse::new(200);
        shape.body = Bytes::from_static(br#"{ "id": "7" }"#);
        shape.mimetype = Some("application/json".to_string());

        let (body, failures) = cast_response_body(spec.schemas(), declared, &shape);
        assert!(failures.is_empty());
        assert_eq!(body, Some(json!({ "id": 7 })));
    }
}
