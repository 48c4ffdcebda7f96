//! Bridge from `http` crate types to the canonical request/response shapes.
//!
//! Route-template canonicalization stays with the framework adapter: a
//! router using typed placeholders (e.g. `<int:id>`) must rewrite each
//! placeholder to bare `{id}` form before setting `path_template`. This
//! module only lowercases methods and header names, splits query strings,
//! and extracts the mimetype from the content-type header.

use crate::types::{RequestParameters, ValidationRequest, ValidationResponse};
use bytes::Bytes;
use http::HeaderMap;
use std::collections::HashMap;

/// Builds a canonical request from `http::Request` parts.
///
/// `path_template` is the canonical `{name}`-style template for the matched
/// route when the caller knows it; pass `None` to let the validator match
/// the path against the specification's templates.
pub fn request_from_http<B: AsRef<[u8]>>(
    request: &http::Request<B>,
    path_template: Option<&str>,
) -> ValidationRequest {
    let mut parameters = RequestParameters::new();
    parameters.query = request
        .uri()
        .query()
        .map(parse_query_string)
        .unwrap_or_default();
    parameters.header = collect_headers(request.headers());

    ValidationRequest {
        method: request.method().as_str().to_lowercase(),
        path: request.uri().path().to_string(),
        path_template: path_template.map(str::to_owned),
        host: request
            .uri()
            .host()
            .map(str::to_owned)
            .unwrap_or_default(),
        parameters,
        body: Bytes::copy_from_slice(request.body().as_ref()),
        mimetype: mimetype_from_headers(request.headers()),
    }
}

/// Builds a canonical response from `http::Response` parts.
pub fn response_from_http<B: AsRef<[u8]>>(response: &http::Response<B>) -> ValidationResponse {
    ValidationResponse {
        status_code: response.status().as_u16(),
        body: Bytes::copy_from_slice(response.body().as_ref()),
        mimetype: mimetype_from_headers(response.headers()),
        headers: collect_headers(response.headers()),
    }
}

/// Splits a raw query string into a percent-decoded multi-map, preserving
/// every occurrence of a repeated key in order.
pub fn parse_query_string(query: &str) -> HashMap<String, Vec<String>> {
    let mut parsed: HashMap<String, Vec<String>> = HashMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        // A bare key without `=` counts as an empty value.
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_encoding::percent_decode_str(key)
            .decode_utf8_lossy()
            .to_string();
        let value = percent_encoding::percent_decode_str(value)
            .decode_utf8_lossy()
            .to_string();
        parsed.entry(key).or_default().push(value);
    }
    parsed
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut collected: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            collected
                .entry(name.as_str().to_lowercase())
                .or_default()
                .push(value.to_string());
        }
    }
    collected
}

/// Extracts the primary mimetype from the content-type header, dropping any
/// parameters such as `charset`.
pub fn mimetype_from_headers(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get("content-type")?.to_str().ok()?;
    content_type
        .split(';')
        .find(|segment| segment.contains('/'))
        .map(|segment| segment.trim().to_lowercase())
}

#[cfg(test)]
mod test {
    use super::*;
    use http::Request;

    #[test]
    fn test_parse_query_string_preserves_repeated_keys() {
        let parsed = parse_query_string("tag=a&tag=b&limit=10");
        assert_eq!(parsed["tag"], vec!["a", "b"]);
        assert_eq!(parsed["limit"], vec!["10"]);
    }

    #[test]
    fn test_parse_query_string_percent_decodes() {
        let parsed = parse_query_string("name=two%20words");
        assert_eq!(parsed["name"], vec!["two words"]);
    }

    #[test]
    fn test_parse_query_string_keeps_empty_values() {
        let parsed = parse_query_string("flag=&other=1");
        assert_eq!(parsed["flag"], vec![""]);
    }

    #[test]
    fn test_parse_query_string_treats_bare_key_as_empty_value() {
        let parsed = parse_query_string("verbose&limit=1");
        assert_eq!(parsed["verbose"], vec![""]);
        assert_eq!(parsed["limit"], vec!["1"]);
    }

    #[test]
    fn test_request_from_http_canonicalizes() {
        let request = Request::builder()
            .method("POST")
            .uri("https://api.example.com/pets/7?verbose=true")
            .header("Content-Type", "application/json; charset=utf-8")
            .header("X-Trace", "abc")
            .body(b"{}".to_vec())
            .unwrap();

        let canonical = request_from_http(&request, Some("/pets/{id}"));
        assert_eq!(canonical.method, "post");
        assert_eq!(canonical.path, "/pets/7");
        assert_eq!(canonical.path_template.as_deref(), Some("/pets/{id}"));
        assert_eq!(canonical.host, "api.example.com");
        assert_eq!(canonical.mimetype.as_deref(), Some("application/json"));
        assert_eq!(canonical.parameters.query["verbose"], vec!["true"]);
        assert_eq!(canonical.parameters.header["x-trace"], vec!["abc"]);
        assert_eq!(&canonical.body[..], b"{}");
    }
}
