pub mod http;
pub mod path;

use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// The carrier an HTTP parameter is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Parses the `in` field of a Parameter Object.
    pub fn from_field(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

impl Display for ParameterLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        };
        write!(f, "{}", str)
    }
}

/// Raw parameter carriers of a canonical request.
///
/// Header names are lowercased by the producing adapter. Query and header
/// values keep every occurrence of a key as a sequence.
#[derive(Debug, Clone, Default)]
pub struct RequestParameters {
    pub path: HashMap<String, String>,
    pub query: HashMap<String, Vec<String>>,
    pub header: HashMap<String, Vec<String>>,
    pub cookie: HashMap<String, String>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value of a header, if present.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.header
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// The canonical request shape consumed by the core.
///
/// Framework adapters produce this shape; the core never sees a framework's
/// native request type. `path_template` is the already-canonicalized
/// `{name}`-style template when the adapter knows it, letting the validator
/// skip path matching.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    /// Lowercased HTTP method.
    pub method: String,
    /// Percent-encoded request path, without query string.
    pub path: String,
    /// Canonical `{name}`-style template, when known by the adapter.
    pub path_template: Option<String>,
    pub host: String,
    pub parameters: RequestParameters,
    pub body: Bytes,
    pub mimetype: Option<String>,
}

impl ValidationRequest {
    pub fn new(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_lowercase(),
            path: path.into(),
            path_template: None,
            host: String::new(),
            parameters: RequestParameters::new(),
            body: Bytes::new(),
            mimetype: None,
        }
    }
}

/// The canonical response shape consumed by the core.
#[derive(Debug, Clone)]
pub struct ValidationResponse {
    pub status_code: u16,
    pub body: Bytes,
    pub mimetype: Option<String>,
    /// Header names lowercased, every occurrence kept.
    pub headers: HashMap<String, Vec<String>>,
}

impl ValidationResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            body: Bytes::new(),
            mimetype: None,
            headers: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parameter_location_from_field() {
        assert_eq!(
            ParameterLocation::from_field("query"),
            Some(ParameterLocation::Query)
        );
        assert_eq!(
            ParameterLocation::from_field("path"),
            Some(ParameterLocation::Path)
        );
        assert_eq!(ParameterLocation::from_field("body"), None);
    }

    #[test]
    fn test_request_method_is_lowercased() {
        let request = ValidationRequest::new("GET", "/pets");
        assert_eq!(request.method, "get");
    }

    #[test]
    fn test_header_value_lookup_is_case_insensitive_on_input() {
        let mut parameters = RequestParameters::new();
        parameters
            .header
            .insert("x-api-key".to_string(), vec!["secret".to_string()]);
        assert_eq!(parameters.header_value("X-Api-Key"), Some("secret"));
        assert_eq!(parameters.header_value("missing"), None);
    }
}
