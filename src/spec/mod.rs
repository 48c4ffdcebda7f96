pub mod schema;

use crate::error::SpecError;
use crate::resolver::Resolver;
use crate::spec::schema::{SchemaBuilder, SchemaId, SchemaStore};
use crate::types::path::ValuePath;
use crate::types::ParameterLocation;
use crate::{
    COMPONENTS_FIELD, CONTENT_FIELD, HEADERS_FIELD, IN_FIELD, INFO_FIELD, NAME_FIELD,
    OPENAPI_FIELD, PARAMETERS_FIELD, PATHS_FIELD, REQUEST_BODY_FIELD, REQUIRED_FIELD,
    RESPONSES_FIELD, SCHEMA_FIELD, SECURITY_FIELD, SERVERS_FIELD, TYPE_FIELD,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const DEFAULT_STATUS: &str = "default";

/// Document metadata.
#[derive(Debug, Clone)]
pub struct Info {
    pub title: String,
    pub version: String,
}

/// One variable of a server URL template.
#[derive(Debug, Clone)]
pub struct ServerVariable {
    pub default: String,
    pub enum_values: Vec<String>,
    pub description: Option<String>,
}

/// A base URL template with named variables.
#[derive(Debug, Clone)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
    pub variables: BTreeMap<String, ServerVariable>,
}

impl Server {
    /// The URL with every variable substituted by its default.
    pub fn default_url(&self) -> String {
        let mut url = self.url.clone();
        for (name, variable) in &self.variables {
            url = url.replace(&format!("{{{}}}", name), &variable.default);
        }
        url
    }
}

/// Array deserialization style of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    Simple,
    Form,
    SpaceDelimited,
    PipeDelimited,
}

impl ParameterStyle {
    pub(crate) fn delimiter(&self) -> char {
        match self {
            ParameterStyle::Simple | ParameterStyle::Form => ',',
            ParameterStyle::SpaceDelimited => ' ',
            ParameterStyle::PipeDelimited => '|',
        }
    }

    fn default_for(location: ParameterLocation) -> Self {
        match location {
            ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
            ParameterLocation::Path | ParameterLocation::Header => ParameterStyle::Simple,
        }
    }

    fn from_field(value: &str) -> Option<Self> {
        match value {
            "simple" => Some(ParameterStyle::Simple),
            "form" => Some(ParameterStyle::Form),
            "spaceDelimited" => Some(ParameterStyle::SpaceDelimited),
            "pipeDelimited" => Some(ParameterStyle::PipeDelimited),
            _ => None,
        }
    }
}

/// One declared parameter (or response header).
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    /// Path parameters are always required, whatever the document says.
    pub required: bool,
    pub schema: Option<SchemaId>,
    pub style: ParameterStyle,
    pub explode: bool,
    pub description: Option<String>,
}

/// One media-type entry of a request body or response.
#[derive(Debug, Clone)]
pub struct MediaType {
    pub mimetype: String,
    pub schema: Option<SchemaId>,
    pub example: Option<Value>,
}

/// The declared request body of an operation.
#[derive(Debug, Clone)]
pub struct RequestBody {
    pub required: bool,
    pub description: Option<String>,
    content: Vec<MediaType>,
}

impl RequestBody {
    pub fn content(&self) -> &[MediaType] {
        &self.content
    }

    /// Exact-match media type lookup; no implicit negotiation.
    pub fn media_type(&self, mimetype: &str) -> Option<&MediaType> {
        self.content.iter().find(|media| media.mimetype == mimetype)
    }
}

/// One declared response of an operation.
#[derive(Debug, Clone)]
pub struct Response {
    pub description: Option<String>,
    content: Vec<MediaType>,
    pub headers: Vec<Parameter>,
}

impl Response {
    pub fn content(&self) -> &[MediaType] {
        &self.content
    }

    pub fn media_type(&self, mimetype: &str) -> Option<&MediaType> {
        self.content.iter().find(|media| media.mimetype == mimetype)
    }
}

/// One named security scheme from the components section.
///
/// Only the credential carrier matters at this layer; deeper semantics
/// (token validity, scope grants) belong to an external authorizer.
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityScheme {
    ApiKey {
        name: String,
        location: ParameterLocation,
    },
    Http {
        scheme: String,
    },
    OAuth2,
    OpenIdConnect,
}

/// One security alternative: a named scheme plus required scope names
/// (empty for non-OAuth schemes).
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityRequirement {
    pub name: String,
    pub scope_names: Vec<String>,
}

/// One HTTP-method handler under one path template.
#[derive(Debug, Clone)]
pub struct Operation {
    pub path_template: String,
    pub method: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Operation-level parameters merged with inherited path-level ones,
    /// deduplicated by (name, location) with the operation winning.
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    responses: Vec<(String, Response)>,
    /// `None` means the document-level default applies; `Some(vec![])`
    /// explicitly disables security for this operation.
    pub security: Option<Vec<SecurityRequirement>>,
    pub servers: Vec<Server>,
}

impl Operation {
    pub fn responses(&self) -> impl Iterator<Item = (&str, &Response)> {
        self.responses
            .iter()
            .map(|(status, response)| (status.as_str(), response))
    }

    /// Resolves a response entry by exact status code, falling back to the
    /// "default" entry when no exact entry exists.
    pub fn response_for_status(&self, status: u16) -> Option<&Response> {
        let exact = status.to_string();
        self.responses
            .iter()
            .find(|(key, _)| *key == exact)
            .or_else(|| self.responses.iter().find(|(key, _)| key == DEFAULT_STATUS))
            .map(|(_, response)| response)
    }
}

/// One path template with its operations and inherited parameters.
#[derive(Debug, Clone)]
pub struct PathItem {
    pub parameters: Vec<Parameter>,
    operations: Vec<(String, Operation)>,
}

impl PathItem {
    pub fn operations(&self) -> impl Iterator<Item = (&str, &Operation)> {
        self.operations
            .iter()
            .map(|(method, operation)| (method.as_str(), operation))
    }

    pub fn operation(&self, method: &str) -> Option<&Operation> {
        let method = method.to_lowercase();
        self.operations
            .iter()
            .find(|(declared, _)| *declared == method)
            .map(|(_, operation)| operation)
    }
}

/// Named reusable components of the document.
#[derive(Debug, Clone, Default)]
pub struct Components {
    schemas: Vec<(String, SchemaId)>,
    security_schemes: Vec<(String, SecurityScheme)>,
}

impl Components {
    pub fn schemas(&self) -> impl Iterator<Item = (&str, SchemaId)> {
        self.schemas.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn schema(&self, name: &str) -> Option<SchemaId> {
        self.schemas
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, id)| *id)
    }

    pub fn security_scheme(&self, name: &str) -> Option<&SecurityScheme> {
        self.security_schemes
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, scheme)| scheme)
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.security_schemes.is_empty()
    }
}

/// The full, immutable object graph of one OpenAPI 3.x document.
///
/// Built once per document load; safe for concurrent read-only use by any
/// number of simultaneous validations.
#[derive(Debug)]
pub struct Spec {
    resolver: Resolver,
    pub info: Option<Info>,
    pub servers: Vec<Server>,
    paths: Vec<(String, PathItem)>,
    pub components: Components,
    default_security: Vec<SecurityRequirement>,
    store: SchemaStore,
}

impl Spec {
    /// Builds the typed model from a raw document.
    ///
    /// Pure and deterministic; the first structural violation aborts the
    /// build with a pointer path to the offending node.
    pub fn from_document(document: Value) -> Result<Self, SpecError> {
        let root_pointer = ValuePath::new();

        let version = document
            .get(OPENAPI_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SpecError::invalid(&root_pointer, "missing or non-string 'openapi' field")
            })?;
        if !version.starts_with("3.") {
            return Err(SpecError::unsupported_version(version));
        }

        let document = Arc::new(document);
        let resolver = Resolver::new(document.clone());
        let mut builder = SpecBuilder {
            resolver: &resolver,
            schemas: SchemaBuilder::new(&resolver),
        };

        let info = match document.get(INFO_FIELD) {
            None => None,
            Some(node) => Some(builder.build_info(node, &root_pointer.child(INFO_FIELD))?),
        };

        let mut servers = Vec::new();
        if let Some(node) = document.get(SERVERS_FIELD) {
            let pointer = root_pointer.child(SERVERS_FIELD);
            let entries = node
                .as_array()
                .ok_or_else(|| SpecError::invalid(&pointer, "'servers' must be an array"))?;
            for (idx, entry) in entries.iter().enumerate() {
                servers.push(builder.build_server(entry, &pointer.index(idx))?);
            }
        }

        let paths_pointer = root_pointer.child(PATHS_FIELD);
        let raw_paths = document
            .get(PATHS_FIELD)
            .ok_or_else(|| SpecError::invalid(&root_pointer, "missing 'paths' object"))?
            .as_object()
            .ok_or_else(|| SpecError::invalid(&paths_pointer, "'paths' must be an object"))?;

        let mut paths = Vec::with_capacity(raw_paths.len());
        for (template, node) in raw_paths {
            let pointer = paths_pointer.child(template);
            paths.push((
                template.clone(),
                builder.build_path_item(template, node, &pointer)?,
            ));
        }

        let default_security = match document.get(SECURITY_FIELD) {
            None => Vec::new(),
            Some(node) => {
                builder.build_security_requirements(node, &root_pointer.child(SECURITY_FIELD))?
            }
        };

        let components = match document.get(COMPONENTS_FIELD) {
            None => Components::default(),
            Some(node) => {
                builder.build_components(node, &root_pointer.child(COMPONENTS_FIELD))?
            }
        };

        let store = builder.schemas.finish();

        Ok(Spec {
            resolver,
            info,
            servers,
            paths,
            components,
            default_security,
            store,
        })
    }

    pub fn paths(&self) -> impl Iterator<Item = (&str, &PathItem)> {
        self.paths
            .iter()
            .map(|(template, item)| (template.as_str(), item))
    }

    pub fn path(&self, template: &str) -> Option<&PathItem> {
        self.paths
            .iter()
            .find(|(declared, _)| declared == template)
            .map(|(_, item)| item)
    }

    pub fn schemas(&self) -> &SchemaStore {
        &self.store
    }

    pub fn document(&self) -> &Value {
        self.resolver.document()
    }

    /// Resolves a `$ref` string against this document, memoized.
    pub fn resolve_ref(&self, ref_string: &str) -> Result<Arc<Value>, SpecError> {
        self.resolver.lookup(ref_string)
    }

    /// The default URL of the first declared server, with server variables
    /// substituted by their defaults.
    pub fn server_url(&self) -> Option<String> {
        self.servers.first().map(Server::default_url)
    }

    pub(crate) fn default_security(&self) -> &[SecurityRequirement] {
        &self.default_security
    }
}

struct SpecBuilder<'r> {
    resolver: &'r Resolver,
    schemas: SchemaBuilder<'r>,
}

impl SpecBuilder<'_> {
    fn build_info(&mut self, node: &Value, pointer: &ValuePath) -> Result<Info, SpecError> {
        Ok(Info {
            title: require_str(node, "title", pointer)?,
            version: require_str(node, "version", pointer)?,
        })
    }

    fn build_server(&mut self, node: &Value, pointer: &ValuePath) -> Result<Server, SpecError> {
        let url = require_str(node, "url", pointer)?;

        let mut variables = BTreeMap::new();
        if let Some(raw_variables) = node.get("variables") {
            let raw_variables = raw_variables
                .as_object()
                .ok_or_else(|| SpecError::invalid(pointer, "'variables' must be an object"))?;
            for (name, raw_variable) in raw_variables {
                let variable_pointer = pointer.child("variables").child(name);
                let default = require_str(raw_variable, "default", &variable_pointer)?;
                let mut enum_values = Vec::new();
                if let Some(raw_enum) = raw_variable.get("enum") {
                    let raw_enum = raw_enum.as_array().ok_or_else(|| {
                        SpecError::invalid(&variable_pointer, "'enum' must be an array")
                    })?;
                    for value in raw_enum {
                        let value = value.as_str().ok_or_else(|| {
                            SpecError::invalid(
                                &variable_pointer,
                                "'enum' entries must be strings",
                            )
                        })?;
                        enum_values.push(value.to_owned());
                    }
                }
                variables.insert(
                    name.clone(),
                    ServerVariable {
                        default,
                        enum_values,
                        description: optional_str(raw_variable, "description"),
                    },
                );
            }
        }

        // Every variable referenced in the URL template needs an entry.
        for variable in template_variables(&url) {
            if !variables.contains_key(variable) {
                return Err(SpecError::invalid(
                    pointer,
                    format!("server URL references undeclared variable '{}'", variable),
                ));
            }
        }

        Ok(Server {
            url,
            description: optional_str(node, "description"),
            variables,
        })
    }

    fn build_path_item(
        &mut self,
        template: &str,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<PathItem, SpecError> {
        let resolved = self.resolver.resolve(node)?;
        let node = resolved.value();
        node.as_object()
            .ok_or_else(|| SpecError::invalid(pointer, "path item must be an object"))?;

        let path_parameters =
            self.build_parameters(node.get(PARAMETERS_FIELD), &pointer.child(PARAMETERS_FIELD))?;

        let mut operations = Vec::new();
        for method in HTTP_METHODS {
            if let Some(raw_operation) = node.get(method) {
                let operation = self.build_operation(
                    template,
                    method,
                    raw_operation,
                    &path_parameters,
                    &pointer.child(method),
                )?;
                operations.push((method.to_string(), operation));
            }
        }

        Ok(PathItem {
            parameters: path_parameters,
            operations,
        })
    }

    fn build_operation(
        &mut self,
        template: &str,
        method: &str,
        node: &Value,
        path_parameters: &[Parameter],
        pointer: &ValuePath,
    ) -> Result<Operation, SpecError> {
        node.as_object()
            .ok_or_else(|| SpecError::invalid(pointer, "operation must be an object"))?;

        let mut parameters =
            self.build_parameters(node.get(PARAMETERS_FIELD), &pointer.child(PARAMETERS_FIELD))?;

        // Inherit path-level parameters unless shadowed by (name, location).
        for inherited in path_parameters {
            let shadowed = parameters.iter().any(|own| {
                own.name == inherited.name && own.location == inherited.location
            });
            if !shadowed {
                parameters.push(inherited.clone());
            }
        }

        let request_body = match node.get(REQUEST_BODY_FIELD) {
            None => None,
            Some(raw_body) => {
                Some(self.build_request_body(raw_body, &pointer.child(REQUEST_BODY_FIELD))?)
            }
        };

        let mut responses = Vec::new();
        if let Some(raw_responses) = node.get(RESPONSES_FIELD) {
            let responses_pointer = pointer.child(RESPONSES_FIELD);
            let raw_responses = raw_responses.as_object().ok_or_else(|| {
                SpecError::invalid(&responses_pointer, "'responses' must be an object")
            })?;
            for (status, raw_response) in raw_responses {
                let response =
                    self.build_response(raw_response, &responses_pointer.child(status))?;
                responses.push((status.clone(), response));
            }
        }

        let security = match node.get(SECURITY_FIELD) {
            None => None,
            Some(raw_security) => Some(
                self.build_security_requirements(raw_security, &pointer.child(SECURITY_FIELD))?,
            ),
        };

        let mut servers = Vec::new();
        if let Some(raw_servers) = node.get(SERVERS_FIELD) {
            let servers_pointer = pointer.child(SERVERS_FIELD);
            let raw_servers = raw_servers.as_array().ok_or_else(|| {
                SpecError::invalid(&servers_pointer, "'servers' must be an array")
            })?;
            for (idx, raw_server) in raw_servers.iter().enumerate() {
                servers.push(self.build_server(raw_server, &servers_pointer.index(idx))?);
            }
        }

        let mut tags = Vec::new();
        if let Some(raw_tags) = node.get("tags") {
            let raw_tags = raw_tags
                .as_array()
                .ok_or_else(|| SpecError::invalid(pointer, "'tags' must be an array"))?;
            for tag in raw_tags {
                let tag = tag.as_str().ok_or_else(|| {
                    SpecError::invalid(pointer, "'tags' entries must be strings")
                })?;
                tags.push(tag.to_owned());
            }
        }

        Ok(Operation {
            path_template: template.to_owned(),
            method: method.to_owned(),
            operation_id: optional_str(node, "operationId"),
            summary: optional_str(node, "summary"),
            description: optional_str(node, "description"),
            tags,
            parameters,
            request_body,
            responses,
            security,
            servers,
        })
    }

    fn build_parameters(
        &mut self,
        node: Option<&Value>,
        pointer: &ValuePath,
    ) -> Result<Vec<Parameter>, SpecError> {
        let Some(node) = node else {
            return Ok(Vec::new());
        };
        let entries = node
            .as_array()
            .ok_or_else(|| SpecError::invalid(pointer, "'parameters' must be an array"))?;

        let mut parameters: Vec<Parameter> = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let parameter = self.build_parameter(entry, &pointer.index(idx))?;
            // Deduplicate by (name, location), first declaration wins.
            let duplicate = parameters.iter().any(|existing| {
                existing.name == parameter.name && existing.location == parameter.location
            });
            if duplicate {
                log::warn!(
                    "Dropping duplicate {} parameter '{}'",
                    parameter.location,
                    parameter.name
                );
                continue;
            }
            parameters.push(parameter);
        }
        Ok(parameters)
    }

    fn build_parameter(
        &mut self,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<Parameter, SpecError> {
        let resolved = self.resolver.resolve(node)?;
        let node = resolved.value();

        let name = require_str(node, NAME_FIELD, pointer)?;
        let raw_location = require_str(node, IN_FIELD, pointer)?;
        let location = ParameterLocation::from_field(&raw_location).ok_or_else(|| {
            SpecError::invalid(
                pointer,
                format!("unknown parameter location '{}'", raw_location),
            )
        })?;

        // Path parameters are implicitly required.
        let required = location == ParameterLocation::Path
            || node
                .get(REQUIRED_FIELD)
                .and_then(Value::as_bool)
                .unwrap_or(false);

        let schema = match node.get(SCHEMA_FIELD) {
            None => None,
            Some(raw_schema) => {
                Some(self.schemas.build(raw_schema, &pointer.child(SCHEMA_FIELD))?)
            }
        };

        let style = match node.get("style").and_then(Value::as_str) {
            None => ParameterStyle::default_for(location),
            Some(raw_style) => ParameterStyle::from_field(raw_style).ok_or_else(|| {
                SpecError::invalid(pointer, format!("unsupported style '{}'", raw_style))
            })?,
        };
        let explode = node
            .get("explode")
            .and_then(Value::as_bool)
            .unwrap_or(style == ParameterStyle::Form);

        Ok(Parameter {
            name,
            location,
            required,
            schema,
            style,
            explode,
            description: optional_str(node, "description"),
        })
    }

    fn build_request_body(
        &mut self,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<RequestBody, SpecError> {
        let resolved = self.resolver.resolve(node)?;
        let node = resolved.value();

        let content = node
            .get(CONTENT_FIELD)
            .ok_or_else(|| SpecError::invalid(pointer, "request body is missing 'content'"))?;
        let content = self.build_media_types(content, &pointer.child(CONTENT_FIELD))?;

        Ok(RequestBody {
            required: node
                .get(REQUIRED_FIELD)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            description: optional_str(node, "description"),
            content,
        })
    }

    fn build_response(
        &mut self,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<Response, SpecError> {
        let resolved = self.resolver.resolve(node)?;
        let node = resolved.value();
        node.as_object()
            .ok_or_else(|| SpecError::invalid(pointer, "response must be an object"))?;

        let content = match node.get(CONTENT_FIELD) {
            None => Vec::new(),
            Some(raw_content) => {
                self.build_media_types(raw_content, &pointer.child(CONTENT_FIELD))?
            }
        };

        let mut headers = Vec::new();
        if let Some(raw_headers) = node.get(HEADERS_FIELD) {
            let headers_pointer = pointer.child(HEADERS_FIELD);
            let raw_headers = raw_headers.as_object().ok_or_else(|| {
                SpecError::invalid(&headers_pointer, "'headers' must be an object")
            })?;
            for (name, raw_header) in raw_headers {
                headers.push(self.build_response_header(
                    name,
                    raw_header,
                    &headers_pointer.child(name),
                )?);
            }
        }

        Ok(Response {
            description: optional_str(node, "description"),
            content,
            headers,
        })
    }

    /// Header Objects are Parameter Objects without `name`/`in`; the name
    /// comes from the map key and the location is always the header carrier.
    fn build_response_header(
        &mut self,
        name: &str,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<Parameter, SpecError> {
        let resolved = self.resolver.resolve(node)?;
        let node = resolved.value();

        let schema = match node.get(SCHEMA_FIELD) {
            None => None,
            Some(raw_schema) => {
                Some(self.schemas.build(raw_schema, &pointer.child(SCHEMA_FIELD))?)
            }
        };

        Ok(Parameter {
            name: name.to_owned(),
            location: ParameterLocation::Header,
            required: node
                .get(REQUIRED_FIELD)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            schema,
            style: ParameterStyle::Simple,
            explode: false,
            description: optional_str(node, "description"),
        })
    }

    fn build_media_types(
        &mut self,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<Vec<MediaType>, SpecError> {
        let entries = node
            .as_object()
            .ok_or_else(|| SpecError::invalid(pointer, "'content' must be an object"))?;

        let mut media_types = Vec::with_capacity(entries.len());
        for (mimetype, raw_media) in entries {
            let media_pointer = pointer.child(mimetype);
            let schema = match raw_media.get(SCHEMA_FIELD) {
                None => None,
                Some(raw_schema) => Some(
                    self.schemas
                        .build(raw_schema, &media_pointer.child(SCHEMA_FIELD))?,
                ),
            };
            media_types.push(MediaType {
                mimetype: mimetype.clone(),
                schema,
                example: raw_media.get("example").cloned(),
            });
        }
        Ok(media_types)
    }

    fn build_security_requirements(
        &mut self,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<Vec<SecurityRequirement>, SpecError> {
        let entries = node
            .as_array()
            .ok_or_else(|| SpecError::invalid(pointer, "'security' must be an array"))?;

        let mut requirements = Vec::new();
        for (idx, entry) in entries.iter().enumerate() {
            let entry_pointer = pointer.index(idx);
            let entry = entry.as_object().ok_or_else(|| {
                SpecError::invalid(&entry_pointer, "security requirement must be an object")
            })?;
            // Each named scheme becomes its own alternative.
            for (name, raw_scopes) in entry {
                let raw_scopes = raw_scopes.as_array().ok_or_else(|| {
                    SpecError::invalid(&entry_pointer, "scope list must be an array")
                })?;
                let mut scope_names = Vec::with_capacity(raw_scopes.len());
                for scope in raw_scopes {
                    let scope = scope.as_str().ok_or_else(|| {
                        SpecError::invalid(&entry_pointer, "scope names must be strings")
                    })?;
                    scope_names.push(scope.to_owned());
                }
                requirements.push(SecurityRequirement {
                    name: name.clone(),
                    scope_names,
                });
            }
        }
        Ok(requirements)
    }

    fn build_components(
        &mut self,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<Components, SpecError> {
        let node = node
            .as_object()
            .ok_or_else(|| SpecError::invalid(pointer, "'components' must be an object"))?;

        let mut components = Components::default();

        if let Some(raw_schemas) = node.get("schemas") {
            let schemas_pointer = pointer.child("schemas");
            let raw_schemas = raw_schemas.as_object().ok_or_else(|| {
                SpecError::invalid(&schemas_pointer, "'schemas' must be an object")
            })?;
            for (name, raw_schema) in raw_schemas {
                let id = self
                    .schemas
                    .build(raw_schema, &schemas_pointer.child(name))?;
                components.schemas.push((name.clone(), id));
            }
        }

        if let Some(raw_schemes) = node.get("securitySchemes") {
            let schemes_pointer = pointer.child("securitySchemes");
            let raw_schemes = raw_schemes.as_object().ok_or_else(|| {
                SpecError::invalid(&schemes_pointer, "'securitySchemes' must be an object")
            })?;
            for (name, raw_scheme) in raw_schemes {
                let scheme =
                    self.build_security_scheme(raw_scheme, &schemes_pointer.child(name))?;
                components.security_schemes.push((name.clone(), scheme));
            }
        }

        Ok(components)
    }

    fn build_security_scheme(
        &mut self,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<SecurityScheme, SpecError> {
        let resolved = self.resolver.resolve(node)?;
        let node = resolved.value();
        let scheme_type = require_str(node, TYPE_FIELD, pointer)?;

        match scheme_type.as_str() {
            "apiKey" => {
                let name = require_str(node, NAME_FIELD, pointer)?;
                let raw_location = require_str(node, IN_FIELD, pointer)?;
                let location =
                    ParameterLocation::from_field(&raw_location).ok_or_else(|| {
                        SpecError::invalid(
                            pointer,
                            format!("unknown apiKey location '{}'", raw_location),
                        )
                    })?;
                Ok(SecurityScheme::ApiKey { name, location })
            }
            "http" => Ok(SecurityScheme::Http {
                scheme: require_str(node, "scheme", pointer)?,
            }),
            "oauth2" => Ok(SecurityScheme::OAuth2),
            "openIdConnect" => Ok(SecurityScheme::OpenIdConnect),
            other => Err(SpecError::invalid(
                pointer,
                format!("unknown security scheme type '{}'", other),
            )),
        }
    }
}

fn require_str(node: &Value, field: &str, pointer: &ValuePath) -> Result<String, SpecError> {
    node.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            SpecError::invalid(pointer, format!("missing or non-string '{}'", field))
        })
}

fn optional_str(node: &Value, field: &str) -> Option<String> {
    node.get(field).and_then(Value::as_str).map(str::to_owned)
}

/// Names of `{variable}` placeholders in a URL template.
fn template_variables(url: &str) -> Vec<&str> {
    let mut variables = Vec::new();
    let mut rest = url;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        variables.push(&rest[start + 1..start + end]);
        rest = &rest[start + end + 1..];
    }
    variables
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn petstore_document() -> Value {
        json!({
            "openapi": "3.0.0",
            "info": { "title": "Swagger Petstore", "version": "1.0.0" },
            "servers": [
                {
                    "url": "http://petstore.swagger.io/{version}",
                    "variables": {
                        "version": { "default": "v1", "enum": ["v1", "v2"] }
                    }
                }
            ],
            "paths": {
                "/pets": {
                    "parameters": [
                        {
                            "name": "api-version",
                            "in": "header",
                            "schema": { "type": "string" }
                        }
                    ],
                    "get": {
                        "operationId": "listPets",
                        "tags": ["pets"],
                        "parameters": [
                            {
                                "name": "limit",
                                "in": "query",
                                "schema": { "type": "integer", "format": "int32" }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "A paged array of pets",
                                "headers": {
                                    "x-next": { "schema": { "type": "string" } }
                                },
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Pets" }
                                    }
                                }
                            },
                            "default": {
                                "description": "unexpected error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Error" }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "operationId": "createPet",
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Pet" }
                                }
                            }
                        },
                        "security": [ { "api_key": [] } ],
                        "responses": {
                            "201": { "description": "created" }
                        }
                    }
                },
                "/pets/{petId}": {
                    "get": {
                        "operationId": "showPetById",
                        "parameters": [
                            {
                                "name": "petId",
                                "in": "path",
                                "schema": { "type": "integer" }
                            }
                        ],
                        "responses": {
                            "200": { "description": "ok" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "required": ["id", "name"],
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "name": { "type": "string" },
                            "tag": { "type": "string" }
                        }
                    },
                    "Pets": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/Pet" }
                    },
                    "Error": {
                        "type": "object",
                        "required": ["code", "message"],
                        "properties": {
                            "code": { "type": "integer" },
                            "message": { "type": "string" }
                        }
                    }
                },
                "securitySchemes": {
                    "api_key": { "type": "apiKey", "name": "x-api-key", "in": "header" }
                }
            }
        })
    }

    #[test]
    fn test_build_round_trips_declared_metadata() {
        let document = petstore_document();
        let spec = Spec::from_document(document.clone()).unwrap();

        let info = spec.info.as_ref().unwrap();
        assert_eq!(info.title, document["info"]["title"]);
        assert_eq!(info.version, document["info"]["version"]);

        assert_eq!(spec.server_url().as_deref(), Some("http://petstore.swagger.io/v1"));
        let server = &spec.servers[0];
        assert_eq!(server.url, document["servers"][0]["url"]);
        assert_eq!(server.variables["version"].enum_values, vec!["v1", "v2"]);

        for (template, item) in spec.paths() {
            assert!(document["paths"].get(template).is_some());
            for (method, operation) in item.operations() {
                let raw = &document["paths"][template][method];
                assert_eq!(operation.path_template, template);
                assert_eq!(operation.method, method);
                assert_eq!(
                    operation.operation_id.as_deref(),
                    raw["operationId"].as_str()
                );
            }
        }

        assert!(!spec.components.is_empty());
        assert!(spec.components.schema("Pet").is_some());
        assert_eq!(
            spec.components.security_scheme("api_key"),
            Some(&SecurityScheme::ApiKey {
                name: "x-api-key".to_string(),
                location: ParameterLocation::Header,
            })
        );
    }

    #[test]
    fn test_operations_inherit_path_level_parameters() {
        let spec = Spec::from_document(petstore_document()).unwrap();
        let operation = spec.path("/pets").unwrap().operation("get").unwrap();

        let names: Vec<&str> = operation
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["limit", "api-version"]);
    }

    #[test]
    fn test_path_parameters_are_implicitly_required() {
        let spec = Spec::from_document(petstore_document()).unwrap();
        let operation = spec.path("/pets/{petId}").unwrap().operation("get").unwrap();
        let pet_id = &operation.parameters[0];
        assert_eq!(pet_id.location, ParameterLocation::Path);
        assert!(pet_id.required);
    }

    #[test]
    fn test_response_resolution_falls_back_to_default() {
        let spec = Spec::from_document(petstore_document()).unwrap();
        let operation = spec.path("/pets").unwrap().operation("get").unwrap();

        assert!(operation.response_for_status(200).is_some());
        let fallback = operation.response_for_status(503).unwrap();
        assert_eq!(fallback.description.as_deref(), Some("unexpected error"));
    }

    #[test]
    fn test_operation_security_flattens_named_schemes() {
        let spec = Spec::from_document(petstore_document()).unwrap();
        let operation = spec.path("/pets").unwrap().operation("post").unwrap();
        let security = operation.security.as_ref().unwrap();
        assert_eq!(security.len(), 1);
        assert_eq!(security[0].name, "api_key");
        assert!(security[0].scope_names.is_empty());
    }

    #[test]
    fn test_build_rejects_undeclared_server_variable() {
        let document = json!({
            "openapi": "3.0.0",
            "servers": [ { "url": "https://{region}.example.com" } ],
            "paths": {}
        });
        let result = Spec::from_document(document);
        assert!(matches!(
            result,
            Err(SpecError::InvalidSpecification { .. })
        ));
    }

    #[test]
    fn test_build_rejects_parameter_without_location() {
        let document = json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets": {
                    "get": {
                        "parameters": [ { "name": "limit" } ]
                    }
                }
            }
        });
        match Spec::from_document(document) {
            Err(SpecError::InvalidSpecification { pointer, .. }) => {
                assert!(pointer.contains("parameters"));
            }
            other => panic!("expected InvalidSpecification, got {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_non_3x_version() {
        let document = json!({ "openapi": "2.0", "paths": {} });
        match Spec::from_document(document) {
            Err(SpecError::UnsupportedVersion(version)) => assert_eq!(version, "2.0"),
            _ => panic!("expected UnsupportedVersion"),
        }
    }

    #[test]
    fn test_build_requires_openapi_field() {
        let document = json!({ "paths": {} });
        assert!(matches!(
            Spec::from_document(document),
            Err(SpecError::InvalidSpecification { .. })
        ));
    }
}
