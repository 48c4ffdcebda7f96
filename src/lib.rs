//! Validates HTTP requests and responses against an OpenAPI 3.x contract.
//!
//! The crate builds a typed, immutable [`spec::Spec`] from an already-parsed
//! specification document (`serde_json::Value`), matches incoming request
//! paths to operations, extracts and type-casts parameters and bodies from
//! their declared locations, and checks them against declared schemas. The
//! result is either a normalized, typed request/response or an ordered list
//! of validation failures.
//!
//! Document loading (reading YAML/JSON from a file or URL) and framework
//! adapters are external collaborators; the core consumes the canonical
//! request/response shapes in [`types`].

pub mod error;
pub mod resolver;
pub mod router;
pub mod spec;
pub mod types;
pub mod validator;

pub use crate::error::{SpecError, ValidationErrors, ValidationFailure};
pub use crate::spec::Spec;
pub use crate::validator::{
    RequestValidator, ResponseValidator, ValidatedRequest, ValidatedResponse,
};

pub(crate) const OPENAPI_FIELD: &str = "openapi";
pub(crate) const INFO_FIELD: &str = "info";
pub(crate) const SERVERS_FIELD: &str = "servers";
pub(crate) const PATHS_FIELD: &str = "paths";
pub(crate) const COMPONENTS_FIELD: &str = "components";
pub(crate) const PARAMETERS_FIELD: &str = "parameters";
pub(crate) const REQUEST_BODY_FIELD: &str = "requestBody";
pub(crate) const RESPONSES_FIELD: &str = "responses";
pub(crate) const CONTENT_FIELD: &str = "content";
pub(crate) const HEADERS_FIELD: &str = "headers";
pub(crate) const SCHEMA_FIELD: &str = "schema";
pub(crate) const SECURITY_FIELD: &str = "security";
pub(crate) const REQUIRED_FIELD: &str = "required";
pub(crate) const NAME_FIELD: &str = "name";
pub(crate) const IN_FIELD: &str = "in";
pub(crate) const TYPE_FIELD: &str = "type";
pub(crate) const REF_FIELD: &str = "$ref";
pub(crate) const DEFAULT_FIELD: &str = "default";
pub(crate) const ENUM_FIELD: &str = "enum";

pub(crate) const PATH_SEPARATOR: &str = "/";
pub(crate) const TILDE: &str = "~";
pub(crate) const ENCODED_SLASH: &str = "~1";
pub(crate) const ENCODED_TILDE: &str = "~0";
