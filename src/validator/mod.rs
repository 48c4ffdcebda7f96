//! Request and response validation against a built [`Spec`].

pub mod body;
pub mod parameter;
pub mod schema;
pub mod security;

pub use crate::validator::parameter::TypedParameters;

use crate::error::{ValidationErrors, ValidationFailure};
use crate::router::{extract_path_parameters, RouteMatch, Router};
use crate::spec::{Operation, SecurityRequirement, Spec};
use crate::types::{ValidationRequest, ValidationResponse};
use crate::validator::schema::SchemaCaster;
use serde_json::Value;
use std::collections::HashMap;

/// A request that passed validation: the matched operation plus the typed
/// values extracted from the declared carriers.
#[derive(Debug)]
pub struct ValidatedRequest<'s> {
    pub operation: &'s Operation,
    pub parameters: TypedParameters,
    pub body: Option<Value>,
    /// The satisfied security alternative, for an external authorizer to
    /// check the credential against.
    pub security: Option<&'s SecurityRequirement>,
}

/// A response that passed validation against its matched response entry.
#[derive(Debug)]
pub struct ValidatedResponse {
    pub headers: HashMap<String, Value>,
    pub body: Option<Value>,
}

/// Validates canonical requests against one specification.
///
/// Cheap to share: all lookups go through the immutable [`Spec`] and the
/// pre-compiled router.
pub struct RequestValidator<'s> {
    spec: &'s Spec,
    router: Router,
}

impl<'s> RequestValidator<'s> {
    pub fn new(spec: &'s Spec) -> Self {
        Self {
            spec,
            router: Router::from_spec(spec),
        }
    }

    /// Validates one request end to end.
    ///
    /// Operation lookup failures are terminal; past that point every
    /// independent parameter, body, and security failure is collected
    /// before returning.
    pub fn validate(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidatedRequest<'s>, ValidationErrors> {
        let (operation, path_values) = resolve_operation(self.spec, &self.router, request)
            .map_err(ValidationErrors::single)?;

        let mut failures = Vec::new();

        let (parameters, parameter_failures) = parameter::cast_parameters(
            self.spec.schemas(),
            &operation.parameters,
            request,
            &path_values,
        );
        failures.extend(parameter_failures);

        let (body, body_failures) =
            body::cast_request_body(self.spec.schemas(), operation, request);
        failures.extend(body_failures);

        let security =
            match security::check_security(self.spec, operation.security.as_deref(), request) {
                Ok(satisfied) => satisfied,
                Err(failure) => {
                    failures.push(failure);
                    None
                }
            };

        if failures.is_empty() {
            Ok(ValidatedRequest {
                operation,
                parameters,
                body,
                security,
            })
        } else {
            Err(ValidationErrors::new(failures))
        }
    }
}

/// Validates canonical responses against the operation their request
/// matched.
pub struct ResponseValidator<'s> {
    spec: &'s Spec,
    router: Router,
}

impl<'s> ResponseValidator<'s> {
    pub fn new(spec: &'s Spec) -> Self {
        Self {
            spec,
            router: Router::from_spec(spec),
        }
    }

    pub fn validate(
        &self,
        request: &ValidationRequest,
        response: &ValidationResponse,
    ) -> Result<ValidatedResponse, ValidationErrors> {
        let (operation, _) = resolve_operation(self.spec, &self.router, request)
            .map_err(ValidationErrors::single)?;

        let Some(declared) = operation.response_for_status(response.status_code) else {
            return Err(ValidationErrors::single(
                ValidationFailure::ResponseNotFound {
                    status: response.status_code,
                },
            ));
        };

        let mut failures = Vec::new();

        let (body, body_failures) =
            body::cast_response_body(self.spec.schemas(), declared, response);
        failures.extend(body_failures);

        let caster = SchemaCaster::new(self.spec.schemas());
        let mut headers = HashMap::new();
        for header in &declared.headers {
            let values = response.headers.get(&header.name.to_lowercase());
            match parameter::cast_parameter(
                self.spec.schemas(),
                &caster,
                header,
                values.map(Vec::as_slice),
            ) {
                Ok(Some(value)) => {
                    headers.insert(header.name.clone(), value);
                }
                Ok(None) => {}
                Err(header_failures) => failures.extend(header_failures),
            }
        }

        if failures.is_empty() {
            Ok(ValidatedResponse { headers, body })
        } else {
            Err(ValidationErrors::new(failures))
        }
    }
}

/// Finds the operation a request addresses, along with the raw values its
/// path template captured.
///
/// A request carrying `path_template` skips matching and goes straight to
/// the declared path. Otherwise templates are tried most-literal first; a
/// structural match without the request's method keeps looking, and only
/// when every candidate lacks the method does the lookup fail with
/// `OperationNotFound`.
fn resolve_operation<'s>(
    spec: &'s Spec,
    router: &Router,
    request: &ValidationRequest,
) -> Result<(&'s Operation, HashMap<String, String>), ValidationFailure> {
    if let Some(template) = &request.path_template {
        let Some(item) = spec.path(template) else {
            return Err(ValidationFailure::PathNotFound {
                path: request.path.clone(),
            });
        };
        let Some(operation) = item.operation(&request.method) else {
            return Err(ValidationFailure::OperationNotFound {
                path: request.path.clone(),
                method: request.method.clone(),
            });
        };
        let path_values =
            extract_path_parameters(template, &request.path).unwrap_or_default();
        return Ok((operation, path_values));
    }

    let matches = router.matches(&request.path);
    if matches.is_empty() {
        return Err(ValidationFailure::PathNotFound {
            path: request.path.clone(),
        });
    }

    for RouteMatch {
        template,
        path_parameters,
    } in matches
    {
        if let Some(operation) = spec
            .path(template)
            .and_then(|item| item.operation(&request.method))
        {
            return Ok((operation, path_parameters));
        }
    }

    Err(ValidationFailure::OperationNotFound {
        path: request.path.clone(),
        method: request.method.clone(),
    })
}
