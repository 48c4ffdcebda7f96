//! Presence checks for declared security requirements.
//!
//! This layer only verifies that a credential carrier for some declared
//! alternative is populated; verifying the credential itself (token
//! validity, scope grants) belongs to an external authorizer, which
//! receives the satisfied requirement's scheme name and scope names.

use crate::error::ValidationFailure;
use crate::spec::{SecurityRequirement, SecurityScheme, Spec};
use crate::types::{ParameterLocation, ValidationRequest};

/// Checks the operation's security alternatives against the request.
///
/// Alternatives are OR-combined: the first one whose carriers are all
/// populated wins. `Ok(None)` means the operation declares no security.
pub(crate) fn check_security<'s>(
    spec: &'s Spec,
    requirements: Option<&'s [SecurityRequirement]>,
    request: &ValidationRequest,
) -> Result<Option<&'s SecurityRequirement>, ValidationFailure> {
    let requirements = requirements.unwrap_or(spec.default_security());
    if requirements.is_empty() {
        return Ok(None);
    }

    for requirement in requirements {
        let Some(scheme) = spec.components.security_scheme(&requirement.name) else {
            log::warn!(
                "Security requirement references undeclared scheme '{}'",
                requirement.name
            );
            continue;
        };
        if carrier_is_populated(scheme, request) {
            log::debug!("Security requirement '{}' satisfied", requirement.name);
            return Ok(Some(requirement));
        }
    }

    Err(ValidationFailure::SecurityNotSatisfied {
        schemes: requirements
            .iter()
            .map(|requirement| requirement.name.clone())
            .collect(),
    })
}

fn carrier_is_populated(scheme: &SecurityScheme, request: &ValidationRequest) -> bool {
    match scheme {
        SecurityScheme::ApiKey { name, location } => match location {
            ParameterLocation::Header => request
                .parameters
                .header_value(name)
                .is_some_and(|value| !value.is_empty()),
            ParameterLocation::Query => request
                .parameters
                .query
                .get(name)
                .and_then(|values| values.first())
                .is_some_and(|value| !value.is_empty()),
            ParameterLocation::Cookie => request
                .parameters
                .cookie
                .get(name)
                .is_some_and(|value| !value.is_empty()),
            ParameterLocation::Path => false,
        },
        SecurityScheme::Http { scheme } => request
            .parameters
            .header_value("authorization")
            .and_then(|value| value.split_whitespace().next())
            .is_some_and(|token| token.eq_ignore_ascii_case(scheme)),
        SecurityScheme::OAuth2 | SecurityScheme::OpenIdConnect => request
            .parameters
            .header_value("authorization")
            .is_some_and(|value| !value.is_empty()),
    }
}
