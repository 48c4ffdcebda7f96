//! Matches concrete request paths against the specification's path
//! templates.
//!
//! Templates are compiled once into segment lists and tried in decreasing
//! literal-segment order, so a fully literal template always beats a
//! templated sibling of the same shape (`/pets/mine` over `/pets/{petId}`).

use crate::spec::Spec;
use crate::PATH_SEPARATOR;
use std::collections::HashMap;

/// One segment of a compiled path template.
#[derive(Debug, Clone, PartialEq)]
enum TemplateSegment {
    Literal(String),
    Parameter(String),
}

#[derive(Debug)]
struct Route {
    template: String,
    segments: Vec<TemplateSegment>,
    literal_count: usize,
}

/// A successful structural match of a request path against one template.
#[derive(Debug, PartialEq)]
pub struct RouteMatch<'r> {
    pub template: &'r str,
    /// Percent-decoded raw values captured by `{name}` segments.
    pub path_parameters: HashMap<String, String>,
}

/// Compiled matcher over every path template of one specification.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn from_spec(spec: &Spec) -> Self {
        let mut routes: Vec<Route> = spec
            .paths()
            .map(|(template, _)| {
                let segments = compile_template(template);
                let literal_count = segments
                    .iter()
                    .filter(|segment| matches!(segment, TemplateSegment::Literal(_)))
                    .count();
                Route {
                    template: template.to_owned(),
                    segments,
                    literal_count,
                }
            })
            .collect();
        // Stable sort keeps declaration order among templates of equal
        // literal weight.
        routes.sort_by(|a, b| b.literal_count.cmp(&a.literal_count));
        Self { routes }
    }

    /// Every template that structurally matches the path, most-literal
    /// first.
    pub fn matches(&self, path: &str) -> Vec<RouteMatch<'_>> {
        let segments = split_path(path);
        self.routes
            .iter()
            .filter_map(|route| {
                match_segments(&route.segments, &segments).map(|path_parameters| RouteMatch {
                    template: &route.template,
                    path_parameters,
                })
            })
            .collect()
    }
}

/// Captures the `{name}` values of a known template from a concrete path.
///
/// Used when the caller already knows which template a request was routed
/// to and only the raw path values are needed.
pub fn extract_path_parameters(template: &str, path: &str) -> Option<HashMap<String, String>> {
    match_segments(&compile_template(template), &split_path(path))
}

fn compile_template(template: &str) -> Vec<TemplateSegment> {
    template
        .split(PATH_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2 {
                TemplateSegment::Parameter(segment[1..segment.len() - 1].to_owned())
            } else {
                TemplateSegment::Literal(segment.to_owned())
            }
        })
        .collect()
}

/// Splits a concrete request path into percent-decoded segments.
fn split_path(path: &str) -> Vec<String> {
    path.split(PATH_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            percent_encoding::percent_decode_str(segment)
                .decode_utf8_lossy()
                .to_string()
        })
        .collect()
}

fn match_segments(
    template: &[TemplateSegment],
    path: &[String],
) -> Option<HashMap<String, String>> {
    if template.len() != path.len() {
        return None;
    }

    let mut captured = HashMap::new();
    for (segment, value) in template.iter().zip(path) {
        match segment {
            TemplateSegment::Literal(literal) => {
                if literal != value {
                    return None;
                }
            }
            TemplateSegment::Parameter(name) => {
                captured.insert(name.clone(), value.clone());
            }
        }
    }
    Some(captured)
}
