use crate::error::SpecError;
use crate::{PATH_SEPARATOR, REF_FIELD};
use dashmap::{DashMap, Entry};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// The result of resolving a node that may or may not be a reference.
#[derive(Debug)]
pub enum ResolvedNode<'a> {
    /// The node was a `$ref`; the target comes out of the shared cache.
    Shared(Arc<Value>),

    /// The node was not a reference and is borrowed as-is.
    Inline(&'a Value),
}

impl<'a> ResolvedNode<'a> {
    pub fn value(&'a self) -> &'a Value {
        match self {
            ResolvedNode::Shared(shared) => shared,
            ResolvedNode::Inline(inline) => inline,
        }
    }
}

/// Resolves `$ref` pointers within a single document.
///
/// Resolution is memoized by ref string for the lifetime of the document:
/// the cache holds identity-stable `Arc` nodes, never deep-copied trees, so
/// re-resolving a ref during a build pass is a lookup. The cache is filled
/// only during the single build pass and is read-only afterwards.
#[derive(Debug)]
pub struct Resolver {
    document: Arc<Value>,
    resolved: DashMap<String, Arc<Value>>,
}

impl Resolver {
    pub fn new(document: Arc<Value>) -> Self {
        Self {
            document,
            resolved: DashMap::new(),
        }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Resolves a node that may carry a `$ref`, following reference chains.
    ///
    /// Non-reference nodes are returned borrowed; references are resolved
    /// through the memo cache. A chain of refs that revisits itself fails
    /// with `UnresolvableReference`.
    pub fn resolve<'a>(&self, node: &'a Value) -> Result<ResolvedNode<'a>, SpecError> {
        match node.get(REF_FIELD).and_then(Value::as_str) {
            Some(ref_string) => Ok(ResolvedNode::Shared(self.lookup(ref_string)?)),
            None => Ok(ResolvedNode::Inline(node)),
        }
    }

    /// Resolves a ref string into the node it addresses, memoized.
    pub fn lookup(&self, ref_string: &str) -> Result<Arc<Value>, SpecError> {
        let entry = self.resolved.entry(ref_string.to_string());
        match entry {
            Entry::Occupied(e) => {
                log::debug!("Reference cache hit for '{}'", ref_string);
                Ok(e.get().clone())
            }
            Entry::Vacant(e) => {
                let mut seen_references = HashSet::new();
                let target = self.follow(ref_string, &mut seen_references)?;
                e.insert(target.clone());
                Ok(target)
            }
        }
    }

    fn follow<'s>(
        &self,
        ref_string: &'s str,
        seen_references: &mut HashSet<String>,
    ) -> Result<Arc<Value>, SpecError> {
        if !seen_references.insert(ref_string.to_string()) {
            return Err(SpecError::unresolvable(ref_string));
        }

        let target = self
            .document
            .pointer(&Self::as_pointer(ref_string))
            .ok_or_else(|| SpecError::unresolvable(ref_string))?;

        match target.get(REF_FIELD).and_then(Value::as_str) {
            Some(next_ref) => {
                let next_ref = next_ref.to_string();
                self.follow(&next_ref, seen_references)
            }
            None => Ok(Arc::new(target.clone())),
        }
    }

    /// Normalizes a `#/a/b`-style ref string into the `/a/b` form expected
    /// by `serde_json::Value::pointer` (which handles `~0`/`~1` decoding).
    fn as_pointer(ref_string: &str) -> String {
        let mut pointer = String::from(PATH_SEPARATOR);
        let joined = ref_string
            .split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty() && *segment != "#")
            .collect::<Vec<&str>>()
            .join(PATH_SEPARATOR);
        pointer.push_str(&joined);
        pointer
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn resolver_for(document: Value) -> Resolver {
        Resolver::new(Arc::new(document))
    }

    #[test]
    fn test_lookup_resolves_component_schema() {
        let resolver = resolver_for(json!({
            "components": {
                "schemas": {
                    "Pet": { "type": "object" }
                }
            }
        }));

        let node = resolver.lookup("#/components/schemas/Pet").unwrap();
        assert_eq!(node["type"], "object");
    }

    #[test]
    fn test_lookup_is_memoized_to_the_same_node() {
        let resolver = resolver_for(json!({
            "components": { "schemas": { "Pet": { "type": "string" } } }
        }));

        let first = resolver.lookup("#/components/schemas/Pet").unwrap();
        let second = resolver.lookup("#/components/schemas/Pet").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_lookup_fails_on_dangling_pointer() {
        let resolver = resolver_for(json!({ "components": {} }));
        let result = resolver.lookup("#/components/schemas/Missing");
        assert_eq!(
            result,
            Err(SpecError::UnresolvableReference(
                "#/components/schemas/Missing".to_string()
            ))
        );
    }

    #[test]
    fn test_lookup_follows_reference_chains() {
        let resolver = resolver_for(json!({
            "components": {
                "schemas": {
                    "A": { "$ref": "#/components/schemas/B" },
                    "B": { "type": "integer" }
                }
            }
        }));

        let node = resolver.lookup("#/components/schemas/A").unwrap();
        assert_eq!(node["type"], "integer");
    }

    #[test]
    fn test_lookup_rejects_circular_ref_chains() {
        let resolver = resolver_for(json!({
            "components": {
                "schemas": {
                    "A": { "$ref": "#/components/schemas/B" },
                    "B": { "$ref": "#/components/schemas/A" }
                }
            }
        }));

        assert!(resolver.lookup("#/components/schemas/A").is_err());
    }

    #[test]
    fn test_resolve_passes_plain_nodes_through() {
        let resolver = resolver_for(json!({}));
        let node = json!({ "type": "string" });
        let resolved = resolver.resolve(&node).unwrap();
        assert_eq!(resolved.value(), &node);
    }

    #[test]
    fn test_lookup_decodes_escaped_pointer_segments() {
        let resolver = resolver_for(json!({
            "paths": {
                "/pets": { "get": {} }
            }
        }));

        let node = resolver.lookup("#/paths/~1pets/get").unwrap();
        assert!(node.is_object());
    }
}
