use crate::error::SpecError;
use crate::resolver::Resolver;
use crate::types::path::ValuePath;
use crate::{DEFAULT_FIELD, ENUM_FIELD, REF_FIELD, REQUIRED_FIELD, TYPE_FIELD};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Identity of a schema node inside a [`SchemaStore`].
///
/// Nodes are arena-allocated so cyclic `$ref` graphs resolve to the same id
/// on re-entry instead of recursing forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SchemaId(usize);

/// The primitive/shape tag of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(SchemaType::String),
            "integer" => Some(SchemaType::Integer),
            "number" => Some(SchemaType::Number),
            "boolean" => Some(SchemaType::Boolean),
            "array" => Some(SchemaType::Array),
            "object" => Some(SchemaType::Object),
            _ => None,
        }
    }
}

impl Display for SchemaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
        };
        write!(f, "{}", name)
    }
}

/// One OpenAPI Schema Object, with children referenced by [`SchemaId`].
///
/// For a given node, exactly one of primitive type, array items, object
/// properties, or a combinator list governs validation; a `type` tag may
/// still sit alongside combinators as a filter.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub type_tag: Option<SchemaType>,
    pub format: Option<String>,
    pub nullable: bool,
    pub required: Vec<String>,
    pub properties: Vec<(String, SchemaId)>,
    /// `false` only when the schema explicitly forbids additional
    /// properties; objects are open by default.
    pub additional_properties_allowed: bool,
    pub items: Option<SchemaId>,
    pub enum_values: Vec<Value>,
    pub default: Option<Value>,
    pub one_of: Vec<SchemaId>,
    pub any_of: Vec<SchemaId>,
    pub all_of: Vec<SchemaId>,
}

impl Schema {
    fn open() -> Self {
        Schema {
            additional_properties_allowed: true,
            ..Schema::default()
        }
    }

    pub fn property(&self, name: &str) -> Option<SchemaId> {
        self.properties
            .iter()
            .find(|(property, _)| property == name)
            .map(|(_, id)| *id)
    }

    pub fn has_combinators(&self) -> bool {
        !self.one_of.is_empty() || !self.any_of.is_empty() || !self.all_of.is_empty()
    }
}

/// Arena owning every schema node of one specification.
#[derive(Debug, Default)]
pub struct SchemaStore {
    nodes: Vec<Schema>,
}

impl SchemaStore {
    pub fn get(&self, id: SchemaId) -> &Schema {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, schema: Schema) -> SchemaId {
        self.nodes.push(schema);
        SchemaId(self.nodes.len() - 1)
    }

    /// Reserves an id before building a `$ref` target, so a schema that
    /// references itself resolves to its own id instead of recursing.
    fn reserve(&mut self) -> SchemaId {
        self.insert(Schema::open())
    }

    fn fill(&mut self, id: SchemaId, schema: Schema) {
        self.nodes[id.0] = schema;
    }
}

/// Builds [`Schema`] nodes from raw document nodes, memoizing `$ref`
/// targets by ref string so each named schema is built exactly once.
pub(crate) struct SchemaBuilder<'r> {
    resolver: &'r Resolver,
    store: SchemaStore,
    by_ref: HashMap<String, SchemaId>,
}

impl<'r> SchemaBuilder<'r> {
    pub(crate) fn new(resolver: &'r Resolver) -> Self {
        Self {
            resolver,
            store: SchemaStore::default(),
            by_ref: HashMap::new(),
        }
    }

    pub(crate) fn finish(self) -> SchemaStore {
        self.store
    }

    /// Builds a schema node, following a `$ref` if the node carries one.
    pub(crate) fn build(
        &mut self,
        node: &Value,
        pointer: &ValuePath,
    ) -> Result<SchemaId, SpecError> {
        if let Some(ref_string) = node.get(REF_FIELD).and_then(Value::as_str) {
            return self.build_ref(ref_string, pointer);
        }
        let schema = self.build_node(node, pointer)?;
        Ok(self.store.insert(schema))
    }

    fn build_ref(&mut self, ref_string: &str, pointer: &ValuePath) -> Result<SchemaId, SpecError> {
        if let Some(id) = self.by_ref.get(ref_string) {
            return Ok(*id);
        }

        // Reserve before descending: a cyclic schema re-entering this ref
        // gets the reserved id back instead of recursing.
        let id = self.store.reserve();
        self.by_ref.insert(ref_string.to_string(), id);

        let target = self.resolver.lookup(ref_string)?;
        let schema = self.build_node(&target, pointer)?;
        self.store.fill(id, schema);
        Ok(id)
    }

    fn build_node(&mut self, node: &Value, pointer: &ValuePath) -> Result<Schema, SpecError> {
        let node = node
            .as_object()
            .ok_or_else(|| SpecError::invalid(pointer, "schema must be an object"))?;

        let mut schema = Schema::open();

        match node.get(TYPE_FIELD) {
            None => {}
            Some(Value::String(name)) => {
                schema.type_tag = Some(Self::type_from_name(name, pointer)?);
            }
            // 3.1-style type arrays: a single concrete type, optionally
            // alongside "null".
            Some(Value::Array(names)) => {
                for name in names {
                    let name = name.as_str().ok_or_else(|| {
                        SpecError::invalid(pointer, "'type' array entries must be strings")
                    })?;
                    if name == "null" {
                        schema.nullable = true;
                    } else if schema.type_tag.is_some() {
                        return Err(SpecError::invalid(
                            pointer,
                            "'type' array declares more than one concrete type",
                        ));
                    } else {
                        schema.type_tag = Some(Self::type_from_name(name, pointer)?);
                    }
                }
            }
            Some(_) => {
                return Err(SpecError::invalid(
                    pointer,
                    "'type' must be a string or an array of strings",
                ));
            }
        }

        schema.format = node
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_owned);
        if node.get("nullable").and_then(Value::as_bool) == Some(true) {
            schema.nullable = true;
        }
        schema.default = node.get(DEFAULT_FIELD).cloned();

        if let Some(enum_values) = node.get(ENUM_FIELD) {
            let enum_values = enum_values
                .as_array()
                .ok_or_else(|| SpecError::invalid(pointer, "'enum' must be an array"))?;
            schema.enum_values = enum_values.clone();
        }

        if let Some(required) = node.get(REQUIRED_FIELD) {
            let required = required
                .as_array()
                .ok_or_else(|| SpecError::invalid(pointer, "'required' must be an array"))?;
            for name in required {
                let name = name.as_str().ok_or_else(|| {
                    SpecError::invalid(pointer, "'required' entries must be strings")
                })?;
                schema.required.push(name.to_owned());
            }
        }

        if let Some(properties) = node.get("properties") {
            let properties = properties
                .as_object()
                .ok_or_else(|| SpecError::invalid(pointer, "'properties' must be an object"))?;
            for (name, property_node) in properties {
                let child_pointer = pointer.child("properties").child(name);
                let child = self.build(property_node, &child_pointer)?;
                schema.properties.push((name.clone(), child));
            }
        }

        if node.get("additionalProperties") == Some(&Value::Bool(false)) {
            schema.additional_properties_allowed = false;
        }

        if let Some(items) = node.get("items") {
            let child_pointer = pointer.child("items");
            schema.items = Some(self.build(items, &child_pointer)?);
        }

        schema.one_of = self.build_alternatives(node.get("oneOf"), pointer, "oneOf")?;
        schema.any_of = self.build_alternatives(node.get("anyOf"), pointer, "anyOf")?;
        schema.all_of = self.build_alternatives(node.get("allOf"), pointer, "allOf")?;

        Ok(schema)
    }

    fn build_alternatives(
        &mut self,
        node: Option<&Value>,
        pointer: &ValuePath,
        keyword: &str,
    ) -> Result<Vec<SchemaId>, SpecError> {
        let Some(node) = node else {
            return Ok(Vec::new());
        };
        let alternatives = node.as_array().ok_or_else(|| {
            SpecError::invalid(pointer, format!("'{}' must be an array", keyword))
        })?;

        let mut ids = Vec::with_capacity(alternatives.len());
        for (idx, alternative) in alternatives.iter().enumerate() {
            let child_pointer = pointer.child(keyword).index(idx);
            ids.push(self.build(alternative, &child_pointer)?);
        }
        Ok(ids)
    }

    fn type_from_name(name: &str, pointer: &ValuePath) -> Result<SchemaType, SpecError> {
        SchemaType::from_name(name)
            .ok_or_else(|| SpecError::invalid(pointer, format!("unknown schema type '{}'", name)))
    }
}
