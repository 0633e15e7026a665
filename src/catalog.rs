//! Declarative schema specs and the catalog of classes built from them.
//!
//! Route manifests and the definitions loader both describe schema classes
//! as [`SchemaSpec`] values keyed by `module.Class`. The catalog turns them
//! into shared [`SchemaClass`] values, wiring nested references between them.

use crate::error::{Error, Result};
use crate::schema::{DeferredClass, Field, FieldKind, SchemaClass, SchemaRef};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Suffix marking the classes a definitions module exports.
pub const SCHEMA_SUFFIX: &str = "Schema";

/// Declarative form of a [`Field`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    /// Scalar kind name, `list` or `nested`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<Number>,
    #[serde(default)]
    pub maximum: Option<Number>,
    #[serde(default)]
    pub min_length: Option<u64>,
    #[serde(default)]
    pub max_length: Option<u64>,
    #[serde(default)]
    pub pattern: Option<String>,
    /// Item spec of a `list`
    #[serde(default)]
    pub items: Option<Box<FieldSpec>>,
    /// Target class of a `nested` field
    #[serde(default)]
    pub schema: Option<String>,
}

impl FieldSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            required: false,
            default: None,
            description: None,
            choices: None,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            pattern: None,
            items: None,
            schema: None,
        }
    }

    /// Convert a standalone spec, resolving nested targets by name only.
    pub fn to_field(&self) -> Result<Field> {
        CatalogBuilder::new(&IndexMap::new()).build_field(self)
    }
}

/// Declarative form of a [`SchemaClass`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaSpec {
    /// Explicit registry name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
}

/// Schema classes by `module.Class` key.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    classes: IndexMap<String, Arc<SchemaClass>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every spec into a class.
    pub fn from_specs(specs: &IndexMap<String, SchemaSpec>) -> Result<Self> {
        let mut builder = CatalogBuilder::new(specs);
        for key in specs.keys() {
            builder.build_class(&normalize_key(key))?;
        }
        debug!("Built {} schema classes", builder.built.len());
        Ok(Self {
            classes: builder.built,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Arc<SchemaClass>> {
        self.classes.get(&normalize_key(key))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<SchemaClass>)> {
        self.classes.iter()
    }

    /// Add the classes of `other`; existing keys are kept.
    pub fn merge(&mut self, other: SchemaCatalog) {
        for (key, class) in other.classes {
            self.classes.entry(key).or_insert(class);
        }
    }

    /// Classes whose name ends with [`SCHEMA_SUFFIX`] and is longer than it.
    pub fn exported(&self) -> impl Iterator<Item = &Arc<SchemaClass>> {
        self.classes.values().filter(|class| {
            class.name.ends_with(SCHEMA_SUFFIX) && class.name.len() > SCHEMA_SUFFIX.len()
        })
    }
}

/// `a::b::C` and `a.b.C` name the same class.
pub fn normalize_key(key: &str) -> String {
    key.trim().replace("::", ".")
}

/// Split a normalized key into module path and class name.
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind('.') {
        Some(pos) => (&key[..pos], &key[pos + 1..]),
        None => ("", key),
    }
}

struct CatalogBuilder<'a> {
    specs: IndexMap<String, &'a SchemaSpec>,
    built: IndexMap<String, Arc<SchemaClass>>,
    /// Classes currently being built, to detect reference cycles
    resolving: Vec<String>,
    /// Back-edges waiting for their class to finish building
    pending: HashMap<String, DeferredClass>,
}

impl<'a> CatalogBuilder<'a> {
    fn new(specs: &'a IndexMap<String, SchemaSpec>) -> Self {
        Self {
            specs: specs.iter().map(|(k, v)| (normalize_key(k), v)).collect(),
            built: IndexMap::new(),
            resolving: Vec::new(),
            pending: HashMap::new(),
        }
    }

    fn registry_name(&self, key: &str) -> String {
        let (module, name) = split_key(key);
        let mut class = SchemaClass::new(module, name);
        class.ref_name = self.specs.get(key).and_then(|spec| spec.name.clone());
        class.registry_name()
    }

    fn build_class(&mut self, key: &str) -> Result<Arc<SchemaClass>> {
        if let Some(class) = self.built.get(key) {
            return Ok(class.clone());
        }
        let spec = *self
            .specs
            .get(key)
            .ok_or_else(|| Error::UnknownSchema(key.to_string()))?;

        self.resolving.push(key.to_string());
        let (module, name) = split_key(key);
        let mut class = SchemaClass::new(module, name);
        class.ref_name = spec.name.clone();
        for (field_name, field_spec) in &spec.fields {
            let field = self.build_field(field_spec).map_err(|e| match e {
                Error::InvalidManifest(msg) => {
                    Error::InvalidManifest(format!("{}.{}: {}", key, field_name, msg))
                }
                other => other,
            })?;
            class.fields.insert(field_name.clone(), field);
        }
        self.resolving.pop();

        let class = Arc::new(class);
        self.built.insert(key.to_string(), class.clone());
        if let Some(deferred) = self.pending.remove(key) {
            deferred.resolve(class.clone());
        }
        Ok(class)
    }

    fn build_field(&mut self, spec: &FieldSpec) -> Result<Field> {
        let kind = match spec.kind.to_ascii_lowercase().as_str() {
            "list" | "array" => {
                let items = spec.items.as_ref().ok_or_else(|| {
                    Error::InvalidManifest("list field without `items`".to_string())
                })?;
                FieldKind::List(Box::new(self.build_field(items)?))
            }
            "nested" => {
                let target = spec.schema.as_ref().ok_or_else(|| {
                    Error::InvalidManifest("nested field without `schema`".to_string())
                })?;
                FieldKind::Nested(self.nested_ref(&normalize_key(target))?)
            }
            other => other
                .parse::<FieldKind>()
                .map_err(|e| Error::InvalidManifest(e.to_string()))?,
        };

        Ok(Field {
            kind,
            required: spec.required,
            default: spec.default.clone(),
            description: spec.description.clone(),
            choices: spec.choices.clone(),
            minimum: spec.minimum.clone(),
            maximum: spec.maximum.clone(),
            min_length: spec.min_length,
            max_length: spec.max_length,
            pattern: spec.pattern.clone(),
        })
    }

    fn nested_ref(&mut self, target: &str) -> Result<SchemaRef> {
        if self.resolving.iter().any(|key| key == target) {
            debug!("Circular schema reference to {}, deferring it", target);
            let name = self.registry_name(target);
            let deferred = self
                .pending
                .entry(target.to_string())
                .or_insert_with(|| DeferredClass::new(name))
                .clone();
            return Ok(SchemaRef::Deferred(deferred));
        }
        if !self.specs.contains_key(target) {
            debug!("Nested schema {} is not in the catalog, referencing by name", target);
            return Ok(SchemaRef::Named(target.to_string()));
        }
        Ok(SchemaRef::Class(self.build_class(target)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Dialect;
    use crate::registry::SchemaRegistry;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn specs(yaml: &str) -> IndexMap<String, SchemaSpec> {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_build_simple_class() {
        let catalog = SchemaCatalog::from_specs(&specs(
            r#"
app.models.BodySchema:
  fields:
    a: { type: integer, required: true }
    b: { type: string }
"#,
        ))
        .unwrap();

        let class = catalog.get("app::models::BodySchema").unwrap();
        assert_eq!(class.module, "app.models");
        assert_eq!(class.name, "BodySchema");
        assert_eq!(class.registry_name(), "app.models.BodySchema");
        assert!(class.fields["a"].required);
        assert_eq!(class.fields["b"].kind, FieldKind::String);
    }

    #[test]
    fn test_nested_reference_is_resolved_before_definition() {
        let catalog = SchemaCatalog::from_specs(&specs(
            r#"
shop.OrderSchema:
  fields:
    lines: { type: list, items: { type: nested, schema: shop.LineSchema } }
shop.LineSchema:
  fields:
    sku: { type: string, required: true }
"#,
        ))
        .unwrap();

        let order = catalog.get("shop.OrderSchema").unwrap();
        let mut registry = SchemaRegistry::new(Dialect::V3);
        registry.register(&SchemaRef::Class(order.clone())).unwrap();

        assert!(registry.contains("shop.LineSchema"));
        let order = serde_json::to_value(registry.get("shop.OrderSchema").unwrap()).unwrap();
        assert_eq!(
            order["properties"]["lines"],
            json!({"type": "array", "items": {"$ref": "#/components/schemas/shop.LineSchema"}})
        );
    }

    /// Every `$ref` in `value` that points at a missing definition
    fn dangling_refs(value: &Value, definitions: &Value, found: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    let name = reference.trim_start_matches("#/components/schemas/");
                    if definitions.get(name).is_none() {
                        found.push(reference.clone());
                    }
                }
                map.values().for_each(|v| dangling_refs(v, definitions, found));
            }
            Value::Array(items) => items.iter().for_each(|v| dangling_refs(v, definitions, found)),
            _ => {}
        }
    }

    #[test]
    fn test_self_reference_is_deferred() {
        let catalog = SchemaCatalog::from_specs(&specs(
            r#"
tree.NodeSchema:
  fields:
    children: { type: list, items: { type: nested, schema: tree.NodeSchema } }
"#,
        ))
        .unwrap();

        let node = catalog.get("tree.NodeSchema").unwrap();
        match &node.fields["children"].kind {
            FieldKind::List(items) => match &items.kind {
                FieldKind::Nested(SchemaRef::Deferred(deferred)) => {
                    assert_eq!(deferred.name(), "tree.NodeSchema");
                    assert!(Arc::ptr_eq(deferred.get().unwrap(), node));
                }
                other => panic!("unexpected item kind {:?}", other),
            },
            other => panic!("unexpected kind {:?}", other),
        }

        let mut registry = SchemaRegistry::new(Dialect::V3);
        registry.register(&SchemaRef::Class(node.clone())).unwrap();
        assert_eq!(registry.len(), 1);
        let node = serde_json::to_value(registry.get("tree.NodeSchema").unwrap()).unwrap();
        assert_eq!(
            node["properties"]["children"],
            json!({"type": "array", "items": {"$ref": "#/components/schemas/tree.NodeSchema"}})
        );
    }

    #[test]
    fn test_mutual_cycle_registers_back_edge_target() {
        let catalog = SchemaCatalog::from_specs(&specs(
            r#"
x.ASchema:
  fields:
    b: { type: nested, schema: x.BSchema }
x.BSchema:
  fields:
    a: { type: nested, schema: x.ASchema }
"#,
        ))
        .unwrap();

        // Only B is used; its `a` field is the back-edge of the cycle
        let mut registry = SchemaRegistry::new(Dialect::V3);
        registry
            .register(&SchemaRef::Class(catalog.get("x.BSchema").unwrap().clone()))
            .unwrap();

        assert!(registry.contains("x.ASchema"));
        assert!(registry.contains("x.BSchema"));
        let definitions = serde_json::to_value(registry.into_schemas()).unwrap();
        let mut dangling = Vec::new();
        dangling_refs(&definitions, &definitions, &mut dangling);
        assert_eq!(dangling, Vec::<String>::new());
        assert_eq!(
            definitions["x.BSchema"]["properties"]["a"],
            json!({"$ref": "#/components/schemas/x.ASchema"})
        );
    }

    #[test]
    fn test_unknown_field_type_is_an_error() {
        let result = SchemaCatalog::from_specs(&specs(
            r#"
app.BadSchema:
  fields:
    x: { type: matrix }
"#,
        ));
        match result {
            Err(Error::InvalidManifest(msg)) => assert!(msg.contains("app.BadSchema.x")),
            other => panic!("unexpected result {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_exported_classes() {
        let catalog = SchemaCatalog::from_specs(&specs(
            r#"
m.UserSchema: {}
m.Schema: {}
m.Address: {}
"#,
        ))
        .unwrap();

        let exported: Vec<_> = catalog.exported().map(|c| c.name.as_str()).collect();
        assert_eq!(exported, vec!["UserSchema"]);
    }
}
