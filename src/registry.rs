use crate::error::{Error, Result};
use crate::options::Dialect;
use crate::schema::{Field, SchemaObject, SchemaRef};
use indexmap::IndexMap;
use log::{debug, error, warn};

/// Named, reusable schema definitions for one generated document.
///
/// Registering the same name twice is fine as long as the definition is the
/// same; a different definition under a taken name is an error.
pub struct SchemaRegistry {
    dialect: Dialect,
    schemas: IndexMap<String, SchemaObject>,
    /// Definitions being built, so reference cycles stop at a `$ref`
    in_progress: Vec<String>,
}

impl SchemaRegistry {
    pub fn new(dialect: Dialect) -> Self {
        debug!("Initializing SchemaRegistry for {:?}", dialect);
        Self {
            dialect,
            schemas: IndexMap::new(),
            in_progress: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// `$ref` path of a registered name.
    pub fn ref_path(&self, name: &str) -> String {
        format!("{}{}", self.dialect.ref_prefix(), name)
    }

    /// Store a definition under `name`.
    pub fn definition(&mut self, name: &str, schema: SchemaObject) -> Result<()> {
        match self.schemas.get(name) {
            Some(existing) if *existing == schema => {
                debug!("Schema {} already registered", name);
                Ok(())
            }
            Some(_) => {
                error!("Conflicting definitions registered for schema {}", name);
                Err(Error::DuplicateSchema {
                    name: name.to_string(),
                })
            }
            None => {
                debug!("Registering schema {}", name);
                self.schemas.insert(name.to_string(), schema);
                Ok(())
            }
        }
    }

    /// Register the schema behind `schema_ref` and return its registry name.
    ///
    /// Named references are taken as already resolved and register nothing.
    pub fn register(&mut self, schema_ref: &SchemaRef) -> Result<String> {
        let name = schema_ref.registry_name();
        if self.in_progress.contains(&name) {
            return Ok(name);
        }

        self.in_progress.push(name.clone());
        let definition = match schema_ref {
            SchemaRef::Named(_) => None,
            SchemaRef::Class(class) => Some(self.object_definition(class.fields.iter())),
            SchemaRef::Instance(instance) => Some(self.object_definition(instance.fields())),
            SchemaRef::Deferred(deferred) => match deferred.get() {
                Some(class) => Some(self.object_definition(class.fields.iter())),
                None => {
                    warn!("Schema {} was never built, referencing it by name", name);
                    None
                }
            },
        };
        self.in_progress.pop();

        if let Some(definition) = definition {
            self.definition(&name, definition?)?;
        }
        Ok(name)
    }

    /// Register the schema and return a `{"$ref": ...}` object pointing at it.
    pub fn reference(&mut self, schema_ref: &SchemaRef) -> Result<SchemaObject> {
        let name = self.register(schema_ref)?;
        Ok(SchemaObject::reference(self.ref_path(&name)))
    }

    fn object_definition<'a, I>(&mut self, fields: I) -> Result<SchemaObject>
    where
        I: Iterator<Item = (&'a String, &'a Field)>,
    {
        let mut properties = IndexMap::new();
        let mut required = Vec::new();

        for (name, field) in fields {
            properties.insert(name.clone(), field.to_schema(self)?);
            if field.required {
                required.push(name.clone());
            }
        }

        Ok(SchemaObject {
            schema_type: Some("object".to_string()),
            required: if required.is_empty() {
                None
            } else {
                Some(required)
            },
            properties: Some(properties),
            ..Default::default()
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SchemaObject> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn into_schemas(self) -> IndexMap<String, SchemaObject> {
        self.schemas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DeferredClass, SchemaClass, SchemaInstance};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn body_schema() -> SchemaClass {
        SchemaClass::new("tests", "BodySchema")
            .field("a", Field::integer().required())
            .field("b", Field::string())
    }

    #[test]
    fn test_register_class() {
        let mut registry = SchemaRegistry::new(Dialect::V3);
        let name = registry.register(&SchemaRef::class(body_schema())).unwrap();

        assert_eq!(name, "tests.BodySchema");
        let definition = serde_json::to_value(registry.get(&name).unwrap()).unwrap();
        assert_eq!(
            definition,
            json!({
                "type": "object",
                "required": ["a"],
                "properties": {
                    "a": {"type": "integer", "format": "int32"},
                    "b": {"type": "string"},
                },
            })
        );
    }

    #[test]
    fn test_identical_registration_is_idempotent() {
        let mut registry = SchemaRegistry::new(Dialect::V3);
        let class = Arc::new(body_schema());

        registry.register(&SchemaRef::Class(class.clone())).unwrap();
        registry
            .register(&SchemaRef::Instance(SchemaInstance::new(class)))
            .unwrap();

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_registration_fails() {
        let mut registry = SchemaRegistry::new(Dialect::V3);
        let class = Arc::new(body_schema());

        registry.register(&SchemaRef::Class(class.clone())).unwrap();
        let other = SchemaClass::new("other", "BodySchema")
            .with_ref_name("tests.BodySchema")
            .field("c", Field::boolean());
        let result = registry.register(&SchemaRef::class(other));

        assert!(matches!(
            result,
            Err(Error::DuplicateSchema { ref name }) if name == "tests.BodySchema"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_filtered_instance_registers_beside_class() {
        let mut registry = SchemaRegistry::new(Dialect::V3);
        let class = Arc::new(body_schema());

        registry.register(&SchemaRef::Class(class.clone())).unwrap();
        let narrowed = SchemaInstance::new(class).exclude(["b"]);
        let name = registry.register(&SchemaRef::Instance(narrowed)).unwrap();

        assert_eq!(name, "tests.BodySchema_exclude_b");
        assert_eq!(registry.len(), 2);
        let narrowed = serde_json::to_value(registry.get(&name).unwrap()).unwrap();
        assert_eq!(
            narrowed,
            json!({
                "type": "object",
                "required": ["a"],
                "properties": {"a": {"type": "integer", "format": "int32"}},
            })
        );
    }

    #[test]
    fn test_deferred_cycle_registers_both_sides() {
        // a.ASchema.b -> a.BSchema, a.BSchema.a -> a.ASchema (back-edge)
        let back_edge = DeferredClass::new("a.ASchema");
        let b = Arc::new(
            SchemaClass::new("a", "BSchema")
                .field("a", Field::nested(SchemaRef::Deferred(back_edge.clone()))),
        );
        let a = Arc::new(
            SchemaClass::new("a", "ASchema").field("b", Field::nested(SchemaRef::Class(b.clone()))),
        );
        back_edge.resolve(a);

        let mut registry = SchemaRegistry::new(Dialect::V3);
        registry.register(&SchemaRef::Class(b)).unwrap();

        assert!(registry.contains("a.ASchema"));
        assert!(registry.contains("a.BSchema"));
        let a = serde_json::to_value(registry.get("a.ASchema").unwrap()).unwrap();
        assert_eq!(
            a["properties"]["b"],
            json!({"$ref": "#/components/schemas/a.BSchema"})
        );
    }

    #[test]
    fn test_unresolved_deferred_is_a_plain_reference() {
        let mut registry = SchemaRegistry::new(Dialect::V2);
        let reference = registry
            .reference(&SchemaRef::Deferred(DeferredClass::new("ghost.GhostSchema")))
            .unwrap();

        assert_eq!(
            reference.reference,
            Some("#/definitions/ghost.GhostSchema".to_string())
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_named_reference_registers_nothing() {
        let mut registry = SchemaRegistry::new(Dialect::V2);
        let reference = registry.reference(&SchemaRef::named("Pet")).unwrap();

        assert_eq!(reference.reference, Some("#/definitions/Pet".to_string()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_nested_schema_is_registered() {
        let address = SchemaClass::new("geo", "AddressSchema").field("city", Field::string());
        let user = SchemaClass::new("accounts", "UserSchema")
            .field("address", Field::nested(SchemaRef::class(address)))
            .field("tags", Field::list(Field::string()));

        let mut registry = SchemaRegistry::new(Dialect::V3);
        registry.register(&SchemaRef::class(user)).unwrap();

        assert!(registry.contains("geo.AddressSchema"));
        let user = serde_json::to_value(registry.get("accounts.UserSchema").unwrap()).unwrap();
        assert_eq!(
            user["properties"]["address"],
            json!({"$ref": "#/components/schemas/geo.AddressSchema"})
        );
        assert_eq!(
            user["properties"]["tags"],
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert!(user.get("required").is_none());
    }
}
