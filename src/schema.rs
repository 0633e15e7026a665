//! Typed fields, structured schemas and their OpenAPI schema objects.
//!
//! A [`Field`] describes one primitive value with its validation rules (the
//! annotation attached to a scalar handler argument or to a schema property).
//! A [`SchemaClass`] is a named, ordered collection of fields; a
//! [`SchemaInstance`] is a class narrowed by `only`/`exclude` filters.
//! [`SchemaRef`] is how handlers and responses point at any of them.

use crate::error::Result;
use crate::registry::SchemaRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

/// OpenAPI schema object, shared by definitions, properties and parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaObject {
    /// Reference to a registered schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Item schema for arrays
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaObject>>,
    /// Required property names for objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaObject>>,
}

impl SchemaObject {
    /// A `{"$ref": ...}` object.
    pub fn reference(path: String) -> Self {
        Self {
            reference: Some(path),
            ..Default::default()
        }
    }

    fn typed(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: format.map(str::to_string),
            ..Default::default()
        }
    }
}

/// Primitive kind of a typed field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Integer,
    Long,
    Number,
    Float,
    Double,
    Decimal,
    String,
    Boolean,
    Uuid,
    DateTime,
    Date,
    Time,
    Email,
    Url,
    Dict,
    /// Any value, documented without a type
    Raw,
    List(Box<Field>),
    Nested(SchemaRef),
}

impl FieldKind {
    /// OpenAPI `type` and `format` for scalar kinds.
    fn type_and_format(&self) -> (Option<&'static str>, Option<&'static str>) {
        match self {
            FieldKind::Integer => (Some("integer"), Some("int32")),
            FieldKind::Long => (Some("integer"), Some("int64")),
            FieldKind::Number | FieldKind::Decimal => (Some("number"), None),
            FieldKind::Float => (Some("number"), Some("float")),
            FieldKind::Double => (Some("number"), Some("double")),
            FieldKind::String | FieldKind::Time => (Some("string"), None),
            FieldKind::Boolean => (Some("boolean"), None),
            FieldKind::Uuid => (Some("string"), Some("uuid")),
            FieldKind::DateTime => (Some("string"), Some("date-time")),
            FieldKind::Date => (Some("string"), Some("date")),
            FieldKind::Email => (Some("string"), Some("email")),
            FieldKind::Url => (Some("string"), Some("url")),
            FieldKind::Dict => (Some("object"), None),
            FieldKind::List(_) => (Some("array"), None),
            FieldKind::Raw | FieldKind::Nested(_) => (None, None),
        }
    }
}

/// Error returned when a scalar kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFieldKind(pub String);

impl std::fmt::Display for UnknownFieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "unknown field type: {}", self.0)
    }
}

impl std::error::Error for UnknownFieldKind {}

impl FromStr for FieldKind {
    type Err = UnknownFieldKind;

    /// Parses scalar kind names; `list` and `nested` need extra data and are
    /// built by the schema catalog.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(FieldKind::Integer),
            "long" => Ok(FieldKind::Long),
            "number" => Ok(FieldKind::Number),
            "float" => Ok(FieldKind::Float),
            "double" => Ok(FieldKind::Double),
            "decimal" => Ok(FieldKind::Decimal),
            "string" | "str" => Ok(FieldKind::String),
            "boolean" | "bool" => Ok(FieldKind::Boolean),
            "uuid" => Ok(FieldKind::Uuid),
            "date-time" | "datetime" => Ok(FieldKind::DateTime),
            "date" => Ok(FieldKind::Date),
            "time" => Ok(FieldKind::Time),
            "email" => Ok(FieldKind::Email),
            "url" => Ok(FieldKind::Url),
            "dict" | "object" => Ok(FieldKind::Dict),
            "raw" | "any" => Ok(FieldKind::Raw),
            _ => Err(UnknownFieldKind(s.to_string())),
        }
    }
}

/// A typed value with validation rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Allowed values, documented as `enum`
    pub choices: Option<Vec<Value>>,
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    /// Minimum string length, or minimum item count for lists
    pub min_length: Option<u64>,
    /// Maximum string length, or maximum item count for lists
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            description: None,
            choices: None,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            pattern: None,
        }
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn long() -> Self {
        Self::new(FieldKind::Long)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn list(items: Field) -> Self {
        Self::new(FieldKind::List(Box::new(items)))
    }

    pub fn nested(schema: SchemaRef) -> Self {
        Self::new(FieldKind::Nested(schema))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn one_of<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn range(mut self, minimum: Option<Number>, maximum: Option<Number>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn length(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Convert the field into a schema object, registering nested schemas.
    pub fn to_schema(&self, registry: &mut SchemaRegistry) -> Result<SchemaObject> {
        let mut schema = match &self.kind {
            FieldKind::Nested(schema_ref) => return registry.reference(schema_ref),
            FieldKind::List(items) => {
                let mut schema = SchemaObject::typed("array", None);
                schema.items = Some(Box::new(items.to_schema(registry)?));
                schema.min_items = self.min_length;
                schema.max_items = self.max_length;
                schema
            }
            kind => {
                let (schema_type, format) = kind.type_and_format();
                let mut schema = SchemaObject {
                    schema_type: schema_type.map(str::to_string),
                    format: format.map(str::to_string),
                    ..Default::default()
                };
                schema.min_length = self.min_length;
                schema.max_length = self.max_length;
                schema
            }
        };

        schema.description = self.description.clone();
        schema.default = self.default.clone();
        schema.enum_values = self.choices.clone();
        schema.minimum = self.minimum.clone();
        schema.maximum = self.maximum.clone();
        schema.pattern = self.pattern.clone();
        Ok(schema)
    }
}

/// A structured schema: a named, ordered set of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaClass {
    /// Module path the class was declared in, `.` or `::` separated
    pub module: String,
    pub name: String,
    /// Explicit registry name, overriding `module.name`
    pub ref_name: Option<String>,
    pub fields: IndexMap<String, Field>,
}

impl SchemaClass {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            ref_name: None,
            fields: IndexMap::new(),
        }
    }

    pub fn with_ref_name(mut self, ref_name: impl Into<String>) -> Self {
        self.ref_name = Some(ref_name.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Name under which the class is registered.
    ///
    /// Qualifying with the module keeps identically named classes from
    /// different modules apart.
    pub fn registry_name(&self) -> String {
        if let Some(ref_name) = &self.ref_name {
            return ref_name.clone();
        }
        let module = self.module.replace("::", ".");
        let module = module.trim_matches('.');
        if module.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", module, self.name)
        }
    }
}

/// A schema class narrowed to a subset of its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaInstance {
    pub class: Arc<SchemaClass>,
    pub only: Option<Vec<String>>,
    pub exclude: Vec<String>,
}

impl SchemaInstance {
    pub fn new(class: Arc<SchemaClass>) -> Self {
        Self {
            class,
            only: None,
            exclude: Vec::new(),
        }
    }

    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Name under which the instance is registered.
    ///
    /// Unfiltered instances share their class's definition; filters add a
    /// suffix so a narrowed view never collides with the full class.
    pub fn registry_name(&self) -> String {
        let mut name = self.class.registry_name();
        if let Some(only) = &self.only {
            name.push_str("_only");
            push_sorted(&mut name, only);
        }
        if !self.exclude.is_empty() {
            name.push_str("_exclude");
            push_sorted(&mut name, &self.exclude);
        }
        name
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.class.fields.iter().filter(move |(name, _)| {
            let included = self
                .only
                .as_ref()
                .map_or(true, |only| only.iter().any(|n| n == *name));
            included && !self.exclude.iter().any(|n| n == *name)
        })
    }
}

fn push_sorted(name: &mut String, fields: &[String]) {
    let mut fields: Vec<&str> = fields.iter().map(String::as_str).collect();
    fields.sort_unstable();
    fields.dedup();
    for field in fields {
        name.push('_');
        name.push_str(field);
    }
}

/// A class referenced from inside its own definition.
///
/// The slot is filled once the class is built. Clones share the slot, and a
/// filled slot keeps the cycle's classes alive for as long as any of them is.
#[derive(Clone)]
pub struct DeferredClass {
    name: String,
    slot: Arc<OnceLock<Arc<SchemaClass>>>,
}

impl DeferredClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Registry name of the class.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fill the slot; returns `false` if it was already filled.
    pub fn resolve(&self, class: Arc<SchemaClass>) -> bool {
        self.slot.set(class).is_ok()
    }

    pub fn get(&self) -> Option<&Arc<SchemaClass>> {
        self.slot.get()
    }
}

// Compared and printed by name: the class itself leads back here.
impl PartialEq for DeferredClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl std::fmt::Debug for DeferredClass {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("DeferredClass")
            .field("name", &self.name)
            .field("resolved", &self.slot.get().is_some())
            .finish()
    }
}

/// Reference to a structured schema, by name, class or instance.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaRef {
    /// A schema registered elsewhere, referenced by registry name
    Named(String),
    Class(Arc<SchemaClass>),
    Instance(SchemaInstance),
    /// Back-edge of a reference cycle
    Deferred(DeferredClass),
}

impl SchemaRef {
    pub fn named(name: impl Into<String>) -> Self {
        SchemaRef::Named(name.into())
    }

    pub fn class(class: SchemaClass) -> Self {
        SchemaRef::Class(Arc::new(class))
    }

    pub fn instance(instance: SchemaInstance) -> Self {
        SchemaRef::Instance(instance)
    }

    pub fn registry_name(&self) -> String {
        match self {
            SchemaRef::Named(name) => name.clone(),
            SchemaRef::Class(class) => class.registry_name(),
            SchemaRef::Instance(instance) => instance.registry_name(),
            SchemaRef::Deferred(deferred) => deferred.name.clone(),
        }
    }
}

impl From<Arc<SchemaClass>> for SchemaRef {
    fn from(class: Arc<SchemaClass>) -> Self {
        SchemaRef::Class(class)
    }
}

impl From<SchemaClass> for SchemaRef {
    fn from(class: SchemaClass) -> Self {
        SchemaRef::class(class)
    }
}

impl From<SchemaInstance> for SchemaRef {
    fn from(instance: SchemaInstance) -> Self {
        SchemaRef::Instance(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Dialect;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema_json(field: &Field) -> Value {
        let mut registry = SchemaRegistry::new(Dialect::V3);
        serde_json::to_value(field.to_schema(&mut registry).unwrap()).unwrap()
    }

    #[test]
    fn test_integer_field() {
        assert_eq!(schema_json(&Field::integer()), json!({"type": "integer", "format": "int32"}));
    }

    #[test]
    fn test_string_field() {
        assert_eq!(schema_json(&Field::string()), json!({"type": "string"}));
    }

    #[test]
    fn test_scalar_formats() {
        let cases = vec![
            (FieldKind::Long, json!({"type": "integer", "format": "int64"})),
            (FieldKind::Float, json!({"type": "number", "format": "float"})),
            (FieldKind::Decimal, json!({"type": "number"})),
            (FieldKind::Uuid, json!({"type": "string", "format": "uuid"})),
            (FieldKind::DateTime, json!({"type": "string", "format": "date-time"})),
            (FieldKind::Boolean, json!({"type": "boolean"})),
            (FieldKind::Raw, json!({})),
        ];
        for (kind, expected) in cases {
            assert_eq!(schema_json(&Field::new(kind)), expected);
        }
    }

    #[test]
    fn test_validation_rules() {
        let field = Field::string()
            .one_of(vec!["asc", "desc"])
            .length(Some(3), Some(4))
            .describe("Sort order");
        assert_eq!(
            schema_json(&field),
            json!({
                "type": "string",
                "description": "Sort order",
                "enum": ["asc", "desc"],
                "minLength": 3,
                "maxLength": 4,
            })
        );
    }

    #[test]
    fn test_list_field_uses_item_bounds() {
        let field = Field::list(Field::integer()).length(Some(1), None);
        assert_eq!(
            schema_json(&field),
            json!({
                "type": "array",
                "minItems": 1,
                "items": {"type": "integer", "format": "int32"},
            })
        );
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("integer".parse::<FieldKind>(), Ok(FieldKind::Integer));
        assert_eq!("Date-Time".parse::<FieldKind>(), Ok(FieldKind::DateTime));
        assert!("matrix".parse::<FieldKind>().is_err());
    }

    #[test]
    fn test_registry_name_is_module_qualified() {
        let class = SchemaClass::new("app::billing", "AddressSchema");
        assert_eq!(class.registry_name(), "app.billing.AddressSchema");

        let bare = SchemaClass::new("", "AddressSchema");
        assert_eq!(bare.registry_name(), "AddressSchema");

        let declared = SchemaClass::new("app", "AddressSchema").with_ref_name("Address");
        assert_eq!(declared.registry_name(), "Address");
    }

    #[test]
    fn test_instance_filters_fields() {
        let class = Arc::new(
            SchemaClass::new("app", "UserSchema")
                .field("id", Field::integer())
                .field("name", Field::string())
                .field("password", Field::string()),
        );

        let public = SchemaInstance::new(class.clone()).exclude(["password"]);
        let names: Vec<_> = public.fields().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);

        let only_id = SchemaInstance::new(class).only(["id"]);
        let names: Vec<_> = only_id.fields().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["id"]);
    }

    #[test]
    fn test_filtered_instances_get_their_own_name() {
        let class = Arc::new(SchemaClass::new("app", "UserSchema"));

        assert_eq!(SchemaInstance::new(class.clone()).registry_name(), "app.UserSchema");
        assert_eq!(
            SchemaInstance::new(class.clone())
                .exclude(["password", "email"])
                .registry_name(),
            "app.UserSchema_exclude_email_password"
        );
        assert_eq!(
            SchemaInstance::new(class).only(["id"]).exclude(["id"]).registry_name(),
            "app.UserSchema_only_id_exclude_id"
        );
    }

    #[test]
    fn test_deferred_class_resolves_once() {
        let deferred = DeferredClass::new("tree.NodeSchema");
        assert!(deferred.get().is_none());

        let node = Arc::new(SchemaClass::new("tree", "NodeSchema"));
        assert!(deferred.clone().resolve(node.clone()));
        assert!(!deferred.resolve(node));
        assert_eq!(deferred.get().map(|c| c.registry_name()), Some("tree.NodeSchema".to_string()));
        assert_eq!(SchemaRef::Deferred(deferred).registry_name(), "tree.NodeSchema");
    }
}
