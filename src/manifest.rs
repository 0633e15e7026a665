//! Route manifests: route tables described in YAML or JSON.
//!
//! ```yaml
//! schemas:
//!   app.models.PetSchema:
//!     fields:
//!       name: { type: string, required: true }
//! routes:
//!   - url: /pets/{id}
//!     method: GET
//!     versions: [1, 2]
//!     handler:
//!       name: get_pet
//!       doc: Fetch one pet.
//!       arguments:
//!         - name: id
//!           field: { type: integer }
//!         - name: hug_timer
//!       returns: { schema: { class: app.models.PetSchema } }
//!       responses:
//!         404: { description: Not found }
//! ```

use crate::catalog::{FieldSpec, SchemaCatalog, SchemaSpec};
use crate::error::{Error, Result};
use crate::route::{
    Annotation, Argument, HandlerDocs, HandlerInterface, HttpMethod, ResponseDescriptor,
    ResponseMetadata, RouteTable, VersionSet, DEFAULT_CONTENT_TYPE,
};
use crate::schema::{SchemaInstance, SchemaRef};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A whole route manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub schemas: IndexMap<String, SchemaSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub versions: Option<VersionsSpec>,
    pub handler: HandlerSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VersionsSpec {
    One(u32),
    Many(Vec<u32>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerSpec {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
    #[serde(default)]
    pub returns: Option<AnnotationSpec>,
    #[serde(default)]
    pub responses: BTreeMap<u16, ResponseSpec>,
    /// Leave the handler out of the document
    #[serde(default)]
    pub exclude: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(flatten)]
    pub annotation: AnnotationSpec,
}

/// At most one of the keys may be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationSpec {
    #[serde(default)]
    pub field: Option<FieldSpec>,
    #[serde(default)]
    pub schema: Option<SchemaRefSpec>,
    #[serde(default)]
    pub directive: Option<String>,
    /// Name of a type the generator cannot document
    #[serde(default, rename = "type")]
    pub other: Option<String>,
}

/// A schema class, instance or registered name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaRefSpec {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub only: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseSpec {
    #[serde(default)]
    pub schema: Option<AnnotationSpec>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Manifest {
    /// Read a manifest; `.json` files are JSON, anything else YAML.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading route manifest {}", path.display());
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::InvalidManifest(e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::InvalidManifest(e.to_string()))
    }

    /// Build the route table and side-table.
    ///
    /// Schema classes are looked up in the manifest's own `schemas` first,
    /// then in `extra` (for instance classes from a definitions module).
    pub fn into_routes(self, extra: &SchemaCatalog) -> Result<(RouteTable, HandlerDocs)> {
        let mut catalog = SchemaCatalog::from_specs(&self.schemas)?;
        catalog.merge(extra.clone());

        let mut routes = RouteTable::new();
        let mut docs = HandlerDocs::new();

        for route in self.routes {
            let method: HttpMethod = route.method.parse().map_err(Error::InvalidManifest)?;
            let versions = match route.versions {
                None => VersionSet::Unversioned,
                Some(VersionsSpec::One(version)) => VersionSet::One(version),
                Some(VersionsSpec::Many(versions)) => VersionSet::Many(versions),
            };
            let spec = route.handler;

            let mut handler = HandlerInterface::new(spec.name.clone());
            handler.doc = spec.doc;
            handler.content_type = spec
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
            for argument in spec.arguments {
                handler.arguments.push(Argument {
                    annotation: argument.annotation.to_annotation(&catalog)?,
                    name: argument.name,
                    default: argument.default,
                });
            }
            if let Some(returns) = spec.returns {
                handler.returns = returns.to_annotation(&catalog)?;
            }

            if !spec.responses.is_empty() {
                let mut responses = ResponseMetadata::new();
                for (code, response) in spec.responses {
                    let schema = match response.schema {
                        Some(schema) => schema.to_annotation(&catalog)?,
                        None => None,
                    };
                    responses.insert(
                        code,
                        ResponseDescriptor {
                            schema,
                            description: response.description,
                        },
                    );
                }
                docs.set_responses(spec.name.clone(), responses);
            }
            if spec.exclude {
                docs.set_excluded(spec.name.clone());
            }

            routes.add(route.url, method, versions, handler);
        }

        debug!("Manifest describes {} handlers", routes.len());
        Ok((routes, docs))
    }
}

impl AnnotationSpec {
    fn to_annotation(&self, catalog: &SchemaCatalog) -> Result<Option<Annotation>> {
        let set = [
            self.field.is_some(),
            self.schema.is_some(),
            self.directive.is_some(),
            self.other.is_some(),
        ];
        if set.iter().filter(|is_set| **is_set).count() > 1 {
            return Err(Error::InvalidManifest(
                "an annotation sets more than one of field, schema, directive and type".to_string(),
            ));
        }

        if let Some(field) = &self.field {
            return Ok(Some(Annotation::Field(field.to_field()?)));
        }
        if let Some(schema) = &self.schema {
            return Ok(Some(Annotation::Schema(schema.to_schema_ref(catalog)?)));
        }
        if let Some(directive) = &self.directive {
            return Ok(Some(Annotation::Directive(directive.clone())));
        }
        Ok(self.other.clone().map(Annotation::Other))
    }
}

impl SchemaRefSpec {
    fn to_schema_ref(&self, catalog: &SchemaCatalog) -> Result<SchemaRef> {
        let lookup = |key: &str| {
            catalog
                .get(key)
                .cloned()
                .ok_or_else(|| Error::UnknownSchema(key.to_string()))
        };

        match (&self.class, &self.instance, &self.name) {
            (Some(class), None, None) => Ok(SchemaRef::Class(lookup(class)?)),
            (None, Some(instance), None) => {
                let mut instance = SchemaInstance::new(lookup(instance)?);
                instance.only = self.only.clone();
                instance.exclude = self.exclude.clone();
                Ok(SchemaRef::Instance(instance))
            }
            (None, None, Some(name)) => Ok(SchemaRef::Named(name.clone())),
            _ => Err(Error::InvalidManifest(
                "a schema reference needs exactly one of class, instance and name".to_string(),
            )),
        }
    }
}
