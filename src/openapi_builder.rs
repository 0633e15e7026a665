use crate::catalog::SchemaCatalog;
use crate::definitions::DefinitionsLoader;
use crate::error::Result;
use crate::options::{Dialect, GeneratorOptions};
use crate::parameters::classify_parameters;
use crate::registry::SchemaRegistry;
use crate::responses::classify_responses;
use crate::route::{HandlerDocs, HandlerInterface, HttpMethod, RouteTable, VersionSet};
use crate::schema::{SchemaObject, SchemaRef};
use indexmap::IndexMap;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// OpenAPI document builder
pub struct OpenApiBuilder {
    options: GeneratorOptions,
    /// Named schema definitions
    registry: SchemaRegistry,
    /// Paths collection (URL path -> PathItem)
    paths: IndexMap<String, PathItem>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Server object (3.x)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Server {
    pub url: String,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    pub fn set_operation(&mut self, method: HttpMethod, operation: Operation) {
        let slot = match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        };
        *slot = Some(operation);
    }
}

/// Operation object for one handler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    /// Output content type of the handler
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<BTreeMap<u16, Response>>,
}

/// Where a parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Body,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub name: String,
    pub required: bool,
    /// Parameter schema (3.x, and body parameters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaObject>,
    /// Type keywords written directly on the parameter (2.x)
    #[serde(flatten)]
    pub inline: Option<SchemaObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaObject>,
}

/// Components object (3.x)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Components {
    pub schemas: IndexMap<String, SchemaObject>,
}

/// Complete generated document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenApiDocument {
    /// Swagger version (2.x)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swagger: Option<String>,
    /// OpenAPI version (3.x)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,
    pub info: Info,
    pub host: String,
    pub schemes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Server>>,
    pub paths: IndexMap<String, PathItem>,
    /// Schema definitions (2.x)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<IndexMap<String, SchemaObject>>,
    /// Schema definitions (3.x)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiDocument {
    /// The document as a plain JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Registered schema definitions, whichever dialect the document uses.
    pub fn schemas(&self) -> Option<&IndexMap<String, SchemaObject>> {
        self.definitions
            .as_ref()
            .or_else(|| self.components.as_ref().map(|c| &c.schemas))
    }
}

/// Generate the document for a whole route table.
///
/// Schemas under `options.definitions_path`, if set, are loaded and
/// registered first.
pub fn generate_spec(
    routes: &RouteTable,
    docs: &HandlerDocs,
    options: &GeneratorOptions,
) -> Result<OpenApiDocument> {
    let catalog = match &options.definitions_path {
        Some(path) => load_definitions(path)?,
        None => SchemaCatalog::new(),
    };
    generate_spec_with_catalog(routes, docs, options, &catalog)
}

/// Generate the document with the exported classes of an already loaded
/// `catalog` registered first. `options.definitions_path` is not read.
pub fn generate_spec_with_catalog(
    routes: &RouteTable,
    docs: &HandlerDocs,
    options: &GeneratorOptions,
    catalog: &SchemaCatalog,
) -> Result<OpenApiDocument> {
    let mut builder = OpenApiBuilder::new(options.clone());
    builder.preload_catalog(catalog)?;

    for (url, method, versions, handler) in routes.iter() {
        builder.add_route(url, method, versions, handler, docs)?;
    }

    Ok(builder.build())
}

fn load_definitions(path: &Path) -> Result<SchemaCatalog> {
    info!("Loading schema definitions from {}", path.display());
    DefinitionsLoader::new(path).load()
}

/// First line and full text of a documentation string, trimmed line by line.
pub fn summary_and_description(doc: Option<&str>) -> (Option<String>, Option<String>) {
    let lines: Vec<&str> = match doc {
        Some(doc) => doc.lines().map(str::trim).collect(),
        None => return (None, None),
    };

    let start = lines.iter().position(|line| !line.is_empty());
    let end = lines.iter().rposition(|line| !line.is_empty());
    match (start, end) {
        (Some(start), Some(end)) => {
            let text = lines[start..=end].join("\n");
            (Some(lines[start].to_string()), Some(text))
        }
        _ => (None, None),
    }
}

/// `/v{version}{url}` for versioned routes, the URL itself otherwise.
pub fn versioned_path(url: &str, version: Option<u32>) -> String {
    match version {
        Some(version) => format!("/v{}{}", version, url),
        None => url.to_string(),
    }
}

impl OpenApiBuilder {
    /// Create a builder for one document
    pub fn new(options: GeneratorOptions) -> Self {
        debug!("Initializing OpenApiBuilder");
        let registry = SchemaRegistry::new(options.dialect());
        Self {
            options,
            registry,
            paths: IndexMap::new(),
        }
    }

    /// Register every exported `*Schema` struct found under `path`.
    pub fn preload_definitions(&mut self, path: &Path) -> Result<()> {
        let catalog = load_definitions(path)?;
        self.preload_catalog(&catalog)
    }

    /// Register every exported `*Schema` class of `catalog`.
    pub fn preload_catalog(&mut self, catalog: &SchemaCatalog) -> Result<()> {
        let mut count = 0;
        for class in catalog.exported() {
            self.registry.register(&SchemaRef::Class(class.clone()))?;
            count += 1;
        }
        info!("Pre-registered {} schema definitions", count);
        Ok(())
    }

    /// Register a schema definition directly.
    pub fn register_schema(&mut self, schema: &SchemaRef) -> Result<String> {
        self.registry.register(schema)
    }

    /// Document one handler under every version it is served at
    pub fn add_route(
        &mut self,
        url: &str,
        method: HttpMethod,
        versions: &VersionSet,
        handler: &HandlerInterface,
        docs: &HandlerDocs,
    ) -> Result<()> {
        if docs.is_excluded(&handler.name) {
            debug!("Handler {} is excluded from documentation", handler.name);
            return Ok(());
        }
        debug!("Adding route: {} {} -> {}", method, url, handler.name);

        let (summary, description) = summary_and_description(handler.doc.as_deref());

        let parameters = classify_parameters(url, handler, &self.options, &mut self.registry)?;
        let responses = classify_responses(
            handler,
            docs.responses_for(&handler.name),
            self.options.use_default_response,
            &mut self.registry,
        )?;

        let operation = Operation {
            content_type: handler.content_type.clone(),
            summary,
            description,
            parameters: if parameters.is_empty() {
                None
            } else {
                Some(parameters)
            },
            responses: if responses.is_empty() {
                None
            } else {
                Some(responses)
            },
        };

        for version in versions.versions() {
            let path = versioned_path(url, version);
            self.paths
                .entry(path)
                .or_default()
                .set_operation(method, operation.clone());
        }

        Ok(())
    }

    /// Build the final document
    pub fn build(self) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let dialect = self.registry.dialect();
        let schemas = self.registry.into_schemas();
        let options = self.options;

        let info = Info {
            title: options.title,
            version: options.version,
            description: options.description,
        };

        match dialect {
            Dialect::V2 => OpenApiDocument {
                swagger: Some(options.openapi_version),
                openapi: None,
                info,
                host: options.host,
                schemes: options.schemes,
                servers: None,
                paths: self.paths,
                definitions: Some(schemas),
                components: None,
            },
            Dialect::V3 => {
                let servers = options
                    .schemes
                    .iter()
                    .map(|scheme| Server {
                        url: format!("{}://{}", scheme, options.host),
                    })
                    .collect();
                OpenApiDocument {
                    swagger: None,
                    openapi: Some(options.openapi_version),
                    info,
                    host: options.host,
                    schemes: options.schemes,
                    servers: Some(servers),
                    paths: self.paths,
                    definitions: None,
                    components: Some(Components { schemas }),
                }
            }
        }
    }
}
