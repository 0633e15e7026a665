//! Route table and handler descriptions consumed by the generator.
//!
//! The web framework owns its routes; this module describes them as plain
//! values: URL pattern → HTTP method → versioned handler interfaces. Handler
//! arguments carry an [`Annotation`] telling the classifiers what kind of
//! value the framework feeds into them.
//!
//! Response metadata and documentation exclusions are kept in a side-table,
//! [`HandlerDocs`], keyed by handler name.

use crate::schema::{Field, SchemaRef};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

/// Default output content type of a handler.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// HTTP methods a route can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Lowercase name, as used for operation keys in the document.
    pub fn as_lowercase(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.as_lowercase().to_ascii_uppercase())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "OPTIONS" => Ok(HttpMethod::Options),
            "HEAD" => Ok(HttpMethod::Head),
            _ => Err(format!("unsupported HTTP method: {}", s)),
        }
    }
}

/// API versions a handler is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSet {
    Unversioned,
    One(u32),
    Many(Vec<u32>),
}

impl VersionSet {
    /// Every version as an `Option`, `None` standing for the unversioned route.
    pub fn versions(&self) -> Vec<Option<u32>> {
        match self {
            VersionSet::Unversioned => vec![None],
            VersionSet::One(version) => vec![Some(*version)],
            VersionSet::Many(versions) if versions.is_empty() => vec![None],
            VersionSet::Many(versions) => versions.iter().copied().map(Some).collect(),
        }
    }
}

impl From<u32> for VersionSet {
    fn from(version: u32) -> Self {
        VersionSet::One(version)
    }
}

impl From<Vec<u32>> for VersionSet {
    fn from(versions: Vec<u32>) -> Self {
        VersionSet::Many(versions)
    }
}

impl From<Option<u32>> for VersionSet {
    fn from(version: Option<u32>) -> Self {
        version.map_or(VersionSet::Unversioned, VersionSet::One)
    }
}

/// What the framework declares about a handler argument or return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Value injected by the framework, never supplied by the caller
    Directive(String),
    /// Typed scalar with validation rules
    Field(Field),
    /// Structured schema
    Schema(SchemaRef),
    /// Any other type, by name
    Other(String),
}

impl Annotation {
    pub fn describe(&self) -> String {
        match self {
            Annotation::Directive(name) => format!("directive {}", name),
            Annotation::Field(field) => format!("field {:?}", field.kind),
            Annotation::Schema(schema) => format!("schema {}", schema.registry_name()),
            Annotation::Other(name) => name.clone(),
        }
    }
}

impl From<Field> for Annotation {
    fn from(field: Field) -> Self {
        Annotation::Field(field)
    }
}

impl From<SchemaRef> for Annotation {
    fn from(schema: SchemaRef) -> Self {
        Annotation::Schema(schema)
    }
}

/// A declared handler argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub annotation: Option<Annotation>,
    pub default: Option<Value>,
}

impl Argument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    pub fn annotated(mut self, annotation: impl Into<Annotation>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Read-only description of a route handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerInterface {
    /// Handler identity, also the key into [`HandlerDocs`]
    pub name: String,
    pub arguments: Vec<Argument>,
    pub doc: Option<String>,
    pub returns: Option<Annotation>,
    pub content_type: String,
}

impl HandlerInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            doc: None,
            returns: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn returns(mut self, annotation: impl Into<Annotation>) -> Self {
        self.returns = Some(annotation.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// One handler registered under a method, with its versions.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedHandler {
    pub versions: VersionSet,
    pub handler: HandlerInterface,
}

/// URL pattern → HTTP method → versioned handlers, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: IndexMap<String, IndexMap<HttpMethod, Vec<VersionedHandler>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unversioned handler.
    pub fn route(self, url: impl Into<String>, method: HttpMethod, handler: HandlerInterface) -> Self {
        self.versioned(url, method, VersionSet::Unversioned, handler)
    }

    pub fn versioned(
        mut self,
        url: impl Into<String>,
        method: HttpMethod,
        versions: impl Into<VersionSet>,
        handler: HandlerInterface,
    ) -> Self {
        self.add(url, method, versions, handler);
        self
    }

    pub fn add(
        &mut self,
        url: impl Into<String>,
        method: HttpMethod,
        versions: impl Into<VersionSet>,
        handler: HandlerInterface,
    ) {
        self.routes
            .entry(url.into())
            .or_default()
            .entry(method)
            .or_default()
            .push(VersionedHandler {
                versions: versions.into(),
                handler,
            });
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Every `(url, method, versions, handler)` in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, HttpMethod, &VersionSet, &HandlerInterface)> {
        self.routes.iter().flat_map(|(url, methods)| {
            methods.iter().flat_map(move |(method, handlers)| {
                handlers
                    .iter()
                    .map(move |h| (url.as_str(), *method, &h.versions, &h.handler))
            })
        })
    }
}

/// Documented response for one status code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseDescriptor {
    pub schema: Option<Annotation>,
    pub description: Option<String>,
}

/// Status code → documented response.
pub type ResponseMetadata = BTreeMap<u16, ResponseDescriptor>;

/// Per-handler documentation side-table.
#[derive(Debug, Clone, Default)]
pub struct HandlerDocs {
    responses: HashMap<String, ResponseMetadata>,
    excluded: HashSet<String>,
}

impl HandlerDocs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document a response of `handler`, replacing any earlier entry for `code`.
    pub fn response(
        mut self,
        handler: impl Into<String>,
        code: u16,
        schema: Option<Annotation>,
        description: Option<&str>,
    ) -> Self {
        self.responses.entry(handler.into()).or_default().insert(
            code,
            ResponseDescriptor {
                schema,
                description: description.map(str::to_string),
            },
        );
        self
    }

    /// Document bare response codes of `handler`.
    pub fn response_codes(mut self, handler: impl Into<String>, codes: &[u16]) -> Self {
        let responses = self.responses.entry(handler.into()).or_default();
        for code in codes {
            responses.insert(*code, ResponseDescriptor::default());
        }
        self
    }

    /// Leave `handler` out of the generated document.
    pub fn exclude(mut self, handler: impl Into<String>) -> Self {
        self.excluded.insert(handler.into());
        self
    }

    pub fn set_responses(&mut self, handler: impl Into<String>, responses: ResponseMetadata) {
        self.responses.insert(handler.into(), responses);
    }

    pub fn set_excluded(&mut self, handler: impl Into<String>) {
        self.excluded.insert(handler.into());
    }

    pub fn responses_for(&self, handler: &str) -> Option<&ResponseMetadata> {
        self.responses.get(handler)
    }

    pub fn is_excluded(&self, handler: &str) -> bool {
        self.excluded.contains(handler)
    }
}
