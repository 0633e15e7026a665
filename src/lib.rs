//! Swagger From Routes - OpenAPI/Swagger documents from a web application's routes.
//!
//! The generator walks a route table (URL pattern → HTTP method → versioned
//! handlers), classifies every handler argument into path, query or body
//! parameters, documents its responses and collects the schema definitions the
//! document references. Output is either Swagger 2.0 or OpenAPI 3.x, chosen by
//! the configured version string.
//!
//! # Architecture
//!
//! 1. [`options`] - Generator settings, defaults and `SWAGGER_*` environment overlay
//! 2. [`schema`] - Fields, schema classes and instances, schema objects
//! 3. [`registry`] - Named schema definitions and `$ref` paths
//! 4. [`route`] - Route table, handler interfaces and the documentation side-table
//! 5. [`parameters`] - Handler argument classification
//! 6. [`responses`] - Handler response classification
//! 7. [`openapi_builder`] - Document assembly
//! 8. [`catalog`] - Declarative schema specs turned into classes
//! 9. [`definitions`] - Schema classes read from Rust source files
//! 10. [`manifest`] - Route tables described in YAML or JSON
//! 11. [`serializer`] - YAML and JSON output
//!
//! # Example Usage
//!
//! ```
//! use swagger_from_routes::{
//!     generate_spec,
//!     options::GeneratorOptions,
//!     route::{Argument, HandlerDocs, HandlerInterface, HttpMethod, RouteTable},
//!     schema::Field,
//! };
//!
//! let routes = RouteTable::new().route(
//!     "/pets/{id}",
//!     HttpMethod::Get,
//!     HandlerInterface::new("get_pet")
//!         .doc("Fetch one pet")
//!         .argument(Argument::new("id").annotated(Field::integer())),
//! );
//!
//! let document = generate_spec(&routes, &HandlerDocs::new(), &GeneratorOptions::new()).unwrap();
//! assert!(document.paths.contains_key("/pets/{id}"));
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod catalog;
pub mod cli;
pub mod definitions;
pub mod error;
pub mod manifest;
pub mod openapi_builder;
pub mod options;
pub mod parameters;
pub mod registry;
pub mod responses;
pub mod route;
pub mod schema;
pub mod serializer;

pub use error::{Error, Result};
pub use openapi_builder::{generate_spec, generate_spec_with_catalog, OpenApiDocument};
