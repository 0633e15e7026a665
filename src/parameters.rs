//! Handler argument classification into OpenAPI parameters.

use crate::error::Result;
use crate::openapi_builder::{Parameter, ParameterLocation};
use crate::options::{Dialect, GeneratorOptions};
use crate::registry::SchemaRegistry;
use crate::route::{Annotation, Argument, HandlerInterface};
use crate::schema::{Field, SchemaRef};
use log::{debug, error, info};
use serde_json::Value;

/// Name of the argument carrying the request body.
pub const BODY_ARGUMENT: &str = "body";

/// `path` if the URL template contains `{name}`, otherwise `query`.
pub fn parameter_location(name: &str, url: &str) -> ParameterLocation {
    if url.contains(&format!("{{{}}}", name)) {
        ParameterLocation::Path
    } else {
        ParameterLocation::Query
    }
}

/// Document the caller-supplied arguments of `handler`.
///
/// Arguments that cannot be documented are logged and left out; the only
/// error is a schema name conflict raised by the registry.
pub fn classify_parameters(
    url: &str,
    handler: &HandlerInterface,
    options: &GeneratorOptions,
    registry: &mut SchemaRegistry,
) -> Result<Vec<Parameter>> {
    let mut parameters = Vec::new();

    for argument in &handler.arguments {
        let name = argument.name.as_str();

        if options.is_reserved_argument(name) {
            debug!("Skip framework argument: {} for url: {}", name, url);
            continue;
        }

        match &argument.annotation {
            Some(Annotation::Directive(directive)) => {
                info!("Skip directive: {} ({}) for url: {}", name, directive, url);
            }
            Some(Annotation::Field(field)) => {
                let location = parameter_location(name, url);
                parameters.push(field_parameter(argument, field, location, registry)?);
            }
            Some(Annotation::Schema(schema_ref)) if name == BODY_ARGUMENT => {
                if let SchemaRef::Named(schema_name) = schema_ref {
                    error!(
                        "Body of url: {} must be a schema class or instance, not the name {}",
                        url, schema_name
                    );
                    continue;
                }
                parameters.push(Parameter {
                    location: ParameterLocation::Body,
                    name: BODY_ARGUMENT.to_string(),
                    required: true,
                    schema: Some(registry.reference(schema_ref)?),
                    inline: None,
                    default: None,
                    description: None,
                });
            }
            Some(annotation) => {
                error!(
                    "Use typed fields in url: {} instead of {}: {}",
                    url,
                    name,
                    annotation.describe()
                );
            }
            None => {
                info!("There is no type annotation for {} in url: {}", name, url);
            }
        }
    }

    Ok(parameters)
}

fn field_parameter(
    argument: &Argument,
    field: &Field,
    location: ParameterLocation,
    registry: &mut SchemaRegistry,
) -> Result<Parameter> {
    let mut schema = field.to_schema(registry)?;
    let description = schema.description.take();
    // A default from either the handler or the field makes it optional
    let required = argument.default.is_none() && field.default.is_none();

    let mut parameter = Parameter {
        location,
        name: argument.name.clone(),
        required,
        schema: None,
        inline: None,
        default: argument.default.clone(),
        description,
    };

    match registry.dialect() {
        Dialect::V3 => parameter.schema = Some(schema),
        Dialect::V2 => {
            // 2.x carries `default` on the parameter itself
            let field_default: Option<Value> = schema.default.take();
            if parameter.default.is_none() {
                parameter.default = field_default;
            }
            parameter.inline = Some(schema);
        }
    }

    Ok(parameter)
}
