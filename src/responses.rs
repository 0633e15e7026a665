//! Handler response classification.

use crate::error::Result;
use crate::openapi_builder::Response;
use crate::registry::SchemaRegistry;
use crate::route::{Annotation, HandlerInterface, ResponseMetadata};
use crate::schema::SchemaObject;
use log::{debug, error};
use std::collections::BTreeMap;

/// Status code documented for a handler's return annotation.
pub const DEFAULT_SUCCESS_CODE: u16 = 200;

/// Document the responses of `handler`.
///
/// Explicit metadata comes first; the return annotation fills in the schema of
/// the 200 response. Every schema in the result is a `$ref`.
pub fn classify_responses(
    handler: &HandlerInterface,
    metadata: Option<&ResponseMetadata>,
    use_default_response: bool,
    registry: &mut SchemaRegistry,
) -> Result<BTreeMap<u16, Response>> {
    let mut declared = metadata.cloned().unwrap_or_default();

    if let Some(returns) = &handler.returns {
        declared.entry(DEFAULT_SUCCESS_CODE).or_default().schema = Some(returns.clone());
    }

    // Added next to any declared codes, not only when none are declared
    if use_default_response {
        declared.entry(DEFAULT_SUCCESS_CODE).or_default();
    }

    let mut responses = BTreeMap::new();
    for (code, descriptor) in declared {
        let schema = match &descriptor.schema {
            Some(annotation) => resolve_schema(&handler.name, code, annotation, registry)?,
            None => None,
        };
        responses.insert(
            code,
            Response {
                description: descriptor.description,
                schema,
            },
        );
    }

    debug!("Handler {} documents {} responses", handler.name, responses.len());
    Ok(responses)
}

fn resolve_schema(
    handler: &str,
    code: u16,
    annotation: &Annotation,
    registry: &mut SchemaRegistry,
) -> Result<Option<SchemaObject>> {
    match annotation {
        Annotation::Schema(schema_ref) => registry.reference(schema_ref).map(Some),
        other => {
            error!(
                "Wrong response schema {} for status {} of handler {}",
                other.describe(),
                code,
                handler
            );
            Ok(None)
        }
    }
}
