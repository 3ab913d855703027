//! Recursive, schema-driven field extraction
//!
//! A field spec is resolved by narrowing the scope through its tag steps and
//! then applying the final step's leaf directive, or recursing into the
//! nested field specs for every matched node. The schema tree is only ever
//! borrowed, so repeated records reuse the same subtree without copying it.

use super::matcher::{find_first, find_matches, text_content, Scope};
use super::ExtractError;
use crate::schema::{Cardinality, FieldSpec, Leaf};
use scraper::ElementRef;
use serde_json::{Map, Value};

/// Extracts one named field from the given scope
///
/// # Resolution
///
/// 1. Every step but the last narrows the scope to its first match
/// 2. The last step selects the first match (cardinality one) or up to
///    `max` matches (cardinality many)
/// 3. Cardinality many yields a list: one record per node for nested specs,
///    or one value per node for `.text`/attribute directives
/// 4. Cardinality one yields the nested mapping, the text, or the attribute
///
/// A spec without steps resolves its nested fields against the scope.
///
/// # Returns
///
/// * `Ok(Value)` - The extracted value
/// * `Err(ExtractError)` - A step found nothing or a required attribute is missing
pub fn extract_field(scope: Scope<'_>, name: &str, spec: &FieldSpec) -> Result<Value, ExtractError> {
    let Some((last, leading)) = spec.steps.split_last() else {
        return Ok(Value::Object(extract_fields(scope, &spec.children)));
    };

    let mut current = scope;
    for step in leading {
        let node = find_first(current, step).ok_or_else(|| ExtractError::NoMatch {
            field: name.to_string(),
            step: step.to_string(),
        })?;
        current = Scope::element(node);
    }

    match spec.cardinality() {
        Cardinality::Many(limit) => {
            let records = find_matches(current, last, limit)
                .into_iter()
                .map(|node| absorb(name, resolve_node(node, name, spec)))
                .collect();
            Ok(Value::Array(records))
        }
        Cardinality::One => {
            let node = find_first(current, last).ok_or_else(|| ExtractError::NoMatch {
                field: name.to_string(),
                step: last.to_string(),
            })?;
            resolve_node(node, name, spec)
        }
    }
}

/// Extracts every field into a mapping keyed by output name
///
/// Failed fields become `null` without affecting their siblings.
pub fn extract_fields(scope: Scope<'_>, fields: &[(String, FieldSpec)]) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, spec)| {
            let value = absorb(name, extract_field(scope, name, spec));
            (spec.output_key(name).to_string(), value)
        })
        .collect()
}

/// Applies the leaf directive to one matched node
fn resolve_node(node: ElementRef<'_>, name: &str, spec: &FieldSpec) -> Result<Value, ExtractError> {
    match &spec.leaf {
        Leaf::Nested => Ok(Value::Object(extract_fields(
            Scope::element(node),
            &spec.children,
        ))),
        Leaf::Text => Ok(Value::String(text_content(&node))),
        Leaf::Attribute(attribute) => node
            .value()
            .attr(attribute)
            .map(|v| Value::String(v.to_string()))
            .ok_or_else(|| ExtractError::MissingAttribute {
                field: name.to_string(),
                attribute: attribute.clone(),
            }),
    }
}

fn absorb(name: &str, result: Result<Value, ExtractError>) -> Value {
    match result {
        Ok(value) => value,
        Err(e) if e.is_absent() => {
            tracing::debug!(field = name, "Field not found: {}", e);
            Value::Null
        }
        Err(e) => {
            tracing::warn!(field = name, "Field extraction failed: {}", e);
            Value::Null
        }
    }
}
