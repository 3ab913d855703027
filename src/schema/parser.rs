use crate::schema::types::{AttrFilter, FieldSpec, Leaf, ResponseType, SiteSchema, TagStep};
use crate::schema::SchemaStore;
use crate::{SchemaError, SchemaResult};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

/// Key holding a field's tag step list
const STEPS_KEY: &str = "item-data";

/// Keys inside a tag step that are not attribute filters
const TAG_KEY: &str = "tag";
const MAX_KEY: &str = "max";
const ATTR_KEY: &str = "attr";

/// Loads and validates a scraping schema file
///
/// # Arguments
///
/// * `path` - Path to the JSON schema document
///
/// # Returns
///
/// * `Ok(SchemaStore)` - Successfully loaded schema store
/// * `Err(SchemaError)` - Failed to read, parse, or validate the schema
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sift_scrape::schema::load_schema;
///
/// let store = load_schema(Path::new("scraping_data.json")).unwrap();
/// println!("{} sites configured", store.len());
/// ```
pub fn load_schema(path: &Path) -> SchemaResult<SchemaStore> {
    let content = std::fs::read_to_string(path)?;
    parse_schema(&content)
}

/// Loads a schema file and returns both the store and its SHA-256 hash
pub fn load_schema_with_hash(path: &Path) -> SchemaResult<(SchemaStore, String)> {
    let content = std::fs::read_to_string(path)?;
    let store = parse_schema(&content)?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok((store, hex::encode(hasher.finalize())))
}

/// Parses a schema store from JSON text
pub fn parse_schema(content: &str) -> SchemaResult<SchemaStore> {
    let value: Value = serde_json::from_str(content)?;
    schema_from_value(&value)
}

/// Builds a schema store from an already-parsed JSON document
pub fn schema_from_value(value: &Value) -> SchemaResult<SchemaStore> {
    let sites = value.as_object().ok_or_else(|| SchemaError::Invalid {
        site: "<root>".to_string(),
        message: "schema document must be a JSON object keyed by site".to_string(),
    })?;

    let mut parsed = HashMap::with_capacity(sites.len());
    for (site, entry) in sites {
        parsed.insert(site.to_lowercase(), parse_site(site, entry)?);
    }

    Ok(SchemaStore::new(parsed))
}

fn parse_site(site: &str, entry: &Value) -> SchemaResult<SiteSchema> {
    let invalid = |message: String| SchemaError::Invalid {
        site: site.to_string(),
        message,
    };

    let entry = entry
        .as_object()
        .ok_or_else(|| invalid("site entry must be an object".to_string()))?;

    let type_str = entry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing string \"type\"".to_string()))?;
    let response_type = ResponseType::parse(type_str)
        .ok_or_else(|| invalid(format!("unknown response type \"{}\"", type_str)))?;

    let root_selector = match entry.get("xpath").or_else(|| entry.get("selector")) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(_) => return Err(invalid("root selector must be a non-empty string".to_string())),
    };

    // Only the HTML path has an extraction engine; other types keep their
    // declared type so extraction can reject them by name.
    let fields = match response_type {
        ResponseType::Html => {
            let data = entry
                .get("data")
                .and_then(Value::as_object)
                .ok_or_else(|| invalid("missing object \"data\"".to_string()))?;
            parse_children(site, "data", data)?
        }
        ResponseType::Json | ResponseType::Xml => Vec::new(),
    };

    Ok(SiteSchema {
        response_type,
        fields,
        root_selector,
    })
}

fn parse_children(
    site: &str,
    path: &str,
    object: &Map<String, Value>,
) -> SchemaResult<Vec<(String, FieldSpec)>> {
    object
        .iter()
        .filter(|(key, _)| key.as_str() != STEPS_KEY)
        .map(|(name, value)| {
            let child_path = format!("{}.{}", path, name);
            parse_field(site, &child_path, value).map(|spec| (name.clone(), spec))
        })
        .collect()
}

fn parse_field(site: &str, path: &str, value: &Value) -> SchemaResult<FieldSpec> {
    let invalid = |message: String| SchemaError::Invalid {
        site: site.to_string(),
        message: format!("{}: {}", path, message),
    };

    let object = value
        .as_object()
        .ok_or_else(|| invalid("field spec must be an object".to_string()))?;

    let raw_steps: &[Value] = match object.get(STEPS_KEY) {
        None => &[],
        Some(Value::Array(items)) => items,
        Some(_) => return Err(invalid(format!("\"{}\" must be an array", STEPS_KEY))),
    };

    let children = parse_children(site, path, object)?;

    if raw_steps.is_empty() && children.is_empty() {
        return Err(invalid(
            "field spec needs tag steps or nested fields".to_string(),
        ));
    }

    let mut steps = Vec::with_capacity(raw_steps.len());
    let mut limit = None;
    let mut directive = None;

    for (index, raw) in raw_steps.iter().enumerate() {
        let is_last = index + 1 == raw_steps.len();
        let step_path = format!("{}[{}]", STEPS_KEY, index);
        let step_obj = raw
            .as_object()
            .ok_or_else(|| invalid(format!("{} must be an object", step_path)))?;

        let mut tag = None;
        let mut filters = Vec::new();

        for (key, value) in step_obj {
            match key.as_str() {
                TAG_KEY => {
                    let name = value
                        .as_str()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .ok_or_else(|| invalid(format!("{}.tag must be a non-empty string", step_path)))?;
                    tag = Some(name.to_lowercase());
                }
                MAX_KEY => {
                    if !is_last {
                        return Err(invalid(format!(
                            "{}: \"max\" is only allowed on the final step",
                            step_path
                        )));
                    }
                    let max = value
                        .as_u64()
                        .filter(|n| *n >= 1)
                        .ok_or_else(|| invalid(format!("{}.max must be a positive integer", step_path)))?;
                    limit = Some(max as usize);
                }
                ATTR_KEY => {
                    if !is_last {
                        return Err(invalid(format!(
                            "{}: \"attr\" is only allowed on the final step",
                            step_path
                        )));
                    }
                    let attr = value
                        .as_str()
                        .filter(|s| !s.is_empty())
                        .ok_or_else(|| invalid(format!("{}.attr must be a non-empty string", step_path)))?;
                    directive = Some(attr.to_string());
                }
                name => {
                    let value = value.as_str().ok_or_else(|| {
                        invalid(format!("{}.{} filter must be a string", step_path, name))
                    })?;
                    filters.push(AttrFilter {
                        name: name.to_lowercase(),
                        value: value.to_string(),
                    });
                }
            }
        }

        let tag = tag.ok_or_else(|| invalid(format!("{} is missing \"tag\"", step_path)))?;
        let step = TagStep::compile(tag, filters)
            .map_err(|message| invalid(format!("{}: {}", step_path, message)))?;
        steps.push(step);
    }

    let leaf = Leaf::from_directive(directive.as_deref());
    if leaf != Leaf::Nested && !children.is_empty() {
        return Err(invalid(
            "\"attr\" and nested fields are mutually exclusive".to_string(),
        ));
    }

    Ok(FieldSpec {
        steps,
        limit,
        leaf,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::Cardinality;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r##"{
        "shop": {
            "type": "html",
            "xpath": "#main",
            "data": {
                "title": { "item-data": [ { "tag": "h1", "class": "title", "attr": ".text" } ] },
                "multiple reviews": {
                    "item-data": [
                        { "tag": "div", "id": "reviews" },
                        { "tag": "li", "class": "review", "max": 5 }
                    ],
                    "author": { "item-data": [ { "tag": "span", "class": "author", "attr": ".text" } ] },
                    "link": { "item-data": [ { "tag": "a", "rel": "permalink", "attr": "href" } ] }
                }
            }
        },
        "feed": { "type": "json", "data": {} }
    }"##;

    #[test]
    fn test_parse_sample_schema() {
        let store = parse_schema(SAMPLE).unwrap();
        assert_eq!(store.len(), 2);

        let shop = store.get("shop").unwrap();
        assert_eq!(shop.response_type, ResponseType::Html);
        assert_eq!(shop.root_selector.as_deref(), Some("#main"));
        assert_eq!(shop.fields.len(), 2);

        let (name, title) = &shop.fields[0];
        assert_eq!(name, "title");
        assert_eq!(title.leaf, Leaf::Text);
        assert_eq!(title.cardinality(), Cardinality::One);
        assert_eq!(
            title.steps,
            vec![TagStep::new("h1").with_filter("class", "title")]
        );

        let (name, reviews) = &shop.fields[1];
        assert_eq!(name, "multiple reviews");
        assert_eq!(reviews.cardinality(), Cardinality::Many(5));
        assert_eq!(reviews.leaf, Leaf::Nested);
        assert_eq!(reviews.steps.len(), 2);
        let child_names: Vec<&str> = reviews.children.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(child_names, vec!["author", "link"]);
        assert_eq!(
            reviews.children[1].1.leaf,
            Leaf::Attribute("href".to_string())
        );
    }

    #[test]
    fn test_non_html_types_parse_without_fields() {
        let store = parse_schema(SAMPLE).unwrap();
        let feed = store.get("feed").unwrap();
        assert_eq!(feed.response_type, ResponseType::Json);
        assert!(feed.fields.is_empty());
    }

    #[test]
    fn test_selector_alias() {
        let store = parse_schema(
            r#"{ "s": { "type": "html", "selector": "body", "data": { "x": { "item-data": [ { "tag": "p", "attr": ".text" } ] } } } }"#,
        )
        .unwrap();
        assert_eq!(store.get("s").unwrap().root_selector.as_deref(), Some("body"));
    }

    #[test]
    fn test_nested_mapping_without_steps() {
        let store = parse_schema(
            r#"{ "s": { "type": "html", "data": { "group": { "a": { "item-data": [ { "tag": "b", "attr": ".text" } ] } } } } }"#,
        )
        .unwrap();
        let (_, group) = &store.get("s").unwrap().fields[0];
        assert!(group.steps.is_empty());
        assert_eq!(group.children.len(), 1);
    }

    fn assert_invalid(json: &str, needle: &str) {
        match parse_schema(json) {
            Err(SchemaError::Invalid { message, .. }) => {
                assert!(message.contains(needle), "{} not in {}", needle, message)
            }
            other => panic!("expected invalid schema, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert_invalid(r#"{ "s": { "type": "csv", "data": {} } }"#, "unknown response type");
    }

    #[test]
    fn test_missing_type_rejected() {
        assert_invalid(r#"{ "s": { "data": {} } }"#, "type");
    }

    #[test]
    fn test_max_on_intermediate_step_rejected() {
        assert_invalid(
            r#"{ "s": { "type": "html", "data": { "x": { "item-data": [
                { "tag": "ul", "max": 2 }, { "tag": "li", "attr": ".text" } ] } } } }"#,
            "only allowed on the final step",
        );
    }

    #[test]
    fn test_zero_max_rejected() {
        assert_invalid(
            r#"{ "s": { "type": "html", "data": { "x": { "item-data": [ { "tag": "li", "max": 0 } ] } } } }"#,
            "positive integer",
        );
    }

    #[test]
    fn test_missing_tag_rejected() {
        assert_invalid(
            r#"{ "s": { "type": "html", "data": { "x": { "item-data": [ { "class": "a" } ] } } } }"#,
            "missing \"tag\"",
        );
    }

    #[test]
    fn test_uncompilable_step_rejected() {
        assert_invalid(
            r#"{ "s": { "type": "html", "data": { "x": { "item-data": [ { "tag": "li>a", "attr": ".text" } ] } } } }"#,
            "invalid selector",
        );
        assert_invalid(
            r#"{ "s": { "type": "html", "data": { "x": { "item-data": [ { "tag": "li", "on click": "a" } ] } } } }"#,
            "invalid selector",
        );
    }

    #[test]
    fn test_empty_field_rejected() {
        assert_invalid(
            r#"{ "s": { "type": "html", "data": { "x": {} } } }"#,
            "needs tag steps or nested fields",
        );
    }

    #[test]
    fn test_attr_with_children_rejected() {
        assert_invalid(
            r#"{ "s": { "type": "html", "data": { "x": {
                "item-data": [ { "tag": "div", "attr": ".text" } ],
                "y": { "item-data": [ { "tag": "p", "attr": ".text" } ] } } } } }"#,
            "mutually exclusive",
        );
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_schema("{ nope"), Err(SchemaError::Parse(_))));
    }

    #[test]
    fn test_load_schema_with_hash() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();

        let (store, hash) = load_schema_with_hash(file.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(hash.len(), 64);

        let (_, again) = load_schema_with_hash(file.path()).unwrap();
        assert_eq!(hash, again);
    }

    #[test]
    fn test_load_schema_missing_file() {
        let result = load_schema(Path::new("/nonexistent/schema.json"));
        assert!(matches!(result, Err(SchemaError::Io(_))));
    }
}
