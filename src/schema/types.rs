use scraper::Selector;
use std::fmt;

/// Prefix on a field name marking a repeated (list-valued) field
pub const MULTIPLE_MARKER: &str = "multiple ";

/// Leaf directive requesting the matched node's text content
pub const TEXT_DIRECTIVE: &str = ".text";

/// Response format a site's schema is written against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    Html,
    Json,
    Xml,
}

impl ResponseType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "html" => Some(Self::Html),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction schema for one site
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSchema {
    /// Declared response format
    pub response_type: ResponseType,

    /// Top-level fields, in schema order
    pub fields: Vec<(String, FieldSpec)>,

    /// Element whose inner HTML the browser strategy returns
    pub root_selector: Option<String>,
}

/// Attribute constraint on a tag step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrFilter {
    pub name: String,
    pub value: String,
}

/// One narrowing step: an element name plus attribute filters
///
/// The step is compiled to a CSS selector once, when the schema loads:
/// `li` with `class: "item"` becomes `li[class~="item"], li[class="item"]`,
/// so a class filter matches one class token or the full attribute value.
/// Every other filter is an exact `[name="value"]` match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagStep {
    pub tag: String,
    pub filters: Vec<AttrFilter>,
    selector: Selector,
}

impl TagStep {
    /// Compiles a step, failing if the tag or a filter name is not a valid
    /// CSS identifier
    pub fn compile(tag: impl Into<String>, filters: Vec<AttrFilter>) -> Result<Self, String> {
        let tag = tag.into();
        if !is_plain_name(&tag) {
            return Err(format!("invalid selector: `{}` is not an element name", tag));
        }
        if let Some(filter) = filters.iter().find(|f| !is_plain_name(&f.name)) {
            return Err(format!("invalid selector: `{}` is not an attribute name", filter.name));
        }

        let css = selector_css(&tag, &filters);
        let selector =
            Selector::parse(&css).map_err(|e| format!("invalid selector `{}`: {}", css, e))?;

        Ok(Self {
            tag,
            filters,
            selector,
        })
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

#[cfg(test)]
impl TagStep {
    pub fn new(tag: &str) -> Self {
        Self::compile(tag, Vec::new()).unwrap()
    }

    pub fn with_filter(self, name: &str, value: &str) -> Self {
        let mut filters = self.filters;
        filters.push(AttrFilter {
            name: name.to_string(),
            value: value.to_string(),
        });
        Self::compile(self.tag, filters).unwrap()
    }
}

/// Letters, digits, `-` and `_`; no combinators or pseudo-classes
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn selector_css(tag: &str, filters: &[AttrFilter]) -> String {
    let mut plain = String::new();
    let mut classes = Vec::new();

    for filter in filters {
        if filter.name == "class" {
            classes.push(quote_css(&filter.value));
        } else {
            plain.push_str(&format!("[{}={}]", filter.name, quote_css(&filter.value)));
        }
    }

    if classes.is_empty() {
        return format!("{}{}", tag, plain);
    }

    let tokens: String = classes.iter().map(|c| format!("[class~={}]", c)).collect();
    let whole: String = classes.iter().map(|c| format!("[class={}]", c)).collect();
    format!("{tag}{plain}{tokens}, {tag}{plain}{whole}")
}

/// Double-quoted CSS string literal
fn quote_css(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            '\r' => out.push_str("\\d "),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for TagStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for filter in &self.filters {
            write!(f, " {}=\"{}\"", filter.name, filter.value)?;
        }
        write!(f, ">")
    }
}

/// What to produce from the node(s) the final step matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaf {
    /// Resolve the nested field specs against the matched node
    Nested,
    /// Take the node's text content
    Text,
    /// Take the named attribute's value
    Attribute(String),
}

impl Leaf {
    pub fn from_directive(directive: Option<&str>) -> Self {
        match directive {
            None => Self::Nested,
            Some(TEXT_DIRECTIVE) => Self::Text,
            Some(name) => Self::Attribute(name.to_string()),
        }
    }
}

/// Whether a field resolves to one node or a list of nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many(usize),
}

/// Declarative recipe for locating and extracting one named field
///
/// A spec with no steps is a plain nested mapping resolved against the
/// current node.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Narrowing steps, applied in order
    pub steps: Vec<TagStep>,

    /// Match limit on the final step; `None` selects the first match only
    pub limit: Option<usize>,

    /// Leaf directive of the final step
    pub leaf: Leaf,

    /// Nested fields, in schema order
    pub children: Vec<(String, FieldSpec)>,
}

impl FieldSpec {
    /// A spec resolving a single step to its text content
    pub fn text(step: TagStep) -> Self {
        Self {
            steps: vec![step],
            limit: None,
            leaf: Leaf::Text,
            children: Vec::new(),
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self.limit {
            Some(n) => Cardinality::Many(n),
            None => Cardinality::One,
        }
    }

    /// Output key for a field with this spec
    ///
    /// Repeated fields drop the leading "multiple " marker; single fields
    /// keep their name verbatim.
    pub fn output_key<'a>(&self, name: &'a str) -> &'a str {
        match self.cardinality() {
            Cardinality::Many(_) => name.strip_prefix(MULTIPLE_MARKER).unwrap_or(name),
            Cardinality::One => name,
        }
    }
}
