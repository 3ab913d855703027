//! Element matching for tag steps
//!
//! Every step carries a compiled selector; matching is `scraper`'s `select`
//! on the document or on an element, in document order.

use crate::schema::TagStep;
use scraper::{ElementRef, Html};

/// The node a step searches beneath
///
/// A document scope also considers the root element itself, so a step can
/// select `<html>`. An element scope only searches strict descendants.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Document(&'a Html),
    Element(ElementRef<'a>),
}

impl<'a> Scope<'a> {
    pub fn document(html: &'a Html) -> Self {
        Self::Document(html)
    }

    pub fn element(element: ElementRef<'a>) -> Self {
        Self::Element(element)
    }
}

/// Returns the first element in the scope matching the step
pub fn find_first<'a>(scope: Scope<'a>, step: &TagStep) -> Option<ElementRef<'a>> {
    find_matches(scope, step, 1).into_iter().next()
}

/// Returns up to `limit` elements in the scope matching the step
pub fn find_matches<'a>(scope: Scope<'a>, step: &TagStep, limit: usize) -> Vec<ElementRef<'a>> {
    match scope {
        Scope::Document(html) => html.select(step.selector()).take(limit).collect(),
        Scope::Element(element) => element.select(step.selector()).take(limit).collect(),
    }
}

/// Text content of an element, whitespace-trimmed
pub fn text_content(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
