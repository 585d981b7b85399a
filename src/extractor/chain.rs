//! Ordered selector lists evaluated until the first qualifying element.

use scraper::{ElementRef, Html, Selector};
use tracing::trace;

/// One selector in a chain, kept together with its source text for logging.
#[derive(Debug, Clone)]
pub struct ChainStep {
    pub source: String,
    pub selector: Selector,
}

/// An ordered list of selectors for one field.
///
/// Steps are tried in order; within a step, matched elements are visited in
/// document order. The first element accepted by the caller's predicate wins,
/// even when a later selector would also match.
#[derive(Debug, Clone)]
pub struct ExtractionChain {
    field: &'static str,
    steps: Vec<ChainStep>,
}

impl ExtractionChain {
    /// Parse every selector, failing on the first invalid one.
    pub fn parse<S: AsRef<str>>(field: &'static str, selectors: &[S]) -> Result<Self, String> {
        let steps = selectors
            .iter()
            .map(|s| {
                let source = s.as_ref();
                Selector::parse(source)
                    .map(|selector| ChainStep {
                        source: source.to_string(),
                        selector,
                    })
                    .map_err(|e| format!("invalid {field} selector {source:?}: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { field, steps })
    }

    /// Run the chain, returning the first value `qualify` accepts.
    pub fn first<'a, T>(
        &self,
        doc: &'a Html,
        mut qualify: impl FnMut(ElementRef<'a>) -> Option<T>,
    ) -> Option<T> {
        for step in &self.steps {
            for element in doc.select(&step.selector) {
                if let Some(value) = qualify(element) {
                    trace!(field = self.field, selector = %step.source, "Chain matched");
                    return Some(value);
                }
            }
        }
        None
    }
}

/// Concatenated, trimmed text of an element and its descendants.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
