//! Tiered HTML extraction.
//!
//! Each field is described by a [`FieldSpec`]: an ordered list of
//! [`Strategy`] closures, most precise first. [`ExtractionPipeline::run`]
//! tries them in order and records which tier satisfied each field, so a
//! page whose markup drifted still yields data from the broader tiers.
//!
//! ## Tiers
//!
//! - [`Tier::Structural`]: exact element ids or classes
//! - [`Tier::Scoped`]: label/value rows or headings inside a known region
//! - [`Tier::PageRegex`]: regular expressions over the page text
//!
//! ```rust
//! use champwiki_core::extract::{ExtractionPipeline, FieldSpec, PageContext, Strategy, Tier};
//! use champwiki_core::key::EntityName;
//! use scraper::Html;
//!
//! let pipeline = ExtractionPipeline::new(vec![FieldSpec::new(
//!     "title",
//!     vec![Strategy::new(Tier::PageRegex, "first heading", |html: &Html, _ctx: &PageContext| {
//!         html.root_element().text().next().map(str::to_string)
//!     })],
//! )]);
//!
//! let html = Html::parse_document("<h1>Ahri</h1>");
//! let ctx = PageContext::new(EntityName::parse("Ahri")?);
//! let result = pipeline.run(&html, &ctx);
//! assert_eq!(result.get("title").map(String::as_str), Some("Ahri"));
//! assert_eq!(result.tier("title"), Some(Tier::PageRegex));
//! # Ok::<(), champwiki_core::Error>(())
//! ```

pub mod abilities;
pub mod numeric;
pub mod patches;
pub(crate) mod selectors;
pub mod stats;

use std::collections::BTreeMap;
use std::fmt;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::key::EntityName;

/// How precise the strategy that produced a value was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Exact element ids or classes.
    Structural,
    /// Label/value structure within a known region.
    Scoped,
    /// Pattern match over the whole page text.
    PageRegex,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structural => "structural",
            Self::Scoped => "scoped",
            Self::PageRegex => "page_regex",
        })
    }
}

/// Inputs strategies may consult besides the document.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Entity the page describes.
    pub entity: EntityName,
}

impl PageContext {
    /// Context for `entity`.
    #[must_use]
    pub const fn new(entity: EntityName) -> Self {
        Self { entity }
    }
}

type ExtractFn<V> = dyn Fn(&Html, &PageContext) -> Option<V> + Send + Sync;

/// One way of locating a field.
pub struct Strategy<V> {
    tier: Tier,
    label: &'static str,
    extract: Box<ExtractFn<V>>,
}

impl<V> Strategy<V> {
    /// Wrap a pure extraction function.
    pub fn new<F>(tier: Tier, label: &'static str, extract: F) -> Self
    where
        F: Fn(&Html, &PageContext) -> Option<V> + Send + Sync + 'static,
    {
        Self {
            tier,
            label,
            extract: Box::new(extract),
        }
    }

    /// Tier this strategy belongs to.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }
}

impl<V> fmt::Debug for Strategy<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("tier", &self.tier)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A named field and its strategies, most precise first.
#[derive(Debug)]
pub struct FieldSpec<V> {
    name: String,
    strategies: Vec<Strategy<V>>,
}

impl<V> FieldSpec<V> {
    /// Describe field `name`.
    pub fn new(name: impl Into<String>, strategies: Vec<Strategy<V>>) -> Self {
        Self {
            name: name.into(),
            strategies,
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What happened to one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome<V> {
    /// Extracted value, if any strategy matched.
    pub value: Option<V>,
    /// Tier of the strategy that matched.
    pub tier: Option<Tier>,
}

impl<V> FieldOutcome<V> {
    /// Whether a value was found.
    #[must_use]
    pub const fn found(&self) -> bool {
        self.value.is_some()
    }
}

/// Outcome of every requested field; never partially populated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult<V> {
    fields: BTreeMap<String, FieldOutcome<V>>,
}

impl<V> ExtractionResult<V> {
    /// Value for `field`, if found.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&V> {
        self.fields.get(field).and_then(|o| o.value.as_ref())
    }

    /// Tier that satisfied `field`.
    #[must_use]
    pub fn tier(&self, field: &str) -> Option<Tier> {
        self.fields.get(field).and_then(|o| o.tier)
    }

    /// Outcome for `field`, `None` if it was never requested.
    #[must_use]
    pub fn outcome(&self, field: &str) -> Option<&FieldOutcome<V>> {
        self.fields.get(field)
    }

    /// Requested fields without a value, in name order.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, o)| !o.found())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of fields with a value.
    #[must_use]
    pub fn found_count(&self) -> usize {
        self.fields.values().filter(|o| o.found()).count()
    }

    /// Number of requested fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields were requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over every field outcome.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldOutcome<V>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Ordered field specs applied to a parsed document.
#[derive(Debug)]
pub struct ExtractionPipeline<V> {
    fields: Vec<FieldSpec<V>>,
}

impl<V> ExtractionPipeline<V> {
    /// Pipeline over `fields`.
    #[must_use]
    pub const fn new(fields: Vec<FieldSpec<V>>) -> Self {
        Self { fields }
    }

    /// Field specs in evaluation order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec<V>] {
        &self.fields
    }

    /// Run every field's strategies against `html`.
    ///
    /// The first strategy returning `Some` wins. The result contains an
    /// entry for every field, found or not.
    pub fn run(&self, html: &Html, ctx: &PageContext) -> ExtractionResult<V> {
        let mut fields = BTreeMap::new();
        for spec in &self.fields {
            let hit = spec
                .strategies
                .iter()
                .find_map(|s| (s.extract)(html, ctx).map(|v| (v, s.tier, s.label)));

            let outcome = match hit {
                Some((value, tier, label)) => {
                    if tier != Tier::Structural {
                        debug!(entity = %ctx.entity, field = %spec.name, %tier, label, "field found by fallback tier");
                    }
                    FieldOutcome {
                        value: Some(value),
                        tier: Some(tier),
                    }
                },
                None => {
                    debug!(entity = %ctx.entity, field = %spec.name, "no strategy matched");
                    FieldOutcome {
                        value: None,
                        tier: None,
                    }
                },
            };
            fields.insert(spec.name.clone(), outcome);
        }
        ExtractionResult { fields }
    }
}

/// Visible text of `element` with whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Page text, one line per block of text nodes, whitespace collapsed per line.
pub(crate) fn page_lines(html: &Html) -> Vec<String> {
    html.root_element()
        .text()
        .flat_map(str::lines)
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Whole page text on one line.
pub(crate) fn page_text(html: &Html) -> String {
    page_lines(html).join(" ")
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First element with the exact `id`; ids are compared verbatim so titles
/// containing quotes or dots need no CSS escaping.
pub(crate) fn element_by_id<'a>(html: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    html.select(&selectors::ANY_ID).find(|el| el.value().id() == Some(id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ctx() -> PageContext {
        PageContext::new(EntityName::parse("Ahri").unwrap())
    }

    fn pipeline() -> ExtractionPipeline<String> {
        ExtractionPipeline::new(vec![
            FieldSpec::new(
                "name",
                vec![
                    Strategy::new(Tier::Structural, "#name", |html: &Html, _: &PageContext| {
                        element_by_id(html, "name").map(element_text)
                    }),
                    Strategy::new(Tier::PageRegex, "first line", |html: &Html, _: &PageContext| {
                        page_lines(html).into_iter().next()
                    }),
                ],
            ),
            FieldSpec::new(
                "never",
                vec![Strategy::new(Tier::Scoped, "nothing", |_: &Html, _: &PageContext| None)],
            ),
        ])
    }

    #[test]
    fn test_first_matching_tier_wins() {
        let html = Html::parse_document(r#"<p>intro</p><span id="name"> Ahri </span>"#);
        let result = pipeline().run(&html, &ctx());
        assert_eq!(result.get("name").unwrap(), "Ahri");
        assert_eq!(result.tier("name"), Some(Tier::Structural));
    }

    #[test]
    fn test_falls_through_to_broader_tier() {
        let html = Html::parse_document("<p>intro line</p><p>other</p>");
        let result = pipeline().run(&html, &ctx());
        assert_eq!(result.get("name").unwrap(), "intro line");
        assert_eq!(result.tier("name"), Some(Tier::PageRegex));
    }

    #[test]
    fn test_result_lists_every_field() {
        let html = Html::parse_document("");
        let result = pipeline().run(&html, &ctx());
        assert_eq!(result.len(), 2);
        assert_eq!(result.found_count(), 0);
        assert_eq!(result.missing(), vec!["name".to_string(), "never".to_string()]);
        assert!(!result.outcome("never").unwrap().found());
        assert!(result.outcome("unknown").is_none());
    }

    #[test]
    fn test_whitespace_helpers() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        let html = Html::parse_document("<div>one\n two</div><div>  </div><div>three</div>");
        assert_eq!(page_lines(&html), vec!["one", "two", "three"]);
        assert_eq!(page_text(&html), "one two three");
    }
}
