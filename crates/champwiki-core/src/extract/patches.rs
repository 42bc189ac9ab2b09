//! Field set for the patch history page.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use super::selectors::{
    DEFINITION_DESC, DEFINITION_LIST, DEFINITION_TERM, LIST_ITEM, SECTION_HEADING, VERSION,
    VERSION_LINE,
};
use super::{ExtractionPipeline, FieldSpec, PageContext, Strategy, Tier, element_text, page_lines};

/// Name of the single field this pipeline produces.
pub const FIELD: &str = "patches";

/// One patch entry as read from the page, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPatch {
    /// Version text as written, e.g. `V14.1`.
    pub version: String,
    /// Change notes as written.
    pub changes: Vec<String>,
}

fn list_items(list: ElementRef<'_>) -> Vec<String> {
    list.select(&LIST_ITEM).map(element_text).collect()
}

/// First `ul`/`ol` among the following siblings, stopping at the next entry.
fn following_list(start: ElementRef<'_>, stop: &[&str]) -> Vec<String> {
    start
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| !stop.contains(&el.value().name()))
        .find(|el| matches!(el.value().name(), "ul" | "ol"))
        .map(list_items)
        .unwrap_or_default()
}

fn non_empty(patches: Vec<RawPatch>) -> Option<Vec<RawPatch>> {
    (!patches.is_empty()).then_some(patches)
}

/// Tier 1: `<dl><dt>V14.1</dt></dl>` followed by a change list, or `dd` items.
fn by_definition_lists(html: &Html, _: &PageContext) -> Option<Vec<RawPatch>> {
    let patches = html
        .select(&DEFINITION_LIST)
        .filter_map(|dl| {
            let version = element_text(dl.select(&DEFINITION_TERM).next()?);
            if !VERSION.is_match(&version) {
                return None;
            }
            let mut changes: Vec<String> = dl
                .select(&DEFINITION_DESC)
                .flat_map(|dd| {
                    let items = list_items(dd);
                    if items.is_empty() { vec![element_text(dd)] } else { items }
                })
                .collect();
            if changes.is_empty() {
                changes = following_list(dl, &["dl", "h2", "h3"]);
            }
            Some(RawPatch { version, changes })
        })
        .collect();
    non_empty(patches)
}

/// Tier 2: version headings followed by a change list.
fn by_headings(html: &Html, _: &PageContext) -> Option<Vec<RawPatch>> {
    let patches = html
        .select(&SECTION_HEADING)
        .filter_map(|heading| {
            let version = element_text(heading);
            VERSION.is_match(&version).then(|| RawPatch {
                changes: following_list(heading, &["h2", "h3", "h4"]),
                version,
            })
        })
        .collect();
    non_empty(patches)
}

/// Tier 3: `V14.1: change` lines anywhere in the text, grouped by version.
fn by_text_lines(html: &Html, _: &PageContext) -> Option<Vec<RawPatch>> {
    let mut patches: Vec<RawPatch> = Vec::new();
    for line in page_lines(html) {
        let Some(caps) = VERSION_LINE.captures(&line) else {
            continue;
        };
        let (Some(version), Some(change)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        match patches.last_mut() {
            Some(last) if last.version == version.as_str() => {
                last.changes.push(change.as_str().to_string());
            },
            _ => patches.push(RawPatch {
                version: version.as_str().to_string(),
                changes: vec![change.as_str().to_string()],
            }),
        }
    }
    non_empty(patches)
}

/// Pipeline with the single list-valued [`FIELD`].
#[must_use]
pub fn pipeline() -> ExtractionPipeline<Vec<RawPatch>> {
    ExtractionPipeline::new(vec![FieldSpec::new(
        FIELD,
        vec![
            Strategy::new(Tier::Structural, "definition list entries", by_definition_lists),
            Strategy::new(Tier::Scoped, "version headings", by_headings),
            Strategy::new(Tier::PageRegex, "version lines in text", by_text_lines),
        ],
    )])
}
