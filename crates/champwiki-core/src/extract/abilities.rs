//! Field set for the five ability slots.
//!
//! Fields are named `<slot>.<part>`, e.g. `q.name` or `r.cooldown`; values
//! are the raw text, decoded later by the transformer.

use scraper::{ElementRef, Html, Selector};

use super::selectors::{
    ABILITY_COOLDOWN, ABILITY_COST, ABILITY_DESCRIPTION, ABILITY_HEADING, ABILITY_NAME,
    COOLDOWN_LINE, COST_LINE, SECTION_HEADING,
};
use super::{ExtractionPipeline, FieldSpec, PageContext, Strategy, Tier, element_text, page_lines};
use crate::types::AbilitySlot;

/// The text parts read for each slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityPart {
    /// Ability name.
    Name,
    /// Tooltip text.
    Description,
    /// Per-rank cooldown text.
    Cooldown,
    /// Per-rank cost text.
    Cost,
}

impl AbilityPart {
    /// Every part, name first.
    pub const ALL: [Self; 4] = [Self::Name, Self::Description, Self::Cooldown, Self::Cost];

    /// Field suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Cooldown => "cooldown",
            Self::Cost => "cost",
        }
    }
}

/// Field name for `slot`'s `part`.
#[must_use]
pub fn field_name(slot: AbilitySlot, part: AbilityPart) -> String {
    format!("{}.{}", slot.as_str(), part.as_str())
}

/// Class suffix of a slot's container, `skill_<key>`.
const fn container_key(slot: AbilitySlot) -> &'static str {
    match slot {
        AbilitySlot::Passive => "innate",
        AbilitySlot::Q => "q",
        AbilitySlot::W => "w",
        AbilitySlot::E => "e",
        AbilitySlot::R => "r",
    }
}

fn part_selector(part: AbilityPart) -> &'static Selector {
    match part {
        AbilityPart::Name => &*ABILITY_NAME,
        AbilityPart::Description => &*ABILITY_DESCRIPTION,
        AbilityPart::Cooldown => &*ABILITY_COOLDOWN,
        AbilityPart::Cost => &*ABILITY_COST,
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn heading_slot(text: &str) -> Option<(AbilitySlot, String)> {
    let caps = ABILITY_HEADING.captures(text)?;
    let slot = match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "passive" | "innate" => AbilitySlot::Passive,
        "q" => AbilitySlot::Q,
        "w" => AbilitySlot::W,
        "e" => AbilitySlot::E,
        "r" => AbilitySlot::R,
        _ => return None,
    };
    Some((slot, caps.get(2)?.as_str().trim().to_string()))
}

/// Tier 1: `.skill_<key>` container with classed children.
fn by_container(html: &Html, slot: AbilitySlot, part: AbilityPart) -> Option<String> {
    let class = container_key(slot);
    html.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().classes().any(|c| c.strip_prefix("skill_") == Some(class)))
        .find_map(|container| {
            container
                .select(part_selector(part))
                .next()
                .and_then(|el| non_empty(element_text(el)))
        })
}

/// Tier 2: a `Q - Name` heading followed by paragraphs.
fn by_heading(html: &Html, slot: AbilitySlot, part: AbilityPart) -> Option<String> {
    let (heading, name) = html.select(&SECTION_HEADING).find_map(|h| {
        let (found, name) = heading_slot(&element_text(h))?;
        (found == slot).then_some((h, name))
    })?;
    if part == AbilityPart::Name {
        return non_empty(name);
    }

    let section: Vec<String> = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| !matches!(el.value().name(), "h1" | "h2" | "h3" | "h4"))
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();

    match part {
        AbilityPart::Description => section
            .iter()
            .find(|line| !COOLDOWN_LINE.is_match(line) && !COST_LINE.is_match(line))
            .cloned(),
        AbilityPart::Cooldown => section
            .iter()
            .find_map(|line| COOLDOWN_LINE.captures(line)?.get(1).map(|m| m.as_str().to_string())),
        AbilityPart::Cost => section
            .iter()
            .find_map(|line| COST_LINE.captures(line)?.get(1).map(|m| m.as_str().to_string())),
        AbilityPart::Name => None,
    }
}

/// Tier 3: `Q: Name` lines anywhere in the page text. Names only.
fn by_text_line(html: &Html, slot: AbilitySlot) -> Option<String> {
    page_lines(html).into_iter().find_map(|line| {
        let (found, name) = heading_slot(&line)?;
        (found == slot).then_some(name).and_then(non_empty)
    })
}

/// Pipeline with four fields per slot.
#[must_use]
pub fn pipeline() -> ExtractionPipeline<String> {
    let mut fields = Vec::with_capacity(AbilitySlot::ALL.len() * AbilityPart::ALL.len());
    for slot in AbilitySlot::ALL {
        for part in AbilityPart::ALL {
            let mut strategies = vec![
                Strategy::new(Tier::Structural, "skill container", move |html: &Html, _: &PageContext| {
                    by_container(html, slot, part)
                }),
                Strategy::new(Tier::Scoped, "slot heading section", move |html: &Html, _: &PageContext| {
                    by_heading(html, slot, part)
                }),
            ];
            if part == AbilityPart::Name {
                strategies.push(Strategy::new(
                    Tier::PageRegex,
                    "slot line in text",
                    move |html: &Html, _: &PageContext| by_text_line(html, slot),
                ));
            }
            fields.push(FieldSpec::new(field_name(slot, part), strategies));
        }
    }
    ExtractionPipeline::new(fields)
}
