//! Field set for champion base stats.

use std::collections::BTreeMap;

use scraper::Html;

use super::numeric::{RawStat, decode_stat, parse_number};
use super::selectors::{INFOBOX_LABEL, INFOBOX_ROW, INFOBOX_VALUE, LEVEL_ROW, STAT_CELL, STAT_TEXT};
use super::{
    ExtractionPipeline, FieldSpec, PageContext, Strategy, Tier, collapse_whitespace, element_by_id,
    element_text, page_text,
};
use crate::types::StatKind;

/// Id prefix of the infobox span holding a stat (`<prefix>_<Title>`).
const fn id_prefix(kind: StatKind) -> &'static str {
    match kind {
        StatKind::Health => "Health",
        StatKind::HealthRegen => "HealthRegen",
        StatKind::Mana => "ResourceBar",
        StatKind::ManaRegen => "ResourceRegen",
        StatKind::Armor => "Armor",
        StatKind::MagicResist => "MagicResist",
        StatKind::AttackDamage => "AttackDamage",
        StatKind::AttackSpeed => "AttackSpeed",
        StatKind::AttackRange => "AttackRange",
        StatKind::MovementSpeed => "MovementSpeed",
    }
}

/// Row labels that name a stat, lower-case.
const fn labels(kind: StatKind) -> &'static [&'static str] {
    match kind {
        StatKind::Health => &["health", "hp"],
        StatKind::HealthRegen => &["health regen", "health regeneration", "hp5", "hp regen"],
        StatKind::Mana => &["mana", "resource"],
        StatKind::ManaRegen => &["mana regen", "mana regeneration", "mp5", "resource regen"],
        StatKind::Armor => &["armor", "armour"],
        StatKind::MagicResist => &["magic resist", "magic resistance", "mr"],
        StatKind::AttackDamage => &["attack damage", "ad"],
        StatKind::AttackSpeed => &["attack speed", "base as", "as"],
        StatKind::AttackRange => &["attack range", "range"],
        StatKind::MovementSpeed => &["move speed", "movement speed", "ms"],
    }
}

fn label_matches(kind: StatKind, label: &str) -> bool {
    let normalized: String = label
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let normalized = collapse_whitespace(&normalized);
    labels(kind).contains(&normalized.as_str())
}

/// Tier 1: `#Health_Ahri` holds the base, `#Health_Ahri_lvl` the growth.
fn by_element_id(html: &Html, ctx: &PageContext, kind: StatKind) -> Option<RawStat> {
    let id = format!("{}_{}", id_prefix(kind), ctx.entity.title());
    let base = decode_stat(&element_text(element_by_id(html, &id)?))?;
    let growth = element_by_id(html, &format!("{id}_lvl"))
        .and_then(|el| decode_stat(&element_text(el)))
        .unwrap_or_default();
    Some(base.with_growth_from(growth))
}

/// Tier 2: infobox label/value rows.
fn by_infobox_row(html: &Html, kind: StatKind) -> Option<RawStat> {
    html.select(&INFOBOX_ROW).find_map(|row| {
        let label = row.select(&INFOBOX_LABEL).next()?;
        if !label_matches(kind, &element_text(label)) {
            return None;
        }
        decode_stat(&element_text(row.select(&INFOBOX_VALUE).next()?))
    })
}

/// Tier 3: `Label: value` anywhere in the page text.
fn by_page_text(html: &Html, kind: StatKind) -> Option<RawStat> {
    let text = page_text(html);
    STAT_TEXT.captures_iter(&text).find_map(|caps| {
        let label = caps.get(1)?.as_str();
        if !label_matches(kind, label) {
            return None;
        }
        decode_stat(caps.get(2)?.as_str())
    })
}

/// Pipeline with one field per [`StatKind`], named by [`StatKind::as_str`].
#[must_use]
pub fn pipeline() -> ExtractionPipeline<RawStat> {
    let fields = StatKind::ALL
        .into_iter()
        .map(|kind| {
            FieldSpec::new(
                kind.as_str(),
                vec![
                    Strategy::new(Tier::Structural, "infobox span id", move |html: &Html, ctx: &PageContext| {
                        by_element_id(html, ctx, kind)
                    }),
                    Strategy::new(Tier::Scoped, "infobox data row", move |html: &Html, _: &PageContext| {
                        by_infobox_row(html, kind)
                    }),
                    Strategy::new(Tier::PageRegex, "labelled value in text", move |html: &Html, _: &PageContext| {
                        by_page_text(html, kind)
                    }),
                ],
            )
        })
        .collect();
    ExtractionPipeline::new(fields)
}

/// Whether the static page carries a per-level table for `level`.
#[must_use]
pub fn has_level_row(html: &Html, level: u8) -> bool {
    let wanted = level.to_string();
    html.select(&LEVEL_ROW)
        .any(|row| row.value().attr("data-level") == Some(wanted.as_str()))
}

/// Values in the static per-level table row for `level`.
///
/// Rows look like `<tr data-level="6"><td data-stat="health">1150</td>…</tr>`.
#[must_use]
pub fn level_row(html: &Html, level: u8) -> Option<BTreeMap<StatKind, f64>> {
    let wanted = level.to_string();
    let row = html
        .select(&LEVEL_ROW)
        .find(|row| row.value().attr("data-level") == Some(wanted.as_str()))?;
    let values: BTreeMap<_, _> = row
        .select(&STAT_CELL)
        .filter_map(|cell| {
            let kind = StatKind::from_name(cell.value().attr("data-stat")?)?;
            Some((kind, parse_number(&element_text(cell))?))
        })
        .collect();
    (!values.is_empty()).then_some(values)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::key::EntityName;

    fn run(html: &str) -> super::super::ExtractionResult<RawStat> {
        let ctx = PageContext::new(EntityName::parse("Ahri").unwrap());
        pipeline().run(&Html::parse_document(html), &ctx)
    }

    #[test]
    fn test_structural_ids() {
        let result = run(r#"
            <div class="infobox">
              <span id="Health_Ahri">590</span><span id="Health_Ahri_lvl">+104</span>
              <span id="AttackSpeed_Ahri">0.668</span><span id="AttackSpeed_Ahri_lvl">+2.2%</span>
            </div>"#);
        let health = result.get("health").unwrap();
        assert_eq!((health.base, health.growth), (Some(590.0), Some(104.0)));
        assert_eq!(result.tier("health"), Some(Tier::Structural));
        let attack_speed = result.get("attack_speed").unwrap();
        assert!(attack_speed.growth_percent);
        assert!(result.get("armor").is_none());
    }

    #[test]
    fn test_infobox_rows_when_ids_drift() {
        let result = run(r#"
            <div class="infobox-data-row">
              <div class="infobox-data-label">Armor</div>
              <div class="infobox-data-value">21 (+4.2)</div>
            </div>
            <div class="infobox-data-row">
              <div class="infobox-data-label">Magic Resist.</div>
              <div class="infobox-data-value">30 (+1.3)</div>
            </div>"#);
        assert_eq!(result.get("armor").unwrap().base, Some(21.0));
        assert_eq!(result.tier("armor"), Some(Tier::Scoped));
        assert_eq!(result.get("magic_resist").unwrap().growth, Some(1.3));
    }

    #[test]
    fn test_page_text_as_last_resort() {
        let result = run(
            "<p>Health: 590 (+104)</p><p>Health regen: 2.5 (+0.6)</p><p>Move speed: 330</p>",
        );
        assert_eq!(result.get("health").unwrap().base, Some(590.0));
        assert_eq!(result.get("health_regen").unwrap().base, Some(2.5));
        assert_eq!(result.tier("movement_speed"), Some(Tier::PageRegex));
        assert_eq!(result.get("movement_speed").unwrap().base, Some(330.0));
    }

    #[test]
    fn test_short_labels_do_not_match_inside_words() {
        assert!(label_matches(StatKind::MagicResist, "MR"));
        assert!(!label_matches(StatKind::Health, "health regen"));
        assert!(label_matches(StatKind::HealthRegen, "Health  Regen:"));
    }

    #[test]
    fn test_level_table() {
        let html = Html::parse_document(
            r#"<table><tr data-level="1"><td data-stat="health">590</td></tr>
               <tr data-level="6"><td data-stat="health">1,150.5</td><td data-stat="armor">41</td>
               <td data-stat="bogus">1</td></tr></table>"#,
        );
        assert!(has_level_row(&html, 6));
        assert!(!has_level_row(&html, 7));
        let row = level_row(&html, 6).unwrap();
        assert_eq!(row[&StatKind::Health], 1150.5);
        assert_eq!(row[&StatKind::Armor], 41.0);
        assert_eq!(row.len(), 2);
    }
}
