//! Ability set assembly.

use crate::extract::ExtractionResult;
use crate::extract::abilities::{AbilityPart, field_name};
use crate::extract::numeric::decode_series;
use crate::key::EntityName;
use crate::types::{AbilityRecord, AbilitySet, AbilitySlot};

use super::Transformed;

/// Longest cooldown accepted, in seconds.
pub const MAX_COOLDOWN_SECS: f64 = 600.0;

fn text(result: &ExtractionResult<String>, slot: AbilitySlot, part: AbilityPart) -> Option<String> {
    let value = result.get(&field_name(slot, part))?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn cooldowns(slot: AbilitySlot, raw: Option<String>, issues: &mut Vec<String>) -> Vec<f64> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match decode_series(&raw) {
        Some(values) if values.iter().all(|v| (0.0..=MAX_COOLDOWN_SECS).contains(v)) => values,
        Some(_) => {
            issues.push(format!("{slot}.cooldown: value out of range in {raw:?}"));
            Vec::new()
        },
        None => {
            issues.push(format!("{slot}.cooldown: unreadable {raw:?}"));
            Vec::new()
        },
    }
}

/// Build an [`AbilitySet`] with one record per slot.
///
/// Costs such as `No cost` decode to an empty list without an issue.
#[must_use]
pub fn transform(entity: &EntityName, result: &ExtractionResult<String>) -> Transformed<AbilitySet> {
    let mut issues = Vec::new();
    let abilities = AbilitySlot::ALL
        .into_iter()
        .map(|slot| AbilityRecord {
            slot,
            name: text(result, slot, AbilityPart::Name),
            description: text(result, slot, AbilityPart::Description),
            cooldowns: cooldowns(slot, text(result, slot, AbilityPart::Cooldown), &mut issues),
            costs: text(result, slot, AbilityPart::Cost)
                .and_then(|raw| decode_series(&raw))
                .unwrap_or_default(),
        })
        .collect();

    let record = AbilitySet {
        champion: entity.title().to_string(),
        abilities,
    };
    let missing = record.missing_mandatory();
    Transformed {
        record,
        issues,
        missing,
    }
}
