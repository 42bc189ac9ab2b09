//! Stat validation and per-level values.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::extract::ExtractionResult;
use crate::extract::numeric::RawStat;
use crate::key::EntityName;
use crate::types::{LevelSnapshot, LevelSource, StatKind, StatRecord, StatValue};

use super::Transformed;

/// Plausible level-1 values.
const fn base_range(kind: StatKind) -> RangeInclusive<f64> {
    match kind {
        StatKind::Health | StatKind::Mana => 0.0..=100_000.0,
        StatKind::HealthRegen | StatKind::ManaRegen => 0.0..=1_000.0,
        StatKind::Armor | StatKind::MagicResist => 0.0..=1_000.0,
        StatKind::AttackDamage => 0.0..=10_000.0,
        StatKind::AttackSpeed => 0.0..=5.0,
        StatKind::AttackRange | StatKind::MovementSpeed => 0.0..=10_000.0,
    }
}

/// Plausible per-level growth; percentages for attack speed.
const fn growth_range(kind: StatKind) -> RangeInclusive<f64> {
    match kind {
        StatKind::Health | StatKind::Mana | StatKind::AttackDamage => 0.0..=1_000.0,
        _ => 0.0..=100.0,
    }
}

fn validate(kind: StatKind, raw: RawStat, issues: &mut Vec<String>) -> Option<StatValue> {
    let Some(base) = raw.base else {
        issues.push(format!("{kind}: growth without a base value"));
        return None;
    };
    if !base_range(kind).contains(&base) {
        issues.push(format!("{kind}: base {base} out of range"));
        return None;
    }

    let percent = kind.grows_by_percent();
    let growth = match raw.growth {
        Some(growth) if raw.growth_percent && !percent => {
            issues.push(format!("{kind}: unexpected percentage growth {growth}%"));
            None
        },
        Some(growth) if !growth_range(kind).contains(&growth) => {
            issues.push(format!("{kind}: growth {growth} out of range"));
            None
        },
        other => other,
    };

    Some(StatValue {
        base,
        growth,
        growth_percent: percent && growth.is_some(),
    })
}

/// Build a [`StatRecord`] from extracted stats.
#[must_use]
pub fn transform(entity: &EntityName, result: &ExtractionResult<RawStat>) -> Transformed<StatRecord> {
    let mut issues = Vec::new();
    let stats: BTreeMap<_, _> = StatKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let raw = *result.get(kind.as_str())?;
            validate(kind, raw, &mut issues).map(|value| (kind, value))
        })
        .collect();

    let record = StatRecord {
        champion: entity.title().to_string(),
        stats,
        level: None,
    };
    let missing = record.missing_mandatory();
    Transformed {
        record,
        issues,
        missing,
    }
}

/// Level values read from a page showing the selected level.
///
/// Only base components are used; growth text is ignored.
#[must_use]
pub fn displayed_level(result: &ExtractionResult<RawStat>, level: u8, source: LevelSource) -> LevelSnapshot {
    let values = StatKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let base = result.get(kind.as_str())?.base?;
            base_range(kind).contains(&base).then_some((kind, base))
        })
        .collect();
    LevelSnapshot {
        level,
        source,
        values,
    }
}

/// Level values derived from base and growth.
#[must_use]
pub fn computed_level(record: &StatRecord, level: u8) -> LevelSnapshot {
    LevelSnapshot {
        level,
        source: LevelSource::Computed,
        values: record
            .stats
            .iter()
            .map(|(kind, value)| (*kind, value.at_level(level)))
            .collect(),
    }
}
