//! Patch history normalization.

use crate::extract::ExtractionResult;
use crate::extract::patches::{FIELD, RawPatch};
use crate::extract::selectors::CANONICAL_VERSION;
use crate::key::EntityName;
use crate::types::{PatchHistory, PatchRecord};

use super::Transformed;

/// `V14.1` becomes `14.1`, `v13.24B` becomes `13.24b`.
///
/// Returns `None` when the result is not `<major>.<minor>[letter]`.
#[must_use]
pub fn canonical_version(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let bare = trimmed
        .strip_prefix(['v', 'V'])
        .unwrap_or(trimmed)
        .to_ascii_lowercase();
    CANONICAL_VERSION.is_match(&bare).then_some(bare)
}

/// Build a [`PatchHistory`], merging repeated versions in page order.
#[must_use]
pub fn transform(entity: &EntityName, result: &ExtractionResult<Vec<RawPatch>>) -> Transformed<PatchHistory> {
    let mut issues = Vec::new();
    let mut patches: Vec<PatchRecord> = Vec::new();

    for raw in result.get(FIELD).into_iter().flatten() {
        let Some(version) = canonical_version(&raw.version) else {
            issues.push(format!("patches: unrecognized version {:?}", raw.version));
            continue;
        };
        let changes = raw
            .changes
            .iter()
            .map(|change| change.trim())
            .filter(|change| !change.is_empty())
            .map(str::to_string);

        match patches.iter_mut().find(|p| p.version == version) {
            Some(existing) => existing.changes.extend(changes),
            None => patches.push(PatchRecord {
                version,
                changes: changes.collect(),
            }),
        }
    }

    let record = PatchHistory {
        champion: entity.title().to_string(),
        patches,
    };
    let missing = record.missing_mandatory();
    Transformed {
        record,
        issues,
        missing,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::extract::{PageContext, patches};
    use scraper::Html;

    fn run(html: &str) -> Transformed<PatchHistory> {
        let entity = EntityName::parse("Ahri").unwrap();
        let ctx = PageContext::new(entity.clone());
        transform(&entity, &patches::pipeline().run(&Html::parse_document(html), &ctx))
    }

    #[test]
    fn test_canonical_version() {
        assert_eq!(canonical_version("V14.1").as_deref(), Some("14.1"));
        assert_eq!(canonical_version(" v13.24B ").as_deref(), Some("13.24b"));
        assert_eq!(canonical_version("14.1").as_deref(), Some("14.1"));
        assert!(canonical_version("Patch 14").is_none());
        assert!(canonical_version("V14.1.2").is_none());
    }

    #[test]
    fn test_history_is_normalized() {
        let out = run(
            "<dl><dt>V14.1</dt><dd><ul><li> Armor increased. </li><li> </li></ul></dd></dl>\
             <dl><dt>V13.24b</dt><dd>Charm duration increased.</dd></dl>",
        );
        assert!(out.is_complete());
        assert_eq!(out.record.patches.len(), 2);
        assert_eq!(out.record.patches[0].version, "14.1");
        assert_eq!(out.record.patches[0].changes, vec!["Armor increased."]);
        assert_eq!(out.record.patches[1].version, "13.24b");
    }

    #[test]
    fn test_empty_history_is_missing() {
        let out = run("<p>This champion has not been changed.</p>");
        assert_eq!(out.missing, vec!["patches"]);
        assert!(out.record.patches.is_empty());
    }
}
