use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;

use super::{Category, Seed};
use crate::extract::patches::RawPatch;
use crate::extract::{ExtractionPipeline, PageContext, patches as fields};
use crate::key::{EntityName, PageKind};
use crate::transform::{Transformed, patches};
use crate::types::PatchHistory;

/// Patch history from the champion's history sub-page.
pub struct PatchesCategory {
    pipeline: ExtractionPipeline<Vec<RawPatch>>,
    seed: Arc<Seed>,
}

impl std::fmt::Debug for PatchesCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchesCategory").finish_non_exhaustive()
    }
}

impl PatchesCategory {
    /// Patch history backed by `seed`.
    #[must_use]
    pub fn new(seed: Arc<Seed>) -> Self {
        Self {
            pipeline: fields::pipeline(),
            seed,
        }
    }
}

#[async_trait]
impl Category for PatchesCategory {
    type Record = PatchHistory;

    const NAME: &'static str = "patches";

    fn page(&self) -> PageKind {
        PageKind::PatchHistory
    }

    fn parse(&self, entity: &EntityName, html: &str) -> Transformed<PatchHistory> {
        let document = Html::parse_document(html);
        let result = self.pipeline.run(&document, &PageContext::new(entity.clone()));
        patches::transform(entity, &result)
    }

    fn has_content(record: &PatchHistory) -> bool {
        !record.patches.is_empty()
    }

    fn missing(record: &PatchHistory) -> Vec<String> {
        record.missing_mandatory()
    }

    fn seed(&self, entity: &EntityName) -> Option<PatchHistory> {
        self.seed.patches(entity)
    }

    fn page_title(&self, entity: &EntityName) -> Option<&str> {
        self.seed.title(entity)
    }
}
