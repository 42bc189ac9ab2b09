use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;

use super::{Category, Seed};
use crate::extract::{ExtractionPipeline, PageContext, abilities as fields};
use crate::key::{EntityName, PageKind};
use crate::transform::{Transformed, abilities};
use crate::types::AbilitySet;

/// The five abilities from the overview page.
pub struct AbilitiesCategory {
    pipeline: ExtractionPipeline<String>,
    seed: Arc<Seed>,
}

impl std::fmt::Debug for AbilitiesCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbilitiesCategory").finish_non_exhaustive()
    }
}

impl AbilitiesCategory {
    /// Abilities backed by `seed`.
    #[must_use]
    pub fn new(seed: Arc<Seed>) -> Self {
        Self {
            pipeline: fields::pipeline(),
            seed,
        }
    }
}

#[async_trait]
impl Category for AbilitiesCategory {
    type Record = AbilitySet;

    const NAME: &'static str = "abilities";

    fn page(&self) -> PageKind {
        PageKind::Overview
    }

    fn parse(&self, entity: &EntityName, html: &str) -> Transformed<AbilitySet> {
        let document = Html::parse_document(html);
        let result = self.pipeline.run(&document, &PageContext::new(entity.clone()));
        abilities::transform(entity, &result)
    }

    fn has_content(record: &AbilitySet) -> bool {
        record.abilities.iter().any(|a| a.name.is_some())
    }

    fn missing(record: &AbilitySet) -> Vec<String> {
        record.missing_mandatory()
    }

    fn seed(&self, entity: &EntityName) -> Option<AbilitySet> {
        self.seed.abilities(entity)
    }

    fn page_title(&self, entity: &EntityName) -> Option<&str> {
        self.seed.title(entity)
    }
}
