use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use super::{Category, GetOptions, Seed};
use crate::config::RenderConfig;
use crate::extract::numeric::RawStat;
use crate::extract::{ExtractionPipeline, ExtractionResult, PageContext, stats as fields};
use crate::key::{EntityName, PageKind};
use crate::render::{DynamicRenderer, RenderRequest};
use crate::transform::{Transformed, stats};
use crate::types::{Confidence, LevelSnapshot, LevelSource, MIN_LEVEL, StatKind, StatRecord};

/// Base stats from the overview page, with per-level values on request.
///
/// Level values come from, in order: a per-level table in the static page,
/// the dynamic renderer, or the growth curve.
pub struct StatsCategory {
    pipeline: ExtractionPipeline<RawStat>,
    seed: Arc<Seed>,
    renderer: Option<Arc<dyn DynamicRenderer>>,
    render: RenderConfig,
}

impl std::fmt::Debug for StatsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCategory")
            .field("renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

impl StatsCategory {
    /// Stats over `seed`, rendering level tables with `renderer` when present.
    #[must_use]
    pub fn new(seed: Arc<Seed>, renderer: Option<Arc<dyn DynamicRenderer>>, render: RenderConfig) -> Self {
        Self {
            pipeline: fields::pipeline(),
            seed,
            renderer,
            render,
        }
    }

    fn extract(&self, entity: &EntityName, html: &str) -> ExtractionResult<RawStat> {
        let document = Html::parse_document(html);
        self.pipeline.run(&document, &PageContext::new(entity.clone()))
    }
}

#[async_trait]
impl Category for StatsCategory {
    type Record = StatRecord;

    const NAME: &'static str = "stats";

    fn page(&self) -> PageKind {
        PageKind::Overview
    }

    fn parse(&self, entity: &EntityName, html: &str) -> Transformed<StatRecord> {
        stats::transform(entity, &self.extract(entity, html))
    }

    fn has_content(record: &StatRecord) -> bool {
        record.missing_mandatory().len() < StatKind::MANDATORY.len()
    }

    fn missing(record: &StatRecord) -> Vec<String> {
        record.missing_mandatory()
    }

    fn seed(&self, entity: &EntityName) -> Option<StatRecord> {
        self.seed.stats(entity)
    }

    fn page_title(&self, entity: &EntityName) -> Option<&str> {
        self.seed.title(entity)
    }

    async fn enrich_live(
        &self,
        entity: &EntityName,
        url: &Url,
        html: &str,
        live: &mut Transformed<StatRecord>,
        options: &GetOptions,
    ) -> Confidence {
        let Some(level) = options.selection else {
            return Confidence::High;
        };

        let table = {
            let document = Html::parse_document(html);
            fields::level_row(&document, level)
        };
        if let Some(values) = table {
            debug!(level, "level values from static table");
            live.record.level = Some(LevelSnapshot {
                level,
                source: LevelSource::StaticTable,
                values,
            });
            return Confidence::High;
        }

        let renderer = match &self.renderer {
            Some(renderer) if level > MIN_LEVEL => renderer,
            _ => {
                live.record.level = Some(stats::computed_level(&live.record, level));
                return Confidence::High;
            },
        };

        let request = RenderRequest::from_config(url.clone(), level, &self.render);
        match renderer.render_at_selection(&request).await {
            Ok(snapshot) => {
                let rendered = self.extract(entity, &snapshot.html);
                let shown = stats::displayed_level(&rendered, level, LevelSource::Rendered);
                if shown.values.is_empty() {
                    live.issues.push(format!("level {level}: rendered page had no stat values"));
                    live.record.level = Some(stats::computed_level(&live.record, level));
                    Confidence::Low
                } else {
                    live.record.level = Some(shown);
                    snapshot.confidence
                }
            },
            Err(err) => {
                warn!(level, error = %err, "render failed, computing level values");
                live.issues.push(format!("level {level}: render failed: {err}"));
                live.record.level = Some(stats::computed_level(&live.record, level));
                Confidence::Low
            },
        }
    }

    fn enrich_offline(&self, record: &mut StatRecord, options: &GetOptions) {
        if let Some(level) = options.selection {
            record.level = Some(stats::computed_level(record, level));
        }
    }
}
