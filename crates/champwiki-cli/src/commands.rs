//! Subcommand implementations. Each returns the JSON value to print.

use std::time::Duration;

use anyhow::{Context, Result};
use champwiki_core::{Config, Engine, GetOptions};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::cli::{CacheCommands, GetArgs};

/// Build the engine for `get`.
///
/// Level lookups get a browser-backed renderer when the binary was built
/// with it; everything else uses static pages only.
#[cfg_attr(not(feature = "chromium"), allow(clippy::unused_async))]
async fn engine_for_get(config: Config, args: &GetArgs) -> Result<Engine> {
    #[cfg(feature = "chromium")]
    if args.level.is_some_and(|level| level > 1) {
        return Engine::with_chromium(config)
            .await
            .context("failed to start the browser renderer");
    }
    #[cfg(not(feature = "chromium"))]
    let _ = args;

    Engine::new(config).context("failed to initialize engine")
}

pub async fn get(config: Config, args: &GetArgs) -> Result<Value> {
    let engine = engine_for_get(config, args).await?;
    let options = GetOptions {
        variant: Some(args.variant.into()),
        selection: args.level,
        force_refresh: args.refresh,
        deadline: args.deadline_ms.map(Duration::from_millis),
    };

    let response = engine.service().get(&args.entity, &options).await?;
    let outcome = response.outcome();
    if !response.missing.is_empty() {
        warn!(entity = %args.entity, missing = ?response.missing, "response is missing fields");
    }

    let mut output = json!({
        "outcome": outcome,
        "response": response,
    });
    if args.with_metrics {
        let snapshot = engine.metrics().snapshot();
        output["metrics"] = serde_json::to_value(&snapshot)?;
        output["cacheHitRatio"] = json!(snapshot.cache_hit_ratio());
    }
    Ok(output)
}

pub fn cache(config: Config, command: &CacheCommands) -> Result<Value> {
    let max_age = config.cache.max_age();
    let engine = Engine::new(config).context("failed to initialize engine")?;
    let cache = engine.cache();

    match command {
        CacheCommands::Stats => {
            let stats = cache.stats()?;
            Ok(json!({
                "dir": cache.dir(),
                "stats": stats,
            }))
        },
        CacheCommands::Cleanup { max_age_days } => {
            let max_age = max_age_days.map_or(max_age, |days| Duration::from_secs(days * 86_400));
            let evicted = cache.cleanup(max_age)?;
            info!(evicted, "cache cleanup complete");
            Ok(json!({
                "evicted": evicted,
                "maxAgeSecs": max_age.as_secs(),
            }))
        },
        CacheCommands::Clear => {
            let evicted = cache.clear()?;
            info!(evicted, "cache cleared");
            Ok(json!({ "evicted": evicted }))
        },
    }
}
