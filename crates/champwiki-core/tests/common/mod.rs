#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;

use champwiki_core::config::{CacheConfig, RateLimitConfig, RetryConfig, WikiConfig};
use champwiki_core::{Config, Engine, ReqwestTransport};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stats page for the fictional "Alpha": every mandatory stat, no level table.
pub const ALPHA_PAGE: &str = r#"<html><body>
<div class="infobox">
  <span id="Health_Alpha">64599+45</span>
  <span id="Armor_Alpha">21</span><span id="Armor_Alpha_lvl">+4.2</span>
  <span id="MagicResist_Alpha">30</span><span id="MagicResist_Alpha_lvl">+1.3</span>
  <span id="AttackDamage_Alpha">53</span><span id="AttackDamage_Alpha_lvl">+3</span>
  <span id="MovementSpeed_Alpha">6450</span>
</div>
</body></html>"#;

/// Alpha with only two of the five mandatory stats.
pub const ALPHA_PARTIAL_PAGE: &str = r#"<html><body>
<span id="Health_Alpha">64599+45</span>
<span id="Armor_Alpha">21</span>
</body></html>"#;

/// A page with none of the fields at all.
pub const EMPTY_PAGE: &str = "<html><body><p>Nothing to see.</p></body></html>";

/// Ahri's overview page: stats in infobox rows, abilities in skill containers.
pub const AHRI_PAGE: &str = r#"<html><body>
<div class="infobox">
  <div class="infobox-data-row"><div class="infobox-data-label">Health</div><div class="infobox-data-value">590 (+104)</div></div>
  <div class="infobox-data-row"><div class="infobox-data-label">Armor</div><div class="infobox-data-value">21 (+4.2)</div></div>
  <div class="infobox-data-row"><div class="infobox-data-label">Magic Resist</div><div class="infobox-data-value">30 (+1.3)</div></div>
  <div class="infobox-data-row"><div class="infobox-data-label">Attack Damage</div><div class="infobox-data-value">53 (+3)</div></div>
  <div class="infobox-data-row"><div class="infobox-data-label">Move Speed</div><div class="infobox-data-value">330</div></div>
</div>
<div class="skill skill_innate"><span class="ability-name">Essence Theft</span></div>
<div class="skill skill_q"><span class="ability-name">Orb of Deception</span>
  <span data-stat="cooldown">7</span><span data-stat="cost">55 / 65 / 75 / 85 / 95</span></div>
<div class="skill skill_w"><span class="ability-name">Fox-Fire</span></div>
<div class="skill skill_e"><span class="ability-name">Charm</span></div>
<div class="skill skill_r"><span class="ability-name">Spirit Rush</span>
  <span data-stat="cooldown">130 / 105 / 80</span></div>
</body></html>"#;

/// Ahri's patch history sub-page.
pub const AHRI_PATCHES_PAGE: &str = r"<html><body>
<dl><dt>V14.1</dt></dl>
<ul><li>Base armor increased to 21 from 18.</li></ul>
<dl><dt>V13.24b</dt></dl>
<ul><li>Charm duration increased.</li><li>  </li></ul>
</body></html>";

pub fn test_config(base_url: &str, cache_dir: &Path) -> Config {
    Config {
        wiki: WikiConfig {
            base_url: base_url.to_string(),
            ..WikiConfig::default()
        },
        rate_limit: RateLimitConfig { min_interval_ms: 0 },
        retry: RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
            ..RetryConfig::default()
        },
        cache: CacheConfig {
            dir: cache_dir.to_path_buf(),
            ..CacheConfig::default()
        },
        ..Config::default()
    }
}

pub fn wiki_base(server: &MockServer) -> String {
    format!("{}/wiki/", server.uri())
}

pub fn engine(config: Config) -> Engine {
    let transport = Arc::new(ReqwestTransport::new(&config.http).unwrap());
    Engine::with_collaborators(config, transport, None).unwrap()
}

pub async fn serve(server: &MockServer, page: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}
