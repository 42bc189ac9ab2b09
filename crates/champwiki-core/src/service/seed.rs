//! Built-in fallback records.
//!
//! The seed set is a small TOML document compiled into the binary. It is
//! consulted when live data is unavailable or incomplete, and is keyed by
//! canonical entity name. It also lists page titles whose spelling cannot be
//! recovered from the canonical form, such as `Lee Sin` or `Kai'Sa`.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::Result;
use crate::key::{EntityName, canonical_name};
use crate::types::{AbilityRecord, AbilitySet, PatchHistory, PatchRecord, StatKind, StatRecord, StatValue};

const BUILTIN: &str = include_str!("seed.toml");

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    titles: Vec<String>,
    #[serde(default, rename = "champion")]
    champions: Vec<SeedChampion>,
}

#[derive(Debug, Clone, Deserialize)]
struct SeedChampion {
    name: String,
    #[serde(default)]
    stats: BTreeMap<StatKind, StatValue>,
    #[serde(default)]
    abilities: Vec<AbilityRecord>,
    #[serde(default)]
    patches: Vec<PatchRecord>,
}

/// Records known without the network, by canonical name.
#[derive(Debug, Clone, Default)]
pub struct Seed {
    champions: HashMap<String, SeedChampion>,
    titles: HashMap<String, String>,
}

impl Seed {
    /// The compiled-in seed set.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN)
    }

    /// Parse a seed document.
    ///
    /// ```rust
    /// use champwiki_core::service::Seed;
    /// use champwiki_core::key::EntityName;
    ///
    /// let seed = Seed::from_toml(r#"
    ///     [[champion]]
    ///     name = "Alpha"
    ///     [champion.stats]
    ///     health = { base = 600.0, growth = 90.0 }
    /// "#)?;
    /// let alpha = EntityName::parse("alpha")?;
    /// assert!(seed.stats(&alpha).is_some());
    /// assert!(seed.abilities(&alpha).is_none());
    /// # Ok::<(), champwiki_core::Error>(())
    /// ```
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: SeedFile = toml::from_str(text)?;
        let titles = file
            .titles
            .into_iter()
            .map(|title| (canonical_name(&title), title))
            .collect();
        let champions = file
            .champions
            .into_iter()
            .map(|champion| (canonical_name(&champion.name), champion))
            .collect();
        Ok(Self { champions, titles })
    }

    /// Number of seeded champions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.champions.len()
    }

    /// Whether the seed set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.champions.is_empty()
    }

    /// Seeded champion titles, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.champions.values().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Known page title for `entity`, from a seeded champion or the title list.
    ///
    /// ```rust
    /// use champwiki_core::service::Seed;
    /// use champwiki_core::key::EntityName;
    ///
    /// let seed = Seed::builtin()?;
    /// assert_eq!(seed.title(&EntityName::parse("leesin")?), Some("Lee Sin"));
    /// assert_eq!(seed.title(&EntityName::parse("AHRI")?), Some("Ahri"));
    /// assert_eq!(seed.title(&EntityName::parse("Nobody")?), None);
    /// # Ok::<(), champwiki_core::Error>(())
    /// ```
    #[must_use]
    pub fn title(&self, entity: &EntityName) -> Option<&str> {
        self.champion(entity)
            .map(|champion| champion.name.as_str())
            .or_else(|| self.titles.get(entity.canonical()).map(String::as_str))
    }

    fn champion(&self, entity: &EntityName) -> Option<&SeedChampion> {
        self.champions.get(entity.canonical())
    }

    /// Seeded stats, if any were recorded.
    #[must_use]
    pub fn stats(&self, entity: &EntityName) -> Option<StatRecord> {
        let champion = self.champion(entity)?;
        (!champion.stats.is_empty()).then(|| StatRecord {
            champion: champion.name.clone(),
            stats: champion.stats.clone(),
            level: None,
        })
    }

    /// Seeded abilities, ordered by slot.
    #[must_use]
    pub fn abilities(&self, entity: &EntityName) -> Option<AbilitySet> {
        let champion = self.champion(entity)?;
        if champion.abilities.is_empty() {
            return None;
        }
        let mut abilities = champion.abilities.clone();
        abilities.sort_by_key(|a| a.slot);
        Some(AbilitySet {
            champion: champion.name.clone(),
            abilities,
        })
    }

    /// Seeded patch history.
    #[must_use]
    pub fn patches(&self, entity: &EntityName) -> Option<PatchHistory> {
        let champion = self.champion(entity)?;
        (!champion.patches.is_empty()).then(|| PatchHistory {
            champion: champion.name.clone(),
            patches: champion.patches.clone(),
        })
    }
}
