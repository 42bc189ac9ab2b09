//! Entity names and fetch keys.
//!
//! Every component that needs to identify a champion goes through
//! [`EntityName`], so `"Kai'Sa"`, `"kaisa"` and `" KAI SA "` all land on the
//! same cache slot and the same seed record.
//!
//! ```rust
//! use champwiki_core::key::{EntityName, FetchKey, PageKind};
//!
//! let a = EntityName::parse("Kai'Sa")?;
//! let b = EntityName::parse("  kaisa ")?;
//! assert_eq!(a.canonical(), "kaisa");
//! assert_eq!(
//!     FetchKey::new(a, PageKind::Overview).page_id(),
//!     FetchKey::new(b, PageKind::Overview).page_id(),
//! );
//! # Ok::<(), champwiki_core::Error>(())
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use url::Url;

use crate::page_cache::PageId;
use crate::{Error, Result};

/// Reduce a free-form entity name to its comparison form.
///
/// Trims, applies NFKD decomposition and lowercases, then drops combining
/// marks and anything else that is not alphanumeric.
#[must_use]
pub fn canonical_name(raw: &str) -> String {
    raw.trim()
        .nfkd()
        .flat_map(char::to_lowercase)
        .nfkd()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Build the wiki page title for a free-form entity name.
///
/// Whitespace runs become a single `_` and each word starts upper-case;
/// the rest of every word is kept as typed.
///
/// ```rust
/// use champwiki_core::key::title_case;
///
/// assert_eq!(title_case("  lee   sin "), "Lee_Sin");
/// assert_eq!(title_case("Kai'Sa"), "Kai'Sa");
/// ```
#[must_use]
pub fn title_case(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// A validated entity name in both its comparison and URL forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityName {
    canonical: String,
    title: String,
}

impl EntityName {
    /// Parse a caller-supplied name.
    ///
    /// Names with no alphanumeric content are rejected as
    /// [`Error::InvalidArgument`].
    pub fn parse(raw: &str) -> Result<Self> {
        let canonical = canonical_name(raw);
        if canonical.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "entity name '{raw}' has no usable characters"
            )));
        }
        Ok(Self {
            canonical,
            title: title_case(raw),
        })
    }

    /// Same entity, with its URL form rebuilt from a known page title.
    ///
    /// ```rust
    /// use champwiki_core::key::EntityName;
    ///
    /// let name = EntityName::parse("leesin")?.with_title("Lee Sin");
    /// assert_eq!(name.title(), "Lee_Sin");
    /// assert_eq!(name.canonical(), "leesin");
    /// # Ok::<(), champwiki_core::Error>(())
    /// ```
    #[must_use]
    pub fn with_title(self, title: &str) -> Self {
        Self {
            title: title_case(title),
            ..self
        }
    }

    /// Comparison form used for cache keys and seed lookup.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Title form used to build page URLs.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Which page of an entity is being fetched.
///
/// Stats and abilities both live on the overview page and share its cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Main champion page.
    Overview,
    /// Patch history sub-page.
    PatchHistory,
}

impl PageKind {
    /// Stable identifier used inside cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::PatchHistory => "patch_history",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one fetchable page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchKey {
    /// Entity the page belongs to.
    pub entity: EntityName,
    /// Which of the entity's pages.
    pub page: PageKind,
}

impl FetchKey {
    /// Create a key for `entity`'s `page`.
    #[must_use]
    pub const fn new(entity: EntityName, page: PageKind) -> Self {
        Self { entity, page }
    }

    /// String hashed into the cache id: `<canonical>|<page>`.
    #[must_use]
    pub fn cache_input(&self) -> String {
        format!("{}|{}", self.entity.canonical(), self.page.as_str())
    }

    /// Content-addressed cache identifier for this key.
    #[must_use]
    pub fn page_id(&self) -> PageId {
        PageId::from_key(self)
    }

    /// Resolve the page URL below `base`.
    ///
    /// Title segments are percent-encoded by [`Url`].
    pub fn url(&self, base: &Url, patch_history_segment: &str) -> Result<Url> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                Error::Config(format!("base URL '{base}' cannot carry a path"))
            })?;
            segments.pop_if_empty().push(self.entity.title());
            if self.page == PageKind::PatchHistory {
                segments.push(patch_history_segment);
            }
        }
        Ok(url)
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity.canonical(), self.page)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonical_strips_marks_and_punctuation() {
        assert_eq!(canonical_name("Kai'Sa"), "kaisa");
        assert_eq!(canonical_name("  Nunu & Willump "), "nunuwillump");
        assert_eq!(canonical_name("Kha'Zix"), "khazix");
        assert_eq!(canonical_name("Léona"), "leona");
        assert_eq!(canonical_name("Dr. Mundo"), "drmundo");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(
            EntityName::parse("  '. "),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_url_building() {
        let base = Url::parse("https://wiki.example/en-us/").unwrap();
        let key = FetchKey::new(EntityName::parse("lee sin").unwrap(), PageKind::Overview);
        assert_eq!(
            key.url(&base, "Patch_history").unwrap().as_str(),
            "https://wiki.example/en-us/Lee_Sin"
        );

        let key = FetchKey::new(EntityName::parse("Ahri").unwrap(), PageKind::PatchHistory);
        assert_eq!(
            key.url(&base, "Patch_history").unwrap().as_str(),
            "https://wiki.example/en-us/Ahri/Patch_history"
        );
    }

    #[test]
    fn test_page_kind_separates_cache_slots() {
        let name = EntityName::parse("Ahri").unwrap();
        let overview = FetchKey::new(name.clone(), PageKind::Overview);
        let history = FetchKey::new(name, PageKind::PatchHistory);
        assert_ne!(overview.page_id(), history.page_id());
        assert_eq!(overview.cache_input(), "ahri|overview");
    }

    proptest! {
        #[test]
        fn canonical_is_idempotent(raw in "[A-Za-z0-9 '.&éèüÖñ-]{0,32}") {
            let once = canonical_name(&raw);
            prop_assert_eq!(canonical_name(&once), once.clone());
        }

        #[test]
        fn canonical_ignores_case_and_padding(word in "[A-Za-z]{1,16}", pad in " {0,4}") {
            let padded = format!("{pad}{word}{pad}");
            prop_assert_eq!(canonical_name(&padded), canonical_name(&word.to_uppercase()));
        }

        #[test]
        fn equal_canonical_means_equal_page_id(word in "[a-z]{1,16}") {
            let lower = EntityName::parse(&word).unwrap();
            let upper = EntityName::parse(&word.to_uppercase()).unwrap();
            prop_assert_eq!(
                FetchKey::new(lower, PageKind::Overview).page_id(),
                FetchKey::new(upper, PageKind::Overview).page_id()
            );
        }
    }
}
