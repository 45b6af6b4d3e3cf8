//! Search criteria and their normalization

use crate::cache::CacheKey;
use crate::format::SubtitleFormat;
use crate::protocol::Value;
use serde::{Deserialize, Serialize};

/// What to search for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTarget {
    /// IMDb identifier, with or without the `tt` prefix
    ImdbId(String),
    /// Free-text title query
    Query(String),
    /// OpenSubtitles movie hash, optionally with the file size in bytes
    MovieHash { hash: String, size: Option<u64> },
}

/// A subtitle search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub target: SearchTarget,
    /// Language codes; empty means any language
    pub languages: Vec<String>,
    /// Format the caller wants to receive
    pub format: SubtitleFormat,
    /// Attach the subtitle text to every result
    pub include_content: bool,
}

impl SearchCriteria {
    pub fn new(target: SearchTarget) -> Self {
        Self {
            target,
            languages: Vec::new(),
            format: SubtitleFormat::Srt,
            include_content: false,
        }
    }

    pub fn imdb_id(id: impl Into<String>) -> Self {
        Self::new(SearchTarget::ImdbId(id.into()))
    }

    pub fn query(text: impl Into<String>) -> Self {
        Self::new(SearchTarget::Query(text.into()))
    }

    pub fn movie_hash(hash: impl Into<String>, size: Option<u64>) -> Self {
        Self::new(SearchTarget::MovieHash {
            hash: hash.into(),
            size,
        })
    }

    /// Set the language filter from codes or comma-separated lists (`"en,es"`)
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.languages = languages
            .into_iter()
            .flat_map(|entry| {
                entry
                    .as_ref()
                    .split(',')
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        self
    }

    pub fn with_format(mut self, format: SubtitleFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_content(mut self, include: bool) -> Self {
        self.include_content = include;
        self
    }

    /// Canonical form used for both the remote request and the cache key
    ///
    /// IMDb ids lose their `tt` prefix and leading zeros, languages are
    /// lowercased, sorted and deduplicated, queries are trimmed with inner
    /// whitespace collapsed and hashes are lowercased.
    pub fn normalized(&self) -> Self {
        let target = match &self.target {
            SearchTarget::ImdbId(id) => SearchTarget::ImdbId(normalize_imdb_id(id)),
            SearchTarget::Query(text) => {
                SearchTarget::Query(text.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            SearchTarget::MovieHash { hash, size } => SearchTarget::MovieHash {
                hash: hash.trim().to_ascii_lowercase(),
                size: *size,
            },
        };

        let mut languages: Vec<String> = self
            .languages
            .iter()
            .map(|lang| lang.trim().to_ascii_lowercase())
            .filter(|lang| !lang.is_empty())
            .collect();
        languages.sort();
        languages.dedup();

        Self {
            target,
            languages,
            format: self.format,
            include_content: self.include_content,
        }
    }

    /// Remote parameter pairs of the normalized criteria
    fn remote_params(&self) -> Vec<(&'static str, String)> {
        let normalized = self.normalized();
        let mut params = match normalized.target {
            SearchTarget::ImdbId(id) => vec![("imdbid", id)],
            SearchTarget::Query(text) => vec![("query", text)],
            SearchTarget::MovieHash { hash, size } => {
                let mut params = vec![("moviehash", hash)];
                if let Some(size) = size {
                    params.push(("moviebytesize", size.to_string()));
                }
                params
            }
        };
        if !normalized.languages.is_empty() {
            params.push(("sublanguageid", normalized.languages.join(",")));
        }
        params
    }

    /// The `SearchSubtitles` query struct
    pub fn to_remote(&self) -> Value {
        Value::structure(
            self.remote_params()
                .into_iter()
                .map(|(name, value)| (name, Value::from(value))),
        )
    }

    /// Cache key covering everything that changes the result list
    pub fn cache_key(&self) -> CacheKey {
        let mut params = self.remote_params();
        params.push(("format", self.format.to_string()));
        params.push(("content", self.include_content.to_string()));

        let borrowed: Vec<(&str, &str)> = params
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        CacheKey::from_params("search", &borrowed)
    }
}

fn normalize_imdb_id(id: &str) -> String {
    let id = id.trim();
    let digits = id
        .strip_prefix("tt")
        .or_else(|| id.strip_prefix("TT"))
        .unwrap_or(id);
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() && !digits.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imdb_id_normalization() {
        assert_eq!(normalize_imdb_id("tt0120338"), "120338");
        assert_eq!(normalize_imdb_id("0120338"), "120338");
        assert_eq!(normalize_imdb_id(" 120338 "), "120338");
        assert_eq!(normalize_imdb_id("TT0000001"), "1");
        assert_eq!(normalize_imdb_id("tt000"), "0");
    }

    #[test]
    fn test_language_normalization() {
        let criteria = SearchCriteria::imdb_id("tt0120338").with_languages(["es, EN", "en", ""]);
        let normalized = criteria.normalized();
        assert_eq!(normalized.languages, vec!["en", "es"]);
    }

    #[test]
    fn test_query_whitespace_collapses() {
        let criteria = SearchCriteria::query("  the   matrix\treloaded ").normalized();
        assert_eq!(
            criteria.target,
            SearchTarget::Query("the matrix reloaded".to_string())
        );
    }

    #[test]
    fn test_equivalent_criteria_share_cache_key() {
        let a = SearchCriteria::imdb_id("tt0120338").with_languages(["en", "es"]);
        let b = SearchCriteria::imdb_id("120338").with_languages(["ES", "en"]);
        assert_eq!(a.cache_key(), b.cache_key());

        let c = a.clone().with_format(SubtitleFormat::Vtt);
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_remote_struct() {
        let value = SearchCriteria::movie_hash("8E245D9679D31E12", Some(12_909_756))
            .with_languages(["en"])
            .to_remote();

        assert_eq!(value.get_str("moviehash"), Some("8e245d9679d31e12"));
        assert_eq!(value.get_str("moviebytesize"), Some("12909756"));
        assert_eq!(value.get_str("sublanguageid"), Some("en"));
        assert_eq!(value.get("imdbid"), None);
    }
}
