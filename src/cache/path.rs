//! Cache path derivation from query URLs
//!
//! A `CachePath` is the ordered list of path segments identifying one result
//! subtree, derived from a query URL's path component. The same path names
//! the position in the in-memory tree and the backing file on disk.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

/// Errors that can occur when deriving a cache path
#[derive(Debug, Error)]
pub enum CachePathError {
    /// The query URL could not be parsed at all
    #[error("invalid query URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// The URL parsed but its path has no usable segments
    #[error("query URL '{0}' has an empty path")]
    EmptyPath(String),
}

/// Ordered, non-empty sequence of path segments naming one result subtree
///
/// Derived once from a query URL and never mutated afterwards. The last
/// segment doubles as the key under which the API response carries its
/// payload collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CachePath(Vec<String>);

impl CachePath {
    /// Derives a cache path from a query URL.
    ///
    /// Takes the URL's path component, drops the leading slash, and splits
    /// the rest on `/`. Empty segments (doubled or trailing slashes) are
    /// discarded. A URL whose path yields no segments is a caller
    /// misconfiguration and returns `CachePathError::EmptyPath`.
    pub fn from_url(query_url: &str) -> Result<Self, CachePathError> {
        let parsed = Url::parse(query_url).map_err(|source| CachePathError::InvalidUrl {
            url: query_url.to_string(),
            source,
        })?;

        let segments: Vec<String> = parsed
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            return Err(CachePathError::EmptyPath(query_url.to_string()));
        }

        Ok(Self(segments))
    }

    /// Builds a cache path directly from segments.
    ///
    /// Returns `None` if no non-empty segment is supplied, preserving the
    /// non-empty invariant.
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(Into::into)
            .filter(|segment| !segment.is_empty())
            .collect();

        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    /// The ordered segments of this path
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The final segment, which names the payload collection key in API
    /// responses for this path
    pub fn last_segment(&self) -> &str {
        // The constructor guarantees at least one segment.
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// File name backing this path: segments joined with `_`, plus `.json`.
    ///
    /// Underscores already present in a segment are not escaped; two distinct
    /// paths can collide on the same file name. Accepted as designed.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0.join("_"))
    }

    /// Full backing-file path under `<root_dir>/dat/`
    pub fn file_path(&self, root_dir: &Path) -> PathBuf {
        root_dir.join("dat").join(self.file_name())
    }
}

impl fmt::Display for CachePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_splits_path_segments() {
        let path = CachePath::from_url("http://api.example.com/a/b").unwrap();
        assert_eq!(path.segments(), ["a", "b"]);
        assert_eq!(path.last_segment(), "b");
    }

    #[test]
    fn test_from_url_ignores_query_string() {
        let path =
            CachePath::from_url("http://api.example.com/users/releases?page=3&per_page=50")
                .unwrap();
        assert_eq!(path.segments(), ["users", "releases"]);
    }

    #[test]
    fn test_from_url_discards_empty_segments() {
        let path = CachePath::from_url("http://api.example.com/a//b/").unwrap();
        assert_eq!(path.segments(), ["a", "b"]);
    }

    #[test]
    fn test_from_url_rejects_empty_path() {
        let result = CachePath::from_url("http://api.example.com/");
        assert!(matches!(result, Err(CachePathError::EmptyPath(_))));
    }

    #[test]
    fn test_from_url_rejects_unparseable_url() {
        let result = CachePath::from_url("not a url");
        assert!(matches!(result, Err(CachePathError::InvalidUrl { .. })));
    }

    #[test]
    fn test_file_name_joins_with_underscores() {
        let path = CachePath::from_url("http://api.example.com/a/b").unwrap();
        assert_eq!(path.file_name(), "a_b.json");
    }

    #[test]
    fn test_file_path_nests_under_dat() {
        let path = CachePath::from_url("http://api.example.com/users/releases").unwrap();
        let file_path = path.file_path(Path::new("/var/lib/pagewalk"));
        assert_eq!(
            file_path,
            Path::new("/var/lib/pagewalk/dat/users_releases.json")
        );
    }

    #[test]
    fn test_from_segments_requires_non_empty() {
        assert!(CachePath::from_segments(Vec::<String>::new()).is_none());
        assert!(CachePath::from_segments(["", ""]).is_none());

        let path = CachePath::from_segments(["collection", "releases"]).unwrap();
        assert_eq!(path.file_name(), "collection_releases.json");
    }

    #[test]
    fn test_display_rejoins_with_slashes() {
        let path = CachePath::from_url("http://api.example.com/a/b").unwrap();
        assert_eq!(path.to_string(), "/a/b");
    }
}
