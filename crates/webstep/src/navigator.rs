//! Symbolic page identifiers to URLs, plus arrival checks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::driver::WebDriver;
use crate::result::{StepError, StepResult};

/// Page name to URL path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIdentifierMap(BTreeMap<String, String>);

impl PageIdentifierMap {
    /// Empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page
    #[must_use]
    pub fn with_page(mut self, identifier: impl Into<String>, path: impl Into<String>) -> Self {
        self.0.insert(identifier.into(), path.into());
        self
    }

    /// Path for `identifier`, if configured
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.0.get(identifier).map(String::as_str)
    }

    /// Number of pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No pages configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PageIdentifierMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Everything before the first `?`
#[must_use]
pub fn url_without_query_string(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// Resolves page identifiers and drives the browser to them
#[derive(Debug, Clone, Default)]
pub struct PageNavigator {
    pages: PageIdentifierMap,
    base_url: String,
}

impl PageNavigator {
    /// Navigator over `pages`, with paths made absolute against `base_url`
    #[must_use]
    pub fn new(pages: PageIdentifierMap, base_url: impl Into<String>) -> Self {
        Self {
            pages,
            base_url: base_url.into(),
        }
    }

    /// Configured pages
    #[must_use]
    pub const fn pages(&self) -> &PageIdentifierMap {
        &self.pages
    }

    /// Path for `identifier`.
    ///
    /// An unknown identifier is a suite authoring error.
    pub fn resolve(&self, identifier: &str) -> StepResult<&str> {
        self.pages
            .get(identifier)
            .ok_or_else(|| StepError::UnknownPageIdentifier {
                identifier: identifier.to_string(),
            })
    }

    /// Absolute URL for `path`; URLs starting with `http` pass through
    #[must_use]
    pub fn locate_path(&self, path: &str) -> String {
        if path.starts_with("http") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Navigate to the page named `identifier`, returning the URL visited
    pub fn navigate_to<D: WebDriver + ?Sized>(
        &self,
        driver: &mut D,
        identifier: &str,
    ) -> StepResult<String> {
        let url = self.locate_path(self.resolve(identifier)?);
        tracing::info!(page = identifier, %url, "navigating");
        driver.navigate(&url)?;
        Ok(url)
    }

    /// Current URL without query string must equal the page's URL
    pub fn assert_current_page<D: WebDriver + ?Sized>(
        &self,
        driver: &D,
        identifier: &str,
    ) -> StepResult<()> {
        let expected = self.locate_path(self.resolve(identifier)?);
        let current_url = driver.current_url()?;
        let actual = url_without_query_string(&current_url);
        if expected == actual {
            Ok(())
        } else {
            Err(StepError::assertion(format!(
                "Unexpected URL of the current site. Expected: '{expected}'. Actual: '{actual}'."
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;

    fn navigator() -> PageNavigator {
        let pages = PageIdentifierMap::new()
            .with_page("home", "/")
            .with_page("search", "/content/search");
        PageNavigator::new(pages, "http://host")
    }

    #[test]
    fn test_resolve_known() {
        assert_eq!(navigator().resolve("search").unwrap(), "/content/search");
    }

    #[test]
    fn test_resolve_unknown_is_configuration_error() {
        let err = navigator().resolve("missing").unwrap_err();
        assert!(err.is_fatal_configuration());
        assert_eq!(err.to_string(), "Unknown page identifier 'missing'");
    }

    #[test]
    fn test_locate_path() {
        let nav = PageNavigator::new(PageIdentifierMap::new(), "http://host/");
        assert_eq!(nav.locate_path("/"), "http://host/");
        assert_eq!(nav.locate_path("news"), "http://host/news");
        assert_eq!(nav.locate_path("https://other/x"), "https://other/x");
    }

    #[test]
    fn test_url_without_query_string() {
        assert_eq!(url_without_query_string("http://host/?query=1"), "http://host/");
        assert_eq!(url_without_query_string("http://host/a"), "http://host/a");
    }

    #[test]
    fn test_current_page_ignores_query_string() {
        let driver = MockDriver::new().at_url("http://host/?query=1");
        assert!(navigator().assert_current_page(&driver, "home").is_ok());
    }

    #[test]
    fn test_current_page_mismatch_shows_both() {
        let driver = MockDriver::new().at_url("http://host/elsewhere");
        let msg = navigator()
            .assert_current_page(&driver, "home")
            .unwrap_err()
            .to_string();
        assert!(msg.contains("'http://host/'"));
        assert!(msg.contains("'http://host/elsewhere'"));
    }

    #[test]
    fn test_navigate_to() {
        let mut driver = MockDriver::new();
        let url = navigator().navigate_to(&mut driver, "search").unwrap();
        assert_eq!(url, "http://host/content/search");
        assert!(driver.was_called("navigate:http://host/content/search"));
    }

    #[test]
    fn test_navigate_unknown_does_not_touch_driver() {
        let mut driver = MockDriver::new();
        assert!(navigator().navigate_to(&mut driver, "nope").is_err());
        assert!(driver.history().is_empty());
    }

    #[test]
    fn test_map_deserializes_transparently() {
        let map: PageIdentifierMap = serde_json::from_str(r#"{"home": "/"}"#).unwrap();
        assert_eq!(map.get("home"), Some("/"));
        assert_eq!(map.len(), 1);
    }
}
