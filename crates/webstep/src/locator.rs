//! Element lookup on top of the driver boundary.
//!
//! `find_one` waits (bounded) for late-rendered elements; `find_all` and
//! absence checks evaluate exactly once, since an empty result is a valid
//! answer for them.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use crate::driver::{ElementHandle, Engine, WebDriver};
use crate::result::{StepError, StepResult};
use crate::table::ActualTable;
use crate::xpath;

/// Default timeout for `find_one` (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval for `find_one` (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

const ROW_XPATH: &str = ".//tr";
const CELL_XPATH: &str = "./th | ./td";

/// Selector paired with the engine that evaluates it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// XPath expression
    XPath(String),
    /// CSS selector
    Css(String),
    /// Driver named selector
    Named(String),
}

impl Selector {
    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// XPath when the string looks like one, CSS otherwise
    #[must_use]
    pub fn infer(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        if xpath::looks_like_xpath(&selector) {
            Self::XPath(selector)
        } else {
            Self::Css(selector)
        }
    }

    /// Engine that evaluates this selector
    #[must_use]
    pub const fn engine(&self) -> Engine {
        match self {
            Self::XPath(_) => Engine::XPath,
            Self::Css(_) => Engine::Css,
            Self::Named(_) => Engine::Named,
        }
    }

    /// Raw selector text
    #[must_use]
    pub fn expression(&self) -> &str {
        match self {
            Self::XPath(s) | Self::Css(s) | Self::Named(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.expression())
    }
}

/// Wait behaviour for single-element lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Upper bound on waiting for a match
    pub timeout: Duration,
    /// Delay between attempts
    pub poll_interval: Duration,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl LocatorOptions {
    /// Evaluate once, never wait
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Resolves selectors against the live document
#[derive(Debug)]
pub struct ElementLocator<'a, D: WebDriver + ?Sized> {
    driver: &'a D,
    options: LocatorOptions,
}

impl<'a, D: WebDriver + ?Sized> ElementLocator<'a, D> {
    /// Create a locator over `driver`
    #[must_use]
    pub const fn new(driver: &'a D, options: LocatorOptions) -> Self {
        Self { driver, options }
    }

    /// Active wait options
    #[must_use]
    pub const fn options(&self) -> LocatorOptions {
        self.options
    }

    /// First match, waiting up to the configured timeout.
    ///
    /// Fails with [`StepError::ElementNotFound`] naming `subject`.
    pub fn find_one(&self, selector: &Selector, subject: &str) -> StepResult<ElementHandle> {
        let start = Instant::now();
        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            if let Some(found) = self
                .driver
                .find_one(selector.engine(), selector.expression())?
            {
                return Ok(found);
            }
            if start.elapsed() >= self.options.timeout {
                break;
            }
            thread::sleep(self.options.poll_interval);
        }
        tracing::debug!(%selector, attempts, "no element found");
        Err(StepError::not_found(subject, selector.expression()))
    }

    /// First match without waiting
    pub fn find_optional(&self, selector: &Selector) -> StepResult<Option<ElementHandle>> {
        self.driver
            .find_one(selector.engine(), selector.expression())
    }

    /// Every match; empty is a valid result
    pub fn find_all(&self, selector: &Selector) -> StepResult<Vec<ElementHandle>> {
        self.driver
            .find_all(selector.engine(), selector.expression())
    }

    /// Every match below `parent`
    pub fn find_all_within(
        &self,
        parent: &ElementHandle,
        selector: &Selector,
    ) -> StepResult<Vec<ElementHandle>> {
        self.driver
            .find_all_within(parent, selector.engine(), selector.expression())
    }

    /// Fails with [`StepError::ElementUnexpectedlyFound`] when anything matches
    pub fn assert_absent(&self, selector: &Selector, subject: &str) -> StepResult<()> {
        match self.find_optional(selector)? {
            None => Ok(()),
            Some(_) => Err(StepError::ElementUnexpectedlyFound {
                subject: subject.to_string(),
                selector: selector.expression().to_string(),
            }),
        }
    }

    /// Button by label, id or name
    pub fn find_button_by_label(&self, label: &str) -> StepResult<ElementHandle> {
        self.find_one(&Selector::xpath(xpath::button_by_label(label)), "button")
    }

    /// Link whose text equals `text`, optionally below `base`
    pub fn find_link_by_text(&self, base: &str, text: &str) -> StepResult<ElementHandle> {
        self.find_one(&Selector::xpath(xpath::link_with_text(base, text)), "link")
    }

    /// Link by id, title or text
    pub fn find_link(&self, locator: &str) -> StepResult<ElementHandle> {
        self.find_one(&Selector::xpath(xpath::link_by_locator(locator)), "link")
    }

    /// Inputs whose id contains `fragment`, in document order
    pub fn find_fields_by_partial_id(&self, fragment: &str) -> StepResult<Vec<ElementHandle>> {
        self.find_all(&Selector::xpath(xpath::field_by_partial_id(fragment)))
    }

    /// Form field by id, name, placeholder or label
    pub fn find_field(&self, locator: &str) -> StepResult<ElementHandle> {
        self.find_one(&Selector::xpath(xpath::field_by_locator(locator)), "field")
    }

    /// Cell texts of the table at `table_xpath`.
    ///
    /// A first row made only of `th` cells becomes the header.
    pub fn read_table(&self, table_xpath: &str) -> StepResult<ActualTable> {
        let table = self.find_one(&Selector::xpath(table_xpath), "table")?;
        let rows = self
            .driver
            .find_all_within(&table, Engine::XPath, ROW_XPATH)?;

        let mut actual = ActualTable::default();
        for (index, row) in rows.iter().enumerate() {
            let cells = self
                .driver
                .find_all_within(row, Engine::XPath, CELL_XPATH)?;
            let is_header = !cells.is_empty()
                && cells.iter().all(|c| c.tag_name.eq_ignore_ascii_case("th"));
            let texts: Vec<String> = cells.iter().map(|c| c.text().trim().to_string()).collect();
            if index == 0 && is_header {
                actual.header = Some(texts);
            } else {
                actual.rows.push(texts);
            }
        }
        Ok(actual)
    }

    /// Complete `attr` value on the current page that contains `fragment`.
    ///
    /// See [`find_complete_attribute`].
    pub fn find_complete_attribute(
        &self,
        fragment: &str,
        tag: Option<&str>,
        attr: &str,
    ) -> StepResult<Option<String>> {
        let markup = self.driver.page_content()?;
        let found = find_complete_attribute(&markup, fragment, tag, attr);
        tracing::debug!(fragment, attr, found = ?found, "completed attribute from markup");
        Ok(found)
    }
}

/// First quoted `attr` value in `markup` that contains `fragment`.
///
/// Generated ids carry object-specific prefixes (`ezcoa-123_title`), so a
/// step only knows a stable part of them. With `tag` the attribute must
/// belong to an element of that name (ASCII case-insensitive).
#[must_use]
pub fn find_complete_attribute(
    markup: &str,
    fragment: &str,
    tag: Option<&str>,
    attr: &str,
) -> Option<String> {
    if fragment.is_empty() || fragment.bytes().any(ends_attribute_value) {
        return None;
    }
    markup.match_indices(fragment).find_map(|(at, _)| {
        let (start, end) = quoted_value_bounds(markup, at, at + fragment.len())?;
        let element = owning_element(markup, start, attr)?;
        match tag {
            Some(tag) if !element.eq_ignore_ascii_case(tag) => None,
            _ => Some(markup[start..end].to_string()),
        }
    })
}

const fn ends_attribute_value(byte: u8) -> bool {
    matches!(byte, b'<' | b'>' | b'=' | b'"' | b'\'' | b' ')
}

/// Bounds of the quoted value around `from..to`, quotes excluded
fn quoted_value_bounds(markup: &str, from: usize, to: usize) -> Option<(usize, usize)> {
    let bytes = markup.as_bytes();
    let open = bytes[..from]
        .iter()
        .rposition(|&b| ends_attribute_value(b))?;
    let close = to + bytes[to..].iter().position(|&b| ends_attribute_value(b))?;
    let quote = bytes[open];
    (matches!(quote, b'"' | b'\'') && bytes[close] == quote).then_some((open + 1, close))
}

/// Name of the element whose `attr="` opens the value at `value_start`
fn owning_element<'m>(markup: &'m str, value_start: usize, attr: &str) -> Option<&'m str> {
    let before = markup.get(..value_start.checked_sub(2)?)?;
    if !markup[before.len()..].starts_with('=') {
        return None;
    }
    let head = before.strip_suffix(attr)?;
    if !head.ends_with(|c: char| c.is_ascii_whitespace()) {
        return None;
    }
    let open = head.rfind('<')?;
    if head[open..].contains('>') {
        return None;
    }
    head[open + 1..]
        .split(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .next()
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_infer_xpath() {
            assert_eq!(Selector::infer("//a").engine(), Engine::XPath);
            assert_eq!(Selector::infer("(//a)[1]").engine(), Engine::XPath);
        }

        #[test]
        fn test_infer_css() {
            let selector = Selector::infer("div.feedback");
            assert_eq!(selector.engine(), Engine::Css);
            assert_eq!(selector.expression(), "div.feedback");
            assert_eq!(selector.to_string(), "div.feedback");
        }
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_default_options() {
            let options = LocatorOptions::default();
            assert_eq!(options.timeout, Duration::from_millis(5000));
            assert_eq!(options.poll_interval, Duration::from_millis(50));
        }

        #[test]
        fn test_immediate() {
            let options = LocatorOptions::immediate();
            assert_eq!(options.timeout, Duration::ZERO);
        }

        #[test]
        fn test_builders() {
            let options = LocatorOptions::default()
                .with_timeout(Duration::from_millis(10))
                .with_poll_interval(Duration::from_millis(1));
            assert_eq!(options.timeout, Duration::from_millis(10));
            assert_eq!(options.poll_interval, Duration::from_millis(1));
        }
    }

    mod complete_attribute_tests {
        use super::*;

        const MARKUP: &str = concat!(
            r#"<div class="ezcca-edit" id="ezcoa-xyz_title">"#,
            r#"<label for="ezcoa-123_title">Title</label>"#,
            r#"<input type="text" id="ezcoa-123_title" name='ContentObjectAttribute_title'>"#,
            r#"<p>see ezcoa-999_title in text</p>"#,
            "</div>"
        );

        #[test]
        fn test_first_matching_id() {
            assert_eq!(
                find_complete_attribute(MARKUP, "_title", None, "id"),
                Some("ezcoa-xyz_title".to_string())
            );
        }

        #[test]
        fn test_restricted_to_tag() {
            assert_eq!(
                find_complete_attribute(MARKUP, "_title", Some("INPUT"), "id"),
                Some("ezcoa-123_title".to_string())
            );
        }

        #[test]
        fn test_other_attribute_and_single_quotes() {
            assert_eq!(
                find_complete_attribute(MARKUP, "_title", None, "name"),
                Some("ContentObjectAttribute_title".to_string())
            );
            assert_eq!(
                find_complete_attribute(MARKUP, "123", Some("label"), "for"),
                Some("ezcoa-123_title".to_string())
            );
        }

        #[test]
        fn test_text_and_partial_attribute_names_ignored() {
            assert_eq!(find_complete_attribute(MARKUP, "999", None, "id"), None);
            // `class` must not match as `s`
            assert_eq!(find_complete_attribute(MARKUP, "ezcca", None, "s"), None);
            assert_eq!(find_complete_attribute(MARKUP, "_title", Some("select"), "id"), None);
        }

        #[test]
        fn test_fragment_with_delimiter_never_matches() {
            assert_eq!(find_complete_attribute(MARKUP, "id=", None, "id"), None);
            assert_eq!(find_complete_attribute(MARKUP, "", None, "id"), None);
        }

        #[test]
        fn test_reads_current_page() {
            let mut driver = MockDriver::new();
            driver.content = MARKUP.to_string();
            let locator = ElementLocator::new(&driver, LocatorOptions::immediate());
            assert_eq!(
                locator
                    .find_complete_attribute("_title", Some("input"), "id")
                    .unwrap(),
                Some("ezcoa-123_title".to_string())
            );
        }
    }

    mod find_tests {
        use super::*;

        #[test]
        fn test_find_one_not_found_carries_subject() {
            let driver = MockDriver::new();
            let locator = ElementLocator::new(&driver, LocatorOptions::immediate());
            let err = locator
                .find_one(&Selector::xpath("//a[@id = 'x']"), "link")
                .unwrap_err();
            match err {
                StepError::ElementNotFound {
                    subject, selector, ..
                } => {
                    assert_eq!(subject, "link");
                    assert_eq!(selector, "//a[@id = 'x']");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_immediate_queries_once() {
            let driver = MockDriver::new();
            let locator = ElementLocator::new(&driver, LocatorOptions::immediate());
            let _ = locator.find_one(&Selector::css("div"), "block");
            assert_eq!(driver.query_count(Engine::Css, "div"), 1);
        }

        #[test]
        fn test_find_one_waits_for_late_element() {
            let mut driver = MockDriver::new();
            driver.add_element(Engine::Css, "div.late", ElementHandle::new("d", "div"));
            driver.hide_for(Engine::Css, "div.late", 3);
            let options = LocatorOptions::default()
                .with_timeout(Duration::from_secs(2))
                .with_poll_interval(Duration::from_millis(1));
            let locator = ElementLocator::new(&driver, options);

            let found = locator.find_one(&Selector::css("div.late"), "block").unwrap();
            assert_eq!(found.id, "d");
            assert_eq!(driver.query_count(Engine::Css, "div.late"), 4);
        }

        #[test]
        fn test_find_all_does_not_wait() {
            let driver = MockDriver::new();
            let locator = ElementLocator::new(&driver, LocatorOptions::default());
            assert!(locator.find_all(&Selector::css("li")).unwrap().is_empty());
            assert_eq!(driver.query_count(Engine::Css, "li"), 1);
        }

        #[test]
        fn test_assert_absent() {
            let mut driver = MockDriver::new();
            driver.add_element(Engine::XPath, "//a", ElementHandle::new("a", "a"));
            let locator = ElementLocator::new(&driver, LocatorOptions::default());

            assert!(locator.assert_absent(&Selector::xpath("//b"), "link").is_ok());
            let err = locator
                .assert_absent(&Selector::xpath("//a"), "link")
                .unwrap_err();
            assert!(matches!(err, StepError::ElementUnexpectedlyFound { .. }));
        }

        #[test]
        fn test_find_fields_by_partial_id() {
            let mut driver = MockDriver::new();
            let expr = xpath::field_by_partial_id("author");
            driver.add_elements(
                Engine::XPath,
                &expr,
                vec![
                    ElementHandle::new("author_0", "input"),
                    ElementHandle::new("author_1", "input"),
                ],
            );
            let locator = ElementLocator::new(&driver, LocatorOptions::immediate());
            let fields = locator.find_fields_by_partial_id("author").unwrap();
            assert_eq!(fields.len(), 2);
        }

        #[test]
        fn test_find_button_by_label() {
            let mut driver = MockDriver::new();
            driver.add_element(
                Engine::XPath,
                &xpath::button_by_label("Publish"),
                ElementHandle::new("publish", "button").with_text("Publish"),
            );
            let locator = ElementLocator::new(&driver, LocatorOptions::immediate());
            assert_eq!(locator.find_button_by_label("Publish").unwrap().id, "publish");
            assert!(locator.find_button_by_label("Cancel").is_err());
        }
    }

    mod read_table_tests {
        use super::*;

        fn cell(id: &str, tag: &str, text: &str) -> ElementHandle {
            ElementHandle::new(id, tag).with_text(text)
        }

        #[test]
        fn test_read_table_with_header() {
            let mut driver = MockDriver::new();
            let table = ElementHandle::new("t", "table");
            let head = ElementHandle::new("r0", "tr");
            let body = ElementHandle::new("r1", "tr");
            driver.add_element(Engine::XPath, "//table", table.clone());
            driver.add_children(&table, Engine::XPath, ROW_XPATH, vec![head.clone(), body.clone()]);
            driver.add_children(
                &head,
                Engine::XPath,
                CELL_XPATH,
                vec![cell("h0", "th", "Name"), cell("h1", "th", "Age")],
            );
            driver.add_children(
                &body,
                Engine::XPath,
                CELL_XPATH,
                vec![cell("c0", "td", " Alice "), cell("c1", "td", "30")],
            );

            let locator = ElementLocator::new(&driver, LocatorOptions::immediate());
            let actual = locator.read_table("//table").unwrap();
            assert_eq!(
                actual.header,
                Some(vec!["Name".to_string(), "Age".to_string()])
            );
            assert_eq!(actual.rows, vec![vec!["Alice".to_string(), "30".to_string()]]);
        }

        #[test]
        fn test_read_table_without_header() {
            let mut driver = MockDriver::new();
            let table = ElementHandle::new("t", "table");
            let row = ElementHandle::new("r0", "tr");
            driver.add_element(Engine::XPath, "//table", table.clone());
            driver.add_children(&table, Engine::XPath, ROW_XPATH, vec![row.clone()]);
            driver.add_children(&row, Engine::XPath, CELL_XPATH, vec![cell("c", "td", "Bob")]);

            let locator = ElementLocator::new(&driver, LocatorOptions::immediate());
            let actual = locator.read_table("//table").unwrap();
            assert!(actual.header.is_none());
            assert_eq!(actual.rows.len(), 1);
        }

        #[test]
        fn test_read_table_missing() {
            let driver = MockDriver::new();
            let locator = ElementLocator::new(&driver, LocatorOptions::immediate());
            assert!(matches!(
                locator.read_table("//table").unwrap_err(),
                StepError::ElementNotFound { .. }
            ));
        }
    }
}
