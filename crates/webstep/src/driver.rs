//! WebDriver - Abstract Browser Boundary
//!
//! Every browser interaction the steps need goes through the [`WebDriver`]
//! trait, so a CDP, WebDriver-protocol or headless-DOM adapter can be
//! swapped in without touching query construction or assertions.
//!
//! ```text
//! ┌──────────────┐   xpath/css   ┌──────────────┐   protocol   ┌─────────┐
//! │ StepCatalog  │──────────────►│  WebDriver   │─────────────►│ Browser │
//! │ (locator,    │◄──────────────│  (adapter)   │◄─────────────│         │
//! │  matcher)    │ ElementHandle └──────────────┘              └─────────┘
//! └──────────────┘
//! ```
//!
//! Calls are blocking; the scenario owns its driver exclusively.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::result::{StepError, StepResult};

/// Selector engine understood by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// XPath 1.0 expression
    XPath,
    /// CSS selector
    Css,
    /// Driver-specific named selector (e.g. "field", "link")
    Named,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::XPath => "xpath",
            Self::Css => "css",
            Self::Named => "named",
        };
        f.write_str(name)
    }
}

/// Snapshot of a DOM element returned by a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned element identifier
    pub id: String,
    /// Element tag name
    pub tag_name: String,
    /// Visible text content
    pub text_content: Option<String>,
    /// Attribute values at query time
    pub attributes: BTreeMap<String, String>,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            text_content: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set visible text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Visible text (empty when the element has none)
    #[must_use]
    pub fn text(&self) -> &str {
        self.text_content.as_deref().unwrap_or("")
    }

    /// Attribute value, if present
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the attribute is present
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// `<input type="file">`
    #[must_use]
    pub fn is_file_input(&self) -> bool {
        self.tag_name.eq_ignore_ascii_case("input")
            && self
                .attribute("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("file"))
    }
}

/// Abstract driver trait for browser automation
///
/// # Implementations
///
/// - [`MockDriver`] - registered query results, for unit testing
/// - external adapters (CDP, WebDriver protocol) live outside this crate
pub trait WebDriver {
    /// Navigate to an absolute URL
    fn navigate(&mut self, url: &str) -> StepResult<()>;

    /// Current page URL
    fn current_url(&self) -> StepResult<String>;

    /// All elements matching `selector`, in document order
    fn find_all(&self, engine: Engine, selector: &str) -> StepResult<Vec<ElementHandle>>;

    /// First element matching `selector`
    fn find_one(&self, engine: Engine, selector: &str) -> StepResult<Option<ElementHandle>> {
        Ok(self.find_all(engine, selector)?.into_iter().next())
    }

    /// Elements matching `selector` below `parent`
    fn find_all_within(
        &self,
        parent: &ElementHandle,
        engine: Engine,
        selector: &str,
    ) -> StepResult<Vec<ElementHandle>>;

    /// Click an element
    fn click(&mut self, element: &ElementHandle) -> StepResult<()>;

    /// Replace the value of a form element
    fn set_value(&mut self, element: &ElementHandle, value: &str) -> StepResult<()>;

    /// Attach a local file to a file input
    fn attach_file(&mut self, element: &ElementHandle, path: &Path) -> StepResult<()>;

    /// Run a script in the page.
    ///
    /// Drivers without scripting return [`StepError::UnsupportedCapability`].
    fn execute_script(&mut self, script: &str) -> StepResult<serde_json::Value> {
        let _ = script;
        Err(StepError::UnsupportedCapability {
            capability: "script execution".to_string(),
        })
    }

    /// Full page markup
    fn page_content(&self) -> StepResult<String>;
}

type QueryKey = (Engine, String);

/// Mock driver for unit testing
///
/// Queries are answered from results registered per `(engine, selector)`;
/// mutating calls are recorded in the call history.
#[derive(Debug, Default)]
pub struct MockDriver {
    /// Current URL
    pub current_url: String,
    /// Page markup returned by `page_content`
    pub content: String,
    /// Whether `execute_script` is supported
    pub scripting: bool,
    /// Call history for verification
    pub call_history: Vec<String>,
    /// Values set through `set_value`, by element id
    pub values: BTreeMap<String, String>,
    /// Files attached through `attach_file`, by element id
    pub attachments: BTreeMap<String, PathBuf>,
    results: BTreeMap<QueryKey, Vec<ElementHandle>>,
    children: BTreeMap<(String, QueryKey), Vec<ElementHandle>>,
    hidden_for: BTreeMap<QueryKey, usize>,
    queries: RefCell<BTreeMap<QueryKey, usize>>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable script execution
    #[must_use]
    pub const fn with_scripting(mut self, enabled: bool) -> Self {
        self.scripting = enabled;
        self
    }

    /// Set the current URL
    #[must_use]
    pub fn at_url(mut self, url: impl Into<String>) -> Self {
        self.current_url = url.into();
        self
    }

    /// Register the result of a query
    pub fn add_elements(&mut self, engine: Engine, selector: &str, elements: Vec<ElementHandle>) {
        self.results
            .entry((engine, selector.to_string()))
            .or_default()
            .extend(elements);
    }

    /// Register a single element for a query
    pub fn add_element(&mut self, engine: Engine, selector: &str, element: ElementHandle) {
        self.add_elements(engine, selector, vec![element]);
    }

    /// Register elements below `parent` for a query
    pub fn add_children(
        &mut self,
        parent: &ElementHandle,
        engine: Engine,
        selector: &str,
        elements: Vec<ElementHandle>,
    ) {
        self.children
            .entry((parent.id.clone(), (engine, selector.to_string())))
            .or_default()
            .extend(elements);
    }

    /// Keep a query empty for its first `polls` evaluations (late rendering)
    pub fn hide_for(&mut self, engine: Engine, selector: &str, polls: usize) {
        self.hidden_for.insert((engine, selector.to_string()), polls);
    }

    /// How often a query was evaluated
    #[must_use]
    pub fn query_count(&self, engine: Engine, selector: &str) -> usize {
        self.queries
            .borrow()
            .get(&(engine, selector.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// Value set on an element
    #[must_use]
    pub fn value_of(&self, element_id: &str) -> Option<&str> {
        self.values.get(element_id).map(String::as_str)
    }
}

impl WebDriver for MockDriver {
    fn navigate(&mut self, url: &str) -> StepResult<()> {
        self.call_history.push(format!("navigate:{url}"));
        self.current_url = url.to_string();
        Ok(())
    }

    fn current_url(&self) -> StepResult<String> {
        Ok(self.current_url.clone())
    }

    fn find_all(&self, engine: Engine, selector: &str) -> StepResult<Vec<ElementHandle>> {
        let key = (engine, selector.to_string());
        let seen = {
            let mut queries = self.queries.borrow_mut();
            let count = queries.entry(key.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if self.hidden_for.get(&key).is_some_and(|polls| seen <= *polls) {
            return Ok(Vec::new());
        }
        Ok(self.results.get(&key).cloned().unwrap_or_default())
    }

    fn find_all_within(
        &self,
        parent: &ElementHandle,
        engine: Engine,
        selector: &str,
    ) -> StepResult<Vec<ElementHandle>> {
        Ok(self
            .children
            .get(&(parent.id.clone(), (engine, selector.to_string())))
            .cloned()
            .unwrap_or_default())
    }

    fn click(&mut self, element: &ElementHandle) -> StepResult<()> {
        self.call_history.push(format!("click:{}", element.id));
        Ok(())
    }

    fn set_value(&mut self, element: &ElementHandle, value: &str) -> StepResult<()> {
        self.call_history
            .push(format!("set_value:{}={value}", element.id));
        self.values.insert(element.id.clone(), value.to_string());
        Ok(())
    }

    fn attach_file(&mut self, element: &ElementHandle, path: &Path) -> StepResult<()> {
        self.call_history
            .push(format!("attach_file:{}={}", element.id, path.display()));
        self.attachments
            .insert(element.id.clone(), path.to_path_buf());
        Ok(())
    }

    fn execute_script(&mut self, script: &str) -> StepResult<serde_json::Value> {
        if !self.scripting {
            return Err(StepError::UnsupportedCapability {
                capability: "script execution".to_string(),
            });
        }
        self.call_history.push(format!("execute_script:{script}"));
        Ok(serde_json::Value::Null)
    }

    fn page_content(&self) -> StepResult<String> {
        Ok(self.content.clone())
    }
}
