//! Suite configuration (webstep.yaml / webstep.json).
//!
//! ```yaml
//! base_url: http://localhost
//! pages:
//!   home: /
//!   search: /content/search
//! blocks:
//!   main: "//div[@id='page']"
//!   top menu: { tag: nav, class: top-menu }
//! forms:
//!   article:
//!     title: Hello
//!     authors: [A, B]
//! locator:
//!   timeout_ms: 2000
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::form::FormDefinition;
use crate::locator::{LocatorOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::navigator::{PageIdentifierMap, PageNavigator};
use crate::result::{StepError, StepResult};
use crate::xpath::BlockDescriptor;

/// Configuration shared by every scenario of a suite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Prefix for page paths
    #[serde(default)]
    pub base_url: String,

    /// Page identifiers to paths
    #[serde(default)]
    pub pages: PageIdentifierMap,

    /// Block identifiers to root descriptors
    #[serde(default)]
    pub blocks: BTreeMap<String, BlockDescriptor>,

    /// Named forms with their default data
    #[serde(default)]
    pub forms: BTreeMap<String, FormDefinition>,

    /// Element wait settings
    #[serde(default)]
    pub locator: LocatorConfig,

    /// Site search settings
    #[serde(default)]
    pub search: SearchConfig,
}

/// Element wait settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Wait bound for single-element lookups
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between lookups
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl LocatorConfig {
    /// Locator options for these settings
    #[must_use]
    pub const fn options(&self) -> LocatorOptions {
        LocatorOptions::immediate()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Site search settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Id of the search input
    #[serde(default = "default_search_field_id")]
    pub field_id: String,

    /// CSS selector of the search form, submitted by script
    #[serde(default = "default_search_form")]
    pub form_selector: String,

    /// Button clicked when the driver cannot run scripts
    #[serde(default = "default_search_button")]
    pub button_label: String,

    /// CSS selector of the result-count element
    #[serde(default = "default_result_selector")]
    pub result_selector: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            field_id: default_search_field_id(),
            form_selector: default_search_form(),
            button_label: default_search_button(),
            result_selector: default_result_selector(),
        }
    }
}

impl SearchConfig {
    /// Script submitting the search form
    #[must_use]
    pub fn submit_script(&self) -> String {
        let selector = serde_json::Value::String(self.form_selector.clone());
        format!("(function(){{ document.querySelector({selector}).submit(); }})()")
    }

    /// Result-count text expected for `phrase` and `count`
    #[must_use]
    pub fn expected_result_text(phrase: &str, count: usize) -> String {
        format!("Search for \"{phrase}\" returned {count} matches")
    }
}

fn default_search_field_id() -> String {
    "site-wide-search-field".to_string()
}

fn default_search_form() -> String {
    "#site-wide-search".to_string()
}

fn default_search_button() -> String {
    "SearchButton".to_string()
}

fn default_result_selector() -> String {
    "div.feedback".to_string()
}

impl SuiteConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> StepResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Parse JSON
    pub fn from_json_str(json: &str) -> StepResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> StepResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config = match extension.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml_str(&text)?,
            Some("json") => Self::from_json_str(&text)?,
            _ => {
                return Err(StepError::configuration(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };
        tracing::info!(
            path = %path.display(),
            pages = config.pages.len(),
            blocks = config.blocks.len(),
            forms = config.forms.len(),
            "suite config loaded"
        );
        Ok(config)
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Add a page
    #[must_use]
    pub fn with_page(mut self, identifier: impl Into<String>, path: impl Into<String>) -> Self {
        self.pages = self.pages.with_page(identifier, path);
        self
    }

    /// Add a block descriptor
    #[must_use]
    pub fn with_block(mut self, identifier: impl Into<String>, descriptor: BlockDescriptor) -> Self {
        self.blocks.insert(identifier.into(), descriptor);
        self
    }

    /// Add a named form
    #[must_use]
    pub fn with_form(mut self, name: impl Into<String>, form: FormDefinition) -> Self {
        self.forms.insert(name.into(), form);
        self
    }

    /// Set element wait bounds
    #[must_use]
    pub const fn with_locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    /// Set search settings
    #[must_use]
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Navigator for the configured pages
    #[must_use]
    pub fn navigator(&self) -> PageNavigator {
        PageNavigator::new(self.pages.clone(), self.base_url.clone())
    }

    /// Form named `name`; missing forms are a configuration error
    pub fn form(&self, name: &str) -> StepResult<&FormDefinition> {
        self.forms
            .get(name)
            .ok_or_else(|| StepError::configuration(format!("form '{name}' is not configured")))
    }
}
