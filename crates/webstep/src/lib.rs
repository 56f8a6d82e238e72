//! Webstep: Gherkin step definitions for browser tests of a CMS
//!
//! Scenario sentences are matched against a catalog of step patterns. Each
//! step builds XPath/CSS queries from suite configuration, runs them through
//! a [`WebDriver`] and checks the page against the step's table argument.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    WEBSTEP Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Step       │    │ WebDriver  │            │
//! │   │ (Gherkin)  │───►│ Catalog    │───►│ (browser   │            │
//! │   │            │    │            │    │  adapter)  │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           │                                      │
//! │          ┌────────────────┼────────────────┐                     │
//! │          ▼                ▼                ▼                     │
//! │   ┌────────────┐   ┌────────────┐   ┌────────────┐              │
//! │   │ XPath      │   │ Table      │   │ Content    │              │
//! │   │ builders   │   │ matcher    │   │ repository │              │
//! │   └────────────┘   └────────────┘   └────────────┘              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use jugar_webstep::{run_scenario, MockDriver, Scenario, StepCatalog, SuiteConfig};
//!
//! let config = SuiteConfig::new()
//!     .with_base_url("http://localhost")
//!     .with_page("home", "/");
//! let mut steps = StepCatalog::new(MockDriver::new(), config)?;
//!
//! let scenario = Scenario::new("home page")
//!     .given(r#"I am on the "home" page"#)
//!     .then(r#"I see "home" page"#);
//! let report = run_scenario(&mut steps, &scenario);
//! assert!(report.passed());
//! # Ok::<(), jugar_webstep::StepError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Suite configuration: pages, blocks, forms, wait and search settings
pub mod config;
/// Scenario-held data and the content repository boundary
pub mod content;
mod context;
/// Browser driver abstraction and the in-memory mock
pub mod driver;
/// Form data, filling and verification
pub mod form;
/// Bounded-wait element lookup
pub mod locator;
/// Tracing subscriber setup
pub mod logging;
/// Page identifiers and URL handling
pub mod navigator;
/// Scenario execution and reporting
pub mod outcome;
mod result;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod steps;
/// Gherkin tables and DOM matching
pub mod table;
/// XPath query construction
pub mod xpath;

pub use config::{LocatorConfig, SearchConfig, SuiteConfig};
pub use content::{
    ContentFields, ContentHolder, ContentRepository, FieldDefinition, MemoryRepository,
    StoredContent, UnavailableRepository,
};
pub use context::ScenarioContext;
pub use driver::{ElementHandle, Engine, MockDriver, WebDriver};
pub use form::{
    FieldSelection, FieldValue, FillAction, FormDefinition, FormFiller, Setting,
};
pub use locator::{
    ElementLocator, LocatorOptions, Selector, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};
pub use navigator::{PageIdentifierMap, PageNavigator};
pub use outcome::{
    run_scenario, Scenario, ScenarioReport, ScenarioStep, StepKeyword, StepOutcome, StepReport,
    StepRunner,
};
pub use result::{StepError, StepResult};
pub use steps::{StepArgs, StepCatalog, StepDefinition, StepHandler};
pub use table::{ActualTable, GherkinTable, LinkDescriptor, TableMatcher, TextMatch};
pub use xpath::{AttributeContainer, AttributeValues, BlockDescriptor, SemanticType};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::content::*;
    pub use super::context::*;
    pub use super::driver::*;
    pub use super::form::*;
    pub use super::locator::*;
    pub use super::navigator::*;
    pub use super::outcome::*;
    pub use super::result::*;
    pub use super::steps::*;
    pub use super::table::*;
    pub use super::config::*;
    pub use super::xpath::*;
}
