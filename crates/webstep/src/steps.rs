//! Step catalog: sentence patterns bound to browser and content operations.
//!
//! ```text
//!   "I see 3 \"Article\" elements listed"
//!        │
//!        ▼  regex match (first definition accepting the keyword)
//!   ┌─────────────┐     ┌───────────────┐     ┌────────────┐
//!   │ StepCatalog │────►│ ElementLocator│────►│ WebDriver  │
//!   │  handlers   │     │ TableMatcher  │     └────────────┘
//!   │             │────►│ PageNavigator │
//!   │             │────►│ FormFiller    │     ┌────────────────────┐
//!   │             │────────────────────────►  │ ContentRepository  │
//!   └─────────────┘                           └────────────────────┘
//! ```
//!
//! The catalog owns the driver, the repository and the [`ScenarioContext`];
//! nothing is shared between catalogs.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

use crate::config::{SearchConfig, SuiteConfig};
use crate::content::{ContentFields, ContentRepository, FieldDefinition, UnavailableRepository};
use crate::context::ScenarioContext;
use crate::driver::WebDriver;
use crate::form::{
    attach_existing, form_data_from_table, settings_from_multiple_value, FieldSelection, FillAction,
    FormDefinition, FormFiller, Setting,
};
use crate::locator::{ElementLocator, LocatorOptions, Selector};
use crate::navigator::PageNavigator;
use crate::outcome::{StepKeyword, StepRunner};
use crate::result::{StepError, StepResult};
use crate::table::{GherkinTable, LinkDescriptor, TableMatcher};
use crate::xpath;

/// Operation bound to a sentence pattern
pub type StepHandler<D, R> = fn(&mut StepCatalog<D, R>, &StepArgs<'_>) -> StepResult<()>;

/// Any keyword
pub const ANY: &[StepKeyword] = &[StepKeyword::Given, StepKeyword::When, StepKeyword::Then];
const SETUP: &[StepKeyword] = &[StepKeyword::Given, StepKeyword::When];
const CHECK: &[StepKeyword] = &[StepKeyword::Then];

/// Parameters captured from a sentence
#[derive(Debug)]
pub struct StepArgs<'a> {
    params: Vec<String>,
    table: Option<&'a GherkinTable>,
}

impl<'a> StepArgs<'a> {
    /// Captured group `index` (empty when it did not participate)
    #[must_use]
    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map_or("", String::as_str)
    }

    /// Captured group `index` as a count
    pub fn count(&self, index: usize) -> StepResult<usize> {
        let raw = self.param(index);
        raw.parse()
            .map_err(|_| StepError::configuration(format!("'{raw}' is not a count")))
    }

    /// Table argument; steps that need one fail without it
    pub fn table(&self) -> StepResult<&'a GherkinTable> {
        self.table
            .ok_or_else(|| StepError::configuration("this step needs a table argument"))
    }
}

/// A sentence pattern and its operation
pub struct StepDefinition<D, R> {
    keywords: &'static [StepKeyword],
    pattern: Regex,
    handler: StepHandler<D, R>,
}

impl<D, R> StepDefinition<D, R> {
    /// Compile `pattern` for `keywords`
    pub fn new(
        keywords: &'static [StepKeyword],
        pattern: &str,
        handler: StepHandler<D, R>,
    ) -> StepResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            StepError::configuration(format!("invalid step pattern '{pattern}': {e}"))
        })?;
        Ok(Self {
            keywords,
            pattern,
            handler,
        })
    }

    /// `And`/`But` are accepted by every definition
    #[must_use]
    pub fn accepts(&self, keyword: StepKeyword) -> bool {
        matches!(keyword, StepKeyword::And | StepKeyword::But) || self.keywords.contains(&keyword)
    }

    /// Sentence pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl<D, R> fmt::Debug for StepDefinition<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("keywords", &self.keywords)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Every step definition, bound to one browser session
pub struct StepCatalog<D, R = UnavailableRepository> {
    driver: D,
    repository: R,
    config: SuiteConfig,
    navigator: PageNavigator,
    options: LocatorOptions,
    context: ScenarioContext,
    definitions: Vec<StepDefinition<D, R>>,
}

impl<D, R> fmt::Debug for StepCatalog<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepCatalog")
            .field("config", &self.config)
            .field("options", &self.options)
            .field("context", &self.context)
            .field("definitions", &self.definitions.len())
            .finish_non_exhaustive()
    }
}

impl<D: WebDriver> StepCatalog<D, UnavailableRepository> {
    /// Catalog without a content repository
    pub fn new(driver: D, config: SuiteConfig) -> StepResult<Self> {
        Self::with_repository(driver, UnavailableRepository, config)
    }
}

// handlers share one signature, whether or not they touch the session
#[allow(clippy::unused_self)]
impl<D: WebDriver, R: ContentRepository> StepCatalog<D, R> {
    /// Catalog delegating fixture steps to `repository`
    pub fn with_repository(driver: D, repository: R, config: SuiteConfig) -> StepResult<Self> {
        let definitions = Self::builtin_definitions()?;
        tracing::debug!(steps = definitions.len(), "step catalog ready");
        Ok(Self {
            driver,
            repository,
            navigator: config.navigator(),
            options: config.locator.options(),
            context: ScenarioContext::fresh(),
            config,
            definitions,
        })
    }

    /// Override element wait bounds
    #[must_use]
    pub fn with_locator_options(mut self, options: LocatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Browser driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Browser driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Content repository
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// Scenario state
    #[must_use]
    pub const fn context(&self) -> &ScenarioContext {
        &self.context
    }

    /// Scenario state, mutably
    pub fn context_mut(&mut self) -> &mut ScenarioContext {
        &mut self.context
    }

    /// Suite configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Registered definitions, in match order
    #[must_use]
    pub fn definitions(&self) -> &[StepDefinition<D, R>] {
        &self.definitions
    }

    /// Add a definition; it is tried after the built-in ones
    pub fn register(
        &mut self,
        keywords: &'static [StepKeyword],
        pattern: &str,
        handler: StepHandler<D, R>,
    ) -> StepResult<()> {
        self.definitions
            .push(StepDefinition::new(keywords, pattern, handler)?);
        Ok(())
    }

    /// Run the first definition accepting `keyword` whose pattern matches.
    ///
    /// Unmatched sentences fail with [`StepError::UndefinedStep`].
    pub fn execute(
        &mut self,
        keyword: StepKeyword,
        sentence: &str,
        table: Option<&GherkinTable>,
    ) -> StepResult<()> {
        let sentence = sentence.trim();
        let (handler, params) = self
            .definitions
            .iter()
            .filter(|d| d.accepts(keyword))
            .find_map(|d| {
                d.pattern.captures(sentence).map(|caps| {
                    let params = caps
                        .iter()
                        .skip(1)
                        .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                        .collect::<Vec<_>>();
                    (d.handler, params)
                })
            })
            .ok_or_else(|| StepError::UndefinedStep {
                sentence: sentence.to_string(),
            })?;

        tracing::debug!(%keyword, sentence, ?params, "dispatching step");
        handler(self, &StepArgs { params, table })
    }

    fn locator(&self) -> ElementLocator<'_, D> {
        ElementLocator::new(&self.driver, self.options)
    }

    fn filler(&self) -> FormFiller {
        FormFiller::new(self.options)
    }

    fn block_xpath(&self, block: &str) -> String {
        xpath::build_block_xpath(block.trim(), &self.config.blocks)
    }

    fn run_fill(&mut self, actions: &[FillAction]) -> StepResult<()> {
        self.filler()
            .execute(&mut self.driver, actions, &self.context, &self.repository)
    }

    fn held_form(&self, identifier: &str) -> StepResult<FormDefinition> {
        let held = self
            .context
            .content_by_identifier(identifier, &self.repository)?
            .ok_or_else(|| StepError::assertion(format!("No data held for '{identifier}'")))?;
        FormDefinition::from_json(&held)
    }

    #[allow(clippy::too_many_lines)]
    fn builtin_definitions() -> StepResult<Vec<StepDefinition<D, R>>> {
        let mut defs = Vec::new();
        let mut add = |keywords: &'static [StepKeyword], pattern: &str, handler: StepHandler<D, R>| -> StepResult<()> {
            defs.push(StepDefinition::new(keywords, pattern, handler)?);
            Ok(())
        };

        // navigation
        add(SETUP, r#"^(?:|I )am (?:at|on) (?:|the )"([^"]*)" page$"#, Self::go_to_page)?;
        add(CHECK, r#"^(?:|I )am (?:at|on) (?:|the )"([^"]*)" page$"#, Self::on_page)?;
        add(ANY, r#"^(?:|I )go to (?:|the )"([^"]*)"(?:| page)$"#, Self::go_to_page)?;
        add(ANY, r#"^(?:|I )am (?:at|on) the "([^"]*)(?:| page)"$"#, Self::on_page)?;
        add(ANY, r#"^(?:|I )see "([^"]*)" page$"#, Self::on_page)?;
        add(ANY, r#"^(?:|I )should be redirected to "([^"]*)"$"#, Self::redirected_to)?;
        add(ANY, r"^(?:|I )want dump of (?:|the )page$", Self::dump_page)?;
        add(ANY, r#"^(?:|I )am logged in as "([^"]*)" with password "([^"]*)"$"#, Self::logged_in)?;

        // links and buttons
        add(ANY, r#"^(?:|I )click (?:on|at) "([^"]*)" link$"#, Self::follow_link)?;
        add(ANY, r#"^(?:|I )follow "([^"]*)"$"#, Self::follow_link)?;
        add(ANY, r#"^(?:|I )press "([^"]*)"$"#, Self::press_button)?;
        add(ANY, r"^(?:|I )(?:don't|do not) see links(?:|:)$", Self::links_absent)?;
        add(ANY, r"^I (?:don't|do not) see on ([A-Za-z\s]*) the links:$", Self::links_absent_in)?;
        add(ANY, r"^(?:|I )see links for Content objects(?:|:)$", Self::links_present)?;
        add(ANY, r"^I see on ([A-Za-z\s]*) the links for Content objects(?:|:)$", Self::links_present_in)?;
        add(ANY, r"^(?:|I )see links for Content objects in following order(?:|:)$", Self::links_in_order)?;
        add(ANY, r"^I see on ([A-Za-z\s]*) links in following order:$", Self::links_in_order_in)?;
        add(ANY, r"^(?:|I )see links in(?:|:)$", Self::links_in_tags)?;

        // menus, listings, search
        add(ANY, r"^I (?:don't|do not) see(?: the| ) ([A-Za-z\s]*) menu$", Self::menu_absent)?;
        add(ANY, r"^I see (?:the |)([A-Za-z\s]*) menu$", Self::menu_present)?;
        add(ANY, r#"^(?:|I )see (\d+) "([^"]*)" elements listed$"#, Self::listed_elements)?;
        add(ANY, r#"^(?:|I )see (?:the )?"([^"]*)" list with(?:|:)$"#, Self::list_table_contains)?;
        add(ANY, r#"^(?:|I )search for "([^"]*)"$"#, Self::search_for)?;
        add(ANY, r"^(?:|I )see search (\d+) results?$", Self::search_result_count)?;

        // forms
        add(ANY, r#"^(?:|I )fill (?:in )?"([^"]*)" with "([^"]*)"$"#, Self::fill_field)?;
        add(ANY, r#"^(?:|I )attach (?:the )?file "([^"]*)" to "([^"]*)"$"#, Self::attach_file)?;
        add(ANY, r#"^(?:|I )fill (?:the )?"([^"]*)" form$"#, Self::fill_configured_form)?;
        add(ANY, r#"^(?:|I )fill (?:the )?"([^"]*)" form with only "([^"]*)"$"#, Self::fill_configured_form)?;
        add(ANY, r"^(?:|I )fill (?:the )?form with(?:|:)$", Self::fill_form_with_table)?;
        add(ANY, r#"^(?:|I )fill (?:the )?form with data "([^"]*)"$"#, Self::fill_form_with_held)?;
        add(ANY, r#"^(?:|I )(?:fix|keep) data "([^"]*)" with(?:|:)$"#, Self::fix_data)?;
        add(ANY, r#"^(?:|I )see (?:the )?form filled with data "([^"]*)"$"#, Self::form_filled_with)?;

        // content fixtures
        add(ANY, r"^I have an User with$", Self::pending_user)?;
        add(ANY, r#"^I have a Content Type "([^"]*)" with$"#, Self::content_type_with)?;
        add(ANY, r#"^I have a Content object "([^"]*)" of Content Type "([^"]*)" with$"#, Self::content_object_with)?;
        add(ANY, r#"^I have a Content object Draft "([^"]*)" of Content Type "([^"]*)"$"#, Self::content_draft)?;
        add(ANY, r#"^I have a Content object "([^"]*)" of Content Type "([^"]*)"$"#, Self::content_object)?;
        add(ANY, r#"^I have the following Content objects of Content Type "([^"]*)"$"#, Self::pending_content_create)?;
        add(
            ANY,
            r#"^I have (\d+) Content objects of Content Type "([^"]*)" containing (\d+) Content objects of Content Type "([^"]*)"$"#,
            Self::pending_content_create,
        )?;
        add(ANY, r#"^I have an average "([^"]*)" stars with "([^"]*)" votes on Content object "([^"]*)"$"#, Self::pending_votes)?;
        add(ANY, r#"^I (?:don't|do not) have Content object "([^"]*)"$"#, Self::pending_delete)?;
        add(ANY, r#"^I update Content object "([^"]*)" to$"#, Self::pending_update)?;
        add(ANY, r#"^I see Content object "([^"]*)"$"#, Self::content_object_visible)?;
        add(ANY, r#"^I have "([^"]*)" active with$"#, Self::pending_extension)?;
        add(ANY, r#"^I got "([^"]*)" (disabled|enabled)$"#, Self::pending_setting)?;

        // semantic text, kept last: the pattern is broad
        add(ANY, r#"^(?:|I )see (?:the )?"([^"]*)" ([A-Za-z]+)$"#, Self::text_as_type)?;

        Ok(defs)
    }

    // ---------------------------------------------------------------------
    // navigation
    // ---------------------------------------------------------------------

    fn go_to_page(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        self.navigator
            .navigate_to(&mut self.driver, args.param(0))
            .map(|_| ())
    }

    fn on_page(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        self.navigator
            .assert_current_page(&self.driver, args.param(0))
    }

    fn redirected_to(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let target = args.param(0);
        let form = self
            .locator()
            .find_one(&Selector::css(r#"form[name="Redirect"]"#), "redirect form")?;
        let action = form.attribute("action").unwrap_or_default();
        if action == target {
            Ok(())
        } else {
            Err(StepError::assertion(format!(
                "Expected redirect to '{target}' but form targets '{action}'"
            )))
        }
    }

    fn dump_page(&mut self, _args: &StepArgs<'_>) -> StepResult<()> {
        let content = self.driver.page_content()?;
        let url = self.driver.current_url()?;
        tracing::info!(%url, "page dump\n{content}");
        Ok(())
    }

    fn logged_in(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        Err(StepError::pending(format!(
            "log in as '{}' is handled by the driver session",
            args.param(0)
        )))
    }

    // ---------------------------------------------------------------------
    // links and buttons
    // ---------------------------------------------------------------------

    fn follow_link(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let link = self.locator().find_link(args.param(0))?;
        self.driver.click(&link)
    }

    fn press_button(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let button = self.locator().find_button_by_label(args.param(0))?;
        self.driver.click(&button)
    }

    fn links_absent(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        self.check_links_absent("main", args.table()?)
    }

    fn links_absent_in(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        self.check_links_absent(args.param(0), args.table()?)
    }

    fn check_links_absent(&self, block: &str, table: &GherkinTable) -> StepResult<()> {
        let base = self.block_xpath(block);
        let candidates = self
            .locator()
            .find_all(&Selector::xpath(xpath::links_within(&base)))?;
        TableMatcher::exact().assert_all_absent("link", &table.first_column(), &candidates, |text| {
            xpath::link_with_text(&base, text)
        })
    }

    fn links_present(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        self.check_links_present("main", args.table()?)
    }

    fn links_present_in(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        self.check_links_present(args.param(0), args.table()?)
    }

    fn check_links_present(&self, block: &str, table: &GherkinTable) -> StepResult<()> {
        let base = self.block_xpath(block);
        let expected: Vec<String> = LinkDescriptor::from_table(table)
            .into_iter()
            .map(|link| link.text)
            .collect();
        let candidates = self
            .locator()
            .find_all(&Selector::xpath(xpath::links_within(&base)))?;
        TableMatcher::contains().assert_all_present("link", &expected, &candidates, |text| {
            xpath::link_containing_text(&base, text)
        })
    }

    fn links_in_order(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        self.check_link_order("main", args.table()?)
    }

    fn links_in_order_in(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        self.check_link_order(args.param(0), args.table()?)
    }

    fn check_link_order(&self, block: &str, table: &GherkinTable) -> StepResult<()> {
        let base = self.block_xpath(block);
        let available = self
            .locator()
            .find_all(&Selector::xpath(xpath::links_within(&base)))?;
        let expected = LinkDescriptor::from_table(table);
        TableMatcher::assert_sequential_order(&expected, &available).map(|_| ())
    }

    fn links_in_tags(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        for row in args.table()?.data_rows() {
            let [link, type_name] = row.as_slice() else {
                return Err(StepError::configuration(format!(
                    "expected '| link | type |' row, got {row:?}"
                )));
            };
            let tags = xpath::tags_for_semantic_type(type_name)?;
            let expr = xpath::concat_tag_xpath(
                tags,
                &format!("//a[@href and text() = {}]", xpath::literal(link)),
            );
            self.locator().find_one(&Selector::xpath(expr), "link")?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // menus, listings, search
    // ---------------------------------------------------------------------

    fn menu_selector(&self, menu: &str) -> StepResult<Selector> {
        let menu = menu.trim();
        let expr = self.block_xpath(&format!("{menu} menu"));
        if expr.is_empty() {
            return Err(StepError::pending(format!("Menu '{menu}' not defined")));
        }
        Ok(Selector::xpath(expr))
    }

    fn menu_present(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let selector = self.menu_selector(args.param(0))?;
        self.locator().find_one(&selector, "menu").map(|_| ())
    }

    fn menu_absent(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let selector = self.menu_selector(args.param(0))?;
        self.locator().assert_absent(&selector, "menu")
    }

    fn listing_table_xpath(object_type: &str) -> String {
        format!(
            "//table[../h1 = {}]",
            xpath::literal(&format!("{object_type} list"))
        )
    }

    fn listed_elements(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        // the listing has a header row
        let expected = args
            .count(0)?
            .checked_add(1)
            .ok_or_else(|| {
                StepError::configuration(format!("'{}' is too many rows", args.param(0)))
            })?;
        let object_type = args.param(1);
        let locator = self.locator();
        let table = locator.find_one(
            &Selector::xpath(Self::listing_table_xpath(object_type)),
            &format!("listing table for {object_type}"),
        )?;
        let rows = locator.find_all_within(&table, &Selector::css("tr"))?;
        if rows.len() == expected {
            Ok(())
        } else {
            Err(StepError::CountMismatch {
                what: "table rows".to_string(),
                expected,
                actual: rows.len(),
            })
        }
    }

    fn list_table_contains(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let actual = self
            .locator()
            .read_table(&Self::listing_table_xpath(args.param(0)))?;
        TableMatcher::assert_table_contains(args.table()?, &actual)
    }

    fn search_for(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let phrase = args.param(0);
        let search = self.config.search.clone();
        let field = self.locator().find_one(
            &Selector::xpath(format!("//*[@id = {}]", xpath::literal(&search.field_id))),
            "search field",
        )?;
        self.driver.set_value(&field, phrase)?;

        match self.driver.execute_script(&search.submit_script()) {
            Ok(_) => {}
            Err(StepError::UnsupportedCapability { capability }) => {
                tracing::info!(%capability, button = %search.button_label, "submitting search by button");
                let button = self.locator().find_button_by_label(&search.button_label)?;
                self.driver.click(&button)?;
            }
            Err(e) => return Err(e),
        }

        self.context.prior_search_phrase = phrase.to_string();
        Ok(())
    }

    fn search_result_count(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let count = args.count(0)?;
        let element = self.locator().find_one(
            &Selector::infer(self.config.search.result_selector.as_str()),
            "result count text",
        )?;
        let expected = SearchConfig::expected_result_text(&self.context.prior_search_phrase, count);
        let actual = element.text().trim();
        if actual == expected {
            Ok(())
        } else {
            Err(StepError::assertion(format!(
                "Expected '{expected}' but found '{actual}'"
            )))
        }
    }

    fn text_as_type(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let tags = xpath::tags_for_semantic_type(args.param(1))?;
        let expr = xpath::concat_tag_xpath(
            tags,
            &format!("[contains(text(), {})]", xpath::literal(args.param(0))),
        );
        self.locator()
            .find_one(&Selector::xpath(expr), args.param(1))
            .map(|_| ())
    }

    // ---------------------------------------------------------------------
    // forms
    // ---------------------------------------------------------------------

    fn fill_field(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let action = FillAction::Fill {
            field: args.param(0).to_string(),
            value: args.param(1).to_string(),
        };
        self.run_fill(&[action])
    }

    fn attach_file(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let (file, field) = (args.param(0), args.param(1));
        let path = self
            .context
            .file_by_identifier(file, &self.repository)?
            .unwrap_or_else(|| PathBuf::from(file));
        let input = self.locator().find_field(field)?;
        attach_existing(&mut self.driver, &input, path.clone())?;
        self.context
            .content
            .insert(field, path.display().to_string());
        Ok(())
    }

    fn fill_configured_form(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let name = args.param(0);
        let form = self.config.form(name)?.clone();
        let actions = FormFiller::plan(&form, &FieldSelection::parse(args.param(1)))?;
        self.run_fill(&actions)?;
        self.context.content.insert(name, form.to_json()?);
        Ok(())
    }

    fn fill_form_with_table(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let form = form_data_from_table(args.table()?)?;
        let actions = FormFiller::plan(&form, &FieldSelection::All)?;
        self.run_fill(&actions)
    }

    fn fill_form_with_held(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let form = self.held_form(args.param(0))?;
        let actions = FormFiller::plan(&form, &FieldSelection::All)?;
        self.run_fill(&actions)
    }

    fn fix_data(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let form = form_data_from_table(args.table()?)?;
        self.context.content.insert(args.param(0), form.to_json()?);
        Ok(())
    }

    fn form_filled_with(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let form = self.held_form(args.param(0))?;
        self.filler().assert_filled(&self.driver, &form)
    }

    // ---------------------------------------------------------------------
    // content fixtures
    // ---------------------------------------------------------------------

    fn content_type_with(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let fields = FieldDefinition::from_table(args.table()?)?;
        self.repository
            .create_content_type(args.param(0), &fields)
    }

    fn content_object_with(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let (identifier, content_type) = (args.param(0), args.param(1));
        let data = form_data_from_table(args.table()?)?.to_json()?;
        let fields: ContentFields = match &data {
            Value::Object(map) => map.clone().into_iter().collect(),
            _ => ContentFields::new(),
        };
        let content_id = self
            .repository
            .create_content(identifier, content_type, &fields)?;
        self.repository.publish_version(&content_id)?;
        self.context.content.insert(identifier, data);
        Ok(())
    }

    fn content_draft(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        self.repository
            .create_content(args.param(0), args.param(1), &ContentFields::new())
            .map(|_| ())
    }

    fn content_object(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let content_id =
            self.repository
                .create_content(args.param(0), args.param(1), &ContentFields::new())?;
        self.repository.publish_version(&content_id)
    }

    fn content_object_visible(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let identifier = args.param(0);
        let data = self
            .context
            .content_by_identifier(identifier, &self.repository)?
            .ok_or_else(|| StepError::assertion(format!("Content object '{identifier}' is unknown")))?;
        let label = ["title", "name"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_str))
            .unwrap_or(identifier)
            .to_string();
        let base = self.block_xpath("main");
        self.locator()
            .find_one(
                &Selector::xpath(xpath::link_containing_text(&base, &label)),
                "link",
            )
            .map(|_| ())
    }

    fn pending_user(&mut self, _args: &StepArgs<'_>) -> StepResult<()> {
        Err(StepError::pending("Content managing: User create"))
    }

    fn pending_content_create(&mut self, _args: &StepArgs<'_>) -> StepResult<()> {
        Err(StepError::pending("Content managing: Content create"))
    }

    fn pending_votes(&mut self, _args: &StepArgs<'_>) -> StepResult<()> {
        Err(StepError::pending("Content managing: voting system"))
    }

    fn pending_delete(&mut self, _args: &StepArgs<'_>) -> StepResult<()> {
        Err(StepError::pending("Content managing: Content delete"))
    }

    fn pending_update(&mut self, _args: &StepArgs<'_>) -> StepResult<()> {
        Err(StepError::pending("Content managing: Content update"))
    }

    fn pending_extension(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        Err(StepError::pending(format!(
            "System managing: enable '{}' with definitions",
            args.param(0)
        )))
    }

    fn pending_setting(&mut self, args: &StepArgs<'_>) -> StepResult<()> {
        let name = match settings_from_multiple_value(args.param(0)) {
            Setting::Plain(name) => name,
            Setting::Single { key, .. } | Setting::Multiple { key, .. } => key,
        };
        Err(StepError::pending(format!(
            "Define {} '{name}'",
            args.param(1).trim_end_matches('d')
        )))
    }
}

impl<D: WebDriver, R: ContentRepository> StepRunner for StepCatalog<D, R> {
    fn begin_scenario(&mut self) {
        self.context.reset();
    }

    fn run_step(
        &mut self,
        keyword: StepKeyword,
        sentence: &str,
        table: Option<&GherkinTable>,
    ) -> StepResult<()> {
        self.execute(keyword, sentence, table)
    }
}
