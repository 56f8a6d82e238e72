//! Form data and the fill plans derived from it.
//!
//! A [`FormDefinition`] keeps field order, so a plan fills fields in the
//! order they were configured. Multi-value fields become a
//! [`FillAction::FillTable`], filled into the inputs whose id contains the
//! field name.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

use crate::content::ContentRepository;
use crate::context::ScenarioContext;
use crate::driver::{ElementHandle, WebDriver};
use crate::locator::{ElementLocator, LocatorOptions};
use crate::result::{StepError, StepResult};
use crate::table::GherkinTable;

/// Item of a multi-value field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldRow {
    /// Single cell; consecutive cells share a row
    Cell(String),
    /// A whole row
    Row(Vec<String>),
}

/// Value of a form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Plain text
    Scalar(String),
    /// Multi-value widget content
    Multi(Vec<FieldRow>),
}

/// Any YAML/JSON scalar read as the text a user would type
struct ScalarText(String);

impl<'de> Deserialize<'de> for ScalarText {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = ScalarText;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, number or boolean")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }

            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<ScalarText, E> {
                Ok(ScalarText(v))
            }

            fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }

            // `field: ~` is an empty value
            fn visit_unit<E: serde::de::Error>(self) -> Result<ScalarText, E> {
                Ok(ScalarText(String::new()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

impl<'de> Deserialize<'de> for FieldRow {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Cell(ScalarText),
            Row(Vec<ScalarText>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Cell(cell) => Self::Cell(cell.0),
            Repr::Row(row) => Self::Row(row.into_iter().map(|c| c.0).collect()),
        })
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Scalar(ScalarText),
            Multi(Vec<FieldRow>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Scalar(value) => Self::Scalar(value.0),
            Repr::Multi(items) => Self::Multi(items),
        })
    }
}

impl FieldValue {
    /// Scalar value
    #[must_use]
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    /// One-row multi value
    #[must_use]
    pub fn cells<S: AsRef<str>>(values: &[S]) -> Self {
        Self::Multi(
            values
                .iter()
                .map(|v| FieldRow::Cell(v.as_ref().to_string()))
                .collect(),
        )
    }

    /// Rows of a multi value; a scalar is a single one-cell row
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<String>> {
        match self {
            Self::Scalar(value) => vec![vec![value.clone()]],
            Self::Multi(items) => {
                let mut rows = Vec::new();
                let mut line: Vec<String> = Vec::new();
                for item in items {
                    match item {
                        FieldRow::Cell(cell) => line.push(cell.clone()),
                        FieldRow::Row(row) => {
                            if !line.is_empty() {
                                rows.push(std::mem::take(&mut line));
                            }
                            rows.push(row.clone());
                        }
                    }
                }
                if !line.is_empty() {
                    rows.push(line);
                }
                rows
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(value) => f.write_str(value),
            Self::Multi(_) => {
                let rows: Vec<String> = self.rows().iter().map(|r| r.join(", ")).collect();
                f.write_str(&rows.join("; "))
            }
        }
    }
}

/// Ordered field name to value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormDefinition {
    fields: Vec<(String, FieldValue)>,
}

impl FormDefinition {
    /// Empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, keeping its original position when it already exists
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Value of a field
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Fields in configured order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// No fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON object form, for the content holder
    pub fn to_json(&self) -> StepResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Read back a form stored with [`FormDefinition::to_json`]
    pub fn from_json(value: &serde_json::Value) -> StepResult<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

impl Serialize for FormDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FormDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FormVisitor;

        impl<'de> Visitor<'de> for FormVisitor {
            type Value = FormDefinition;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut form = FormDefinition::new();
                while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
                    form.insert(name, value);
                }
                Ok(form)
            }
        }

        deserializer.deserialize_map(FormVisitor)
    }
}

/// Which fields a plan touches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldSelection {
    /// Every field
    #[default]
    All,
    /// A single field
    One(String),
    /// A set of fields
    Many(Vec<String>),
}

impl FieldSelection {
    /// Comma-separated field names; empty input selects everything
    #[must_use]
    pub fn parse(list: &str) -> Self {
        let names: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        match names.len() {
            0 => Self::All,
            1 => Self::One(names.into_iter().next().unwrap_or_default()),
            _ => Self::Many(names),
        }
    }

    /// Whether `field` is selected
    #[must_use]
    pub fn selects(&self, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::One(name) => name == field,
            Self::Many(names) => names.iter().any(|n| n == field),
        }
    }
}

/// One atomic form operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillAction {
    /// Set a single field
    Fill {
        /// Field locator
        field: String,
        /// Value (or alias token)
        value: String,
    },
    /// Fill a multi-value widget row by row
    FillTable {
        /// Field name, matched against input ids
        field: String,
        /// Rows of cell values
        rows: Vec<Vec<String>>,
    },
}

impl FillAction {
    /// Field the action targets
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Fill { field, .. } | Self::FillTable { field, .. } => field,
        }
    }
}

/// Single uppercase ASCII letter, standing for held data
#[must_use]
pub fn is_alias_token(value: &str) -> bool {
    value.len() == 1 && value.bytes().all(|b| b.is_ascii_uppercase())
}

/// Plans and performs form filling
#[derive(Debug, Clone, Copy, Default)]
pub struct FormFiller {
    options: LocatorOptions,
}

impl FormFiller {
    /// Filler locating fields with `options`
    #[must_use]
    pub const fn new(options: LocatorOptions) -> Self {
        Self { options }
    }

    /// Actions for the selected fields, in form order.
    ///
    /// Unselected fields are skipped, not cleared.
    pub fn plan(form: &FormDefinition, only: &FieldSelection) -> StepResult<Vec<FillAction>> {
        if form.is_empty() {
            return Err(StepError::configuration("form data is empty"));
        }
        Ok(form
            .iter()
            .filter(|(name, _)| only.selects(name))
            .map(|(name, value)| match value {
                FieldValue::Scalar(v) => FillAction::Fill {
                    field: name.to_string(),
                    value: v.clone(),
                },
                FieldValue::Multi(_) => FillAction::FillTable {
                    field: name.to_string(),
                    rows: value.rows(),
                },
            })
            .collect())
    }

    /// Run `actions` against the page
    pub fn execute<D, R>(
        &self,
        driver: &mut D,
        actions: &[FillAction],
        context: &ScenarioContext,
        repository: &R,
    ) -> StepResult<()>
    where
        D: WebDriver + ?Sized,
        R: ContentRepository + ?Sized,
    {
        for action in actions {
            match action {
                FillAction::Fill { field, value } => {
                    let element = ElementLocator::new(&*driver, self.options).find_field(field)?;
                    Self::fill_element(driver, &element, value, context, repository)?;
                }
                FillAction::FillTable { field, rows } => {
                    let inputs = ElementLocator::new(&*driver, self.options)
                        .find_fields_by_partial_id(field)?;
                    let cells: Vec<&String> = rows.iter().flatten().collect();
                    if inputs.len() < cells.len() {
                        return Err(StepError::CountMismatch {
                            what: format!("inputs for '{field}'"),
                            expected: cells.len(),
                            actual: inputs.len(),
                        });
                    }
                    for (input, cell) in inputs.iter().zip(cells) {
                        Self::fill_element(driver, input, cell, context, repository)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn fill_element<D, R>(
        driver: &mut D,
        element: &ElementHandle,
        value: &str,
        context: &ScenarioContext,
        repository: &R,
    ) -> StepResult<()>
    where
        D: WebDriver + ?Sized,
        R: ContentRepository + ?Sized,
    {
        if element.is_file_input() {
            let path = context
                .file_by_identifier(value, repository)?
                .unwrap_or_else(|| PathBuf::from(value));
            return attach_existing(driver, element, path);
        }
        let resolved = resolve_value(value, context, repository)?;
        tracing::debug!(element = %element.id, "filling field");
        driver.set_value(element, &resolved)
    }

    /// Every field of `form` must show its value on the page.
    ///
    /// Multi-value cells are compared in order against the inputs whose id
    /// contains the field name, the same inputs [`FillAction::FillTable`]
    /// writes to.
    pub fn assert_filled<D: WebDriver + ?Sized>(
        &self,
        driver: &D,
        form: &FormDefinition,
    ) -> StepResult<()> {
        let locator = ElementLocator::new(driver, self.options);
        for (name, value) in form.iter() {
            match value {
                FieldValue::Scalar(expected) => {
                    let element = locator.find_field(name)?;
                    assert_shows(name, &element, expected)?;
                }
                FieldValue::Multi(_) => {
                    let inputs = locator.find_fields_by_partial_id(name)?;
                    let cells: Vec<String> = value.rows().into_iter().flatten().collect();
                    if inputs.len() < cells.len() {
                        return Err(StepError::CountMismatch {
                            what: format!("inputs for '{name}'"),
                            expected: cells.len(),
                            actual: inputs.len(),
                        });
                    }
                    for (input, cell) in inputs.iter().zip(&cells) {
                        assert_shows(name, input, cell)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn assert_shows(name: &str, element: &ElementHandle, expected: &str) -> StepResult<()> {
    let actual = element.attribute("value").unwrap_or_else(|| element.text());
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::assertion(format!(
            "Field '{name}' expected '{expected}' but was '{actual}'"
        )))
    }
}

/// Attach `path` after checking it exists
pub fn attach_existing<D: WebDriver + ?Sized>(
    driver: &mut D,
    element: &ElementHandle,
    path: PathBuf,
) -> StepResult<()> {
    if !path.is_file() {
        return Err(StepError::MissingFile {
            path: path.display().to_string(),
        });
    }
    driver.attach_file(element, &path)
}

fn resolve_value<R: ContentRepository + ?Sized>(
    value: &str,
    context: &ScenarioContext,
    repository: &R,
) -> StepResult<String> {
    if !is_alias_token(value) {
        return Ok(value.to_string());
    }
    match context.content_by_identifier(value, repository)? {
        Some(serde_json::Value::String(held)) => Ok(held),
        Some(other) => Ok(other.to_string()),
        None => Err(StepError::pending(format!("no data held for '{value}'"))),
    }
}

/// Form data from `| field | value ... |` rows (header stripped).
///
/// Rows with up to two non-empty cells give a scalar (empty when the value
/// cell is missing); more give a multi value. Later rows win.
pub fn form_data_from_table(table: &GherkinTable) -> StepResult<FormDefinition> {
    let mut form = FormDefinition::new();
    for row in table.data_rows() {
        let Some(field) = row.first() else { continue };
        let filled = row.iter().filter(|c| !c.is_empty()).count();
        let value = if filled <= 2 {
            FieldValue::scalar(row.get(1).cloned().unwrap_or_default())
        } else {
            FieldValue::cells(&row[1..])
        };
        form.insert(field.clone(), value);
    }
    if form.is_empty() {
        return Err(StepError::configuration("table has no form data"));
    }
    Ok(form)
}

/// Parsed `key:value[:value...]` setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    /// No `:` present
    Plain(String),
    /// `key:value`
    Single {
        /// Setting name
        key: String,
        /// Setting value
        value: String,
    },
    /// `key:v1:v2...`
    Multiple {
        /// Setting name
        key: String,
        /// Setting values
        values: Vec<String>,
    },
}

/// Split a `key:v1:v2` setting
#[must_use]
pub fn settings_from_multiple_value(value: &str) -> Setting {
    let mut parts = value.split(':');
    let key = parts.next().unwrap_or_default().to_string();
    let mut values: Vec<String> = parts.map(str::to_string).collect();
    match values.len() {
        0 => Setting::Plain(value.to_string()),
        1 => Setting::Single {
            key,
            value: values.remove(0),
        },
        _ => Setting::Multiple { key, values },
    }
}
