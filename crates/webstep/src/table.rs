//! Gherkin tables and the matchers that check them against the page.
//!
//! Row 0 of every Gherkin table is a header and is never matched.
//!
//! Three disciplines are offered by [`TableMatcher`]:
//!
//! - unordered presence/absence: each expected row is searched independently
//! - sequential order: one cursor walks the actual elements and only ever
//!   moves forward, so gaps are allowed but reordering is not
//! - tabular rows: a key column selects candidate rows, the remaining cells
//!   must match exactly

use serde::{Deserialize, Serialize};

use crate::driver::ElementHandle;
use crate::result::{StepError, StepResult};

/// Table argument of a step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GherkinTable {
    rows: Vec<Vec<String>>,
}

impl GherkinTable {
    /// Create a table from raw rows (row 0 is the header)
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build from string slices
    #[must_use]
    pub fn from_slices(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|c| (*c).to_string()).collect())
                .collect(),
        )
    }

    /// Parse pipe-delimited Gherkin table text.
    ///
    /// Lines not starting with `|` are ignored; `\|` is a literal pipe.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let rows = text
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with('|'))
            .map(parse_row)
            .collect();
        Self::new(rows)
    }

    /// Header row
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows after the header
    #[must_use]
    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// First cell of every data row
    #[must_use]
    pub fn first_column(&self) -> Vec<String> {
        self.data_rows()
            .iter()
            .filter_map(|row| row.first().cloned())
            .collect()
    }

    /// All rows including the header
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// True when there are no data rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_rows().is_empty()
    }
}

fn parse_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line.trim_start_matches('|').chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }
    cells
}

/// Link expected by an ordering check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDescriptor {
    /// Display text (or the text a URL slug is derived from)
    pub text: String,
    /// Parent label, when the table has a second column
    pub parent: Option<String>,
}

impl LinkDescriptor {
    /// Descriptor without a parent
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parent: None,
        }
    }

    /// Descriptors from `| link | parent |` rows (header stripped)
    #[must_use]
    pub fn from_table(table: &GherkinTable) -> Vec<Self> {
        table
            .data_rows()
            .iter()
            .filter_map(|row| {
                row.first().map(|text| Self {
                    text: text.clone(),
                    parent: row.get(1).filter(|p| !p.is_empty()).cloned(),
                })
            })
            .collect()
    }

    /// URL fragment form of the text
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.text)
    }

    /// Href contains the slug, or visible text contains the text
    #[must_use]
    pub fn matches(&self, element: &ElementHandle) -> bool {
        element
            .attribute("href")
            .is_some_and(|href| href.contains(&self.slug()))
            || element.text().contains(&self.text)
    }
}

/// Spaces replaced with hyphens
#[must_use]
pub fn slugify(text: &str) -> String {
    text.replace(' ', "-")
}

/// Text comparison used by unordered checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMatch {
    /// Candidate text contains the expected text
    #[default]
    Contains,
    /// Trimmed candidate text equals the expected text
    Exact,
}

impl TextMatch {
    /// Compare a candidate text against an expected value
    #[must_use]
    pub fn matches(self, candidate: &str, expected: &str) -> bool {
        match self {
            Self::Contains => candidate.contains(expected),
            Self::Exact => candidate.trim() == expected,
        }
    }
}

/// Cell texts read from a DOM table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActualTable {
    /// `th` texts of the first row, if it had only header cells
    pub header: Option<Vec<String>>,
    /// Remaining rows
    pub rows: Vec<Vec<String>>,
}

impl ActualTable {
    /// Column named `name` in the header, else `position`
    #[must_use]
    pub fn column_index(&self, name: &str, position: usize) -> usize {
        self.header
            .as_ref()
            .and_then(|header| {
                header
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
            })
            .unwrap_or(position)
    }
}

/// Matches expected rows against candidate elements
#[derive(Debug, Clone, Copy, Default)]
pub struct TableMatcher {
    mode: TextMatch,
}

impl TableMatcher {
    /// Matcher using `mode` for unordered checks
    #[must_use]
    pub const fn new(mode: TextMatch) -> Self {
        Self { mode }
    }

    /// Substring matching
    #[must_use]
    pub const fn contains() -> Self {
        Self::new(TextMatch::Contains)
    }

    /// Full-text matching
    #[must_use]
    pub const fn exact() -> Self {
        Self::new(TextMatch::Exact)
    }

    fn find<'e>(&self, expected: &str, candidates: &'e [ElementHandle]) -> Option<&'e ElementHandle> {
        candidates
            .iter()
            .find(|c| self.mode.matches(c.text(), expected))
    }

    /// Every expected text must match some candidate.
    ///
    /// `describe` renders the query used in failure messages.
    pub fn assert_all_present<F>(
        &self,
        subject: &str,
        expected: &[String],
        candidates: &[ElementHandle],
        describe: F,
    ) -> StepResult<()>
    where
        F: Fn(&str) -> String,
    {
        for item in expected {
            if self.find(item, candidates).is_none() {
                return Err(StepError::ElementNotFound {
                    subject: subject.to_string(),
                    selector: describe(item),
                    context: Some(format!("no {subject} for '{item}'")),
                });
            }
        }
        Ok(())
    }

    /// No expected text may match any candidate
    pub fn assert_all_absent<F>(
        &self,
        subject: &str,
        expected: &[String],
        candidates: &[ElementHandle],
        describe: F,
    ) -> StepResult<()>
    where
        F: Fn(&str) -> String,
    {
        for item in expected {
            if self.find(item, candidates).is_some() {
                return Err(StepError::ElementUnexpectedlyFound {
                    subject: subject.to_string(),
                    selector: describe(item),
                });
            }
        }
        Ok(())
    }

    /// Check that `expected` appears in `actual` in the same relative order.
    ///
    /// Returns the matched position of every expected item. The cursor
    /// stays on a match, so positions are non-decreasing.
    pub fn assert_sequential_order(
        expected: &[LinkDescriptor],
        actual: &[ElementHandle],
    ) -> StepResult<Vec<usize>> {
        let mut cursor = 0;
        let mut previous = String::new();
        let mut positions = Vec::with_capacity(expected.len());

        for link in expected {
            while cursor < actual.len() && !link.matches(&actual[cursor]) {
                cursor += 1;
            }
            if cursor >= actual.len() {
                return Err(StepError::OrderingViolation {
                    expected: link.text.clone(),
                    previous,
                });
            }
            tracing::trace!(link = %link.text, position = cursor, "link matched");
            positions.push(cursor);
            previous.clone_from(&link.text);
        }

        if positions.len() != expected.len() {
            return Err(StepError::CountMismatch {
                what: "links evaluated".to_string(),
                expected: expected.len(),
                actual: positions.len(),
            });
        }
        Ok(positions)
    }

    /// Every expected data row must match some actual row.
    ///
    /// The first expected column is the key (substring match); the other
    /// columns must be equal after trimming. Columns are found by header
    /// name in `actual`, falling back to position.
    pub fn assert_table_contains(expected: &GherkinTable, actual: &ActualTable) -> StepResult<()> {
        let header = expected
            .header()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| StepError::configuration("expected table needs a header row"))?;
        let columns: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(position, name)| actual.column_index(name, position))
            .collect();

        for row in expected.data_rows() {
            let Some(key) = row.first() else { continue };
            if row.len() > header.len() {
                return Err(StepError::configuration(format!(
                    "table row '{}' has more cells than the header",
                    row.join(",")
                )));
            }
            let found = actual.rows.iter().any(|candidate| {
                let key_matches = candidate
                    .get(columns[0])
                    .is_some_and(|cell| cell.contains(key.as_str()));
                key_matches
                    && row.iter().enumerate().skip(1).all(|(j, want)| {
                        columns
                            .get(j)
                            .and_then(|&col| candidate.get(col))
                            .is_some_and(|cell| cell.trim() == want.trim())
                    })
            });
            if !found {
                return Err(StepError::assertion(format!(
                    "Couldn't find table row '{}'",
                    row.join(",")
                )));
            }
        }
        Ok(())
    }
}
