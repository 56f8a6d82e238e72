//! XPath query construction.
//!
//! Pure functions that turn declarative descriptors (block attribute maps,
//! semantic tag types, literal text) into XPath expressions. Every
//! user-supplied string goes through [`literal`], so quote characters never
//! leak into the expression unescaped.
//!
//! # Example
//!
//! ```
//! use jugar_webstep::xpath::{build_block_xpath, literal, BlockDescriptor};
//! use std::collections::BTreeMap;
//!
//! let mut blocks = BTreeMap::new();
//! blocks.insert("menu".to_string(), BlockDescriptor::tag("nav"));
//! assert_eq!(build_block_xpath("menu", &blocks), "//nav");
//! assert_eq!(literal("it's"), "\"it's\"");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::result::{StepError, StepResult};

/// Pseudo-attribute that targets the text node instead of an attribute
pub const TEXT_KEY: &str = "text";

/// Separator between union branches
const UNION: &str = " | ";

/// Escape `text` as an XPath string literal.
///
/// Text without single quotes is wrapped in single quotes, text without
/// double quotes in double quotes; text containing both is rendered as a
/// `concat()` call that splices in `"'"` for every single quote.
#[must_use]
pub fn literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }

    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find('\'') {
        parts.push(format!("'{}'", &rest[..pos]));
        parts.push("\"'\"".to_string());
        rest = &rest[pos + 1..];
    }
    parts.push(format!("'{rest}'"));

    format!("concat({})", parts.join(","))
}

/// Heuristic: a configured string starting with `/` or `(` is already an
/// XPath expression.
///
/// This only sniffs the first character; it is not a syntax check.
#[must_use]
pub fn looks_like_xpath(candidate: &str) -> bool {
    candidate.starts_with('/') || candidate.starts_with('(')
}

/// One or many values for an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValues {
    /// Single value
    One(String),
    /// Several values
    Many(Vec<String>),
}

impl AttributeValues {
    /// Values as a slice-like vector of borrowed strings
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(v) => vec![v.as_str()],
            Self::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for AttributeValues {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<Vec<&str>> for AttributeValues {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Root selector descriptor for a named page block ("main", "menu", ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BlockDescriptor {
    /// Expression used verbatim
    RawXPath(String),
    /// Bare tag name, rendered as `//tag`
    TagName(String),
    /// Optional tag plus required substrings per attribute
    AttributeMatch {
        /// Element tag (wildcard when absent)
        #[serde(skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        /// Attribute name (or `text`) to required substrings
        #[serde(flatten)]
        attrs: BTreeMap<String, AttributeValues>,
    },
}

impl BlockDescriptor {
    /// Classify a configured string as raw XPath or tag name
    #[must_use]
    pub fn from_config_str(value: impl Into<String>) -> Self {
        let value = value.into();
        if looks_like_xpath(&value) {
            Self::RawXPath(value)
        } else {
            Self::TagName(value)
        }
    }

    /// Bare tag descriptor
    #[must_use]
    pub fn tag(name: impl Into<String>) -> Self {
        Self::TagName(name.into())
    }

    /// Structured descriptor with no attributes yet
    #[must_use]
    pub fn matching(tag: Option<&str>) -> Self {
        Self::AttributeMatch {
            tag: tag.map(str::to_string),
            attrs: BTreeMap::new(),
        }
    }

    /// Add a required substring for `attr` (structured descriptors only)
    #[must_use]
    pub fn with_attr(mut self, attr: &str, value: impl Into<AttributeValues>) -> Self {
        if let Self::AttributeMatch { attrs, .. } = &mut self {
            attrs.insert(attr.to_string(), value.into());
        }
        self
    }

    /// Render this descriptor as XPath
    #[must_use]
    pub fn to_xpath(&self) -> String {
        match self {
            Self::RawXPath(raw) => raw.clone(),
            Self::TagName(tag) => format!("//{tag}"),
            Self::AttributeMatch { tag, attrs } => {
                let mut xpath = match tag {
                    Some(tag) => format!("//{tag}"),
                    None => "//*".to_string(),
                };
                for (attr, values) in attrs {
                    let target = if attr == TEXT_KEY {
                        "text()".to_string()
                    } else {
                        format!("@{attr}")
                    };
                    let checks: Vec<String> = values
                        .values()
                        .into_iter()
                        .map(|v| format!("contains({target}, {})", literal(v)))
                        .collect();
                    if !checks.is_empty() {
                        xpath.push_str(&format!("[{}]", checks.join(" and ")));
                    }
                }
                xpath
            }
        }
    }
}

impl<'de> Deserialize<'de> for BlockDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Structured {
                #[serde(default)]
                tag: Option<String>,
                #[serde(flatten)]
                attrs: BTreeMap<String, AttributeValues>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(value) => Self::from_config_str(value),
            Repr::Structured { tag, attrs } => Self::AttributeMatch { tag, attrs },
        })
    }
}

impl fmt::Display for BlockDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xpath())
    }
}

/// Render the XPath for `block_id`.
///
/// Returns an empty string when the block has no descriptor; callers treat
/// that as "no constraint" (or as an unsupported block where one is
/// required).
#[must_use]
pub fn build_block_xpath(block_id: &str, blocks: &BTreeMap<String, BlockDescriptor>) -> String {
    blocks
        .get(block_id)
        .map(BlockDescriptor::to_xpath)
        .unwrap_or_default()
}

/// Semantic text types with a fixed tag mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    /// topic / header / title
    Heading,
    /// list item
    List,
}

impl SemanticType {
    /// Parse a (case-insensitive) type name
    pub fn parse(type_name: &str) -> StepResult<Self> {
        match type_name.trim().to_lowercase().as_str() {
            "topic" | "header" | "title" => Ok(Self::Heading),
            "list" => Ok(Self::List),
            _ => Err(StepError::UnsupportedType {
                type_name: type_name.to_string(),
            }),
        }
    }

    /// Tags that carry this type
    #[must_use]
    pub const fn tags(self) -> &'static [&'static str] {
        match self {
            Self::Heading => &["h1", "h2", "h3"],
            Self::List => &["li"],
        }
    }
}

/// Tags registered for a semantic type name.
///
/// Unknown types fail with [`StepError::UnsupportedType`], never an empty
/// set.
pub fn tags_for_semantic_type(type_name: &str) -> StepResult<&'static [&'static str]> {
    SemanticType::parse(type_name).map(SemanticType::tags)
}

/// Build `//tag1<suffix> | //tag2<suffix> | ...`
#[must_use]
pub fn concat_tag_xpath<S: AsRef<str>>(tags: &[S], suffix: &str) -> String {
    tags.iter()
        .map(|tag| format!("//{}{suffix}", tag.as_ref()))
        .collect::<Vec<_>>()
        .join(UNION)
}

/// Attribute search input: a bare id/class value or an attribute map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeContainer {
    /// Matched against `@id` or `@class`
    IdOrClass(String),
    /// Attribute name to accepted value(s)
    Attributes(BTreeMap<String, AttributeValues>),
}

/// Build an attribute search expression.
///
/// A bare value yields `@id = lit or @class = lit`. A map yields one clause
/// per attribute joined with `and`; attributes with several accepted values
/// become a parenthesized `or` group. With `wrap_in_predicate` the result is
/// returned as `//*[...]`.
#[must_use]
pub fn attribute_search_expr(container: &AttributeContainer, wrap_in_predicate: bool) -> String {
    let expr = match container {
        AttributeContainer::IdOrClass(value) => {
            let lit = literal(value);
            format!("@id = {lit} or @class = {lit}")
        }
        AttributeContainer::Attributes(attrs) => attrs
            .iter()
            .filter_map(|(attr, values)| match values {
                AttributeValues::One(v) => Some(format!("@{attr} = {}", literal(v))),
                AttributeValues::Many(vs) if vs.is_empty() => None,
                AttributeValues::Many(vs) => Some(format!(
                    "({})",
                    vs.iter()
                        .map(|v| format!("@{attr} = {}", literal(v)))
                        .collect::<Vec<_>>()
                        .join(" or ")
                )),
            })
            .collect::<Vec<_>>()
            .join(" and "),
    };

    if wrap_in_predicate {
        format!("//*[{expr}]")
    } else {
        expr
    }
}

/// Append a descendant path to a base expression.
///
/// Union bases are parenthesized so the descendant step applies to every
/// branch; an empty base leaves the descendant path unscoped.
#[must_use]
pub fn scoped(base: &str, descendant: &str) -> String {
    if base.is_empty() {
        descendant.to_string()
    } else if base.contains('|') && !(base.starts_with('(') && base.ends_with(')')) {
        format!("({base}){descendant}")
    } else {
        format!("{base}{descendant}")
    }
}

/// Links whose text equals `text` exactly
#[must_use]
pub fn link_with_text(base: &str, text: &str) -> String {
    scoped(base, &format!("//a[text() = {}][@href]", literal(text)))
}

/// Links whose text contains `text`
#[must_use]
pub fn link_containing_text(base: &str, text: &str) -> String {
    scoped(base, &format!("//a[contains(text(), {})][@href]", literal(text)))
}

/// Links addressed by id, title or (partial) text
#[must_use]
pub fn link_by_locator(locator: &str) -> String {
    let lit = literal(locator);
    format!(
        "//a[@href][@id = {lit} or contains(normalize-space(string(.)), {lit}) or contains(@title, {lit})]"
    )
}

/// Every link under `base`
#[must_use]
pub fn links_within(base: &str) -> String {
    scoped(base, "//a[@href]")
}

/// Buttons whose label, id or name matches `label`
#[must_use]
pub fn button_by_label(label: &str) -> String {
    let lit = literal(label);
    format!(
        "//button[contains(normalize-space(.), {lit}) or @id = {lit} or @name = {lit}]{UNION}\
         //input[(@type = 'submit' or @type = 'button' or @type = 'reset' or @type = 'image') \
         and (contains(@value, {lit}) or @id = {lit} or @name = {lit})]"
    )
}

/// Inputs whose id contains `fragment`
#[must_use]
pub fn field_by_partial_id(fragment: &str) -> String {
    format!("//input[contains(@id, {})]", literal(fragment))
}

/// Form fields addressed by id, name, placeholder or label text
#[must_use]
pub fn field_by_locator(locator: &str) -> String {
    let lit = literal(locator);
    let by_attr = format!("[@id = {lit} or @name = {lit} or @placeholder = {lit}]");
    let by_label = format!("[@id = //label[normalize-space(.) = {lit}]/@for]");
    ["input", "textarea", "select"]
        .iter()
        .flat_map(|tag| [format!("//{tag}{by_attr}"), format!("//{tag}{by_label}")])
        .collect::<Vec<_>>()
        .join(UNION)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Evaluate an XPath string-literal expression (plain literal or
    /// `concat()` of literals) back into the string it denotes.
    fn decode_literal(expr: &str) -> Option<String> {
        fn quoted(s: &str) -> Option<(String, &str)> {
            let quote = s.chars().next()?;
            if quote != '\'' && quote != '"' {
                return None;
            }
            let body = &s[1..];
            let end = body.find(quote)?;
            Some((body[..end].to_string(), &body[end + 1..]))
        }

        if let Some(inner) = expr.strip_prefix("concat(").and_then(|e| e.strip_suffix(')')) {
            let mut out = String::new();
            let mut rest = inner;
            loop {
                let (part, tail) = quoted(rest)?;
                out.push_str(&part);
                match tail.strip_prefix(',') {
                    Some(next) => rest = next,
                    None if tail.is_empty() => return Some(out),
                    None => return None,
                }
            }
        }

        let (value, tail) = quoted(expr)?;
        tail.is_empty().then_some(value)
    }

    mod literal_tests {
        use super::*;

        #[test]
        fn test_plain_text_uses_single_quotes() {
            assert_eq!(literal("Home"), "'Home'");
        }

        #[test]
        fn test_single_quote_switches_to_double_quotes() {
            assert_eq!(literal("it's"), "\"it's\"");
        }

        #[test]
        fn test_double_quote_keeps_single_quotes() {
            assert_eq!(literal("say \"hi\""), "'say \"hi\"'");
        }

        #[test]
        fn test_both_quotes_use_concat() {
            let lit = literal("it's \"x\"");
            assert_eq!(lit, "concat('it',\"'\",'s \"x\"')");
            assert_eq!(decode_literal(&lit).unwrap(), "it's \"x\"");
        }

        #[test]
        fn test_empty_string() {
            assert_eq!(literal(""), "''");
        }

        #[test]
        fn test_trailing_single_quote_with_double_quote() {
            let text = "\"quoted\" end'";
            assert_eq!(decode_literal(&literal(text)).unwrap(), text);
        }
    }

    mod heuristic_tests {
        use super::*;

        #[test]
        fn test_looks_like_xpath() {
            assert!(looks_like_xpath("//div[@id='main']"));
            assert!(looks_like_xpath("(//h1 | //h2)"));
            assert!(!looks_like_xpath("nav"));
            assert!(!looks_like_xpath(""));
        }

        #[test]
        fn test_config_string_classification() {
            assert_eq!(
                BlockDescriptor::from_config_str("//div"),
                BlockDescriptor::RawXPath("//div".to_string())
            );
            assert_eq!(
                BlockDescriptor::from_config_str("nav"),
                BlockDescriptor::TagName("nav".to_string())
            );
        }
    }

    mod block_tests {
        use super::*;

        fn blocks() -> BTreeMap<String, BlockDescriptor> {
            let mut blocks = BTreeMap::new();
            blocks.insert(
                "main".to_string(),
                BlockDescriptor::from_config_str("//div[@id = 'content']"),
            );
            blocks.insert("menu".to_string(), BlockDescriptor::tag("nav"));
            blocks.insert(
                "side menu".to_string(),
                BlockDescriptor::matching(Some("ul"))
                    .with_attr("class", "side")
                    .with_attr("text", "Menu"),
            );
            blocks.insert(
                "footer".to_string(),
                BlockDescriptor::matching(None).with_attr("id", "footer"),
            );
            blocks
        }

        #[test]
        fn test_absent_block_is_empty() {
            assert_eq!(build_block_xpath("sidebar", &blocks()), "");
        }

        #[test]
        fn test_raw_xpath_returned_unchanged() {
            assert_eq!(
                build_block_xpath("main", &blocks()),
                "//div[@id = 'content']"
            );
        }

        #[test]
        fn test_bare_tag() {
            assert_eq!(build_block_xpath("menu", &blocks()), "//nav");
        }

        #[test]
        fn test_structured_with_tag_and_text() {
            assert_eq!(
                build_block_xpath("side menu", &blocks()),
                "//ul[contains(@class, 'side')][contains(text(), 'Menu')]"
            );
        }

        #[test]
        fn test_structured_without_tag_uses_wildcard() {
            assert_eq!(
                build_block_xpath("footer", &blocks()),
                "//*[contains(@id, 'footer')]"
            );
        }

        #[test]
        fn test_multiple_required_values_share_predicate() {
            let desc = BlockDescriptor::matching(Some("div"))
                .with_attr("class", vec!["column", "left"]);
            assert_eq!(
                desc.to_xpath(),
                "//div[contains(@class, 'column') and contains(@class, 'left')]"
            );
        }

        #[test]
        fn test_deserialize_from_yaml() {
            let yaml = r#"
main: "//div[@id='main']"
menu: nav
column:
  tag: div
  class: [a, b]
  text: Hello
"#;
            let parsed: BTreeMap<String, BlockDescriptor> =
                serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(
                parsed["main"],
                BlockDescriptor::RawXPath("//div[@id='main']".to_string())
            );
            assert_eq!(parsed["menu"], BlockDescriptor::TagName("nav".to_string()));
            assert_eq!(
                parsed["column"].to_xpath(),
                "//div[contains(@class, 'a') and contains(@class, 'b')][contains(text(), 'Hello')]"
            );
        }

        #[test]
        fn test_with_attr_ignored_on_plain_descriptors() {
            let desc = BlockDescriptor::tag("nav").with_attr("class", "x");
            assert_eq!(desc, BlockDescriptor::TagName("nav".to_string()));
        }
    }

    mod semantic_type_tests {
        use super::*;

        #[test]
        fn test_list_maps_to_li() {
            assert_eq!(tags_for_semantic_type("list").unwrap(), &["li"]);
        }

        #[test]
        fn test_heading_aliases() {
            for name in ["topic", "header", "Title"] {
                assert_eq!(tags_for_semantic_type(name).unwrap(), &["h1", "h2", "h3"]);
            }
        }

        #[test]
        fn test_unknown_type_is_unsupported() {
            let err = tags_for_semantic_type("unknown").unwrap_err();
            assert!(matches!(err, StepError::UnsupportedType { .. }));
            assert!(err.is_pending());
        }
    }

    mod concat_tests {
        use super::*;

        #[test]
        fn test_concat_tags() {
            assert_eq!(
                concat_tag_xpath(&["h1", "h2"], "//a[@href]"),
                "//h1//a[@href] | //h2//a[@href]"
            );
        }

        #[test]
        fn test_single_tag_has_no_separator() {
            assert_eq!(concat_tag_xpath(&["li"], ""), "//li");
        }

        #[test]
        fn test_empty_tags() {
            let tags: [&str; 0] = [];
            assert_eq!(concat_tag_xpath(&tags, "//a"), "");
        }
    }

    mod attribute_search_tests {
        use super::*;

        #[test]
        fn test_single_value_matches_id_or_class() {
            let container = AttributeContainer::IdOrClass("content".to_string());
            assert_eq!(
                attribute_search_expr(&container, false),
                "@id = 'content' or @class = 'content'"
            );
            assert_eq!(
                attribute_search_expr(&container, true),
                "//*[@id = 'content' or @class = 'content']"
            );
        }

        #[test]
        fn test_map_joins_with_and_and_groups_with_or() {
            let mut attrs = BTreeMap::new();
            attrs.insert("class".to_string(), AttributeValues::from(vec!["a", "b"]));
            attrs.insert("id".to_string(), AttributeValues::from("main"));
            let expr = attribute_search_expr(&AttributeContainer::Attributes(attrs), false);
            assert_eq!(expr, "(@class = 'a' or @class = 'b') and @id = 'main'");
        }

        #[test]
        fn test_values_are_escaped() {
            let container = AttributeContainer::IdOrClass("it's".to_string());
            assert!(attribute_search_expr(&container, false).contains("\"it's\""));
        }
    }

    mod fragment_tests {
        use super::*;

        #[test]
        fn test_scoped_union_is_parenthesized() {
            assert_eq!(scoped("//h1 | //h2", "//a"), "(//h1 | //h2)//a");
            assert_eq!(scoped("(//h1 | //h2)", "//a"), "(//h1 | //h2)//a");
            assert_eq!(scoped("", "//a"), "//a");
        }

        #[test]
        fn test_link_fragments() {
            assert_eq!(
                link_with_text("//nav", "Home"),
                "//nav//a[text() = 'Home'][@href]"
            );
            assert_eq!(
                link_containing_text("", "Home"),
                "//a[contains(text(), 'Home')][@href]"
            );
            assert_eq!(links_within("//nav"), "//nav//a[@href]");
            assert!(link_by_locator("News").starts_with("//a[@href][@id = 'News'"));
        }

        #[test]
        fn test_field_by_partial_id() {
            assert_eq!(
                field_by_partial_id("title"),
                "//input[contains(@id, 'title')]"
            );
        }

        #[test]
        fn test_button_by_label_escapes() {
            let xpath = button_by_label("Don't");
            assert!(xpath.contains("\"Don't\""));
            assert!(xpath.starts_with("//button"));
        }
    }

    proptest! {
        #[test]
        fn prop_literal_round_trips(text in "[a-z'\" ]{0,24}") {
            prop_assert_eq!(decode_literal(&literal(&text)), Some(text));
        }

        #[test]
        fn prop_literal_round_trips_any_text(text in ".*") {
            prop_assert_eq!(decode_literal(&literal(&text)), Some(text));
        }

        #[test]
        fn prop_text_key_targets_text_node(value in "[A-Za-z0-9 ]{1,12}") {
            let desc = BlockDescriptor::matching(None).with_attr(TEXT_KEY, value.as_str());
            let xpath = desc.to_xpath();
            prop_assert!(xpath.contains("contains(text(), "));
            prop_assert!(!xpath.contains("@text"));
        }
    }
}
