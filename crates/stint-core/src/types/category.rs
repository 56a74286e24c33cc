//! Category types for activity classification.
//!
//! Free text such as a browser domain or a window title is mapped onto a
//! closed set of [`Category`] tags by an ordered rule table. The table is plain
//! configuration: applications can use the defaults, extend them, or replace
//! them entirely.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Closed set of activity categories.
///
/// Categories serialize to snake_case for storage compatibility.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Programming, code review, debugging.
    Coding,
    /// Documents, notes, long-form writing.
    Writing,
    /// Reading papers, references, searching.
    Research,
    /// Entertainment and social feeds.
    Distraction,
    /// Anything no rule matched.
    Uncategorized,
}

impl Category {
    /// Returns all category names as static strings.
    pub fn all_names() -> Vec<&'static str> {
        Self::iter().map(|c| c.into()).collect()
    }

    /// Static string form, identical to `Display`.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// One classification rule: any pattern that occurs in the text selects the
/// category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub patterns: Vec<String>,
}

impl CategoryRule {
    pub fn new<I, S>(category: Category, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered rule table used by [`CategoryRules::classify`].
///
/// Rules are evaluated in order and the first match wins, so a more specific
/// rule must be listed before a broader one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CategoryRule>", into = "Vec<CategoryRule>")]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
}

impl From<Vec<CategoryRule>> for CategoryRules {
    fn from(rules: Vec<CategoryRule>) -> Self {
        Self::new(rules)
    }
}

impl From<CategoryRules> for Vec<CategoryRule> {
    fn from(table: CategoryRules) -> Self {
        table.rules
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::new(
                Category::Coding,
                ["github.com", "stackoverflow.com", "leetcode.com"],
            ),
            CategoryRule::new(
                Category::Writing,
                ["docs.google.com", "notion.so", "medium.com"],
            ),
            CategoryRule::new(
                Category::Research,
                ["scholar.google.com", "arxiv.org", "wikipedia.org"],
            ),
            CategoryRule::new(
                Category::Distraction,
                ["youtube.com", "reddit.com", "twitter.com", "instagram.com"],
            ),
        ])
    }
}

impl CategoryRules {
    /// Build a table from explicit rules. Patterns are normalized to lowercase.
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| CategoryRule {
                category: rule.category,
                patterns: rule
                    .patterns
                    .into_iter()
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// A table that classifies everything as uncategorized.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, rule: CategoryRule) -> Self {
        self.rules.extend(Self::new(vec![rule]).rules);
        self
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Map free text onto a category.
    ///
    /// Matching is a case-insensitive substring test of every pattern of every
    /// rule, in table order.
    pub fn classify(&self, text: &str) -> Category {
        let haystack = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.patterns.iter().any(|p| haystack.contains(p.as_str())))
            .map(|rule| rule.category)
            .unwrap_or(Category::Uncategorized)
    }

    /// Every pattern in the table, de-duplicated, in table order.
    ///
    /// Used to seed the tracked-sites setting.
    pub fn tracked_sites(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .flat_map(|rule| rule.patterns.iter())
            .filter(|p| seen.insert(p.as_str()))
            .cloned()
            .collect()
    }
}
