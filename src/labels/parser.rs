//! Label parsing.
//!
//! # Responsibilities
//! - Match keys of the form `<prefix>(_<digits>)?(.<directive>)?`
//! - Group values into one bundle per route index
//! - Classify bundles as routes, snippets or global settings
//!
//! # Design Decisions
//! - Keys that do not match are ignored, never an error
//! - Index scoping is per service; only snippet names and global keys
//!   are shared across services (see `pipeline`)
//! - When `caddy.x` and `caddy_0.x` both exist, the numbered label wins

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::labels::bundle::{BundleKind, DirectiveBundle, RouteIndex};

/// Parses label maps for one key prefix.
#[derive(Debug, Clone)]
pub struct LabelParser {
    key_pattern: Regex,
}

impl LabelParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        let pattern = format!(r"^{}(?:_([0-9]+))?(?:\.(.+))?$", regex::escape(&prefix.into()));
        Self {
            key_pattern: Regex::new(&pattern).expect("escaped label prefix is a valid pattern"),
        }
    }

    /// Split a label key into route index and directive name.
    ///
    /// Returns the index, whether it was explicit, and the directive name
    /// (empty for the domain slot). `None` for keys outside the grammar.
    pub fn split_key<'a>(&self, key: &'a str) -> Option<(RouteIndex, bool, &'a str)> {
        let captures = self.key_pattern.captures(key)?;
        let directive = captures.get(2).map_or("", |m| m.as_str());
        Some(match captures.get(1) {
            Some(digits) => (RouteIndex::new(digits.as_str()), true, directive),
            None => (RouteIndex::default(), false, directive),
        })
    }

    /// Parse one service's labels.
    pub fn parse(&self, labels: &BTreeMap<String, String>) -> ParsedLabels {
        let mut matched: Vec<(RouteIndex, bool, &str, &str)> = labels
            .iter()
            .filter_map(|(key, value)| {
                self.split_key(key)
                    .map(|(index, explicit, directive)| (index, explicit, directive, value.as_str()))
            })
            .collect();
        // Unnumbered labels first so numbered ones override them.
        matched.sort_by_key(|(_, explicit, _, _)| *explicit);

        let mut bundles: BTreeMap<RouteIndex, DirectiveBundle> = BTreeMap::new();
        for (index, _, directive, value) in matched {
            bundles.entry(index).or_default().insert(directive, value);
        }

        let mut snippets = BTreeSet::new();
        let mut globals = BTreeSet::new();
        for (index, bundle) in &bundles {
            match bundle.kind() {
                BundleKind::Snippet(_) => {
                    snippets.insert(index.clone());
                }
                BundleKind::Global => {
                    globals.insert(index.clone());
                }
                BundleKind::Route | BundleKind::Empty => {}
            }
        }

        ParsedLabels {
            bundles,
            snippets,
            globals,
        }
    }
}

/// Bundles of one service plus their classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLabels {
    pub bundles: BTreeMap<RouteIndex, DirectiveBundle>,
    /// Indices whose bundle defines a snippet.
    pub snippets: BTreeSet<RouteIndex>,
    /// Indices whose bundle holds global settings.
    pub globals: BTreeSet<RouteIndex>,
}

impl ParsedLabels {
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Routable bundles in index order.
    pub fn routes(&self) -> impl Iterator<Item = (&RouteIndex, &DirectiveBundle)> {
        self.bundles
            .iter()
            .filter(|(_, bundle)| bundle.kind() == BundleKind::Route)
    }

    /// Snippet definitions as `(name, bundle)`.
    pub fn snippet_definitions(&self) -> impl Iterator<Item = (String, &DirectiveBundle)> {
        self.snippets.iter().filter_map(|index| {
            let bundle = self.bundles.get(index)?;
            match bundle.kind() {
                BundleKind::Snippet(name) => Some((name, bundle)),
                _ => None,
            }
        })
    }

    /// Global settings flattened to `directive → value`, later indices
    /// overriding earlier ones.
    pub fn global_settings(&self) -> BTreeMap<String, String> {
        self.globals
            .iter()
            .filter_map(|index| self.bundles.get(index))
            .flat_map(|bundle| bundle.entries())
            .map(|(name, entry)| (name.to_string(), entry.value.clone()))
            .collect()
    }
}
