//! Directive bundles: all directives of one route index.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::labels::directive::Directive;

/// Groups the labels of one logical route within a service.
/// Ordered numerically; unnumbered labels use `"0"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteIndex(String);

impl RouteIndex {
    pub const DEFAULT: &'static str = "0";

    /// `digits` must be non-empty ASCII digits.
    pub(crate) fn new(digits: &str) -> Self {
        Self(digits.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl Default for RouteIndex {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl Ord for RouteIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        // Digit strings: shorter is smaller, then lexicographic.
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for RouteIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RouteIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveEntry {
    pub directive: Directive,
    pub value: String,
}

/// What a bundle describes, decided by its domain slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleKind {
    /// Domain wrapped in parentheses: a reusable snippet.
    Snippet(String),
    /// No domain but at least one directive: server-wide settings.
    Global,
    /// A routable bundle with a domain list.
    Route,
    /// Neither domain nor directives.
    Empty,
}

/// Raw directive values keyed by directive name, plus the domain slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveBundle {
    domain: Option<String>,
    entries: BTreeMap<String, DirectiveEntry>,
}

impl DirectiveBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a directive. The empty name sets the domain.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match Directive::parse(name) {
            Directive::Domain => self.domain = Some(value),
            directive => {
                self.entries
                    .insert(name.to_string(), DirectiveEntry { directive, value });
            }
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Domain value, trimmed; `None` when absent or blank.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.value.as_str())
    }

    /// First value for a directive family, in name order.
    pub fn first(&self, directive: Directive) -> Option<&str> {
        self.values(directive).next()
    }

    /// All values for a directive family, in name order.
    pub fn values(&self, directive: Directive) -> impl Iterator<Item = &str> {
        self.entries
            .values()
            .filter(move |e| e.directive == directive)
            .map(|e| e.value.as_str())
    }

    pub fn has(&self, directive: Directive) -> bool {
        self.values(directive).next().is_some()
    }

    /// Directive names and entries, in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &DirectiveEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of directives, not counting the domain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kind(&self) -> BundleKind {
        match self.domain() {
            Some(d) if d.len() >= 2 && d.starts_with('(') && d.ends_with(')') => {
                BundleKind::Snippet(d[1..d.len() - 1].trim().to_string())
            }
            Some(_) => BundleKind::Route,
            None if !self.entries.is_empty() => BundleKind::Global,
            None => BundleKind::Empty,
        }
    }

    /// `self` layered over `base`: every directive of `base` that `self`
    /// does not define is copied in. The domain comes from `self`.
    pub fn layered_over(&self, base: &DirectiveBundle) -> DirectiveBundle {
        let mut entries = base.entries.clone();
        entries.extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        DirectiveBundle {
            domain: self.domain.clone(),
            entries,
        }
    }
}
