//! Snippet table and `import` resolution.

use std::collections::BTreeMap;

use crate::labels::bundle::DirectiveBundle;
use crate::labels::directive::Directive;

/// Named snippets collected across every discovered service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetTable {
    snippets: BTreeMap<String, DirectiveBundle>,
}

impl SnippetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snippet. A later definition with the same name replaces
    /// the earlier one.
    pub fn insert(&mut self, name: impl Into<String>, bundle: DirectiveBundle) {
        let name = name.into();
        tracing::debug!(snippet = %name, directives = bundle.len(), "Snippet defined");
        if self.snippets.insert(name.clone(), bundle).is_some() {
            tracing::debug!(snippet = %name, "Snippet redefined by a later service");
        }
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveBundle> {
        self.snippets.get(name)
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Apply the bundle's `import` directive.
    ///
    /// Imported snippets apply in the order listed; the route's own
    /// directives override all of them. Unknown snippet names are logged
    /// and skipped.
    pub fn resolve(&self, bundle: &DirectiveBundle, route: &str) -> DirectiveBundle {
        let Some(imports) = bundle.first(Directive::Import) else {
            return bundle.clone();
        };

        let mut base = DirectiveBundle::new();
        let mut applied = 0;
        for name in imports
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|n| !n.is_empty())
        {
            match self.snippets.get(name) {
                Some(snippet) => {
                    tracing::debug!(route = %route, snippet = %name, "Applying snippet");
                    base = snippet.layered_over(&base);
                    applied += 1;
                }
                None => {
                    tracing::warn!(route = %route, snippet = %name, "Imported snippet not found");
                }
            }
        }

        if applied == 0 {
            return bundle.clone();
        }
        bundle.layered_over(&base)
    }
}
