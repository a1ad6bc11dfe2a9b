//! Server-wide settings from domain-less label bundles.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::document::{AutomaticHttps, Server};
use crate::labels::Directive;

/// `auto_https` global setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoHttpsMode {
    PreferWildcard,
    Off,
    DisableRedirects,
}

impl FromStr for AutoHttpsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefer_wildcard" => Ok(AutoHttpsMode::PreferWildcard),
            "off" | "disable" => Ok(AutoHttpsMode::Off),
            "disable_redirects" => Ok(AutoHttpsMode::DisableRedirects),
            other => Err(format!("unknown auto_https mode '{}'", other)),
        }
    }
}

impl fmt::Display for AutoHttpsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AutoHttpsMode::PreferWildcard => "prefer_wildcard",
            AutoHttpsMode::Off => "off",
            AutoHttpsMode::DisableRedirects => "disable_redirects",
        })
    }
}

impl AutoHttpsMode {
    /// Set the matching flag on the server's `automatic_https` block.
    pub fn apply(self, server: &mut Server) {
        let block = server
            .automatic_https
            .get_or_insert_with(AutomaticHttps::default);
        match self {
            AutoHttpsMode::PreferWildcard => block.prefer_wildcard = true,
            AutoHttpsMode::Off => block.disable = true,
            AutoHttpsMode::DisableRedirects => block.disable_redirects = true,
        }
    }
}

/// Global settings merged across services; later values win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalSettings {
    values: BTreeMap<String, String>,
}

impl GlobalSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, service: &str, values: BTreeMap<String, String>) {
        for (key, value) in values {
            if let Some(previous) = self.values.get(&key).filter(|p| **p != value) {
                tracing::debug!(
                    service = %service,
                    setting = %key,
                    previous = %previous,
                    value = %value,
                    "Global setting overridden"
                );
            }
            self.values.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Non-empty `email` setting.
    pub fn email(&self) -> Option<&str> {
        self.find(Directive::Email)
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// Parsed `auto_https` setting. Unknown values are logged and ignored.
    pub fn auto_https(&self) -> Option<AutoHttpsMode> {
        let value = self.find(Directive::AutoHttps)?;
        match value.parse() {
            Ok(mode) => Some(mode),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring auto_https setting");
                None
            }
        }
    }

    fn find(&self, directive: Directive) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| Directive::parse(key) == directive)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_later_service_wins() {
        let mut globals = GlobalSettings::new();
        globals.merge("a", settings(&[("email", "a@example.com"), ("auto_https", "off")]));
        globals.merge("b", settings(&[("email", "b@example.com")]));

        assert_eq!(globals.email(), Some("b@example.com"));
        assert_eq!(globals.auto_https(), Some(AutoHttpsMode::Off));
    }

    #[test]
    fn test_blank_email_and_unknown_mode() {
        let mut globals = GlobalSettings::new();
        globals.merge("a", settings(&[("email", "  "), ("auto_https", "sometimes")]));
        assert_eq!(globals.email(), None);
        assert_eq!(globals.auto_https(), None);
    }

    #[test]
    fn test_apply_auto_https() {
        let mut server = Server::default();
        AutoHttpsMode::PreferWildcard.apply(&mut server);
        AutoHttpsMode::DisableRedirects.apply(&mut server);

        let block = server.automatic_https.unwrap();
        assert!(block.prefer_wildcard);
        assert!(block.disable_redirects);
        assert!(!block.disable);
    }
}
