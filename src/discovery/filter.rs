//! Service filter predicate (`key` or `key=value`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Selects services by a label. A bare key requires a non-empty value;
/// `key=value` requires an exact match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFilter {
    key: String,
    value: Option<String>,
}

impl ServiceFilter {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match (labels.get(&self.key), &self.value) {
            (Some(actual), _) if actual.is_empty() => false,
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl FromStr for ServiceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = match s.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim().to_string())),
            None => (s.trim(), None),
        };
        if key.is_empty() {
            return Err(format!("filter '{}' has an empty label key", s));
        }
        Ok(Self {
            key: key.to_string(),
            value,
        })
    }
}

impl fmt::Display for ServiceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.key, v),
            None => write!(f, "{}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_only() {
        let filter: ServiceFilter = "agent".parse().unwrap();
        assert!(filter.matches(&labels(&[("agent", "remote1")])));
        assert!(!filter.matches(&labels(&[("agent", "")])));
        assert!(!filter.matches(&labels(&[("other", "x")])));
    }

    #[test]
    fn test_key_value() {
        let filter: ServiceFilter = "agent=remote1".parse().unwrap();
        assert!(filter.matches(&labels(&[("agent", "remote1")])));
        assert!(!filter.matches(&labels(&[("agent", "remote2")])));
        assert_eq!(filter.to_string(), "agent=remote1");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!("=x".parse::<ServiceFilter>().is_err());
    }
}
