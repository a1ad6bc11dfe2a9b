//! `reverse_proxy.header_up` / `header_down` rewrite rules.
//!
//! Value grammar:
//! ```text
//! -Name            delete
//! +Name value      add
//! Name value       set
//! ```
//! The value may be wrapped in double quotes.

use crate::document::{HeaderOps, HeaderRewrite};
use crate::labels::{Directive, DirectiveBundle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRule {
    Delete(String),
    Add(String, String),
    Set(String, String),
}

/// Parse one rule. `None` for malformed values.
pub fn parse_header_rule(value: &str) -> Option<HeaderRule> {
    let value = value.trim();

    if let Some(name) = value.strip_prefix('-') {
        let name = name.trim();
        return (!name.is_empty() && !name.contains(char::is_whitespace))
            .then(|| HeaderRule::Delete(name.to_string()));
    }

    let (add, rest) = match value.strip_prefix('+') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, value),
    };
    let (name, header_value) = rest.split_once(char::is_whitespace)?;
    let header_value = unquote(header_value.trim());
    if name.is_empty() || header_value.is_empty() {
        return None;
    }

    let (name, header_value) = (name.to_string(), header_value.to_string());
    Some(if add {
        HeaderRule::Add(name, header_value)
    } else {
        HeaderRule::Set(name, header_value)
    })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn apply(ops: &mut HeaderOps, rule: HeaderRule) {
    match rule {
        HeaderRule::Delete(name) => {
            if !ops.delete.contains(&name) {
                ops.delete.push(name);
            }
        }
        HeaderRule::Add(name, value) => ops.add.entry(name).or_default().push(value),
        HeaderRule::Set(name, value) => {
            ops.set.insert(name, vec![value]);
        }
    }
}

fn collect(bundle: &DirectiveBundle, directive: Directive) -> Option<HeaderOps> {
    let mut ops = HeaderOps::default();
    for value in bundle.values(directive) {
        match parse_header_rule(value) {
            Some(rule) => apply(&mut ops, rule),
            None => tracing::warn!(directive = %directive, value = %value, "Ignoring malformed header rule"),
        }
    }
    (!ops.is_empty()).then_some(ops)
}

/// Request-side and response-side rewrites. `None` when neither has rules.
pub fn translate_headers(bundle: &DirectiveBundle) -> Option<HeaderRewrite> {
    let request = collect(bundle, Directive::HeaderUp);
    let response = collect(bundle, Directive::HeaderDown);
    if request.is_none() && response.is_none() {
        return None;
    }
    Some(HeaderRewrite {
        request,
        response,
        ..HeaderRewrite::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules() {
        assert_eq!(
            parse_header_rule("-X-Forwarded-For"),
            Some(HeaderRule::Delete("X-Forwarded-For".into()))
        );
        assert_eq!(
            parse_header_rule(r#"+X-Custom-Header "custom-value""#),
            Some(HeaderRule::Add("X-Custom-Header".into(), "custom-value".into()))
        );
        assert_eq!(
            parse_header_rule(r#"Host "backend.internal""#),
            Some(HeaderRule::Set("Host".into(), "backend.internal".into()))
        );
        assert_eq!(
            parse_header_rule("X-Real-IP {remote_host}"),
            Some(HeaderRule::Set("X-Real-IP".into(), "{remote_host}".into()))
        );
    }

    #[test]
    fn test_malformed_rules() {
        assert_eq!(parse_header_rule("-"), None);
        assert_eq!(parse_header_rule("Host"), None);
        assert_eq!(parse_header_rule(r#"+X-Empty """#), None);
    }

    #[test]
    fn test_translate_both_directions() {
        let bundle = DirectiveBundle::new()
            .with("reverse_proxy.header_up", "-X-Forwarded-For")
            .with("reverse_proxy.header_up_1", r#"Host "backend.internal""#)
            .with("reverse_proxy.header_down", "-Server")
            .with("reverse_proxy.header_down_1", r#"+X-Served-By "agent""#);

        let rewrite = translate_headers(&bundle).unwrap();
        let request = rewrite.request.unwrap();
        assert_eq!(request.delete, vec!["X-Forwarded-For"]);
        assert_eq!(request.set["Host"], vec!["backend.internal"]);

        let response = rewrite.response.unwrap();
        assert_eq!(response.delete, vec!["Server"]);
        assert_eq!(response.add["X-Served-By"], vec!["agent"]);
    }

    #[test]
    fn test_only_malformed_is_none() {
        let bundle = DirectiveBundle::new().with("reverse_proxy.header_up", "Host");
        assert!(translate_headers(&bundle).is_none());
    }
}
