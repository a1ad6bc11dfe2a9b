//! TLS automation policy aggregation and merge.
//!
//! # Responsibilities
//! - Build one subject-scoped policy per HTTPS route carrying `tls.dns`
//! - Merge fresh policies into the document's policy list
//! - Propagate the ACME account email
//! - Keep every subject-scoped policy ahead of the catch-all
//!
//! # Ordering
//! ```text
//! [scoped (discovery order) ...] [catch-all ...]
//! ```
//! The proxy picks the first policy whose subjects match. A catch-all
//! placed earlier would capture scoped domains and issue them with the
//! wrong issuer.

use crate::document::{AutomationPolicy, Issuer};
use crate::policy::settings::GlobalSettings;
use crate::routing::AssembledRoute;

/// Subject-scoped policies collected during one synthesis pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicySet {
    policies: Vec<AutomationPolicy>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the policy for a route that requested a DNS challenge.
    pub fn add_route(&mut self, route: &AssembledRoute) {
        let Some(issuer) = route.tls.as_ref().and_then(|tls| tls.issuer()) else {
            return;
        };
        let subjects = route.hosts();
        if subjects.is_empty() {
            return;
        }
        self.upsert(AutomationPolicy {
            subjects,
            issuers: vec![issuer],
            ..AutomationPolicy::default()
        });
    }

    /// Replace the policy with the same subject set, or append.
    pub fn upsert(&mut self, policy: AutomationPolicy) {
        upsert_policy(&mut self.policies, policy);
    }

    pub fn policies(&self) -> &[AutomationPolicy] {
        &self.policies
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

fn upsert_policy(policies: &mut Vec<AutomationPolicy>, policy: AutomationPolicy) {
    match policies.iter_mut().find(|p| p.same_subjects(&policy)) {
        Some(existing) => *existing = policy,
        None => policies.push(policy),
    }
}

/// Stable partition: subject-scoped policies first, catch-alls last.
pub fn order_policies(policies: &mut Vec<AutomationPolicy>) {
    let (scoped, catch_all): (Vec<_>, Vec<_>) =
        policies.drain(..).partition(|p| !p.is_catch_all());
    policies.extend(scoped);
    policies.extend(catch_all);
}

/// The email to stamp into issuers: the `email` setting, else the first
/// non-empty email on an existing catch-all policy.
pub fn effective_email(settings: &GlobalSettings, existing: &[AutomationPolicy]) -> Option<String> {
    settings.email().map(str::to_string).or_else(|| {
        existing
            .iter()
            .filter(|p| p.is_catch_all())
            .flat_map(|p| p.issuers.iter())
            .find_map(|i| i.email().map(str::to_string))
    })
}

/// Copy `email` into every ACME issuer that has none.
pub fn propagate_email(policies: &mut [AutomationPolicy], email: &str) {
    for issuer in policies
        .iter_mut()
        .flat_map(|p| p.issuers.iter_mut())
        .filter(|i| i.is_acme() && i.email().is_none())
    {
        issuer.email = Some(email.to_string());
    }
}

/// Point the catch-all ACME issuer at `email`, creating the catch-all
/// policy or its ACME issuer when missing.
fn pin_catch_all_email(policies: &mut Vec<AutomationPolicy>, email: &str) {
    let index = match policies.iter().position(AutomationPolicy::is_catch_all) {
        Some(index) => index,
        None => {
            tracing::info!(email = %email, "Creating catch-all TLS policy");
            policies.push(AutomationPolicy::default());
            policies.len() - 1
        }
    };
    let policy = &mut policies[index];

    match policy.issuers.iter_mut().find(|i| i.is_acme()) {
        Some(issuer) => issuer.email = Some(email.to_string()),
        None => {
            let mut issuer = Issuer::acme();
            issuer.email = Some(email.to_string());
            policy.issuers.push(issuer);
        }
    }
}

/// Merge fresh policies into `existing`.
///
/// Fresh policies replace same-subject entries in place or are appended.
/// Email is then propagated and the ordering invariant re-applied, so the
/// merge is idempotent.
pub fn merge_policies(
    existing: &mut Vec<AutomationPolicy>,
    fresh: &PolicySet,
    settings: &GlobalSettings,
) {
    let email = effective_email(settings, existing);

    for policy in fresh.policies() {
        upsert_policy(existing, policy.clone());
    }

    if let Some(global) = settings.email() {
        pin_catch_all_email(existing, global);
    }
    if let Some(email) = email.as_deref() {
        propagate_email(existing, email);
    }

    order_policies(existing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn scoped(subject: &str) -> AutomationPolicy {
        AutomationPolicy {
            subjects: vec![subject.to_string()],
            issuers: vec![Issuer::acme()],
            ..AutomationPolicy::default()
        }
    }

    fn catch_all(email: Option<&str>) -> AutomationPolicy {
        let mut issuer = Issuer::acme();
        issuer.email = email.map(str::to_string);
        AutomationPolicy {
            issuers: vec![issuer],
            ..AutomationPolicy::default()
        }
    }

    fn settings(pairs: &[(&str, &str)]) -> GlobalSettings {
        let mut globals = GlobalSettings::new();
        globals.merge(
            "svc",
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        );
        globals
    }

    #[test]
    fn test_scoped_before_catch_all_in_either_order() {
        let mut a = vec![catch_all(None), scoped("*.x.com")];
        order_policies(&mut a);
        assert!(!a[0].is_catch_all());
        assert!(a[1].is_catch_all());

        let mut b = vec![scoped("*.x.com"), catch_all(None)];
        order_policies(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_subjects_replace_in_place() {
        let mut set = PolicySet::new();
        set.upsert(scoped("a.lan"));
        set.upsert(scoped("b.lan"));

        let mut replacement = scoped("a.lan");
        replacement.issuers[0].email = Some("new@example.com".into());
        set.upsert(replacement);

        assert_eq!(set.len(), 2);
        assert_eq!(set.policies()[0].subjects, vec!["a.lan"]);
        assert_eq!(set.policies()[0].issuers[0].email(), Some("new@example.com"));
    }

    #[test]
    fn test_email_from_existing_catch_all() {
        let mut existing = vec![catch_all(Some("ops@example.com"))];
        let mut fresh = PolicySet::new();
        fresh.upsert(scoped("*.x.com"));

        merge_policies(&mut existing, &fresh, &GlobalSettings::new());

        assert_eq!(existing.len(), 2);
        assert_eq!(existing[0].subjects, vec!["*.x.com"]);
        assert_eq!(existing[0].issuers[0].email(), Some("ops@example.com"));
        assert!(existing[1].is_catch_all());
    }

    #[test]
    fn test_global_email_creates_catch_all() {
        let mut existing = Vec::new();
        let mut fresh = PolicySet::new();
        fresh.upsert(scoped("a.lan"));

        merge_policies(&mut existing, &fresh, &settings(&[("email", "me@example.com")]));

        assert_eq!(existing.len(), 2);
        assert!(existing[1].is_catch_all());
        assert_eq!(existing[1].issuers[0].email(), Some("me@example.com"));
        assert_eq!(existing[0].issuers[0].email(), Some("me@example.com"));
    }

    #[test]
    fn test_scoped_email_is_kept() {
        let mut own = scoped("a.lan");
        own.issuers[0].email = Some("team@example.com".into());
        let mut existing = vec![catch_all(Some("ops@example.com")), own];

        merge_policies(&mut existing, &PolicySet::new(), &GlobalSettings::new());

        assert_eq!(existing[0].issuers[0].email(), Some("team@example.com"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut fresh = PolicySet::new();
        fresh.upsert(scoped("a.lan"));
        let globals = settings(&[("email", "me@example.com")]);

        let mut once = vec![catch_all(None)];
        merge_policies(&mut once, &fresh, &globals);
        let mut twice = once.clone();
        merge_policies(&mut twice, &fresh, &globals);

        assert_eq!(once, twice);
    }
}
