use hub_primitives::{DEFAULT_TAG, PRIVATE_TAG_PREFIX};

/// The kind of resource id extracted from a request path (spec.md §4.7
/// step 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Fingerprint(String),
    TagId(String),
    Numeric(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// A record for the resource could not be found.
    NotFound,
    Deny(String),
}

/// The stateless decision core of the authorization guard. Path
/// classification (write-path / resource-scoped / unscoped) and resource
/// lookup are the caller's job (`hub-server`'s middleware), since they need
/// the HTTP routing table and repository access respectively; this type
/// implements only the decision in spec.md §4.7 step 4.
pub struct AuthorizationGuard;

impl AuthorizationGuard {
    /// `caller_assigned_tags` is the caller's *raw* assigned set, taken
    /// from the session — deliberately not the effective (ancestor-closed)
    /// set computed by `TagResolver`; the guard layer never performs
    /// ancestor expansion (spec.md §4.7 step 4, final bullet).
    pub fn decide(
        caller_id: i64,
        caller_is_admin: bool,
        caller_assigned_tags: &[String],
        owner: i64,
        scope_tag: &str,
        is_public: bool,
    ) -> AccessDecision {
        if is_public || scope_tag.is_empty() || scope_tag == DEFAULT_TAG {
            return AccessDecision::Allow;
        }
        if caller_id == owner || caller_is_admin {
            return AccessDecision::Allow;
        }

        if scope_tag.starts_with(PRIVATE_TAG_PREFIX) {
            return AccessDecision::Deny("private tag cross-access".into());
        }

        if caller_assigned_tags.is_empty() {
            return AccessDecision::Deny("caller has no assigned tags".into());
        }

        if caller_assigned_tags.iter().any(|t| t == scope_tag) {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny("caller's tags do not include the resource's scope tag".into())
        }
    }

    /// Classify a raw path segment into a `ResourceKind`, per spec.md §4.7
    /// step 2: a 32-hex fingerprint, a numeric id, or a tag id.
    pub fn classify_resource_id(segment: &str) -> ResourceKind {
        if segment.len() == 32 && segment.chars().all(|c| c.is_ascii_hexdigit()) {
            return ResourceKind::Fingerprint(segment.to_string());
        }
        if let Ok(n) = segment.parse::<i64>() {
            return ResourceKind::Numeric(n);
        }
        ResourceKind::TagId(segment.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_resource_is_always_allowed() {
        let decision = AuthorizationGuard::decide(2, false, &[], 1, "some-tag", true);
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn owner_is_always_allowed() {
        let decision = AuthorizationGuard::decide(1, false, &[], 1, "private-scope", false);
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn admin_is_always_allowed() {
        let decision = AuthorizationGuard::decide(2, true, &[], 1, "private-scope", false);
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn private_tag_cross_access_is_denied() {
        let decision = AuthorizationGuard::decide(2, false, &["anything".into()], 1, "PRIVATE_alice", false);
        assert!(matches!(decision, AccessDecision::Deny(_)));
    }

    #[test]
    fn matching_raw_tag_is_allowed_without_ancestor_walk() {
        let decision = AuthorizationGuard::decide(2, false, &["mid".into()], 1, "mid", false);
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn ancestor_tag_alone_is_not_enough() {
        // caller holds "leaf" (child of "mid") but the resource is scoped to "mid";
        // the guard does not walk ancestors, only the search layer does.
        let decision = AuthorizationGuard::decide(2, false, &["leaf".into()], 1, "mid", false);
        assert!(matches!(decision, AccessDecision::Deny(_)));
    }

    #[test]
    fn empty_tag_set_is_denied_for_private_scope() {
        let decision = AuthorizationGuard::decide(2, false, &[], 1, "some-scope", false);
        assert!(matches!(decision, AccessDecision::Deny(_)));
    }

    #[test]
    fn classify_fingerprint_vs_numeric_vs_tag() {
        let fp = "a".repeat(32);
        assert_eq!(
            AuthorizationGuard::classify_resource_id(&fp),
            ResourceKind::Fingerprint(fp.clone())
        );
        assert_eq!(
            AuthorizationGuard::classify_resource_id("42"),
            ResourceKind::Numeric(42)
        );
        assert_eq!(
            AuthorizationGuard::classify_resource_id("root"),
            ResourceKind::TagId("root".into())
        );
    }
}
