//! Entity references embedded in payload bodies
//!
//! Policy bodies refer to other entities through well-known elements such as
//! `<L7p:PolicyGuid stringValue="..."/>` or `<L7p:PasswordGoid goidValue="..."/>`.
//! [`scan`] finds them in document order; [`rewrite`] substitutes values in place
//! and leaves everything else in the body untouched.

use crate::entity::EntityType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// How a body reference selects its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// By entity id
    Id,
    /// By GUID
    Guid,
    /// By name (resource documents: by URI)
    Name,
}

/// One reference found in a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyReference {
    /// Referenced type
    pub entity_type: EntityType,
    /// Selector kind
    pub selector: Selector,
    /// Selector value
    pub value: String,
    span: Range<usize>,
}

const ELEMENT_RULES: &[(&str, EntityType, Selector)] = &[
    ("PolicyGuid", EntityType::Policy, Selector::Guid),
    ("EncapsulatedAssertionConfigGuid", EntityType::EncapsulatedAssertion, Selector::Guid),
    ("PasswordGoid", EntityType::SecurePassword, Selector::Id),
    ("SecretGoid", EntityType::SecurePassword, Selector::Id),
    ("RecipientTrustedCertificateGoid", EntityType::TrustedCertificate, Selector::Id),
    ("VerifyCertificateGoid", EntityType::TrustedCertificate, Selector::Id),
    ("IdentityProviderOid", EntityType::IdentityProvider, Selector::Id),
    ("SsgActiveConnectorGoid", EntityType::JmsDestination, Selector::Id),
    ("SsgActiveConnectorId", EntityType::JmsDestination, Selector::Id),
    ("JmsEndpointOid", EntityType::JmsDestination, Selector::Id),
    ("GenericEntityId", EntityType::GenericEntity, Selector::Id),
];

static ELEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<L7p:([A-Za-z]+)\s+(?:goidValue|stringValue)="([^"]*)""#)
        .expect("element pattern is valid")
});

static RESOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<L7p:ResourceInfo\b[^>]*>\s*<L7p:Id\s+stringValue="([^"]*)""#)
        .expect("resource pattern is valid")
});

fn rule_for(element: &str) -> Option<(EntityType, Selector)> {
    ELEMENT_RULES
        .iter()
        .find(|(name, _, _)| *name == element)
        .map(|(_, t, s)| (*t, *s))
}

/// Find every entity reference in `body`, in document order
#[must_use]
pub fn scan(body: &str) -> Vec<BodyReference> {
    let mut found = Vec::new();

    for caps in ELEMENT_RE.captures_iter(body) {
        let (Some(element), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if let Some((entity_type, selector)) = rule_for(element.as_str()) {
            if value.as_str().is_empty() {
                continue;
            }
            found.push(BodyReference {
                entity_type,
                selector,
                value: value.as_str().to_string(),
                span: value.range(),
            });
        }
    }

    for caps in RESOURCE_RE.captures_iter(body) {
        if let Some(value) = caps.get(1) {
            found.push(BodyReference {
                entity_type: EntityType::ResourceDocument,
                selector: Selector::Name,
                value: value.as_str().to_string(),
                span: value.range(),
            });
        }
    }

    found.sort_by_key(|r| r.span.start);
    found
}

/// Replace reference values in `body`
///
/// `replace` returns the new value for a reference, or `None` to keep it.
pub fn rewrite<F>(body: &str, mut replace: F) -> String
where
    F: FnMut(&BodyReference) -> Option<String>,
{
    let mut out = String::with_capacity(body.len());
    let mut cursor = 0;
    for reference in scan(body) {
        if let Some(new_value) = replace(&reference) {
            out.push_str(&body[cursor..reference.span.start]);
            out.push_str(&new_value);
            cursor = reference.span.end;
        }
    }
    out.push_str(&body[cursor..]);
    out
}
