use cmig_model::references::{rewrite, scan, Selector};
use cmig_model::EntityType;
use proptest::prelude::*;

const ELEMENTS: &[(&str, &str, EntityType)] = &[
    ("PasswordGoid", "goidValue", EntityType::SecurePassword),
    ("PolicyGuid", "stringValue", EntityType::Policy),
    ("JmsEndpointOid", "goidValue", EntityType::JmsDestination),
    ("VerifyCertificateGoid", "goidValue", EntityType::TrustedCertificate),
];

fn body_of(refs: &[(usize, String)]) -> String {
    let mut body = String::from("<wsp:Policy>\n");
    for (element, value) in refs {
        let (name, attr, _) = ELEMENTS[*element];
        body.push_str(&format!("  <L7p:Step><L7p:{name} {attr}=\"{value}\"/></L7p:Step>\n"));
        body.push_str("  <L7p:Comment stringValue=\"untouched\"/>\n");
    }
    body.push_str("</wsp:Policy>");
    body
}

fn references() -> impl Strategy<Value = Vec<(usize, String)>> {
    prop::collection::vec((0..ELEMENTS.len(), "[0-9a-f]{32}"), 0..8)
}

proptest! {
    #[test]
    fn prop_scan_finds_references_in_document_order(refs in references()) {
        let found = scan(&body_of(&refs));
        prop_assert_eq!(found.len(), refs.len());
        for (reference, (element, value)) in found.iter().zip(&refs) {
            prop_assert_eq!(reference.entity_type, ELEMENTS[*element].2);
            prop_assert_eq!(&reference.value, value);
            let expected = if ELEMENTS[*element].2 == EntityType::Policy { Selector::Guid } else { Selector::Id };
            prop_assert_eq!(reference.selector, expected);
        }
    }

    #[test]
    fn prop_rewrite_only_touches_reference_values(refs in references()) {
        let body = body_of(&refs);
        prop_assert_eq!(rewrite(&body, |_| None), body.clone());

        let rewritten = rewrite(&body, |r| Some(r.value.to_uppercase()));
        let expected: Vec<_> = refs.iter().map(|(e, v)| (*e, v.to_uppercase())).collect();
        prop_assert_eq!(rewritten, body_of(&expected));
    }
}
