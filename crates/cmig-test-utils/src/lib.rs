//! Testing utilities for cmig workspace
//!
//! Entity builders and seeded source stores shared by the integration tests.

#![allow(missing_docs)]

use cmig_model::well_known::{INTERNAL_PROVIDER_ID, ROOT_FOLDER_ID};
use cmig_model::{
    EntityKey, EntityRef, EntityType, Secret, KEYSTORE_PROPERTY, PROVIDER_LINK,
};
use cmig_store::MemoryStore;

pub const ZONE_ID: &str = "5a0e0000000000000000000000000001";
pub const DOCUMENT_ID: &str = "d0c00000000000000000000000000001";
pub const POLICY_ID: &str = "901c0000000000000000000000000001";
pub const DOCUMENT_URI: &str = "http://example.com/order.xsd";

pub fn security_zone(id: &str, name: &str) -> EntityRef {
    EntityRef::new(EntityType::SecurityZone, id, name)
        .with_property("permittedTypes", "POLICY,SERVICE")
}

pub fn resource_document(id: &str, uri: &str) -> EntityRef {
    EntityRef::new(EntityType::ResourceDocument, id, uri)
        .with_property("contentType", "text/xml")
        .with_body("<xs:schema/>")
}

pub fn policy(id: &str, name: &str) -> EntityRef {
    EntityRef::new(EntityType::Policy, id, name)
        .with_guid(format!("guid-{id}"))
        .in_folder(ROOT_FOLDER_ID)
}

pub fn folder(id: &str, name: &str, parent: &str) -> EntityRef {
    EntityRef::new(EntityType::Folder, id, name).in_folder(parent)
}

pub fn secure_password(id: &str, name: &str, value: &str) -> EntityRef {
    EntityRef::new(EntityType::SecurePassword, id, name).with_secret(Secret::Clear(value.to_string()))
}

pub fn trusted_certificate(id: &str, name: &str) -> EntityRef {
    EntityRef::new(EntityType::TrustedCertificate, id, name)
        .with_property("subjectDn", format!("CN={name}"))
}

pub fn internal_user(id: &str, login: &str) -> EntityRef {
    EntityRef::new(EntityType::User, id, login).with_link(
        PROVIDER_LINK,
        EntityKey::new(EntityType::IdentityProvider, INTERNAL_PROVIDER_ID),
    )
}

pub fn private_key(id: &str, alias: &str, keystore: &str) -> EntityRef {
    EntityRef::new(EntityType::PrivateKey, id, alias).with_property(KEYSTORE_PROPERTY, keystore)
}

/// Policy XML validating against a resource document
pub fn schema_validation_body(uri: &str) -> String {
    format!(
        r#"<wsp:Policy>
    <L7p:SchemaValidation>
        <L7p:ResourceInfo staticResourceInfo="included">
            <L7p:Id stringValue="{uri}"/>
        </L7p:ResourceInfo>
    </L7p:SchemaValidation>
</wsp:Policy>"#
    )
}

/// Policy XML including another policy by GUID
pub fn include_body(guid: &str) -> String {
    format!(r#"<wsp:Policy><L7p:Include><L7p:PolicyGuid stringValue="{guid}"/></L7p:Include></wsp:Policy>"#)
}

/// Policy XML invoking an encapsulated assertion by GUID
pub fn encass_invocation_body(guid: &str) -> String {
    format!(
        r#"<wsp:Policy><L7p:Encapsulated><L7p:EncapsulatedAssertionConfigGuid stringValue="{guid}"/></L7p:Encapsulated></wsp:Policy>"#
    )
}

/// Policy XML using a stored password by id
pub fn password_body(password_id: &str) -> String {
    format!(r#"<wsp:Policy><L7p:JdbcQuery><L7p:PasswordGoid goidValue="{password_id}"/></L7p:JdbcQuery></wsp:Policy>"#)
}

/// The canonical policy: in the root folder, in a security zone, validating
/// against a resource document
pub fn order_policy() -> EntityRef {
    policy(POLICY_ID, "Order Validation")
        .in_zone(ZONE_ID)
        .with_body(schema_validation_body(DOCUMENT_URI))
}

/// Source store holding [`order_policy`] and its dependencies
pub fn order_policy_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(security_zone(ZONE_ID, "Orders Zone")).unwrap();
    store.insert(resource_document(DOCUMENT_ID, DOCUMENT_URI)).unwrap();
    store.insert(order_policy()).unwrap();
    store
}

pub const BACKING_POLICY_ID: &str = "901c0000000000000000000000000002";
pub const ENCASS_ID: &str = "e0ca0000000000000000000000000001";
pub const ENCASS_GUID: &str = "encass-guid-0001";

/// An encapsulated assertion whose backing policy invokes it
pub fn encass_cycle_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert(
            policy(BACKING_POLICY_ID, "Backing Policy").with_body(encass_invocation_body(ENCASS_GUID)),
        )
        .unwrap();
    store
        .insert(
            EntityRef::new(EntityType::EncapsulatedAssertion, ENCASS_ID, "Recursive Lookup")
                .with_guid(ENCASS_GUID)
                .with_link("policy", EntityKey::new(EntityType::Policy, BACKING_POLICY_ID)),
        )
        .unwrap();
    store
}

pub const CERT_ID: &str = "ce470000000000000000000000000001";
pub const REVOCATION_ID: &str = "4e0c0000000000000000000000000001";

/// A certificate checked by a revocation policy that in turn trusts the certificate
pub fn mutual_trust_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert(
            trusted_certificate(CERT_ID, "Issuing CA").with_link(
                "revocationCheckPolicy",
                EntityKey::new(EntityType::RevocationCheckPolicy, REVOCATION_ID),
            ),
        )
        .unwrap();
    store
        .insert(
            EntityRef::new(EntityType::RevocationCheckPolicy, REVOCATION_ID, "OCSP").with_link(
                "trustedSigner",
                EntityKey::new(EntityType::TrustedCertificate, CERT_ID),
            ),
        )
        .unwrap();
    store
}

/// root / Shared / { Fragments / fragment, entry } with entry including fragment
pub fn folder_tree_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(folder("f0000000000000000000000000000001", "Shared", ROOT_FOLDER_ID)).unwrap();
    store
        .insert(folder(
            "f0000000000000000000000000000002",
            "Fragments",
            "f0000000000000000000000000000001",
        ))
        .unwrap();
    store
        .insert(
            policy("901c00000000000000000000000000f1", "Fragment")
                .in_folder("f0000000000000000000000000000002"),
        )
        .unwrap();
    store
        .insert(
            policy("901c00000000000000000000000000e1", "Entry")
                .in_folder("f0000000000000000000000000000001")
                .with_body(include_body("guid-901c00000000000000000000000000f1")),
        )
        .unwrap();
    store
}

/// Position of `(entity_type, id)` among a bundle's directives
pub fn directive_position(bundle: &cmig_model::Bundle, entity_type: EntityType, id: &str) -> usize {
    bundle
        .mappings
        .iter()
        .position(|m| m.entity_type == entity_type && m.src_id.as_str() == id)
        .unwrap_or_else(|| panic!("no directive for {entity_type}:{id}"))
}
