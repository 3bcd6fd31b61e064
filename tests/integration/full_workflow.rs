//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle on a filesystem store:
//! 1. Provision admin-1 and org-1
//! 2. Add an index entry and save
//! 3. Rebuild the whole chain from the local admin bootstrap only
//! 4. Corrupt the stored index and confirm loading fails loudly

use pki_trust::error::{StorageError, TrustStep, VerificationError};
use pki_trust::{
    provision_admin, provision_organization, EntityId, EntityRole, FsStorage, PkiError, Scope,
    TrustChainLoader,
};

fn flip_signature_byte(path: &std::path::Path) {
    use base64::Engine;
    let engine = base64::engine::general_purpose::STANDARD;

    let bytes = std::fs::read(path).unwrap();
    let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let mut signature = engine
        .decode(value["signature"].as_str().unwrap())
        .unwrap();
    signature[10] ^= 0x80;
    value["signature"] = serde_json::Value::String(engine.encode(signature));
    std::fs::write(path, serde_json::to_vec(&value).unwrap()).unwrap();
}

#[test]
fn full_workflow_bootstrap_to_index() {
    let dir = tempfile::tempdir().unwrap();

    // ── Step 1: Provision ───────────────────────────────────────────────
    {
        let storage = FsStorage::new(dir.path(), EntityId::new("admin-1"));
        let admin = provision_admin(&storage, EntityId::new("admin-1"), Some("alice".into()))
            .expect("admin provisioning should succeed");
        let org = provision_organization(
            &storage,
            &admin,
            EntityId::new("org-1"),
            Some("acme".into()),
        )
        .expect("organization provisioning should succeed");

        // ── Step 2: Add an entry ────────────────────────────────────────
        let loader = TrustChainLoader::new(&storage);
        let mut index = loader.load_index(&org).expect("fresh index should load");
        assert!(index.is_empty());
        index.add_entry("db-cert", "blob://abc");
        loader.save_index(&org, &index).unwrap();
    }

    // ── Step 3: Rebuild from local bootstrap only ───────────────────────
    let storage = FsStorage::new(dir.path(), EntityId::new("admin-1"));
    let loader = TrustChainLoader::new(&storage);

    let admin = loader.load_local_admin().unwrap();
    assert_eq!(admin.id().as_str(), "admin-1");
    assert_eq!(admin.role(), EntityRole::Admin);
    assert_eq!(admin.name.as_deref(), Some("alice"));

    let org = loader.load_organization_private(&admin).unwrap();
    assert_eq!(org.id().as_str(), "org-1");
    assert_eq!(org.role(), EntityRole::Organization);
    assert_eq!(org.anchored_by(), Some(admin.id()));

    let index = loader.load_index(&org).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.lookup("db-cert").unwrap(), "blob://abc");
    assert_eq!(index.owner_id(), org.id());

    // The public copy names the same organization but carries no secrets.
    let public_org = loader.load_organization(&admin, Scope::Public).unwrap();
    assert_eq!(public_org.id(), org.id());
    assert_eq!(public_org.fingerprint(), org.fingerprint());
    assert!(!public_org.has_signing_key());

    // On-disk layout
    assert!(dir.path().join("local/admin-1/admin.json").exists());
    assert!(dir.path().join("private/admin-1/org.json").exists());
    assert!(dir.path().join("public/admin-1/org.json").exists());
    assert!(dir.path().join("private/org-1/index.json").exists());
}

#[test]
fn full_workflow_stored_index_is_ciphertext() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path(), EntityId::new("admin-1"));
    let admin = provision_admin(&storage, EntityId::new("admin-1"), None).unwrap();
    let org = provision_organization(&storage, &admin, EntityId::new("org-1"), None).unwrap();

    let loader = TrustChainLoader::new(&storage);
    let mut index = loader.load_index(&org).unwrap();
    index.add_entry("db-cert", "blob://very-secret-reference");
    loader.save_index(&org, &index).unwrap();

    let raw = std::fs::read_to_string(dir.path().join("private/org-1/index.json")).unwrap();
    assert!(!raw.contains("very-secret-reference"));
    assert!(!raw.contains("db-cert"));

    let raw_org = std::fs::read_to_string(dir.path().join("private/admin-1/org.json")).unwrap();
    assert!(!raw_org.contains("private_signing_key"));
}

#[test]
fn full_workflow_corrupted_index_is_verification_error() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path(), EntityId::new("admin-1"));
    let admin = provision_admin(&storage, EntityId::new("admin-1"), None).unwrap();
    let org = provision_organization(&storage, &admin, EntityId::new("org-1"), None).unwrap();

    let loader = TrustChainLoader::new(&storage);
    let mut index = loader.load_index(&org).unwrap();
    index.add_entry("db-cert", "blob://abc");
    loader.save_index(&org, &index).unwrap();

    flip_signature_byte(&dir.path().join("private/org-1/index.json"));

    let err = loader
        .load_index(&org)
        .expect_err("corrupted index must not load");
    assert_eq!(err.step(), Some(TrustStep::VerifyIndex));
    assert!(matches!(
        err.root_cause(),
        PkiError::Verification(VerificationError::SignatureMismatch)
    ));
    assert!(err.is_corruption());
    assert!(!err.is_not_found());
}

#[test]
fn full_workflow_unprovisioned_directory() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path(), EntityId::new("admin-1"));
    let loader = TrustChainLoader::new(&storage);

    let err = loader.load_local_admin().unwrap_err();
    assert!(matches!(err.root_cause(), PkiError::AdminBootstrapMissing));
    assert!(err.is_not_found());

    let admin = provision_admin(&storage, EntityId::new("admin-1"), None).unwrap();
    let err = loader.load_organization_private(&admin).unwrap_err();
    assert_eq!(err.step(), Some(TrustStep::FetchOrganization));
    assert!(matches!(
        err.root_cause(),
        PkiError::Storage(StorageError::NotFound(_))
    ));
}

#[test]
fn full_workflow_second_admin_cannot_impersonate() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path(), EntityId::new("admin-1"));
    let admin = provision_admin(&storage, EntityId::new("admin-1"), None).unwrap();
    provision_organization(&storage, &admin, EntityId::new("org-1"), None).unwrap();

    // A different admin bootstrapped under the same id cannot verify the
    // organization container signed by the original.
    let impostor_dir = tempfile::tempdir().unwrap();
    let impostor_storage = FsStorage::new(impostor_dir.path(), EntityId::new("admin-1"));
    let impostor = provision_admin(&impostor_storage, EntityId::new("admin-1"), None).unwrap();

    let err = TrustChainLoader::new(&storage)
        .load_organization_private(&impostor)
        .unwrap_err();
    assert_eq!(err.step(), Some(TrustStep::VerifyOrganization));
    assert!(matches!(
        err.root_cause(),
        PkiError::Verification(VerificationError::SignatureMismatch)
    ));
}
