//! Stress test: containers encrypted to many recipients.

use pki_trust::error::DecryptionError;
use pki_trust::{Container, Entity, EntityId, EntityRole, PkiError};

fn entity(id: &str) -> Entity {
    Entity::generate(EntityId::new(id), EntityRole::Admin, None)
}

#[test]
fn stress_50_recipients_each_decrypt() {
    let sender = Entity::generate(EntityId::new("org-1"), EntityRole::Organization, None);
    let recipients: Vec<Entity> = (0..50).map(|i| entity(&format!("admin-{i}"))).collect();
    let refs: Vec<&Entity> = recipients.iter().collect();

    let body = b"shared across fifty admins";
    let bytes = sender
        .encrypt_then_sign(body, Some(refs.as_slice()))
        .unwrap()
        .to_bytes()
        .unwrap();

    for recipient in &recipients {
        let container = Container::from_bytes(&bytes).unwrap();
        let verified = sender.verify(container).unwrap();
        assert_eq!(recipient.decrypt(&verified).unwrap(), body);
    }
}

#[test]
fn stress_duplicate_recipients_collapse() {
    let sender = entity("admin-0");
    let other = entity("admin-1");
    let container = sender
        .encrypt_then_sign(b"x", Some(&[&other, &other, &sender, &other]))
        .unwrap();
    assert_eq!(container.recipients().len(), 2);
    assert_eq!(container.encryption().unwrap().keys.len(), 2);
}

#[test]
fn stress_outsider_excluded_from_large_group() {
    let sender = entity("admin-0");
    let group: Vec<Entity> = (1..20).map(|i| entity(&format!("admin-{i}"))).collect();
    let refs: Vec<&Entity> = group.iter().collect();
    let outsider = entity("outsider");

    let container = sender.encrypt_then_sign(b"members only", Some(refs.as_slice())).unwrap();
    let verified = sender.verify(container).unwrap();
    assert!(matches!(
        outsider.decrypt(&verified),
        Err(PkiError::Decryption(DecryptionError::NotARecipient(_)))
    ));
}

#[test]
fn stress_large_body_roundtrip() {
    let sender = entity("admin-0");
    let body: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();

    let bytes = sender
        .encrypt_then_sign(&body, None)
        .unwrap()
        .to_bytes()
        .unwrap();
    let verified = sender.verify(Container::from_bytes(&bytes).unwrap()).unwrap();
    let opened = sender.open(verified).unwrap();
    assert_eq!(opened.body(), body.as_slice());
}

#[test]
fn stress_empty_recipient_list_rejected() {
    let sender = entity("admin-0");
    let nobody: Vec<&Entity> = Vec::new();
    assert!(matches!(
        sender.encrypt_then_sign(b"nobody", Some(nobody.as_slice())),
        Err(PkiError::EncryptionFailed(_))
    ));
}
