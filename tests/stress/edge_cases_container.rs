//! Edge cases: tampered, forged, and malformed containers.
//!
//! Every case must fail with a typed error before any plaintext is
//! released.

use base64::Engine;
use serde_json::Value;

use pki_trust::error::{DecryptionError, VerificationError};
use pki_trust::{Container, ContainerState, Entity, EntityId, EntityRole, PkiError};

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

fn admin(id: &str) -> Entity {
    Entity::generate(EntityId::new(id), EntityRole::Admin, None)
}

fn to_value(container: &Container) -> Value {
    serde_json::from_slice(&container.to_bytes().unwrap()).unwrap()
}

fn from_value(value: &Value) -> pki_trust::Result<Container> {
    Container::from_bytes(&serde_json::to_vec(value).unwrap())
}

fn flip_b64_field(value: &mut Value, field: &str) {
    let mut bytes = B64.decode(value[field].as_str().unwrap()).unwrap();
    bytes[0] ^= 0xff;
    value[field] = Value::String(B64.encode(bytes));
}

fn assert_signature_mismatch(result: pki_trust::Result<impl std::fmt::Debug>) {
    match result {
        Err(PkiError::Verification(VerificationError::SignatureMismatch)) => {}
        other => panic!("expected SignatureMismatch, got {other:?}"),
    }
}

#[test]
fn edge_tampered_ciphertext_fails_verify() {
    let a = admin("admin-1");
    let mut value = to_value(&a.encrypt_then_sign(b"secret", None).unwrap());
    flip_b64_field(&mut value, "body");

    assert_signature_mismatch(a.verify(from_value(&value).unwrap()));
}

#[test]
fn edge_tampered_plaintext_body_fails_verify() {
    let a = admin("admin-1");
    let mut value = to_value(&a.sign_string("{\"hello\":\"world\"}").unwrap());
    value["body"] = Value::String(B64.encode(b"{\"hello\":\"mallory\"}"));

    assert_signature_mismatch(a.verify(from_value(&value).unwrap()));
}

#[test]
fn edge_tampered_wrapped_key_fails_verify() {
    let a = admin("admin-1");
    let mut value = to_value(&a.encrypt_then_sign(b"secret", None).unwrap());
    let wrapped = &mut value["encryption"]["keys"]["admin-1"];
    let mut ct = B64.decode(wrapped["ciphertext"].as_str().unwrap()).unwrap();
    ct[0] ^= 0x01;
    wrapped["ciphertext"] = Value::String(B64.encode(ct));

    assert_signature_mismatch(a.verify(from_value(&value).unwrap()));
}

#[test]
fn edge_dropped_recipient_fails_verify() {
    let a = admin("admin-1");
    let b = admin("admin-2");
    let original = a.encrypt_then_sign(b"secret", Some(&[&a, &b])).unwrap();

    // Dropping a recipient and its wrapped key keeps the container
    // well-formed but breaks the signature.
    let mut value = to_value(&original);
    value["recipients"] = serde_json::json!(["admin-1"]);
    value["encryption"]["keys"]
        .as_object_mut()
        .unwrap()
        .remove("admin-2");

    assert_signature_mismatch(a.verify(from_value(&value).unwrap()));
}

#[test]
fn edge_rewritten_signer_id() {
    let a = admin("admin-1");
    let b = admin("admin-2");
    let mut value = to_value(&a.sign_string("payload").unwrap());
    value["signer_id"] = Value::String("admin-2".into());
    let forged = from_value(&value).unwrap();

    // The original signer no longer matches the claim...
    assert!(matches!(
        a.verify(forged.clone()),
        Err(PkiError::Verification(VerificationError::UnknownSigner(_)))
    ));
    // ...and the claimed signer's key does not check out.
    assert_signature_mismatch(b.verify(forged));
}

#[test]
fn edge_same_id_different_key() {
    let real = admin("admin-1");
    let impostor = admin("admin-1");
    let container = impostor.sign_string("payload").unwrap();
    assert_signature_mismatch(real.verify(container));
}

#[test]
fn edge_unknown_fields_ignored() {
    let a = admin("admin-1");
    let mut value = to_value(&a.encrypt_then_sign(b"secret", None).unwrap());
    value["comment"] = Value::String("added by a newer writer".into());
    value["encryption"]["extra"] = serde_json::json!({ "x": 1 });

    let verified = a.verify(from_value(&value).unwrap()).unwrap();
    let opened = a.open(verified).unwrap();
    assert_eq!(opened.state(), ContainerState::Decrypted);
    assert_eq!(opened.body(), b"secret");
}

#[test]
fn edge_missing_fields_are_malformed() {
    let a = admin("admin-1");
    let value = to_value(&a.sign_string("payload").unwrap());

    for field in ["body", "signer_id", "signature"] {
        let mut stripped = value.clone();
        stripped.as_object_mut().unwrap().remove(field);
        match from_value(&stripped) {
            Err(PkiError::Verification(VerificationError::MalformedContainer(msg))) => {
                assert!(msg.contains(field), "{msg} should name {field}");
            }
            other => panic!("expected MalformedContainer for {field}, got {other:?}"),
        }
    }
}

#[test]
fn edge_recipients_without_metadata_malformed() {
    let a = admin("admin-1");
    let mut value = to_value(&a.encrypt_then_sign(b"secret", None).unwrap());
    value.as_object_mut().unwrap().remove("encryption");
    assert!(matches!(
        from_value(&value),
        Err(PkiError::Verification(VerificationError::MalformedContainer(_)))
    ));
}

#[test]
fn edge_future_version_rejected() {
    let a = admin("admin-1");
    let mut value = to_value(&a.sign_string("payload").unwrap());
    value["version"] = serde_json::json!(99);
    assert!(matches!(from_value(&value), Err(PkiError::Parse(_))));
}

#[test]
fn edge_garbage_is_parse_error() {
    for bytes in [&b""[..], b"not json", b"[]", b"{\"body\": 5}"] {
        assert!(
            matches!(Container::from_bytes(bytes), Err(PkiError::Parse(_))),
            "{:?} should be a parse error",
            String::from_utf8_lossy(bytes)
        );
    }
}

#[test]
fn edge_non_recipient_cannot_decrypt() {
    let a = admin("admin-1");
    let o = Entity::generate(EntityId::new("org-1"), EntityRole::Organization, None);
    let container = a.encrypt_then_sign(b"for org only", Some(&[&o])).unwrap();
    let verified = a.verify(container).unwrap();

    assert!(matches!(
        a.decrypt(&verified),
        Err(PkiError::Decryption(DecryptionError::NotARecipient(_)))
    ));
    assert_eq!(o.decrypt(&verified).unwrap(), b"for org only");
}

#[test]
fn edge_plaintext_container_opens_without_keys() {
    let a = admin("admin-1");
    let public_a = a.public();
    let container = a.sign_string("hello").unwrap();

    let opened = public_a.open(public_a.verify(container).unwrap()).unwrap();
    assert_eq!(opened.state(), ContainerState::PlaintextReady);
    assert_eq!(opened.body(), b"hello");
}
