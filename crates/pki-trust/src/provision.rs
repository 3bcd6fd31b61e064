//! Provisioning of a new trust hierarchy.
//!
//! Writes exactly what [`crate::chain::TrustChainLoader`] later reads:
//!
//! | Location                 | Contents                                        |
//! |--------------------------|-------------------------------------------------|
//! | `local/{admin}/admin`    | admin entity document with private keys        |
//! | `private/{admin}/org`    | org document with private keys, sealed to admin |
//! | `public/{admin}/org`     | org public document, signed by admin            |
//! | `private/{org}/index`    | empty index, sealed to and signed by the org    |

use log::info;
use zeroize::Zeroize;

use crate::chain::{TrustChainLoader, ADMIN_KEY, ORG_KEY};
use crate::document::Container;
use crate::entity::{Entity, EntityId, EntityRole};
use crate::error::Result;
use crate::index::Index;
use crate::storage::Storage;

/// Generate an admin and store its bootstrap document in local scope.
pub fn provision_admin<S: Storage + ?Sized>(
    storage: &S,
    id: EntityId,
    name: Option<String>,
) -> Result<Entity> {
    let admin = Entity::generate(id, EntityRole::Admin, name);
    let mut document = admin.dump_private()?;
    let written = storage.write_local(ADMIN_KEY, &document);
    document.zeroize();
    written?;

    info!("provisioned admin {} ({})", admin.id(), admin.fingerprint());
    Ok(admin)
}

/// Generate an organization under `admin` and give it an empty index.
///
/// The returned organization holds its private keys and is anchored by
/// `admin`.
pub fn provision_organization<S: Storage + ?Sized>(
    storage: &S,
    admin: &Entity,
    id: EntityId,
    name: Option<String>,
) -> Result<Entity> {
    admin.require_role(EntityRole::Admin)?;
    let org = Entity::generate(id, EntityRole::Organization, name);

    let mut private_document = org.dump_private()?;
    let sealed = admin.encrypt_then_sign(&private_document, Some(&[admin]));
    private_document.zeroize();
    storage.send_private(admin.id(), ORG_KEY, &sealed?.to_bytes()?)?;

    let public_document = org.dump_public()?;
    let signed =
        admin.sign_container(&Container::plaintext(admin.id().clone(), &public_document))?;
    storage.send_public(admin.id(), ORG_KEY, &signed.to_bytes()?)?;

    let org = org.anchored(admin.id());
    TrustChainLoader::new(storage).save_index(&org, &Index::new(org.id().clone()))?;

    info!(
        "provisioned organization {} ({}) under admin {}",
        org.id(),
        org.fingerprint(),
        admin.id()
    );
    Ok(org)
}
