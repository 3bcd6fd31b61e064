//! Trust-chain loader.
//!
//! Walks the hierarchy from the single local root of trust downward:
//!
//! ```text
//! local/"admin"  ──build──▶ Admin
//! {admin}/"org"  ──verify(admin)──▶ [decrypt(admin)] ──build──▶ Organization
//! private/{org}/"index" ──verify(org)──▶ decrypt(org) ──build──▶ Index
//! ```
//!
//! Each stage runs to completion or fails; nothing is retried. Every
//! failure is wrapped in [`PkiError::TrustChain`] naming the [`TrustStep`]
//! it happened at, so callers can tell a missing object from a forged one.

use log::{debug, info};

use crate::document::{Container, ContainerState, OpenedContainer, VerifiedContainer};
use crate::entity::{Entity, EntityDocument, EntityRole};
use crate::error::{DecryptionError, PkiError, Result, StorageError, TrustStep};
use crate::index::Index;
use crate::storage::{Scope, Storage};

/// Storage key of the admin's bootstrap entity document (local scope).
pub const ADMIN_KEY: &str = "admin";
/// Storage key of the organization container in the admin's partition.
pub const ORG_KEY: &str = "org";
/// Storage key of the index container in the organization's partition.
pub const INDEX_KEY: &str = "index";

/// Materializes entities and the index from storage, verifying each link.
pub struct TrustChainLoader<'a, S: Storage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: Storage + ?Sized> TrustChainLoader<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &'a S {
        self.storage
    }

    /// Build the admin from unsigned local bootstrap data.
    ///
    /// The admin is the root of trust: it must hold both private keys.
    pub fn load_local_admin(&self) -> Result<Entity> {
        let step = TrustStep::LoadLocalAdmin;
        let bytes = self.storage.read_local(ADMIN_KEY).map_err(|e| match e {
            StorageError::NotFound(_) => PkiError::AdminBootstrapMissing.at(step),
            other => PkiError::from(other).at(step),
        })?;

        let document = EntityDocument::from_json(&bytes).map_err(|e| e.at(step))?;
        if !document.has_private_keys() {
            return Err(PkiError::InvalidKey(format!(
                "local admin {} is missing private key material",
                document.id
            ))
            .at(step));
        }
        let admin = Entity::from_document(&document).map_err(|e| e.at(step))?;
        admin
            .require_role(EntityRole::Admin)
            .map_err(|e| e.at(step))?;

        debug!("loaded local admin {} ({})", admin.id(), admin.fingerprint());
        Ok(admin)
    }

    /// Load the organization from the admin's `scope` partition.
    ///
    /// The private copy is encrypted to the admin and yields an organization
    /// with its private keys; the public copy is plaintext and yields
    /// public keys only.
    pub fn load_organization(&self, admin: &Entity, scope: Scope) -> Result<Entity> {
        if scope == Scope::Local {
            return Err(PkiError::UnsupportedScope(format!("organization: {scope}"))
                .at(TrustStep::FetchOrganization));
        }

        let bytes = self
            .storage
            .get(scope, admin.id(), ORG_KEY)
            .map_err(|e| PkiError::from(e).at(TrustStep::FetchOrganization))?;
        let container = Container::from_bytes(&bytes)
            .map_err(|e| e.at(TrustStep::ParseOrganizationContainer))?;
        let verified = admin
            .verify(container)
            .map_err(|e| e.at(TrustStep::VerifyOrganization))?;

        let opened = match scope {
            Scope::Private => open_sealed(admin, verified, "organization")
                .map_err(|e| e.at(TrustStep::DecryptOrganization))?,
            _ => verified
                .into_plaintext()
                .map_err(|e| e.at(TrustStep::BuildOrganization))?,
        };

        let org = Entity::from_json(opened.body())
            .and_then(|org| org.require_role(EntityRole::Organization).map(|_| org))
            .map_err(|e| e.at(TrustStep::BuildOrganization))?;

        debug!(
            "loaded {scope} organization {} anchored by {}",
            org.id(),
            admin.id()
        );
        Ok(org.anchored(admin.id()))
    }

    /// [`Self::load_organization`] from the admin's private partition.
    pub fn load_organization_private(&self, admin: &Entity) -> Result<Entity> {
        self.load_organization(admin, Scope::Private)
    }

    /// [`Self::load_organization`] from the admin's public partition.
    pub fn load_organization_public(&self, admin: &Entity) -> Result<Entity> {
        self.load_organization(admin, Scope::Public)
    }

    /// Load the index stored in the organization's private partition.
    ///
    /// The container must be signed by and encrypted to `org`, and the
    /// index inside must name `org` as its owner.
    pub fn load_index(&self, org: &Entity) -> Result<Index> {
        let bytes = self
            .storage
            .get_private(org.id(), INDEX_KEY)
            .map_err(|e| PkiError::from(e).at(TrustStep::FetchIndex))?;
        let container =
            Container::from_bytes(&bytes).map_err(|e| e.at(TrustStep::ParseIndexContainer))?;
        let verified = org
            .verify(container)
            .map_err(|e| e.at(TrustStep::VerifyIndex))?;

        let opened =
            open_sealed(org, verified, "index").map_err(|e| e.at(TrustStep::DecryptIndex))?;

        let index = Index::load(opened.body()).map_err(|e| e.at(TrustStep::BuildIndex))?;
        if index.owner_id() != org.id() {
            return Err(PkiError::OwnerMismatch {
                expected: org.id().to_string(),
                found: index.owner_id().to_string(),
            }
            .at(TrustStep::BuildIndex));
        }

        debug!("loaded index of {} ({} entries)", org.id(), index.len());
        Ok(index)
    }

    /// Encrypt the index to `org`, sign it, and replace the stored copy.
    pub fn save_index(&self, org: &Entity, index: &Index) -> Result<()> {
        if index.owner_id() != org.id() {
            return Err(PkiError::OwnerMismatch {
                expected: org.id().to_string(),
                found: index.owner_id().to_string(),
            }
            .at(TrustStep::SealIndex));
        }

        let bytes = index
            .dump()
            .and_then(|body| org.encrypt_then_sign_string(&body, None))
            .and_then(|container| container.to_bytes())
            .map_err(|e| e.at(TrustStep::SealIndex))?;
        self.storage
            .send_private(org.id(), INDEX_KEY, &bytes)
            .map_err(|e| PkiError::from(e).at(TrustStep::WriteIndex))?;

        info!("saved index of {} ({} entries)", org.id(), index.len());
        Ok(())
    }
}

/// Decrypt a private-scope container, refusing one stored in plaintext.
fn open_sealed(
    recipient: &Entity,
    verified: VerifiedContainer,
    what: &str,
) -> Result<OpenedContainer> {
    if !verified.is_encrypted() {
        return Err(DecryptionError::DecryptionFailed(format!(
            "{what} container is not encrypted"
        ))
        .into());
    }
    let opened = recipient.open(verified)?;
    debug_assert_eq!(opened.state(), ContainerState::Decrypted);
    Ok(opened)
}
