//! Document containers: wire format and verify-then-open typestate.

pub mod container;

pub use container::{
    Container, ContainerState, EncryptionMetadata, OpenedContainer, VerifiedContainer,
    CONTAINER_VERSION,
};
