// Collaborator traits for the pieces of the system that are explicitly
// out of scope for the core: a remote embedding service, pluggable
// auth/authz, and a replication dispatcher. The executor depends only on
// these traits, never on a concrete HTTP client or auth backend, so
// wiring in a real implementation is a matter of handing it a boxed trait
// object at startup. Each trait ships a `Disabled` no-op implementation
// that the binary wires in by default.

#![allow(dead_code)]

mod auth;
mod embedder;
mod replicator;

pub use auth::{Auth, DisabledAuth};
pub use embedder::{DisabledEmbedder, Embedder};
pub use replicator::{DisabledReplicator, MutationKind, Replicator};
