//! Document store for the YTGen backend.
//!
//! This crate provides:
//! - Typed repositories for assets, agents and channel profiles
//! - Ownership checks on every read and mutation
//! - Guarded (compare-and-set) status transitions for the job state machines
//!
//! The backing store is an in-process collection keyed by id. Mutations run
//! as closures under the collection's write lock, which makes per-record
//! status transitions linearizable: a later read never observes an earlier
//! status after a later one was committed.

pub mod agents;
pub mod assets;
pub mod backend;
pub mod error;
pub mod profiles;

pub use agents::AgentRepository;
pub use assets::AssetRepository;
pub use backend::Collection;
pub use error::{StoreError, StoreResult};
pub use profiles::ProfileRepository;
