//! Core types for the tutoring marketplace back office.
//!
//! Holds the domain records (teachers, study groups), the [`store::Store`]
//! capability trait with its REST and in-memory implementations, and the
//! environment configuration used to reach the hosted store.

pub mod config;
pub mod errors;
pub mod models;
pub mod store;

pub use config::{CredentialTier, StoreConfig};
pub use errors::{ConfigError, StoreError};
pub use models::{Record, StudyGroup, TeacherProfile, TeachingMode};
pub use store::{Filter, MemoryStore, RawSupport, RestStore, Store};
