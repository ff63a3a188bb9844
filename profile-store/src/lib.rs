//! Persistence core for profile records.
//!
//! A [`Profile`] is a record keyed by email address with optional name and
//! address fields. The [`ProfileStore`] trait is the whole contract: create,
//! get, list, partial update, full-overwrite upsert, delete, and the
//! administrative delete-all. [`SledStore`] is the embedded implementation,
//! one sled tree with one record per email.

pub mod error;
pub mod profile;
pub mod store;

pub use error::{Result, StoreError};
pub use profile::{Profile, ProfileChanges};
pub use store::{ProfileStore, SledStore};
