//! Core domain types for the restash REST backup server.
//!
//! This crate defines the pieces every other crate agrees on:
//! - The fixed set of blob types and the sharding rule
//! - Repository namespaces and storage key resolution
//! - `Range` header parsing and serving windows
//! - Configuration types

pub mod blob;
pub mod config;
pub mod error;
pub mod range;
pub mod repo;

pub use blob::{BlobType, shard_names};
pub use error::{Error, Result};
pub use range::{ByteRange, Window};
pub use repo::{ROOT_REPO, Repo};

/// Media type of the versioned JSON listing format.
pub const LIST_V2_MEDIA_TYPE: &str = "application/vnd.x.restic.rest.v2";
