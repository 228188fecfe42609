//! Cloudflare R2 publishing client.
//!
//! This crate provides:
//! - File and byte upload to R2 with public URL resolution
//! - Object existence checks and deletion
//! - Connectivity checks for readiness probes

pub mod client;
pub mod error;

pub use client::{PublishedObject, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
