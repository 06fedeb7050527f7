//! Apphost Storage - document and app-data persistence.
//!
//! Apps persist two kinds of content, kept in separate spaces:
//!
//! - **Documents**: user-facing files an app produces
//! - **App data**: the app's own private state
//!
//! Both spaces are reached through the [`DocumentStore`] trait. Paths are
//! relative and already namespaced by the caller (`<app>/<relative path>`);
//! the store only guarantees that a path can never escape its space.
//!
//! # Backends
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`MemoryDocumentStore`] | Tests and headless hosts |
//! | [`FileDocumentStore`] | One directory per space on the local filesystem |

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::{DocumentStore, FileDocumentStore, MemoryDocumentStore, StorageSpace};
