//! `warden-core`: shared building blocks for the authorization core.
//!
//! This crate contains **pure** primitives (no storage, no crypto).

pub mod entity;
pub mod error;
pub mod id;
pub mod page;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{PermissionId, RoleId, UserId};
pub use page::{Page, Pagination};
