// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for Muster: permission store and ordered collections.
//!
//! Two concerns live here:
//!
//! - [`perms::PermissionRepository`] and [`service::PermissionService`] —
//!   SQLite-backed groups, memberships, and grants, plus the authorization
//!   entry point that feeds them to the pure decision engine.
//! - [`ordering::OrderedCollection`] — dense, scope-partitioned position
//!   maintenance for any table that declares an [`ordering::OrderingSpec`].

pub mod error;
pub mod ordering;
pub mod perms;
pub mod pool;
pub mod service;
pub mod testing;

pub use error::DbError;
pub use ordering::{Orderable, OrderedCollection, OrderingSpec, RecordId};
pub use perms::{PermissionRepository, PermissionStore};
pub use pool::create_pool;
pub use service::PermissionService;
