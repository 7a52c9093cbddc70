// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scoped, group-based permission evaluation for Muster.
//!
//! Users belong to permission groups; groups carry allow/deny grants
//! scoped to everything, a kind of object, one object, or a string key.
//! [`PermissionEngine`] evaluates a check against pre-fetched grants with
//! deny precedence, falling back to code-defined inherited rules. All
//! evaluation is pure — the persistence layer (muster-server-db) loads the
//! candidate grants and scope attributes up front.

pub mod engine;
pub mod error;
pub mod grant;
pub mod group;
pub mod matcher;
pub mod registry;
pub mod rules;
pub mod scope;
pub mod types;

pub use engine::PermissionEngine;
pub use error::AuthError;
pub use grant::{Grant, GrantScope};
pub use group::{Membership, PermissionGroup};
pub use matcher::permission_matches;
pub use registry::{AllowedScopes, PermissionRegistry, PermissionSpec, ResolvedRegistry, ScopeSource};
pub use rules::{builtin_rules, check_inherited, InheritedRule};
pub use scope::{NormalizedScope, ScopeAttrs, ScopeRef};
pub use types::{Effect, GrantId, GroupId, Module, ObjectId, Principal, ScopeKind, Subject, UserId};
